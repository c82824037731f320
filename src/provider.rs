//! Data-provider units.
//!
//! A provider unit is a script in the data tree whose output *is* the data:
//! `api/posts/index.js` might query a CMS and print the posts. Units are run
//! as subprocesses with a fixed contract:
//!
//! - command line: the interpreter configured for the unit's extension,
//!   followed by the unit's path (`node /site/api/posts/index.js`);
//! - working directory: the directory holding the unit;
//! - success: exit status 0 and exactly one JSON document on stdout.
//!
//! Anything else on stdout breaks the parse, so a node unit prints its
//! result with `console.log(JSON.stringify(data))` and keeps diagnostics on
//! stderr. Stderr is captured and reported only when the unit fails.
//!
//! The [`ProviderRunner`] trait is the seam: the pipeline only ever asks for
//! "the value this unit produces", and tests substitute a scripted runner.

use serde_json::Value;
use std::io;
use std::path::Path;
use std::process::Command;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("failed to start `{command}`: {source}")]
    Spawn { command: String, source: io::Error },
    #[error("exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },
    #[error("did not print valid JSON: {0}")]
    InvalidOutput(#[from] serde_json::Error),
    #[error("no interpreter configured")]
    NoCommand,
}

/// Executes provider units.
pub trait ProviderRunner: Sync {
    /// Run `unit` with `command` and return its raw stdout.
    fn run(&self, unit: &Path, command: &[String]) -> Result<Vec<u8>, ProviderError>;

    /// Run `unit` and parse its output as JSON.
    fn produce(&self, unit: &Path, command: &[String]) -> Result<Value, ProviderError> {
        let stdout = self.run(unit, command)?;
        Ok(serde_json::from_slice(&stdout)?)
    }
}

/// Runs units as real subprocesses.
#[derive(Debug, Default, Clone, Copy)]
pub struct CommandRunner;

impl ProviderRunner for CommandRunner {
    fn run(&self, unit: &Path, command: &[String]) -> Result<Vec<u8>, ProviderError> {
        let (program, args) = command.split_first().ok_or(ProviderError::NoCommand)?;

        let mut cmd = Command::new(program);
        cmd.args(args).arg(unit);
        if let Some(dir) = unit.parent()
            && !dir.as_os_str().is_empty()
        {
            cmd.current_dir(dir);
        }

        let output = cmd.output().map_err(|source| ProviderError::Spawn {
            command: command.join(" "),
            source,
        })?;

        if !output.status.success() {
            return Err(ProviderError::Failed {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(output.stdout)
    }
}
