//! Runs external command lines to completion and enforces exit-code
//! contracts.
//!
//! Each invocation is an independent unit: spawn, buffer stdout and stderr
//! separately until the child exits, compare the exit code. There is no
//! internal timeout; bounding the overall step is the calling scenario's
//! job, and a mismatched exit code is never retried here since re-running
//! a mutating command may not be idempotent.

use std::borrow::Cow;

use thiserror::Error;
use tokio::process::Command;

#[derive(Debug, Error)]
pub enum ExecError {
    #[error("empty command line")]
    Empty,

    #[error("failed to parse command line {command:?}: {source}")]
    Parse {
        command: String,
        source: shell_words::ParseError,
    },

    #[error("failed to spawn {command:?}: {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },

    #[error("{command:?} was terminated by a signal before exiting")]
    Signal { command: String },

    #[error("{command:?} exited with code {actual}, expected {expected}; stderr: {stderr}")]
    ExitCode {
        command: String,
        expected: i32,
        actual: i32,
        stderr: String,
    },
}

/// Captured result of one finished command.
#[derive(Clone, Debug)]
pub struct CommandOutput {
    pub exit_code: i32,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl CommandOutput {
    pub fn stdout_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.stdout)
    }

    pub fn stderr_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.stderr)
    }
}

/// Run a command line to completion and capture its output.
///
/// The line is split with shell-style word rules (quoting honored, no
/// variable expansion). The first word is the program, including any
/// privilege-elevation prefix the caller put there.
pub async fn run(command_line: &str) -> Result<CommandOutput, ExecError> {
    let words = shell_words::split(command_line).map_err(|source| ExecError::Parse {
        command: command_line.to_string(),
        source,
    })?;
    let (program, args) = words.split_first().ok_or(ExecError::Empty)?;

    tracing::info!(command = command_line, "running command");
    let output = Command::new(program)
        .args(args)
        .output()
        .await
        .map_err(|source| ExecError::Spawn {
            command: command_line.to_string(),
            source,
        })?;

    let exit_code = output.status.code().ok_or_else(|| ExecError::Signal {
        command: command_line.to_string(),
    })?;
    Ok(CommandOutput {
        exit_code,
        stdout: output.stdout,
        stderr: output.stderr,
    })
}

/// Run a command line and fail unless it exits with `expected_exit`.
///
/// The error carries the actual code and the captured stderr, so a failing
/// step loses no diagnostics.
pub async fn run_and_check(
    command_line: &str,
    expected_exit: i32,
) -> Result<CommandOutput, ExecError> {
    let output = run(command_line).await?;
    if output.exit_code != expected_exit {
        tracing::error!(
            command = command_line,
            expected = expected_exit,
            actual = output.exit_code,
            "unexpected exit code"
        );
        return Err(ExecError::ExitCode {
            command: command_line.to_string(),
            expected: expected_exit,
            actual: output.exit_code,
            stderr: output.stderr_lossy().into_owned(),
        });
    }
    Ok(output)
}
