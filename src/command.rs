//! External command execution.
//!
//! Helper utilities (xdotool, wmctrl, xprop, osascript, sips, ...) are spawned
//! through a [`CommandRunner`]. Running a command never fails: a missing
//! binary, a non-zero exit and a missed deadline all come back as a
//! [`CommandOutput`] the caller has to inspect.

use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, trace};

/// Captured result of one external command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Everything the command wrote to stdout (lossy UTF-8).
    pub stdout: String,

    /// Everything the command wrote to stderr, or the reason it never ran.
    pub stderr: String,

    /// Exit code. `None` if the command could not be spawned, was killed
    /// by a signal, or missed its deadline.
    pub exit_code: Option<i32>,
}

impl CommandOutput {
    /// Output of a command that exited with code 0.
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: String::new(),
            exit_code: Some(0),
        }
    }

    /// Output of a command that did not produce a usable result.
    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            stdout: String::new(),
            stderr: reason.into(),
            exit_code: None,
        }
    }

    /// Returns true if the command ran and exited with code 0.
    pub fn succeeded(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Trimmed stdout of a successful run, `None` if the command failed or
    /// printed nothing.
    pub fn stdout_if_success(&self) -> Option<&str> {
        if !self.succeeded() {
            return None;
        }
        let trimmed = self.stdout.trim();
        (!trimmed.is_empty()).then_some(trimmed)
    }

    /// Human readable reason for a failed run.
    pub fn failure_reason(&self) -> String {
        let stderr = self.stderr.trim();
        match (self.exit_code, stderr.is_empty()) {
            (Some(code), true) => format!("exited with code {code}"),
            (Some(code), false) => format!("exited with code {code}: {stderr}"),
            (None, true) => "did not run".to_string(),
            (None, false) => stderr.to_string(),
        }
    }
}

/// Runs external programs with a deadline.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `program` with `args`, waiting at most `timeout` for it to exit.
    async fn run(&self, program: &str, args: &[&str], timeout: Duration) -> CommandOutput;
}

/// [`CommandRunner`] backed by real child processes.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn run(&self, program: &str, args: &[&str], timeout: Duration) -> CommandOutput {
        trace!("Running: {} {}", program, args.join(" "));

        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn();

        let child = match child {
            Ok(child) => child,
            Err(e) => {
                debug!("Failed to spawn {}: {}", program, e);
                return CommandOutput::failed(format!("failed to spawn {program}: {e}"));
            }
        };

        // The child is killed when the timed-out future drops it.
        match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => {
                let result = CommandOutput {
                    stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                    stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                    exit_code: output.status.code(),
                };
                if !result.succeeded() {
                    debug!("{} {}", program, result.failure_reason());
                }
                result
            }
            Ok(Err(e)) => {
                debug!("Failed to wait for {}: {}", program, e);
                CommandOutput::failed(format!("failed to wait for {program}: {e}"))
            }
            Err(_) => {
                debug!("{} timed out after {:?}", program, timeout);
                CommandOutput::failed(format!("{program} timed out after {timeout:?}"))
            }
        }
    }
}
