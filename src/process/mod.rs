//! Subprocess execution for the build tool and git.
//!
//! `capture` buffers standard output up to a byte limit and treats anything
//! beyond it as an error. `stream` hands the terminal to the child so build
//! progress is visible as it happens.

use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use log::debug;
use thiserror::Error;
use tokio::io::AsyncReadExt;
use tokio::process::Command;

/// Exit status of a finished child process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessStatus {
    /// Exit code, `None` when the process was terminated by a signal.
    pub code: Option<i32>,
}

impl ProcessStatus {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    pub fn exited(code: i32) -> Self {
        Self { code: Some(code) }
    }
}

impl std::fmt::Display for ProcessStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.code {
            Some(code) => write!(f, "exit code {}", code),
            None => write!(f, "terminated by signal"),
        }
    }
}

impl From<std::process::ExitStatus> for ProcessStatus {
    fn from(status: std::process::ExitStatus) -> Self {
        Self {
            code: status.code(),
        }
    }
}

/// Output of a process run with captured standard output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedOutput {
    pub status: ProcessStatus,
    pub stdout: String,
    pub stderr: String,
}

impl CapturedOutput {
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            status: ProcessStatus::exited(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn failure(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            status: ProcessStatus::exited(code),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("failed to start `{command}`")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("output of `{command}` exceeded {limit} bytes")]
    OutputTooLarge { command: String, limit: usize },

    #[error("I/O error while running `{command}`")]
    Io {
        command: String,
        #[source]
        source: std::io::Error,
    },
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    /// Run `program` in `cwd`, capturing at most `limit` bytes of standard output.
    async fn capture(
        &self,
        program: &str,
        args: &[String],
        cwd: &Path,
        limit: usize,
    ) -> Result<CapturedOutput, ProcessError>;

    /// Run `program` in `cwd` with inherited standard output and error.
    async fn stream(
        &self,
        program: &str,
        args: &[String],
        cwd: &Path,
    ) -> Result<ProcessStatus, ProcessError>;
}

/// Render a command line for messages.
pub fn display_command(program: &str, args: &[String]) -> String {
    let mut parts = vec![program.to_string()];
    parts.extend(args.iter().cloned());
    parts.join(" ")
}

pub struct TokioProcessRunner;

#[async_trait]
impl ProcessRunner for TokioProcessRunner {
    #[tracing::instrument(skip(self))]
    async fn capture(
        &self,
        program: &str,
        args: &[String],
        cwd: &Path,
        limit: usize,
    ) -> Result<CapturedOutput, ProcessError> {
        let command = display_command(program, args);
        debug!("Running `{}` in {:?}", command, cwd);

        let mut child = Command::new(program)
            .args(args)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ProcessError::Spawn {
                command: command.clone(),
                source,
            })?;

        let io_error = |source| ProcessError::Io {
            command: command.clone(),
            source,
        };

        let stdout = child.stdout.take().ok_or_else(|| {
            io_error(std::io::Error::other("standard output was not captured"))
        })?;
        let mut stderr = child.stderr.take().ok_or_else(|| {
            io_error(std::io::Error::other("standard error was not captured"))
        })?;

        let read_stdout = async {
            let mut buf = Vec::new();
            stdout
                .take(limit as u64 + 1)
                .read_to_end(&mut buf)
                .await
                .map(|_| buf)
        };
        let read_stderr = async {
            let mut buf = Vec::new();
            stderr.read_to_end(&mut buf).await.map(|_| buf)
        };

        let (out, err) = tokio::join!(read_stdout, read_stderr);
        let out = out.map_err(io_error)?;

        if out.len() > limit {
            let _ = child.kill().await;
            return Err(ProcessError::OutputTooLarge {
                command: command.clone(),
                limit,
            });
        }

        let err = err.map_err(io_error)?;
        let status = child.wait().await.map_err(io_error)?;

        Ok(CapturedOutput {
            status: status.into(),
            stdout: String::from_utf8_lossy(&out).into_owned(),
            stderr: String::from_utf8_lossy(&err).into_owned(),
        })
    }

    #[tracing::instrument(skip(self))]
    async fn stream(
        &self,
        program: &str,
        args: &[String],
        cwd: &Path,
    ) -> Result<ProcessStatus, ProcessError> {
        let command = display_command(program, args);
        debug!("Running `{}` in {:?}", command, cwd);

        let status = Command::new(program)
            .args(args)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .status()
            .await
            .map_err(|source| ProcessError::Spawn {
                command: command.clone(),
                source,
            })?;

        Ok(status.into())
    }
}
