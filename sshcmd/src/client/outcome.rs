//! Structured outcome of a remote execution.

use std::fmt;

use serde::ser::{Serialize, SerializeStruct, Serializer};

use crate::error::{FailureKind, TransportError};
use crate::transport::ChannelOutput;

/// Message reported for a successful execution.
pub const SUCCESS_MESSAGE: &str = "SSH connection executed successfully.";

/// Captured output of a remote process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// Standard output (lossy UTF-8).
    pub stdout: String,

    /// Standard error (lossy UTF-8).
    pub stderr: String,

    /// Exit status of the remote process; `-1` if it ended on a signal.
    pub exit_code: i32,
}

impl CommandOutput {
    /// Whether the remote process exited with status zero.
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

impl From<ChannelOutput> for CommandOutput {
    fn from(output: ChannelOutput) -> Self {
        Self {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            exit_code: output.exit_status,
        }
    }
}

/// Where in the session a failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Connecting and authenticating.
    Connect,
    /// Opening the channel, sending commands or collecting output.
    Execute,
}

/// A classified runtime failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    phase: Phase,
    kind: FailureKind,
    detail: String,
}

impl Failure {
    /// Classify a transport error raised during `phase`.
    pub fn new(phase: Phase, error: &TransportError) -> Self {
        Self {
            phase,
            kind: error.kind(),
            detail: error.to_string(),
        }
    }

    /// Phase the failure happened in.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Failure classification.
    pub fn kind(&self) -> FailureKind {
        self.kind
    }

    /// The underlying transport error text.
    pub fn detail(&self) -> &str {
        &self.detail
    }

    /// Human-readable message, distinct for every phase and kind.
    pub fn message(&self) -> String {
        let detail = self.detail.trim_end_matches('.');
        match (self.phase, self.kind) {
            (Phase::Connect, FailureKind::BadHostKey) => {
                "The host key given by the SSH server did not match what we were expecting."
                    .to_string()
            }
            (Phase::Connect, FailureKind::Authentication) => {
                "Authentication failed. It may be possible to retry with different credentials."
                    .to_string()
            }
            (Phase::Connect, FailureKind::ChannelOpen) => {
                "An attempt to open a new channel failed while connecting.".to_string()
            }
            (Phase::Connect, FailureKind::Protocol) => {
                format!("There was an error connecting or establishing an SSH session. {detail}.")
            }
            (Phase::Connect, FailureKind::Socket) => "Socket error while connecting.".to_string(),
            (Phase::Connect, FailureKind::Timeout) => {
                "Socket timeout while connecting. The server may be unreachable.".to_string()
            }
            (Phase::Execute, FailureKind::ChannelOpen) => {
                "An attempt to open a channel for the command failed.".to_string()
            }
            (Phase::Execute, FailureKind::Socket) => {
                "Socket error while executing command.".to_string()
            }
            (Phase::Execute, FailureKind::Timeout) => {
                "Socket timeout while executing command. This server may be unresponsive."
                    .to_string()
            }
            (Phase::Execute, _) => format!(
                "There was an error executing the command; an SSH exception occurred. {detail}."
            ),
        }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message())
    }
}

/// Outcome of [`SessionClient::execute_remote_command`](super::SessionClient::execute_remote_command).
///
/// A success always carries stdout, stderr and the exit code; a failure
/// carries none of them, even if some output had already been read.
/// `status` reports whether the SSH side worked and says nothing about the
/// remote command's own exit code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionResult {
    /// Every command was delivered and the remote process finished.
    Success(CommandOutput),
    /// The session failed before a complete result was collected.
    Failure(Failure),
}

impl ExecutionResult {
    /// Whether connection and execution succeeded.
    pub fn status(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Human-readable description of the outcome.
    pub fn message(&self) -> String {
        match self {
            Self::Success(_) => SUCCESS_MESSAGE.to_string(),
            Self::Failure(failure) => failure.message(),
        }
    }

    /// Captured stdout, present only on success.
    pub fn stdout(&self) -> Option<&str> {
        self.output().map(|o| o.stdout.as_str())
    }

    /// Captured stderr, present only on success.
    pub fn stderr(&self) -> Option<&str> {
        self.output().map(|o| o.stderr.as_str())
    }

    /// Remote exit code, present only on success.
    pub fn exit_code(&self) -> Option<i32> {
        self.output().map(|o| o.exit_code)
    }

    /// The captured output, if the execution succeeded.
    pub fn output(&self) -> Option<&CommandOutput> {
        match self {
            Self::Success(output) => Some(output),
            Self::Failure(_) => None,
        }
    }

    /// The failure, if the execution failed.
    pub fn failure(&self) -> Option<&Failure> {
        match self {
            Self::Success(_) => None,
            Self::Failure(failure) => Some(failure),
        }
    }
}

impl Serialize for ExecutionResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut record = serializer.serialize_struct("ExecutionResult", 5)?;
        record.serialize_field("status", &self.status())?;
        record.serialize_field("msg", &self.message())?;
        record.serialize_field("stdout", &self.stdout())?;
        record.serialize_field("stderr", &self.stderr())?;
        record.serialize_field("exit_code", &self.exit_code())?;
        record.end()
    }
}
