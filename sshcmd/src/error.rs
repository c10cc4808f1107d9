//! Error types for sshcmd.
//!
//! Two families live here. [`ConfigError`] is raised while building a
//! session or a command sequence and means the caller passed something
//! unusable. [`TransportError`] comes out of the SSH layer at runtime and
//! never reaches the caller directly: the session client folds it into an
//! [`ExecutionResult`](crate::ExecutionResult) using [`TransportError::kind`].

use std::fmt;
use std::io;
use std::time::Duration;

use thiserror::Error;

/// Main error type for sshcmd operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid session configuration or command sequence
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// SSH transport-level errors
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
}

/// Caller-input errors detected before any connection is attempted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Hostname missing or blank
    #[error("hostname must not be empty")]
    EmptyHostname,

    /// Username missing or blank
    #[error("username must not be empty")]
    EmptyUsername,

    /// Neither a password nor a private key file was supplied
    #[error("a password or private_key_file (or both) must be provided")]
    MissingCredentials,

    /// A timeout or sleep value was not a non-negative whole number of seconds
    #[error("{field} must be a non-negative integer number of seconds, got {value}")]
    InvalidSeconds { field: &'static str, value: String },

    /// The command sequence was empty
    #[error("commands must contain at least one command")]
    EmptyCommands,
}

/// Transport layer errors (connection, authentication, channel I/O).
#[derive(Error, Debug)]
pub enum TransportError {
    /// Host key presented by the server was rejected
    #[error("Host key for {host}:{port} was rejected")]
    HostKeyRejected { host: String, port: u16 },

    /// Authentication failed
    #[error("Authentication failed for user '{user}'")]
    AuthenticationFailed { user: String },

    /// Private key could not be loaded or decrypted
    #[error("SSH key error: {0}")]
    Key(String),

    /// The server refused to open a session channel
    #[error("Failed to open channel: {0}")]
    ChannelOpenFailed(String),

    /// The server refused the exec request
    #[error("Remote command request was rejected")]
    RequestRejected,

    /// The channel closed before the remote process reported an exit status
    #[error("Channel closed before an exit status was received")]
    ChannelClosed,

    /// SSH handshake or protocol error
    #[error("SSH error: {0}")]
    Ssh(#[from] russh::Error),

    /// Operation timed out
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl TransportError {
    /// Classify this error for reporting in an execution result.
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::HostKeyRejected { .. } | Self::Ssh(russh::Error::UnknownKey) => {
                FailureKind::BadHostKey
            }
            Self::AuthenticationFailed { .. } | Self::Key(_) => FailureKind::Authentication,
            Self::ChannelOpenFailed(_) => FailureKind::ChannelOpen,
            Self::Timeout(_) => FailureKind::Timeout,
            Self::Io(e) | Self::Ssh(russh::Error::IO(e)) if e.kind() == io::ErrorKind::TimedOut => {
                FailureKind::Timeout
            }
            Self::Ssh(
                russh::Error::ConnectionTimeout
                | russh::Error::KeepaliveTimeout
                | russh::Error::InactivityTimeout,
            ) => FailureKind::Timeout,
            Self::Io(_) | Self::Ssh(russh::Error::IO(_)) => FailureKind::Socket,
            Self::RequestRejected | Self::ChannelClosed | Self::Ssh(_) => FailureKind::Protocol,
        }
    }
}

/// Classification of a runtime failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// The server's host key was not acceptable.
    BadHostKey,
    /// The server rejected every supplied credential.
    Authentication,
    /// A session channel could not be opened.
    ChannelOpen,
    /// Any other SSH protocol failure.
    Protocol,
    /// The underlying socket failed.
    Socket,
    /// A connection or command timeout fired.
    Timeout,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::BadHostKey => "bad host key",
            Self::Authentication => "authentication",
            Self::ChannelOpen => "channel open",
            Self::Protocol => "protocol",
            Self::Socket => "socket",
            Self::Timeout => "timeout",
        };
        f.write_str(name)
    }
}

/// Result type alias using sshcmd's Error.
pub type Result<T> = std::result::Result<T, Error>;
