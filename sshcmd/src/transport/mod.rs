//! SSH transport layer.
//!
//! The session client talks to the network only through the [`Connector`],
//! [`Connection`] and [`ExecChannel`] traits. [`SshConnector`] implements
//! them on top of russh; tests substitute a scripted transport.

pub mod config;
mod ssh;

use std::future::Future;
use std::time::Duration;

use bytes::Bytes;

pub use config::{AuthMethod, ConnectSettings};
pub use ssh::{SIGNALLED_EXIT_CODE, SshChannel, SshConnection, SshConnector};

use crate::error::TransportError;

/// Opens authenticated connections.
pub trait Connector: Send + Sync {
    /// Connection type produced by this connector.
    type Connection: Connection;

    /// Connect to the host and authenticate.
    fn connect(
        &self,
        settings: &ConnectSettings<'_>,
    ) -> impl Future<Output = Result<Self::Connection, TransportError>> + Send;
}

/// An authenticated SSH connection.
pub trait Connection: Send {
    /// Channel type opened on this connection.
    type Channel: ExecChannel;

    /// Open a session channel.
    fn open_channel(
        &mut self,
    ) -> impl Future<Output = Result<Self::Channel, TransportError>> + Send;

    /// Disconnect. Consumes the connection so it can only be closed once.
    fn close(self) -> impl Future<Output = Result<(), TransportError>> + Send;
}

/// A session channel running a single remote process.
pub trait ExecChannel: Send {
    /// Start the remote process.
    fn exec(&mut self, command: &str) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Whether the channel can accept input right now.
    fn send_ready(&mut self) -> impl Future<Output = Result<bool, TransportError>> + Send;

    /// Write to the remote process's standard input.
    fn send(&mut self, data: &[u8]) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Signal end-of-input while leaving the read side open.
    fn shutdown_write(&mut self) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Drain stdout and stderr and wait for the exit status.
    fn read_to_end(&mut self) -> impl Future<Output = Result<ChannelOutput, TransportError>> + Send;

    /// Close the channel. Consumes it so it can only be closed once.
    fn close(self) -> impl Future<Output = Result<(), TransportError>> + Send;
}

/// Everything a finished remote process produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelOutput {
    /// Standard output bytes.
    pub stdout: Bytes,

    /// Standard error bytes.
    pub stderr: Bytes,

    /// Exit status reported by the server, or [`SIGNALLED_EXIT_CODE`] if the
    /// process was killed by a signal.
    pub exit_status: i32,
}

/// Run `op`, failing with [`TransportError::Timeout`] if `limit` elapses first.
///
/// `None` leaves the operation unbounded.
pub(crate) async fn bounded<T, F>(limit: Option<Duration>, op: F) -> Result<T, TransportError>
where
    F: Future<Output = Result<T, TransportError>>,
{
    match limit {
        Some(limit) => tokio::time::timeout(limit, op)
            .await
            .map_err(|_| TransportError::Timeout(limit))?,
        None => op.await,
    }
}
