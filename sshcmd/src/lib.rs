//! # sshcmd
//!
//! Async SSH remote command execution for automation callers.
//!
//! sshcmd connects to a host, runs a command sequence over a single channel
//! and hands back stdout, stderr and the exit code as one structured result.
//!
//! ## Features
//!
//! - Async SSH connections via russh
//! - Password, private key, or key-with-passphrase authentication
//! - Multi-step sequences on one channel (`sudo su -` followed by the payload)
//! - Optional connection and per-operation command timeouts
//! - Failures classified into a result value instead of an error
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use sshcmd::{SessionClient, SessionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), sshcmd::Error> {
//!     let config = SessionConfig::builder("192.168.1.1", "admin")
//!         .password("secret")
//!         .connection_timeout(10)
//!         .build()?;
//!
//!     let client = SessionClient::new(config);
//!     let result = client.execute(["uname -a"]).await?;
//!
//!     match result.output() {
//!         Some(output) => println!("{}", output.stdout),
//!         None => eprintln!("{}", result.message()),
//!     }
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod error;
pub mod transport;

// Re-export main types for convenience
pub use client::{
    CommandOutput, CommandSequence, ExecutionResult, Failure, Phase, SessionClient, SessionConfig,
    SessionConfigBuilder,
};
pub use error::{ConfigError, Error, FailureKind, TransportError};
pub use transport::{AuthMethod, SshConnector};
