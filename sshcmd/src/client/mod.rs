//! Session client API.
//!
//! The client layer turns a validated [`SessionConfig`] and a
//! [`CommandSequence`] into an [`ExecutionResult`], driving the transport
//! through connect, exec, input, end-of-input and drain.

mod builder;
mod commands;
#[cfg(test)]
mod mock;
mod outcome;
mod session;

pub use builder::{DEFAULT_PORT, SessionConfig, SessionConfigBuilder};
pub use commands::CommandSequence;
pub use outcome::{CommandOutput, ExecutionResult, Failure, Phase, SUCCESS_MESSAGE};
pub use session::SessionClient;
