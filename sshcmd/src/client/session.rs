//! Session client: one connection, one channel, one result per call.

use std::time::Duration;

use log::{debug, info, trace, warn};

use super::builder::SessionConfig;
use super::commands::CommandSequence;
use super::outcome::{CommandOutput, ExecutionResult, Failure, Phase};
use crate::error::{Result, TransportError};
use crate::transport::{Connection, Connector, ExecChannel, SshConnector, bounded};

/// Delay between send-ready polls while the channel cannot take input.
const SEND_READY_POLL: Duration = Duration::from_millis(10);

/// Runs command sequences on a remote host.
///
/// The client keeps no connection between calls: every call to
/// [`execute_remote_command`](Self::execute_remote_command) connects,
/// authenticates, runs the sequence over one channel, and tears everything
/// down again. Calls may run concurrently from separate tasks.
///
/// # Example
///
/// ```rust,no_run
/// use sshcmd::{CommandSequence, SessionClient, SessionConfig};
///
/// # async fn example() -> Result<(), sshcmd::Error> {
/// let config = SessionConfig::builder("host01.acme.com", "deploy")
///     .private_key_file("/home/deploy/.ssh/id_ed25519")
///     .connection_timeout(10)
///     .command_timeout(60)
///     .build()?;
///
/// let client = SessionClient::new(config);
/// let commands = CommandSequence::new(["sudo su -", "mount /dev/sdb1 /mnt/data"])?;
///
/// let result = client.execute_remote_command(&commands).await;
/// if result.status() {
///     println!("exit {}: {}", result.exit_code().unwrap_or_default(), result.stdout().unwrap_or_default());
/// } else {
///     eprintln!("{}", result.message());
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct SessionClient<C = SshConnector> {
    config: SessionConfig,
    connector: C,
}

impl SessionClient<SshConnector> {
    /// Create a client that connects over SSH.
    pub fn new(config: SessionConfig) -> Self {
        Self::with_connector(config, SshConnector)
    }
}

impl<C: Connector> SessionClient<C> {
    /// Create a client using a custom transport.
    pub fn with_connector(config: SessionConfig, connector: C) -> Self {
        Self { config, connector }
    }

    /// Get the session configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Run `commands` and report the outcome.
    ///
    /// The first command starts the remote process; each following entry is
    /// written to its stdin once the channel is ready, then stdin is closed
    /// and output is collected. Runtime failures come back as
    /// [`ExecutionResult::Failure`], never as an error.
    pub async fn execute_remote_command(&self, commands: &CommandSequence) -> ExecutionResult {
        let settings = self.config.connect_settings();
        info!(
            "Connecting to {} as '{}'",
            settings.socket_addr(),
            settings.username
        );

        let connection = match bounded(self.config.connect_limit(), self.connector.connect(&settings))
            .await
        {
            Ok(connection) => connection,
            Err(e) => return self.failed(Phase::Connect, &e),
        };

        match self.run(connection, commands).await {
            Ok(output) => {
                debug!(
                    "Remote process on {} exited with {}",
                    self.config.hostname(),
                    output.exit_code
                );
                if let Some(pause) = self.config.post_execute_sleep() {
                    debug!("Sleeping {:?} before returning", pause);
                    tokio::time::sleep(pause).await;
                }
                ExecutionResult::Success(output)
            }
            Err(e) => self.failed(Phase::Execute, &e),
        }
    }

    /// Validate `commands` and run them.
    ///
    /// Fails only when the sequence is empty; everything else is reported in
    /// the returned [`ExecutionResult`].
    pub async fn execute<I, S>(&self, commands: I) -> Result<ExecutionResult>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let commands = CommandSequence::new(commands)?;
        Ok(self.execute_remote_command(&commands).await)
    }

    /// Open a channel, drive it, and close the channel and connection
    /// whatever the outcome.
    async fn run(
        &self,
        mut connection: C::Connection,
        commands: &CommandSequence,
    ) -> std::result::Result<CommandOutput, TransportError> {
        let limit = self.config.command_limit();

        let outcome = match bounded(limit, connection.open_channel()).await {
            Ok(mut channel) => {
                let outcome = drive(&mut channel, commands, limit).await;
                if let Err(e) = bounded(limit, channel.close()).await {
                    debug!("Channel close failed: {}", e);
                }
                outcome
            }
            Err(e) => Err(e),
        };

        if let Err(e) = bounded(limit, connection.close()).await {
            debug!("Disconnect failed: {}", e);
        }

        outcome
    }

    fn failed(&self, phase: Phase, error: &TransportError) -> ExecutionResult {
        let failure = Failure::new(phase, error);
        warn!(
            "{:?} failed on {} ({}): {}",
            phase,
            self.config.hostname(),
            failure.kind(),
            error
        );
        ExecutionResult::Failure(failure)
    }
}

/// Send the sequence into `channel` and collect what the process produced.
async fn drive<Ch: ExecChannel>(
    channel: &mut Ch,
    commands: &CommandSequence,
    limit: Option<Duration>,
) -> std::result::Result<CommandOutput, TransportError> {
    debug!("Executing {:?}", commands.command());
    bounded(limit, channel.exec(commands.command())).await?;

    for (index, input) in commands.inputs().enumerate() {
        bounded(limit, wait_send_ready(channel)).await?;
        // Inputs may carry secrets, so only their size is logged
        trace!("Sending input {} ({} bytes)", index + 1, input.len());
        bounded(limit, channel.send(input.as_bytes())).await?;
    }

    bounded(limit, channel.shutdown_write()).await?;

    let output = bounded(limit, channel.read_to_end()).await?;
    Ok(output.into())
}

/// Poll until the channel reports it can take input.
async fn wait_send_ready<Ch: ExecChannel>(
    channel: &mut Ch,
) -> std::result::Result<(), TransportError> {
    while !channel.send_ready().await? {
        tokio::time::sleep(SEND_READY_POLL).await;
    }
    Ok(())
}
