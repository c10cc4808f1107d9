//! SSH transport implementation using russh.

use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use bytes::BytesMut;
use log::{debug, trace};
use russh::client::{self, Handle, Msg};
use russh::keys::{PrivateKey, PrivateKeyWithHashAlg, PublicKey, load_secret_key};
use russh::{Channel, ChannelMsg, Disconnect};
use secrecy::ExposeSecret;

use super::config::{AuthMethod, ConnectSettings};
use super::{ChannelOutput, Connection, Connector, ExecChannel};
use crate::error::TransportError;

/// Extended data stream number carrying stderr.
const STDERR_STREAM: u32 = 1;

/// Exit code reported for a process that ended on a signal.
pub const SIGNALLED_EXIT_CODE: i32 = -1;

/// Connector that opens SSH sessions through russh.
///
/// Server host keys are accepted without verification.
#[derive(Debug, Clone, Copy, Default)]
pub struct SshConnector;

impl Connector for SshConnector {
    type Connection = SshConnection;

    async fn connect(
        &self,
        settings: &ConnectSettings<'_>,
    ) -> Result<SshConnection, TransportError> {
        let config = Arc::new(client::Config::default());
        let handler = AcceptAnyHostKey {
            host: settings.host.to_string(),
        };

        let mut session =
            client::connect(config, (settings.host, settings.port), handler).await?;

        authenticate(&mut session, settings).await?;

        Ok(SshConnection { session })
    }
}

/// Login primitives used by [`authenticate`].
trait Login: Send {
    /// Loaded private key.
    type Key: Send;

    /// Load and decrypt a private key file.
    fn load_key(&self, path: &Path, passphrase: Option<&str>) -> Result<Self::Key, TransportError>;

    /// Offer a public key. Returns whether the server accepted it.
    fn login_key(
        &mut self,
        user: &str,
        key: Self::Key,
    ) -> impl Future<Output = Result<bool, TransportError>> + Send;

    /// Offer a password. Returns whether the server accepted it.
    fn login_password(
        &mut self,
        user: &str,
        password: &str,
    ) -> impl Future<Output = Result<bool, TransportError>> + Send;
}

impl Login for Handle<AcceptAnyHostKey> {
    type Key = PrivateKey;

    fn load_key(&self, path: &Path, passphrase: Option<&str>) -> Result<PrivateKey, TransportError> {
        load_secret_key(path, passphrase).map_err(|e| TransportError::Key(e.to_string()))
    }

    async fn login_key(&mut self, user: &str, key: PrivateKey) -> Result<bool, TransportError> {
        // Get the best RSA hash algorithm supported by the server
        let hash_alg = self.best_supported_rsa_hash().await?.flatten();

        Ok(self
            .authenticate_publickey(user, PrivateKeyWithHashAlg::new(Arc::new(key), hash_alg))
            .await?
            .success())
    }

    async fn login_password(&mut self, user: &str, password: &str) -> Result<bool, TransportError> {
        Ok(self.authenticate_password(user, password).await?.success())
    }
}

/// Authenticate with the server.
///
/// With a key and a password, the password is tried as the key passphrase
/// first. If the key cannot be loaded or the server rejects it, the same
/// password is offered as a login password.
async fn authenticate<S: Login>(
    session: &mut S,
    settings: &ConnectSettings<'_>,
) -> Result<(), TransportError> {
    let user = settings.username;
    debug!("Authenticating as '{}' using {}", user, settings.auth.describe());

    let success = match settings.auth {
        AuthMethod::Password(password) => {
            session.login_password(user, password.expose_secret()).await?
        }
        AuthMethod::PrivateKey {
            path,
            passphrase: None,
        } => {
            let key = session.load_key(path, None)?;
            session.login_key(user, key).await?
        }
        AuthMethod::PrivateKey {
            path,
            passphrase: Some(password),
        } => {
            let password = password.expose_secret();
            let accepted = match session.load_key(path, Some(password)) {
                Ok(key) => session.login_key(user, key).await?,
                Err(e) => {
                    debug!("Skipping key {}: {}", path.display(), e);
                    false
                }
            };

            if accepted {
                true
            } else {
                debug!("Key not accepted for '{}', trying password", user);
                session.login_password(user, password).await?
            }
        }
    };

    if !success {
        return Err(TransportError::AuthenticationFailed {
            user: user.to_string(),
        });
    }

    Ok(())
}

/// An authenticated russh session.
pub struct SshConnection {
    session: Handle<AcceptAnyHostKey>,
}

impl Connection for SshConnection {
    type Channel = SshChannel;

    async fn open_channel(&mut self) -> Result<SshChannel, TransportError> {
        let channel = self
            .session
            .channel_open_session()
            .await
            .map_err(|e| TransportError::ChannelOpenFailed(e.to_string()))?;

        Ok(SshChannel { channel })
    }

    async fn close(self) -> Result<(), TransportError> {
        self.session
            .disconnect(Disconnect::ByApplication, "", "en")
            .await?;
        Ok(())
    }
}

/// A russh session channel.
pub struct SshChannel {
    channel: Channel<Msg>,
}

impl ExecChannel for SshChannel {
    async fn exec(&mut self, command: &str) -> Result<(), TransportError> {
        self.channel.exec(true, command).await?;
        Ok(())
    }

    async fn send_ready(&mut self) -> Result<bool, TransportError> {
        // russh applies window flow control inside `data`, which waits for
        // remote window space before writing.
        Ok(true)
    }

    async fn send(&mut self, data: &[u8]) -> Result<(), TransportError> {
        self.channel.data(data).await?;
        Ok(())
    }

    async fn shutdown_write(&mut self) -> Result<(), TransportError> {
        self.channel.eof().await?;
        Ok(())
    }

    async fn read_to_end(&mut self) -> Result<ChannelOutput, TransportError> {
        let mut output = OutputCollector::default();

        loop {
            match self.channel.wait().await {
                Some(ChannelMsg::Data { data }) => output.stdout(&data),
                Some(ChannelMsg::ExtendedData { data, ext }) => {
                    if ext == STDERR_STREAM {
                        output.stderr(&data);
                    }
                }
                Some(ChannelMsg::ExitStatus { exit_status }) => output.exit_status(exit_status),
                Some(ChannelMsg::ExitSignal { signal_name, .. }) => {
                    debug!("Remote process terminated by signal {:?}", signal_name);
                    output.exit_signal();
                }
                Some(ChannelMsg::Eof) => output.eof(),
                Some(ChannelMsg::Failure) => return Err(TransportError::RequestRejected),
                Some(ChannelMsg::Close) | None => break,
                Some(_) => {}
            }

            if output.is_complete() {
                break;
            }
        }

        output.finish()
    }

    async fn close(self) -> Result<(), TransportError> {
        self.channel.close().await?;
        Ok(())
    }
}

/// Accumulates what a remote process sends until it has finished.
#[derive(Debug, Default)]
struct OutputCollector {
    stdout: BytesMut,
    stderr: BytesMut,
    exit_status: Option<i32>,
    signalled: bool,
    eof: bool,
}

impl OutputCollector {
    fn stdout(&mut self, data: &[u8]) {
        trace!("stdout: {} bytes", data.len());
        self.stdout.extend_from_slice(data);
    }

    fn stderr(&mut self, data: &[u8]) {
        trace!("stderr: {} bytes", data.len());
        self.stderr.extend_from_slice(data);
    }

    fn exit_status(&mut self, status: u32) {
        self.exit_status = Some(i32::try_from(status).unwrap_or(i32::MAX));
    }

    fn exit_signal(&mut self) {
        self.signalled = true;
    }

    fn eof(&mut self) {
        self.eof = true;
    }

    /// Output is drained and the process has reported how it ended.
    fn is_complete(&self) -> bool {
        self.eof && (self.exit_status.is_some() || self.signalled)
    }

    /// An explicit exit status wins over a signal; a channel that reported
    /// neither is an error.
    fn finish(self) -> Result<ChannelOutput, TransportError> {
        let exit_status = self
            .exit_status
            .or(self.signalled.then_some(SIGNALLED_EXIT_CODE))
            .ok_or(TransportError::ChannelClosed)?;

        Ok(ChannelOutput {
            stdout: self.stdout.freeze(),
            stderr: self.stderr.freeze(),
            exit_status,
        })
    }
}

/// russh client handler that trusts every server host key.
struct AcceptAnyHostKey {
    host: String,
}

impl client::Handler for AcceptAnyHostKey {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        _server_public_key: &PublicKey,
    ) -> Result<bool, Self::Error> {
        debug!("Accepting host key presented by {}", self.host);
        Ok(true)
    }
}
