//! Scripted in-memory transport for exercising the session client.

use std::io;
use std::sync::{Arc, Mutex};

use bytes::Bytes;

use crate::error::TransportError;
use crate::transport::{
    AuthMethod, ChannelOutput, ConnectSettings, Connection, Connector, ExecChannel,
};

/// Transport operation a fault can be attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Stage {
    Connect,
    OpenChannel,
    Exec,
    Send,
    Shutdown,
    Read,
}

/// Failure injected at a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Fault {
    HostKey,
    Auth,
    ChannelOpen,
    Protocol,
    Socket,
    /// Never completes, leaving the configured timeout to fire.
    Hang,
}

impl Fault {
    fn error(self) -> TransportError {
        match self {
            Self::HostKey => TransportError::HostKeyRejected {
                host: "mock".into(),
                port: 22,
            },
            Self::Auth => TransportError::AuthenticationFailed {
                user: "mock".into(),
            },
            Self::ChannelOpen => TransportError::ChannelOpenFailed("refused".into()),
            Self::Protocol => TransportError::ChannelClosed,
            Self::Socket => TransportError::Io(io::Error::new(
                io::ErrorKind::ConnectionReset,
                "connection reset by peer",
            )),
            Self::Hang => unreachable!("hang faults never produce an error"),
        }
    }
}

/// Everything the client did to the transport.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub(crate) struct Calls {
    pub connects: usize,
    pub auth: Vec<&'static str>,
    pub hosts: Vec<String>,
    pub exec: Vec<String>,
    pub send_ready_polls: usize,
    pub sent: Vec<String>,
    pub shutdowns: usize,
    pub reads: usize,
    pub channel_closes: usize,
    pub connection_closes: usize,
}

#[derive(Debug)]
struct Script {
    stdout: Bytes,
    stderr: Bytes,
    exit_status: i32,
    fault: Option<(Stage, Fault)>,
    busy_polls: usize,
    calls: Mutex<Calls>,
}

impl Script {
    fn record(&self, f: impl FnOnce(&mut Calls)) {
        f(&mut self.calls.lock().unwrap());
    }

    async fn reach(&self, stage: Stage) -> Result<(), TransportError> {
        match self.fault {
            Some((at, Fault::Hang)) if at == stage => std::future::pending().await,
            Some((at, fault)) if at == stage => Err(fault.error()),
            _ => Ok(()),
        }
    }
}

/// Connector whose connections replay a fixed output.
#[derive(Debug, Clone)]
pub(crate) struct MockConnector {
    script: Arc<Script>,
}

impl MockConnector {
    pub fn new(stdout: &'static str, stderr: &'static str, exit_status: i32) -> Self {
        Self {
            script: Arc::new(Script {
                stdout: Bytes::from_static(stdout.as_bytes()),
                stderr: Bytes::from_static(stderr.as_bytes()),
                exit_status,
                fault: None,
                busy_polls: 0,
                calls: Mutex::new(Calls::default()),
            }),
        }
    }

    /// Fail with `fault` when `stage` is reached.
    pub fn failing(stage: Stage, fault: Fault) -> Self {
        let mut mock = Self::new("partial output", "partial error", 0);
        Arc::get_mut(&mut mock.script).unwrap().fault = Some((stage, fault));
        mock
    }

    /// Report "not ready" this many times before each input is accepted.
    pub fn with_busy_polls(mut self, polls: usize) -> Self {
        Arc::get_mut(&mut self.script).unwrap().busy_polls = polls;
        self
    }

    pub fn calls(&self) -> Calls {
        self.script.calls.lock().unwrap().clone()
    }
}

impl Connector for MockConnector {
    type Connection = MockConnection;

    async fn connect(&self, settings: &ConnectSettings<'_>) -> Result<MockConnection, TransportError> {
        let auth = match settings.auth {
            AuthMethod::Password(_) => "password",
            AuthMethod::PrivateKey {
                passphrase: Some(_),
                ..
            } => "key+passphrase",
            AuthMethod::PrivateKey { .. } => "key",
        };
        let host = settings.socket_addr();
        self.script.record(|c| {
            c.connects += 1;
            c.auth.push(auth);
            c.hosts.push(host);
        });

        self.script.reach(Stage::Connect).await?;
        Ok(MockConnection {
            script: self.script.clone(),
        })
    }
}

pub(crate) struct MockConnection {
    script: Arc<Script>,
}

impl Connection for MockConnection {
    type Channel = MockChannel;

    async fn open_channel(&mut self) -> Result<MockChannel, TransportError> {
        self.script.reach(Stage::OpenChannel).await?;
        Ok(MockChannel {
            busy: self.script.busy_polls,
            script: self.script.clone(),
        })
    }

    async fn close(self) -> Result<(), TransportError> {
        self.script.record(|c| c.connection_closes += 1);
        Ok(())
    }
}

pub(crate) struct MockChannel {
    script: Arc<Script>,
    busy: usize,
}

impl ExecChannel for MockChannel {
    async fn exec(&mut self, command: &str) -> Result<(), TransportError> {
        self.script.record(|c| c.exec.push(command.to_string()));
        self.script.reach(Stage::Exec).await
    }

    async fn send_ready(&mut self) -> Result<bool, TransportError> {
        self.script.record(|c| c.send_ready_polls += 1);
        if self.busy > 0 {
            self.busy -= 1;
            return Ok(false);
        }
        Ok(true)
    }

    async fn send(&mut self, data: &[u8]) -> Result<(), TransportError> {
        self.script.reach(Stage::Send).await?;
        let line = String::from_utf8_lossy(data).into_owned();
        self.script.record(|c| c.sent.push(line));
        self.busy = self.script.busy_polls;
        Ok(())
    }

    async fn shutdown_write(&mut self) -> Result<(), TransportError> {
        self.script.record(|c| c.shutdowns += 1);
        self.script.reach(Stage::Shutdown).await
    }

    async fn read_to_end(&mut self) -> Result<ChannelOutput, TransportError> {
        self.script.record(|c| c.reads += 1);
        self.script.reach(Stage::Read).await?;
        Ok(ChannelOutput {
            stdout: self.script.stdout.clone(),
            stderr: self.script.stderr.clone(),
            exit_status: self.script.exit_status,
        })
    }

    async fn close(self) -> Result<(), TransportError> {
        self.script.record(|c| c.channel_closes += 1);
        Ok(())
    }
}
