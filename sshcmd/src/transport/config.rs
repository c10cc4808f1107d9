//! SSH connection settings.

use std::path::PathBuf;

use secrecy::SecretString;

/// Authentication method for SSH connections.
#[derive(Debug)]
pub enum AuthMethod {
    /// Password authentication.
    Password(SecretString),

    /// Private key authentication.
    PrivateKey {
        /// Path to the private key file.
        path: PathBuf,
        /// Passphrase for the key. Also offered as a login password if the
        /// server rejects the key.
        passphrase: Option<SecretString>,
    },
}

impl AuthMethod {
    /// Short description for logging, never containing secret material.
    pub fn describe(&self) -> &'static str {
        match self {
            Self::Password(_) => "password",
            Self::PrivateKey {
                passphrase: None, ..
            } => "private key",
            Self::PrivateKey {
                passphrase: Some(_),
                ..
            } => "private key with passphrase",
        }
    }
}

/// Everything a [`Connector`](super::Connector) needs to reach and log into a host.
#[derive(Debug, Clone, Copy)]
pub struct ConnectSettings<'a> {
    /// Target host (hostname or IP address).
    pub host: &'a str,

    /// SSH port.
    pub port: u16,

    /// Username for authentication.
    pub username: &'a str,

    /// Authentication method.
    pub auth: &'a AuthMethod,
}

impl ConnectSettings<'_> {
    /// Get the socket address for connection.
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
