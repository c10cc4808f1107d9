//! Validated session configuration and its builder.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::de::{self, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::Deserialize;

use crate::error::ConfigError;
use crate::transport::{AuthMethod, ConnectSettings};

/// Default SSH port.
pub const DEFAULT_PORT: u16 = 22;

/// Immutable, validated settings for a [`SessionClient`](super::SessionClient).
///
/// Built with [`SessionConfig::builder`], or deserialized from any serde
/// format, which runs the same validation.
///
/// # Example
///
/// ```rust
/// use sshcmd::SessionConfig;
///
/// let config = SessionConfig::builder("host01.acme.com", "deploy")
///     .private_key_file("/home/deploy/.ssh/id_ed25519/")
///     .command_timeout(30)
///     .build()
///     .unwrap();
///
/// assert_eq!(
///     config.private_key_file().unwrap().to_str(),
///     Some("/home/deploy/.ssh/id_ed25519")
/// );
/// ```
#[derive(Debug)]
pub struct SessionConfig {
    hostname: String,
    port: u16,
    username: String,
    auth: AuthMethod,
    connection_timeout: Option<u64>,
    command_timeout: Option<u64>,
    command_sleep: Option<u64>,
}

impl SessionConfig {
    /// Start building a configuration for `username@hostname`.
    pub fn builder(
        hostname: impl Into<String>,
        username: impl Into<String>,
    ) -> SessionConfigBuilder {
        SessionConfigBuilder::new(hostname, username)
    }

    /// Target host.
    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    /// SSH port.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Login user.
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Password, also used as the private key passphrase when a key is set.
    pub fn password(&self) -> Option<&SecretString> {
        match &self.auth {
            AuthMethod::Password(password) => Some(password),
            AuthMethod::PrivateKey { passphrase, .. } => passphrase.as_ref(),
        }
    }

    /// Private key path with trailing separators removed.
    pub fn private_key_file(&self) -> Option<&Path> {
        match &self.auth {
            AuthMethod::Password(_) => None,
            AuthMethod::PrivateKey { path, .. } => Some(path),
        }
    }

    /// Authentication method chosen from the supplied credentials.
    pub fn auth(&self) -> &AuthMethod {
        &self.auth
    }

    /// Connection timeout in seconds, as given.
    pub fn connection_timeout(&self) -> Option<u64> {
        self.connection_timeout
    }

    /// Per-operation command timeout in seconds, as given.
    pub fn command_timeout(&self) -> Option<u64> {
        self.command_timeout
    }

    /// Pause after a successful execution in seconds, as given.
    pub fn command_sleep(&self) -> Option<u64> {
        self.command_sleep
    }

    /// Bound applied to connection establishment. Zero disables it.
    pub fn connect_limit(&self) -> Option<Duration> {
        seconds(self.connection_timeout)
    }

    /// Bound applied to each channel operation. Zero disables it.
    pub fn command_limit(&self) -> Option<Duration> {
        seconds(self.command_timeout)
    }

    /// Pause applied after a successful execution. Zero disables it.
    pub fn post_execute_sleep(&self) -> Option<Duration> {
        seconds(self.command_sleep)
    }

    /// Settings handed to the transport.
    pub fn connect_settings(&self) -> ConnectSettings<'_> {
        ConnectSettings {
            host: &self.hostname,
            port: self.port,
            username: &self.username,
            auth: &self.auth,
        }
    }
}

fn seconds(value: Option<u64>) -> Option<Duration> {
    value.filter(|&s| s > 0).map(Duration::from_secs)
}

impl<'de> Deserialize<'de> for SessionConfig {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        SessionConfigBuilder::deserialize(deserializer)?
            .build()
            .map_err(de::Error::custom)
    }
}

/// Builder for [`SessionConfig`].
///
/// Nothing is checked until [`build`](Self::build), which validates in a
/// fixed order: hostname, username, credentials, then timeouts.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SessionConfigBuilder {
    #[serde(default)]
    hostname: String,
    #[serde(default = "default_port")]
    port: u16,
    #[serde(default)]
    username: String,
    #[serde(default, deserialize_with = "secret")]
    password: Option<SecretString>,
    #[serde(default)]
    private_key_file: Option<String>,
    #[serde(default)]
    connection_timeout: Option<Seconds>,
    #[serde(default)]
    command_timeout: Option<Seconds>,
    #[serde(default)]
    command_sleep: Option<Seconds>,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn secret<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<SecretString>, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.map(SecretString::from))
}

impl SessionConfigBuilder {
    /// Create a builder for `username@hostname`.
    pub fn new(hostname: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            port: DEFAULT_PORT,
            username: username.into(),
            password: None,
            private_key_file: None,
            connection_timeout: None,
            command_timeout: None,
            command_sleep: None,
        }
    }

    /// Set the SSH port (default: 22).
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the password. With a private key it doubles as the key passphrase.
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(SecretString::from(password.into()));
        self
    }

    /// Set the private key file path.
    pub fn private_key_file(mut self, path: impl Into<String>) -> Self {
        self.private_key_file = Some(path.into());
        self
    }

    /// Bound connection establishment to `seconds`.
    pub fn connection_timeout(mut self, seconds: u64) -> Self {
        self.connection_timeout = Some(Seconds::Whole(seconds));
        self
    }

    /// Bound each channel operation to `seconds`.
    pub fn command_timeout(mut self, seconds: u64) -> Self {
        self.command_timeout = Some(Seconds::Whole(seconds));
        self
    }

    /// Pause for `seconds` after a successful execution.
    pub fn command_sleep(mut self, seconds: u64) -> Self {
        self.command_sleep = Some(Seconds::Whole(seconds));
        self
    }

    /// Validate and build the configuration.
    pub fn build(self) -> Result<SessionConfig, ConfigError> {
        if self.hostname.trim().is_empty() {
            return Err(ConfigError::EmptyHostname);
        }
        if self.username.trim().is_empty() {
            return Err(ConfigError::EmptyUsername);
        }

        let password = self.password.filter(|p| !p.expose_secret().is_empty());
        let key_path = self
            .private_key_file
            .as_deref()
            .map(|p| p.trim_end_matches(std::path::is_separator))
            .filter(|p| !p.is_empty())
            .map(PathBuf::from);

        let auth = match (key_path, password) {
            (Some(path), passphrase) => AuthMethod::PrivateKey { path, passphrase },
            (None, Some(password)) => AuthMethod::Password(password),
            (None, None) => return Err(ConfigError::MissingCredentials),
        };

        Ok(SessionConfig {
            hostname: self.hostname,
            port: self.port,
            username: self.username,
            auth,
            connection_timeout: Seconds::check("connection_timeout", self.connection_timeout)?,
            command_timeout: Seconds::check("command_timeout", self.command_timeout)?,
            command_sleep: Seconds::check("command_sleep", self.command_sleep)?,
        })
    }
}

/// A seconds value as supplied, kept unvalidated until `build`.
#[derive(Debug, Clone, PartialEq)]
enum Seconds {
    Whole(u64),
    Invalid(String),
}

impl Seconds {
    fn check(field: &'static str, value: Option<Self>) -> Result<Option<u64>, ConfigError> {
        match value {
            None => Ok(None),
            Some(Self::Whole(s)) => Ok(Some(s)),
            Some(Self::Invalid(value)) => Err(ConfigError::InvalidSeconds { field, value }),
        }
    }
}

impl<'de> Deserialize<'de> for Seconds {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(SecondsVisitor)
    }
}

struct SecondsVisitor;

impl<'de> Visitor<'de> for SecondsVisitor {
    type Value = Seconds;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a whole number of seconds")
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Seconds, E> {
        Ok(Seconds::Whole(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Seconds, E> {
        Ok(u64::try_from(v).map_or_else(|_| Seconds::Invalid(v.to_string()), Seconds::Whole))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Seconds, E> {
        Ok(Seconds::Invalid(v.to_string()))
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<Seconds, E> {
        Ok(Seconds::Invalid(v.to_string()))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Seconds, E> {
        Ok(Seconds::Invalid(format!("{v:?}")))
    }

    fn visit_unit<E: de::Error>(self) -> Result<Seconds, E> {
        Ok(Seconds::Invalid("()".to_string()))
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Seconds, A::Error> {
        while seq.next_element::<de::IgnoredAny>()?.is_some() {}
        Ok(Seconds::Invalid("a list".to_string()))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Seconds, A::Error> {
        while map
            .next_entry::<de::IgnoredAny, de::IgnoredAny>()?
            .is_some()
        {}
        Ok(Seconds::Invalid("a map".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn password_only() -> SessionConfigBuilder {
        SessionConfig::builder("host01.acme.com", "deploy").password("secret")
    }

    #[test]
    fn test_valid_credential_combinations() {
        let config = password_only().build().unwrap();
        assert!(matches!(config.auth(), AuthMethod::Password(_)));

        let config = SessionConfig::builder("host01.acme.com", "deploy")
            .private_key_file("/keys/id_rsa")
            .build()
            .unwrap();
        assert!(matches!(
            config.auth(),
            AuthMethod::PrivateKey {
                passphrase: None,
                ..
            }
        ));

        let config = SessionConfig::builder("host01.acme.com", "deploy")
            .private_key_file("/keys/id_rsa")
            .password("passphrase")
            .build()
            .unwrap();
        assert!(matches!(
            config.auth(),
            AuthMethod::PrivateKey {
                passphrase: Some(_),
                ..
            }
        ));
        assert_eq!(config.password().unwrap().expose_secret(), "passphrase");
    }

    #[test]
    fn test_empty_hostname_rejected() {
        let err = SessionConfig::builder("", "deploy")
            .password("secret")
            .build()
            .unwrap_err();
        assert_eq!(err, ConfigError::EmptyHostname);
    }

    #[test]
    fn test_empty_username_rejected() {
        let err = SessionConfig::builder("host01.acme.com", "")
            .password("secret")
            .build()
            .unwrap_err();
        assert_eq!(err, ConfigError::EmptyUsername);
    }

    #[test]
    fn test_missing_credentials_rejected() {
        let err = SessionConfig::builder("host01.acme.com", "deploy")
            .build()
            .unwrap_err();
        assert_eq!(err, ConfigError::MissingCredentials);

        // Empty strings count as absent
        let err = SessionConfig::builder("host01.acme.com", "deploy")
            .password("")
            .private_key_file("")
            .build()
            .unwrap_err();
        assert_eq!(err, ConfigError::MissingCredentials);
    }

    #[test]
    fn test_validation_order() {
        // Hostname is reported before username and credentials
        let err = SessionConfig::builder("", "").build().unwrap_err();
        assert_eq!(err, ConfigError::EmptyHostname);

        // Username is reported before credentials
        let err = SessionConfig::builder("host", "").build().unwrap_err();
        assert_eq!(err, ConfigError::EmptyUsername);
    }

    #[test]
    fn test_trailing_separators_stripped() {
        let config = SessionConfig::builder("host", "deploy")
            .private_key_file("/home/deploy/.ssh/my_key.priv//")
            .build()
            .unwrap();
        assert_eq!(
            config.private_key_file(),
            Some(Path::new("/home/deploy/.ssh/my_key.priv"))
        );
    }

    #[test]
    fn test_timeouts_preserved() {
        let config = password_only()
            .connection_timeout(10)
            .command_timeout(0)
            .command_sleep(2)
            .build()
            .unwrap();

        assert_eq!(config.connection_timeout(), Some(10));
        assert_eq!(config.command_timeout(), Some(0));
        assert_eq!(config.command_sleep(), Some(2));

        assert_eq!(config.connect_limit(), Some(Duration::from_secs(10)));
        assert_eq!(config.command_limit(), None);
        assert_eq!(config.post_execute_sleep(), Some(Duration::from_secs(2)));
    }

    #[test]
    fn test_unset_timeouts_are_unbounded() {
        let config = password_only().build().unwrap();
        assert_eq!(config.connection_timeout(), None);
        assert_eq!(config.connect_limit(), None);
        assert_eq!(config.command_limit(), None);
        assert_eq!(config.post_execute_sleep(), None);
    }

    #[test]
    fn test_debug_redacts_password() {
        let config = password_only().build().unwrap();
        assert!(!format!("{config:?}").contains("\"secret\""));
    }

    #[test]
    fn test_deserialize() {
        let config: SessionConfig = serde_json::from_value(serde_json::json!({
            "hostname": "host01.acme.com",
            "username": "deploy",
            "private_key_file": "/keys/id_rsa/",
            "connection_timeout": 5,
            "command_timeout": 60,
        }))
        .unwrap();

        assert_eq!(config.hostname(), "host01.acme.com");
        assert_eq!(config.port(), DEFAULT_PORT);
        assert_eq!(config.private_key_file(), Some(Path::new("/keys/id_rsa")));
        assert_eq!(config.connection_timeout(), Some(5));
        assert_eq!(config.command_timeout(), Some(60));
        assert_eq!(config.command_sleep(), None);
    }

    #[test]
    fn test_deserialize_rejects_non_integer_timeouts() {
        for (field, bad) in [
            ("connection_timeout", serde_json::json!("ten")),
            ("command_timeout", serde_json::json!(1.5)),
            ("command_sleep", serde_json::json!(-1)),
            ("command_timeout", serde_json::json!(true)),
            ("command_timeout", serde_json::json!([5])),
            ("connection_timeout", serde_json::json!({"seconds": 5})),
        ] {
            let mut value = serde_json::json!({
                "hostname": "host01.acme.com",
                "username": "deploy",
                "password": "secret",
            });
            value[field] = bad;

            let err = serde_json::from_value::<SessionConfig>(value).unwrap_err();
            assert!(
                err.to_string().contains(field),
                "error for {field} should name it: {err}"
            );
        }
    }

    #[test]
    fn test_deserialize_validation_order() {
        // A bad timeout is not reported while the hostname is missing
        let err = serde_json::from_value::<SessionConfig>(serde_json::json!({
            "username": "deploy",
            "password": "secret",
            "command_timeout": "soon",
        }))
        .unwrap_err();
        assert!(err.to_string().contains("hostname"));

        let err = serde_json::from_value::<SessionConfig>(serde_json::json!({
            "username": "deploy",
            "password": "secret",
            "command_timeout": [5],
        }))
        .unwrap_err();
        assert!(err.to_string().contains("hostname"), "{err}");
    }

    #[test]
    fn test_deserialize_null_timeout_is_unset() {
        let config: SessionConfig = serde_json::from_value(serde_json::json!({
            "hostname": "host",
            "username": "deploy",
            "password": "secret",
            "command_sleep": null,
        }))
        .unwrap();
        assert_eq!(config.command_sleep(), None);
    }
}
