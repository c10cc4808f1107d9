//! Ordered command sequences fed into a single remote execution.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// A non-empty, ordered list of commands run over one channel.
///
/// The first entry starts the remote process. Every later entry is written
/// to that process's standard input as one line, which is how an elevation
/// command such as `sudo su -` and the payload that must run under it share
/// a single session.
///
/// # Example
///
/// ```rust
/// use sshcmd::CommandSequence;
///
/// let commands = CommandSequence::new(["sudo su -", "mount /dev/sdb1 /mnt/data"]).unwrap();
/// assert_eq!(commands.command(), "sudo su -");
///
/// let inputs: Vec<_> = commands.inputs().collect();
/// assert_eq!(inputs, ["mount /dev/sdb1 /mnt/data\n"]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct CommandSequence {
    commands: Vec<String>,
}

impl CommandSequence {
    /// Build a sequence from any list of commands.
    ///
    /// Fails with [`ConfigError::EmptyCommands`] if the list is empty.
    pub fn new<I, S>(commands: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let commands: Vec<String> = commands.into_iter().map(Into::into).collect();
        if commands.is_empty() {
            return Err(ConfigError::EmptyCommands);
        }
        Ok(Self { commands })
    }

    /// A sequence holding just one command.
    pub fn single(command: impl Into<String>) -> Self {
        Self {
            commands: vec![command.into()],
        }
    }

    /// Append a line of input for the running command.
    pub fn then(mut self, input: impl Into<String>) -> Self {
        self.commands.push(input.into());
        self
    }

    /// The command that starts the remote process.
    pub fn command(&self) -> &str {
        &self.commands[0]
    }

    /// Input lines sent after the process starts, each newline-terminated.
    pub fn inputs(&self) -> impl Iterator<Item = Cow<'_, str>> {
        self.commands[1..].iter().map(|line| terminate_line(line))
    }

    /// Number of entries, including the starting command.
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Always false; present for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Iterate the raw entries in order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.commands.iter().map(String::as_str)
    }
}

/// Append a newline unless the line already ends with one.
fn terminate_line(line: &str) -> Cow<'_, str> {
    if line.ends_with('\n') {
        Cow::Borrowed(line)
    } else {
        Cow::Owned(format!("{line}\n"))
    }
}

impl TryFrom<Vec<String>> for CommandSequence {
    type Error = ConfigError;

    fn try_from(commands: Vec<String>) -> Result<Self, Self::Error> {
        Self::new(commands)
    }
}

impl From<CommandSequence> for Vec<String> {
    fn from(sequence: CommandSequence) -> Self {
        sequence.commands
    }
}
