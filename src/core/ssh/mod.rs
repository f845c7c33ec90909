//! Remote command channel used by the execution engine.

mod client;

pub use client::{ssh_args, SshConnector, SshSession};

use serde::Serialize;

use crate::error::Result;

/// Host and port of the device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Target {
    pub host: String,
    pub port: u16,
}

impl Target {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl std::fmt::Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn has_password(&self) -> bool {
        !self.password.is_empty()
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &if self.has_password() { "***" } else { "" })
            .finish()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub success: bool,
    pub exit_code: i32,
}

impl CommandOutput {
    /// stdout followed by stderr, as a terminal would show them.
    pub fn combined(&self) -> String {
        match (self.stdout.is_empty(), self.stderr.is_empty()) {
            (_, true) => self.stdout.clone(),
            (true, false) => self.stderr.clone(),
            (false, false) => format!("{}{}", self.stdout, self.stderr),
        }
    }
}

/// An open channel to one device. Dropping it releases the connection.
pub trait RemoteSession: Send {
    /// Run one command. `Err` means the command could not be issued at all;
    /// a non-zero exit is reported through `CommandOutput`.
    fn run(&mut self, command: &str) -> Result<CommandOutput>;

    fn close(&mut self) {}
}

pub trait Connector: Send + Sync {
    fn connect(&self, target: &Target, credentials: &Credentials) -> Result<Box<dyn RemoteSession>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn combined_output_joins_streams() {
        let out = CommandOutput {
            stdout: "a\n".to_string(),
            stderr: "b\n".to_string(),
            success: true,
            exit_code: 0,
        };
        assert_eq!(out.combined(), "a\nb\n");

        let only_err = CommandOutput {
            stderr: "oops".to_string(),
            ..Default::default()
        };
        assert_eq!(only_err.combined(), "oops");
    }

    #[test]
    fn debug_hides_password() {
        let creds = Credentials::new("root", "secret");
        let shown = format!("{:?}", creds);
        assert!(!shown.contains("secret"));
        assert!(shown.contains("root"));
    }
}
