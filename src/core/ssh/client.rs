use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::defaults::SshConfig;
use crate::error::{Error, RemoteCommandFailedDetails, Result, SshConnectFailedDetails};
use crate::paths;

use super::{CommandOutput, Connector, Credentials, RemoteSession, Target};

const PASSWORD_ENV: &str = "SSHPASS";

/// Opens sessions with the system `ssh` binary. One master connection is
/// established per session and every command reuses it through a control socket.
pub struct SshConnector {
    config: SshConfig,
    control_dir: PathBuf,
}

impl SshConnector {
    pub fn new(config: SshConfig) -> Self {
        Self {
            config,
            control_dir: paths::ssh_control_dir(),
        }
    }

    pub fn with_control_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.control_dir = dir.into();
        self
    }
}

pub struct SshSession {
    target: Target,
    credentials: Credentials,
    config: SshConfig,
    control_path: PathBuf,
    open: bool,
}

/// Arguments for `ssh`. `command` of `None` starts the background master.
pub fn ssh_args(
    target: &Target,
    credentials: &Credentials,
    config: &SshConfig,
    control_path: &Path,
    command: Option<&str>,
) -> Vec<String> {
    let mut args = Vec::new();

    if let Some(identity_file) = config.identity_file.as_deref().filter(|p| !p.is_empty()) {
        args.push("-i".to_string());
        args.push(shellexpand::tilde(identity_file).to_string());
    }

    if target.port != 22 {
        args.push("-p".to_string());
        args.push(target.port.to_string());
    }

    let mut options = vec![
        format!("ControlPath={}", control_path.display()),
        format!("ConnectTimeout={}", config.connect_timeout_secs),
        "ServerAliveInterval=15".to_string(),
        "ServerAliveCountMax=3".to_string(),
    ];

    if command.is_none() {
        options.push("ControlMaster=yes".to_string());
        options.push("ControlPersist=yes".to_string());
        if credentials.has_password() {
            options.push("PreferredAuthentications=password,keyboard-interactive".to_string());
            options.push("NumberOfPasswordPrompts=1".to_string());
        } else {
            options.push("BatchMode=yes".to_string());
        }
    } else {
        // Commands only ride the master; without it they fail instead of prompting.
        options.push("ControlMaster=no".to_string());
        options.push("BatchMode=yes".to_string());
    }

    if config.accept_new_host_keys {
        options.push("StrictHostKeyChecking=no".to_string());
        options.push("UserKnownHostsFile=/dev/null".to_string());
        options.push("LogLevel=ERROR".to_string());
    }

    for option in options {
        args.push("-o".to_string());
        args.push(option);
    }

    match command {
        None => {
            args.push("-N".to_string());
            args.push("-f".to_string());
            args.push(format!("{}@{}", credentials.username, target.host));
        }
        Some(cmd) => {
            args.push(format!("{}@{}", credentials.username, target.host));
            args.push(cmd.to_string());
        }
    }

    args
}

fn capture(mut cmd: Command) -> std::io::Result<CommandOutput> {
    let out = cmd.stdin(Stdio::null()).output()?;
    Ok(CommandOutput {
        stdout: String::from_utf8_lossy(&out.stdout).to_string(),
        stderr: String::from_utf8_lossy(&out.stderr).to_string(),
        success: out.status.success(),
        exit_code: out.status.code().unwrap_or(-1),
    })
}

impl Connector for SshConnector {
    fn connect(&self, target: &Target, credentials: &Credentials) -> Result<Box<dyn RemoteSession>> {
        let connect_error = |error: String| {
            Error::ssh_connect_failed(SshConnectFailedDetails {
                host: target.host.clone(),
                port: target.port,
                user: credentials.username.clone(),
                error,
            })
        };

        std::fs::create_dir_all(&self.control_dir).map_err(|e| {
            Error::internal_io(
                e.to_string(),
                Some(format!("create {}", self.control_dir.display())),
            )
        })?;

        let id = uuid::Uuid::new_v4().simple().to_string();
        let control_path = self.control_dir.join(&id[..12]);
        let args = ssh_args(target, credentials, &self.config, &control_path, None);

        let cmd = if credentials.has_password() {
            let mut cmd = Command::new("sshpass");
            cmd.arg("-e").arg("ssh").args(&args);
            cmd.env(PASSWORD_ENV, &credentials.password);
            cmd
        } else {
            let mut cmd = Command::new("ssh");
            cmd.args(&args);
            cmd
        };

        tracing::debug!(target = %target, user = %credentials.username, "opening ssh master");
        let output = capture(cmd).map_err(|e| {
            let hint = if credentials.has_password() {
                "Password login needs 'sshpass' on PATH"
            } else {
                "Is the 'ssh' client installed?"
            };
            connect_error(e.to_string()).with_hint(hint)
        })?;

        if !output.success {
            let reason = output.combined().trim().to_string();
            return Err(connect_error(if reason.is_empty() {
                format!("ssh exited with code {}", output.exit_code)
            } else {
                reason
            }));
        }

        tracing::info!(target = %target, "ssh session open");
        Ok(Box::new(SshSession {
            target: target.clone(),
            credentials: credentials.clone(),
            config: self.config.clone(),
            control_path,
            open: true,
        }))
    }
}

impl RemoteSession for SshSession {
    fn run(&mut self, command: &str) -> Result<CommandOutput> {
        let args = ssh_args(
            &self.target,
            &self.credentials,
            &self.config,
            &self.control_path,
            Some(command),
        );
        let mut cmd = Command::new("ssh");
        cmd.args(&args);

        let output = capture(cmd).map_err(|e| {
            Error::remote_command_failed(RemoteCommandFailedDetails {
                command: command.to_string(),
                exit_code: -1,
                output: e.to_string(),
                host: self.target.host.clone(),
            })
        })?;

        tracing::debug!(
            target = %self.target,
            exit_code = output.exit_code,
            "remote command finished"
        );
        Ok(output)
    }

    fn close(&mut self) {
        if !self.open {
            return;
        }
        self.open = false;

        let mut cmd = Command::new("ssh");
        cmd.arg("-O")
            .arg("exit")
            .arg("-o")
            .arg(format!("ControlPath={}", self.control_path.display()))
            .arg(format!("{}@{}", self.credentials.username, self.target.host));

        match capture(cmd) {
            Ok(out) if out.success => tracing::debug!(target = %self.target, "ssh session closed"),
            Ok(out) => tracing::warn!(target = %self.target, stderr = %out.stderr.trim(), "ssh master did not exit cleanly"),
            Err(e) => tracing::warn!(target = %self.target, error = %e, "failed to close ssh master"),
        }
        let _ = std::fs::remove_file(&self.control_path);
    }
}

impl Drop for SshSession {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> SshConfig {
        crate::defaults::PatchkitConfig::default().defaults.ssh
    }

    fn position(args: &[String], value: &str) -> Option<usize> {
        args.iter().position(|a| a == value)
    }

    #[test]
    fn master_args_with_password_skip_batch_mode() {
        let args = ssh_args(
            &Target::new("printer.local", 22),
            &Credentials::new("root", "pw"),
            &config(),
            Path::new("/tmp/pk/abc"),
            None,
        );
        assert!(position(&args, "ControlMaster=yes").is_some());
        assert!(position(&args, "BatchMode=yes").is_none());
        assert!(position(&args, "-p").is_none());
        assert_eq!(args[args.len() - 1], "root@printer.local");
        assert!(position(&args, "-N").is_some());
    }

    #[test]
    fn command_args_reuse_control_socket() {
        let args = ssh_args(
            &Target::new("10.0.0.5", 2222),
            &Credentials::new("root", ""),
            &config(),
            Path::new("/tmp/pk/abc"),
            Some("echo OK"),
        );
        assert_eq!(args[position(&args, "-p").unwrap() + 1], "2222");
        assert!(position(&args, "ControlPath=/tmp/pk/abc").is_some());
        assert!(position(&args, "ControlMaster=yes").is_none());
        assert!(position(&args, "ControlMaster=no").is_some());
        assert!(position(&args, "BatchMode=yes").is_some());
        assert_eq!(args[args.len() - 2], "root@10.0.0.5");
        assert_eq!(args[args.len() - 1], "echo OK");
    }

    #[test]
    fn password_command_args_never_prompt() {
        let args = ssh_args(
            &Target::new("printer.local", 22),
            &Credentials::new("root", "pw"),
            &config(),
            Path::new("/tmp/pk/abc"),
            Some("uname -s"),
        );
        assert!(position(&args, "BatchMode=yes").is_some());
        assert!(position(&args, "ControlMaster=no").is_some());
        assert!(position(&args, "PreferredAuthentications=password,keyboard-interactive").is_none());
    }

    #[test]
    fn key_only_master_uses_batch_mode() {
        let mut config = config();
        config.identity_file = Some("/keys/id".to_string());
        config.accept_new_host_keys = false;
        let args = ssh_args(
            &Target::new("h", 22),
            &Credentials::new("u", ""),
            &config,
            Path::new("/tmp/c"),
            None,
        );
        assert_eq!(args[0], "-i");
        assert_eq!(args[1], "/keys/id");
        assert!(position(&args, "BatchMode=yes").is_some());
        assert!(position(&args, "StrictHostKeyChecking=no").is_none());
    }
}
