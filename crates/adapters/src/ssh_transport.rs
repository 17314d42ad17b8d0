// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! SSH-backed [`RemoteShellTransport`], implemented by shelling out to
//! the system `ssh`/`scp` binaries — the same "wrap an external command"
//! approach as
//! `examples/original_source/molequeue/app/sshcommand.h`, which this
//! daemon treats as an opaque remote-shell transport per `spec.md` §1.

use crate::error::BackendError;
use crate::transport::{ExecOutput, RemoteShellTransport};
use async_trait::async_trait;
use std::path::Path;
use tokio::process::Command;

pub struct SshTransport {
    pub host: String,
    pub username: String,
    pub port: u16,
}

impl SshTransport {
    pub fn new(host: impl Into<String>, username: impl Into<String>, port: u16) -> Self {
        Self { host: host.into(), username: username.into(), port }
    }

    fn user_host(&self) -> String {
        format!("{}@{}", self.username, self.host)
    }

    async fn run(&self, mut cmd: Command) -> Result<ExecOutput, BackendError> {
        tracing::debug!(host = %self.host, "running ssh/scp command");
        let output = cmd.output().await.map_err(|e| {
            tracing::warn!(host = %self.host, error = %e, "failed to spawn ssh/scp");
            BackendError::Transport(e.to_string())
        })?;
        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));
        let exit_code = output.status.code().unwrap_or(-1);
        if exit_code != 0 {
            tracing::debug!(host = %self.host, exit_code, "ssh/scp command exited non-zero");
        }
        Ok(ExecOutput { combined_output: combined, exit_code })
    }
}

#[async_trait]
impl RemoteShellTransport for SshTransport {
    async fn execute(&self, command: &str) -> Result<ExecOutput, BackendError> {
        let mut cmd = Command::new("ssh");
        cmd.arg("-p").arg(self.port.to_string()).arg(self.user_host()).arg(command);
        self.run(cmd).await
    }

    async fn copy_to(&self, local_path: &Path, remote_path: &str) -> Result<(), BackendError> {
        let mut cmd = Command::new("scp");
        cmd.arg("-P")
            .arg(self.port.to_string())
            .arg(local_path)
            .arg(format!("{}:{}", self.user_host(), remote_path));
        let out = self.run(cmd).await?;
        if !out.success() {
            return Err(BackendError::NonZeroExit {
                exit_code: out.exit_code,
                output: out.combined_output,
            });
        }
        Ok(())
    }

    async fn copy_from(&self, remote_path: &str, local_path: &Path) -> Result<(), BackendError> {
        let mut cmd = Command::new("scp");
        cmd.arg("-P")
            .arg(self.port.to_string())
            .arg(format!("{}:{}", self.user_host(), remote_path))
            .arg(local_path);
        let out = self.run(cmd).await?;
        if !out.success() {
            return Err(BackendError::NonZeroExit {
                exit_code: out.exit_code,
                output: out.combined_output,
            });
        }
        Ok(())
    }

    async fn copy_dir_to(&self, local_dir: &Path, remote_dir: &str) -> Result<(), BackendError> {
        let mut cmd = Command::new("scp");
        cmd.arg("-r")
            .arg("-P")
            .arg(self.port.to_string())
            .arg(local_dir)
            .arg(format!("{}:{}", self.user_host(), remote_dir));
        let out = self.run(cmd).await?;
        if !out.success() {
            return Err(BackendError::NonZeroExit {
                exit_code: out.exit_code,
                output: out.combined_output,
            });
        }
        Ok(())
    }

    async fn copy_dir_from(&self, remote_dir: &str, local_dir: &Path) -> Result<(), BackendError> {
        let mut cmd = Command::new("scp");
        cmd.arg("-r")
            .arg("-P")
            .arg(self.port.to_string())
            .arg(format!("{}:{}", self.user_host(), remote_dir))
            .arg(local_dir);
        let out = self.run(cmd).await?;
        if !out.success() {
            return Err(BackendError::NonZeroExit {
                exit_code: out.exit_code,
                output: out.combined_output,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_host_formats_as_user_at_host() {
        let t = SshTransport::new("cluster.example.edu", "alice", 22);
        assert_eq!(t.user_host(), "alice@cluster.example.edu");
    }
}
