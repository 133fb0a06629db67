//! SSH tunnel lifecycle.
//!
//! Opens a background local forward to the remote database endpoint and
//! tracks the spawned session's process handle directly - the child is
//! captured at creation, never recovered later by pattern search over the
//! process table.

use crate::config::SourceConfig;
use crate::error::{CloneError, Result};
use std::process::Stdio;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

/// Seconds between ssh keepalive probes.
const SERVER_ALIVE_INTERVAL: u32 = 15;

/// Missed-probe threshold after which ssh tears the session down.
const SERVER_ALIVE_COUNT_MAX: u32 = 3;

/// Bounded attempts to confirm the forward is accepting connections.
const CONFIRM_ATTEMPTS: u32 = 40;

/// Delay between confirmation attempts.
const CONFIRM_DELAY: Duration = Duration::from_millis(250);

/// Tunnel lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TunnelState {
    Opening,
    Active,
    Closed,
}

/// An open SSH forward from a local port to the remote database endpoint.
///
/// Owned exclusively by one orchestrator run. Must transition to `Closed`
/// exactly once regardless of the path taken; [`Tunnel::close`] is
/// idempotent and the child is additionally killed on drop as a last
/// resort for abnormal exits.
pub struct Tunnel {
    child: Child,
    local_port: u16,
    remote: String,
    state: TunnelState,
}

impl Tunnel {
    /// Establish a forward from `local_port` to the remote database.
    ///
    /// Fails immediately and loudly if the forward cannot be confirmed -
    /// there is no silent partial tunnel.
    pub async fn open(source: &SourceConfig, local_port: u16) -> Result<Self> {
        let remote = format!(
            "{}:{} via {}@{}",
            source.db_host, source.db_port, source.ssh_user, source.ssh_host
        );
        info!("Opening tunnel: 127.0.0.1:{} -> {}", local_port, remote);

        let mut command = Command::new("ssh");
        command
            .arg("-N")
            .arg("-L")
            .arg(format!(
                "{}:{}:{}",
                local_port, source.db_host, source.db_port
            ))
            .arg("-p")
            .arg(source.ssh_port.to_string())
            .arg("-o")
            .arg("BatchMode=yes")
            .arg("-o")
            .arg("ExitOnForwardFailure=yes")
            .arg("-o")
            .arg(format!("ServerAliveInterval={}", SERVER_ALIVE_INTERVAL))
            .arg("-o")
            .arg(format!("ServerAliveCountMax={}", SERVER_ALIVE_COUNT_MAX))
            .arg("-o")
            .arg(format!(
                "StrictHostKeyChecking={}",
                source.host_key_check.ssh_option_value()
            ));
        if let Some(ref identity) = source.ssh_identity {
            command.arg("-i").arg(identity);
        }
        command
            .arg(format!("{}@{}", source.ssh_user, source.ssh_host))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .kill_on_drop(true);

        let child = command
            .spawn()
            .map_err(|e| CloneError::Tunnel(format!("failed to spawn ssh: {}", e)))?;

        let mut tunnel = Self {
            child,
            local_port,
            remote,
            state: TunnelState::Opening,
        };

        if let Err(e) = tunnel.confirm_forward().await {
            tunnel.close().await;
            return Err(e);
        }

        tunnel.state = TunnelState::Active;
        info!("Tunnel active on 127.0.0.1:{}", local_port);
        Ok(tunnel)
    }

    /// Wait until the local forward accepts connections.
    async fn confirm_forward(&mut self) -> Result<()> {
        for _ in 0..CONFIRM_ATTEMPTS {
            if let Some(status) = self
                .child
                .try_wait()
                .map_err(|e| CloneError::Tunnel(format!("failed to poll ssh: {}", e)))?
            {
                return Err(CloneError::Tunnel(format!(
                    "ssh exited with {} before the forward came up",
                    status
                )));
            }

            if TcpStream::connect(("127.0.0.1", self.local_port)).await.is_ok() {
                return Ok(());
            }

            tokio::time::sleep(CONFIRM_DELAY).await;
        }

        Err(CloneError::Tunnel(format!(
            "forward on 127.0.0.1:{} did not come up within {:?}",
            self.local_port,
            CONFIRM_DELAY * CONFIRM_ATTEMPTS
        )))
    }

    /// Local port the forward listens on.
    pub fn local_port(&self) -> u16 {
        self.local_port
    }

    /// Current lifecycle state.
    pub fn state(&self) -> TunnelState {
        self.state
    }

    /// Close the tunnel.
    ///
    /// Idempotent: a no-op if already closed or if the tracked process is
    /// already gone; no second termination signal is ever issued.
    pub async fn close(&mut self) {
        if self.state == TunnelState::Closed {
            return;
        }
        self.state = TunnelState::Closed;

        match self.child.try_wait() {
            Ok(Some(status)) => {
                debug!("Tunnel to {} already exited with {}", self.remote, status);
            }
            Ok(None) => match self.child.kill().await {
                Ok(()) => info!("Closed tunnel to {}", self.remote),
                Err(e) => warn!("Failed to terminate tunnel to {}: {}", self.remote, e),
            },
            Err(e) => warn!("Failed to poll tunnel process: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tunnel_around(child: Child) -> Tunnel {
        Tunnel {
            child,
            local_port: 0,
            remote: "test".to_string(),
            state: TunnelState::Active,
        }
    }

    fn spawn_sleep() -> Child {
        Command::new("sleep")
            .arg("30")
            .kill_on_drop(true)
            .spawn()
            .unwrap()
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let mut tunnel = tunnel_around(spawn_sleep());
        tunnel.close().await;
        assert_eq!(tunnel.state(), TunnelState::Closed);

        // Second close is a no-op, not an error.
        tunnel.close().await;
        assert_eq!(tunnel.state(), TunnelState::Closed);
    }

    #[tokio::test]
    async fn test_close_after_process_exit() {
        let child = Command::new("true").spawn().unwrap();
        let mut tunnel = tunnel_around(child);

        // Let the process exit before closing.
        tokio::time::sleep(Duration::from_millis(100)).await;
        tunnel.close().await;
        assert_eq!(tunnel.state(), TunnelState::Closed);
    }
}
