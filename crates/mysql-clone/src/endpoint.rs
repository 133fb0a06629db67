//! Target endpoint resolution.
//!
//! Maps the configured target reference to a reachable host:port. A
//! host/port pair passes through unchanged; a container reference is
//! resolved by asking docker for the published 3306 port. Resolution
//! failures are connectivity errors and happen before any dump artifact
//! is created.

use crate::config::TargetConfig;
use crate::error::{CloneError, Result};
use tokio::process::Command;
use tracing::{debug, info};

/// MySQL's canonical in-container port.
const CONTAINER_MYSQL_PORT: &str = "3306/tcp";

/// Resolve the target reference to a reachable `(host, port)`.
pub async fn resolve(target: &TargetConfig) -> Result<(String, u16)> {
    if let (Some(host), Some(port)) = (&target.host, target.port) {
        return Ok((host.clone(), port));
    }

    let container = target.container.as_deref().ok_or_else(|| {
        CloneError::Connectivity("no target endpoint configured".to_string())
    })?;

    let output = Command::new("docker")
        .args(["port", container, CONTAINER_MYSQL_PORT])
        .output()
        .await
        .map_err(|e| CloneError::Connectivity(format!("failed to run docker: {}", e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(CloneError::Connectivity(format!(
            "docker port {} failed: {}",
            container,
            stderr.trim()
        )));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let (host, port) = parse_docker_port(&stdout).ok_or_else(|| {
        CloneError::Connectivity(format!(
            "container '{}' does not publish {}",
            container, CONTAINER_MYSQL_PORT
        ))
    })?;

    info!("Resolved container '{}' to {}:{}", container, host, port);
    Ok((host, port))
}

/// Parse `docker port` output into a connectable `(host, port)`.
///
/// Output has one mapping per line, e.g. `0.0.0.0:49154` or
/// `[::]:49154`. Wildcard binds are rewritten to 127.0.0.1.
fn parse_docker_port(output: &str) -> Option<(String, u16)> {
    for line in output.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let (host, port_str) = line.rsplit_once(':')?;
        let port: u16 = match port_str.parse() {
            Ok(p) => p,
            Err(_) => {
                debug!("Skipping unparsable port mapping line: {:?}", line);
                continue;
            }
        };

        let host = match host {
            "0.0.0.0" | "[::]" | "::" | "" => "127.0.0.1".to_string(),
            other => other.to_string(),
        };
        return Some((host, port));
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ipv4_mapping() {
        let parsed = parse_docker_port("0.0.0.0:49154\n");
        assert_eq!(parsed, Some(("127.0.0.1".to_string(), 49154)));
    }

    #[test]
    fn test_parse_ipv6_wildcard_mapping() {
        let parsed = parse_docker_port("[::]:49154\n");
        assert_eq!(parsed, Some(("127.0.0.1".to_string(), 49154)));
    }

    #[test]
    fn test_parse_takes_first_valid_line() {
        let parsed = parse_docker_port("0.0.0.0:49154\n[::]:49154\n");
        assert_eq!(parsed, Some(("127.0.0.1".to_string(), 49154)));
    }

    #[test]
    fn test_parse_explicit_host() {
        let parsed = parse_docker_port("192.168.1.5:3307\n");
        assert_eq!(parsed, Some(("192.168.1.5".to_string(), 3307)));
    }

    #[test]
    fn test_parse_empty_output() {
        assert_eq!(parse_docker_port(""), None);
        assert_eq!(parse_docker_port("\n\n"), None);
    }

    #[tokio::test]
    async fn test_host_port_passthrough() {
        let target = TargetConfig {
            container: None,
            host: Some("127.0.0.1".to_string()),
            port: Some(3307),
            db_user: "root".to_string(),
            db_password: "pw".to_string(),
            schema: None,
            timestamp_schema: false,
            charset: "utf8mb4".to_string(),
            collation: "utf8mb4_0900_ai_ci".to_string(),
        };
        let (host, port) = resolve(&target).await.unwrap();
        assert_eq!(host, "127.0.0.1");
        assert_eq!(port, 3307);
    }
}
