//! Configuration validation.
//!
//! Validation is eager and exhaustive: every problem is collected and
//! reported in one error rather than failing on the first missing field.

use super::Config;
use crate::error::{CloneError, Result};
use crate::identifier;

/// Validate the configuration, aggregating all problems.
pub fn validate(config: &Config) -> Result<()> {
    let mut problems = Vec::new();

    // Source validation
    if config.source.ssh_host.is_empty() {
        problems.push("source.ssh_host is required".to_string());
    }
    if config.source.ssh_user.is_empty() {
        problems.push("source.ssh_user is required".to_string());
    }
    if config.source.db_user.is_empty() {
        problems.push("source.db_user is required".to_string());
    }
    if config.source.schema.is_empty() {
        problems.push("source.schema is required".to_string());
    } else if !identifier::is_safe(&config.source.schema) {
        problems.push(format!(
            "source.schema '{}' is not a valid identifier",
            config.source.schema
        ));
    }

    // Target validation: exactly one endpoint reference
    match (&config.target.container, &config.target.host) {
        (None, None) => {
            problems.push("target.container or target.host is required".to_string());
        }
        (Some(_), Some(_)) => {
            problems.push("target.container and target.host are mutually exclusive".to_string());
        }
        (None, Some(_)) if config.target.port.is_none() => {
            problems.push("target.port is required with target.host".to_string());
        }
        _ => {}
    }
    if config.target.db_user.is_empty() {
        problems.push("target.db_user is required".to_string());
    }
    if let Some(ref schema) = config.target.schema {
        if !identifier::is_safe(schema) {
            problems.push(format!("target.schema '{}' is not a valid identifier", schema));
        }
        if config.target.timestamp_schema {
            problems.push(
                "target.schema and target.timestamp_schema are mutually exclusive".to_string(),
            );
        }
    }
    if !identifier::is_safe(&config.target.charset) {
        problems.push(format!(
            "target.charset '{}' is not a valid identifier",
            config.target.charset
        ));
    }
    if !identifier::is_safe(&config.target.collation) {
        problems.push(format!(
            "target.collation '{}' is not a valid identifier",
            config.target.collation
        ));
    }

    // Clone config validation - only check if explicitly set
    if let Some(0) = config.clone.dump_threads {
        problems.push("clone.dump_threads must be at least 1".to_string());
    }
    if let Some(0) = config.clone.load_threads {
        problems.push("clone.load_threads must be at least 1".to_string());
    }
    if config.clone.dump_base.as_os_str().is_empty() {
        problems.push("clone.dump_base is required".to_string());
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(CloneError::Config(problems.join("; ")))
    }
}
