//! Error types for the clone library.

use thiserror::Error;

/// Main error type for clone operations.
#[derive(Error, Debug)]
pub enum CloneError {
    /// Configuration error (missing fields, invalid values).
    ///
    /// Validation aggregates every problem into a single message so a bad
    /// config is reported once, not field by field across several runs.
    #[error("Configuration error: {0}")]
    Config(String),

    /// No free local port could be found for the tunnel.
    #[error("No free local port found after {attempts} attempts")]
    NoFreePort { attempts: u32 },

    /// SSH tunnel could not be established or died unexpectedly.
    #[error("Tunnel error: {0}")]
    Tunnel(String),

    /// Target endpoint unreachable or unresolvable.
    #[error("Connectivity error: {0}")]
    Connectivity(String),

    /// External dump phase failed.
    #[error("Export failed during {phase} dump: {message}")]
    Export { phase: String, message: String },

    /// External load phase failed.
    #[error("Import failed during {phase} load: {message}")]
    Import { phase: String, message: String },

    /// Database query error (catalog or target preparation).
    #[error("Database error: {0}")]
    Sql(#[from] sqlx::Error),

    /// IO error (file operations, process spawning).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML configuration parse error.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization error (run reports).
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CloneError {
    /// Create an Export error for a named dump phase.
    pub fn export(phase: impl Into<String>, message: impl Into<String>) -> Self {
        CloneError::Export {
            phase: phase.into(),
            message: message.into(),
        }
    }

    /// Create an Import error for a named load phase.
    pub fn import(phase: impl Into<String>, message: impl Into<String>) -> Self {
        CloneError::Import {
            phase: phase.into(),
            message: message.into(),
        }
    }

    /// Format error with full details including error chain.
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }

    /// Stable process exit code for this error class.
    pub fn exit_code(&self) -> u8 {
        match self {
            CloneError::Config(_) => 2,
            CloneError::NoFreePort { .. } => 3,
            CloneError::Tunnel(_) | CloneError::Connectivity(_) => 4,
            CloneError::Export { .. } => 5,
            CloneError::Import { .. } => 6,
            _ => 1,
        }
    }
}

/// Result type alias for clone operations.
pub type Result<T> = std::result::Result<T, CloneError>;
