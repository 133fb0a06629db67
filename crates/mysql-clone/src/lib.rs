//! # mysql-clone
//!
//! Clone a remote MySQL schema to a local target over an SSH tunnel.
//!
//! The library orchestrates one run end to end:
//!
//! - **Port allocation** for the tunnel's local endpoint
//! - **Tunnel lifecycle** with the spawned session owned directly
//! - **Table-set resolution** for selective data exclusion
//! - **Phase planning** (single- vs two-phase dump/load)
//! - **External dump/load** through MySQL Shell
//! - **Target preparation** (load settings, drop/recreate)
//! - **Safety-guarded cleanup** of transient dump artifacts
//!
//! ## Example
//!
//! ```rust,no_run
//! use mysql_clone::{Config, Orchestrator};
//!
//! #[tokio::main]
//! async fn main() -> mysql_clone::Result<()> {
//!     let config = Config::load("config.yaml")?;
//!     let report = Orchestrator::new(config).run(false).await?;
//!     println!("Cloned {} into {}", report.source_schema, report.target_schema);
//!     Ok(())
//! }
//! ```

pub mod cleanup;
pub mod config;
pub mod dump;
pub mod endpoint;
pub mod error;
pub mod identifier;
pub mod orchestrator;
pub mod plan;
pub mod ports;
pub mod tables;
pub mod target;
pub mod tunnel;

// Re-exports for convenient access
pub use config::{CloneConfig, Compression, Config, DeferIndexes, SourceConfig, TargetConfig};
pub use error::{CloneError, Result};
pub use orchestrator::{Orchestrator, RunReport};
pub use plan::DumpPlan;
pub use tables::TableSet;
pub use tunnel::{Tunnel, TunnelState};
