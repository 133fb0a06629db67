//! External bulk export/import execution.
//!
//! One capability interface with a single implementation: every dump and
//! load phase is a MySQL Shell (`mysqlsh`) invocation built here. Argument
//! construction is pure and unit-tested; spawning inherits stdio so the
//! tool's own progress reporting reaches the operator unchanged.

use crate::config::{Compression, DeferIndexes};
use crate::error::{CloneError, Result};
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::info;

/// Database endpoint an invocation connects to.
#[derive(Debug, Clone)]
pub struct DbEndpoint {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
}

/// Dump phase kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DumpPhase {
    /// Full schema dump (DDL + data).
    Full,
    /// Full table-set dump (DDL + data of every table). Required when the
    /// load renames the schema: the import tool's schema override applies
    /// to table-scoped dumps, not schema-level ones.
    FullTables,
    /// DDL-only dump of the full schema.
    Ddl,
    /// Data-only dump restricted to a table subset.
    Data,
}

impl DumpPhase {
    pub fn name(&self) -> &'static str {
        match self {
            DumpPhase::Full | DumpPhase::FullTables => "full",
            DumpPhase::Ddl => "ddl",
            DumpPhase::Data => "data",
        }
    }
}

/// Load phase kind, mirroring the dump that produced the directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadPhase {
    Full,
    Ddl,
    Data,
}

impl LoadPhase {
    pub fn name(&self) -> &'static str {
        match self {
            LoadPhase::Full => "full",
            LoadPhase::Ddl => "ddl",
            LoadPhase::Data => "data",
        }
    }
}

/// Options for a dump invocation.
#[derive(Debug, Clone)]
pub struct DumpOptions {
    pub threads: usize,
    pub compression: Compression,
}

/// Options for a load invocation.
#[derive(Debug, Clone)]
pub struct LoadOptions {
    pub threads: usize,
    pub defer_indexes: DeferIndexes,
    pub ignore_existing: bool,
    /// Load into this schema instead of the dumped one.
    pub schema_override: Option<String>,
}

/// Executes dump and load phases against the external tool.
#[derive(Debug, Clone)]
pub struct DumpLoadExecutor {
    mysqlsh_bin: String,
}

impl Default for DumpLoadExecutor {
    fn default() -> Self {
        Self {
            mysqlsh_bin: "mysqlsh".to_string(),
        }
    }
}

impl DumpLoadExecutor {
    /// Use a non-default `mysqlsh` binary.
    pub fn with_binary(bin: impl Into<String>) -> Self {
        Self {
            mysqlsh_bin: bin.into(),
        }
    }

    /// Run a dump phase into `dir`.
    ///
    /// `tables` is only consulted for the data phase; full and DDL dumps
    /// cover the whole schema with snapshot-consistent reads.
    pub async fn dump(
        &self,
        endpoint: &DbEndpoint,
        phase: DumpPhase,
        schema: &str,
        tables: &[String],
        dir: &Path,
        opts: &DumpOptions,
    ) -> Result<()> {
        let args = dump_args(endpoint, phase, schema, tables, dir, opts);
        info!("Starting {} dump of {} into {}", phase.name(), schema, dir.display());
        self.run(&args)
            .await
            .map_err(|message| CloneError::export(phase.name(), message))
    }

    /// Run a load phase from `dir`.
    pub async fn load(
        &self,
        endpoint: &DbEndpoint,
        phase: LoadPhase,
        dir: &Path,
        opts: &LoadOptions,
    ) -> Result<()> {
        let args = load_args(endpoint, dir, opts);
        info!("Starting {} load from {}", phase.name(), dir.display());
        self.run(&args)
            .await
            .map_err(|message| CloneError::import(phase.name(), message))
    }

    async fn run(&self, args: &[String]) -> std::result::Result<(), String> {
        let status = Command::new(&self.mysqlsh_bin)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .await
            .map_err(|e| format!("failed to spawn {}: {}", self.mysqlsh_bin, e))?;

        if status.success() {
            Ok(())
        } else {
            Err(format!("mysqlsh exited with {}", status))
        }
    }
}

/// Connection arguments shared by dump and load invocations.
fn connection_args(endpoint: &DbEndpoint) -> Vec<String> {
    vec![
        "--mysql".to_string(),
        "--host".to_string(),
        endpoint.host.clone(),
        "--port".to_string(),
        endpoint.port.to_string(),
        "--user".to_string(),
        endpoint.user.clone(),
        format!("--password={}", endpoint.password),
    ]
}

/// Build the argument vector for a dump phase.
fn dump_args(
    endpoint: &DbEndpoint,
    phase: DumpPhase,
    schema: &str,
    tables: &[String],
    dir: &Path,
    opts: &DumpOptions,
) -> Vec<String> {
    let mut args = connection_args(endpoint);
    args.push("--".to_string());
    args.push("util".to_string());

    match phase {
        DumpPhase::Full | DumpPhase::Ddl => {
            args.push("dump-schemas".to_string());
            args.push(schema.to_string());
        }
        DumpPhase::FullTables | DumpPhase::Data => {
            args.push("dump-tables".to_string());
            args.push(schema.to_string());
            args.push(tables.join(","));
        }
    }

    args.push(format!("--outputUrl={}", dir.display()));
    args.push(format!("--threads={}", opts.threads));
    args.push(format!(
        "--compression={}",
        opts.compression.as_option_value()
    ));

    match phase {
        DumpPhase::Full | DumpPhase::FullTables => {
            args.push("--consistent=true".to_string());
        }
        DumpPhase::Ddl => {
            args.push("--consistent=true".to_string());
            args.push("--ddlOnly=true".to_string());
        }
        DumpPhase::Data => {
            args.push("--dataOnly=true".to_string());
        }
    }

    args
}

/// Build the argument vector for a load phase.
fn load_args(endpoint: &DbEndpoint, dir: &Path, opts: &LoadOptions) -> Vec<String> {
    let mut args = connection_args(endpoint);
    args.push("--".to_string());
    args.push("util".to_string());
    args.push("load-dump".to_string());
    args.push(dir.display().to_string());
    args.push(format!("--threads={}", opts.threads));
    args.push(format!(
        "--deferTableIndexes={}",
        opts.defer_indexes.as_option_value()
    ));
    args.push(format!(
        "--ignoreExistingObjects={}",
        opts.ignore_existing
    ));
    if let Some(ref schema) = opts.schema_override {
        args.push(format!("--schema={}", schema));
    }

    args
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn endpoint() -> DbEndpoint {
        DbEndpoint {
            host: "127.0.0.1".to_string(),
            port: 53211,
            user: "reader".to_string(),
            password: "secret".to_string(),
        }
    }

    fn dump_opts() -> DumpOptions {
        DumpOptions {
            threads: 4,
            compression: Compression::Zstd,
        }
    }

    // =========================================================================
    // Dump argument shapes
    // =========================================================================

    #[test]
    fn test_full_dump_args() {
        let dir = PathBuf::from("/tmp/mysql-clone/shop_20240101_000000");
        let args = dump_args(&endpoint(), DumpPhase::Full, "shop", &[], &dir, &dump_opts());

        assert!(args.contains(&"dump-schemas".to_string()));
        assert!(args.contains(&"shop".to_string()));
        assert!(args.contains(&"--consistent=true".to_string()));
        assert!(args.contains(&"--threads=4".to_string()));
        assert!(args.contains(&"--compression=zstd".to_string()));
        assert!(!args.iter().any(|a| a.starts_with("--ddlOnly")));
        assert!(!args.iter().any(|a| a.starts_with("--dataOnly")));
    }

    #[test]
    fn test_full_table_set_dump_args_for_rename() {
        let dir = PathBuf::from("/tmp/mysql-clone/shop_20240101_000000");
        let tables = vec![
            "audit_log".to_string(),
            "customers".to_string(),
            "orders".to_string(),
        ];
        let args = dump_args(
            &endpoint(),
            DumpPhase::FullTables,
            "shop",
            &tables,
            &dir,
            &dump_opts(),
        );

        assert!(args.contains(&"dump-tables".to_string()));
        assert!(args.contains(&"audit_log,customers,orders".to_string()));
        assert!(args.contains(&"--consistent=true".to_string()));
        assert!(!args.iter().any(|a| a.starts_with("--ddlOnly")));
        assert!(!args.iter().any(|a| a.starts_with("--dataOnly")));
    }

    #[test]
    fn test_ddl_dump_args() {
        let dir = PathBuf::from("/tmp/mysql-clone/shop_20240101_000000_ddl");
        let args = dump_args(&endpoint(), DumpPhase::Ddl, "shop", &[], &dir, &dump_opts());

        assert!(args.contains(&"dump-schemas".to_string()));
        assert!(args.contains(&"--ddlOnly=true".to_string()));
        assert!(args.contains(&"--consistent=true".to_string()));
    }

    #[test]
    fn test_data_dump_args_restrict_table_list() {
        let dir = PathBuf::from("/tmp/mysql-clone/shop_20240101_000000_data");
        let tables = vec!["customers".to_string(), "products".to_string()];
        let args = dump_args(
            &endpoint(),
            DumpPhase::Data,
            "shop",
            &tables,
            &dir,
            &dump_opts(),
        );

        assert!(args.contains(&"dump-tables".to_string()));
        assert!(args.contains(&"customers,products".to_string()));
        assert!(args.contains(&"--dataOnly=true".to_string()));
        // Excluded tables never appear in the data dump's table list.
        assert!(!args.iter().any(|a| a.contains("audit_log")));
        assert!(!args.iter().any(|a| a.contains("orders")));
    }

    // =========================================================================
    // Load argument shapes
    // =========================================================================

    #[test]
    fn test_load_args_defaults() {
        let dir = PathBuf::from("/tmp/mysql-clone/shop_20240101_000000");
        let opts = LoadOptions {
            threads: 8,
            defer_indexes: DeferIndexes::None,
            ignore_existing: false,
            schema_override: None,
        };
        let args = load_args(&endpoint(), &dir, &opts);

        assert!(args.contains(&"load-dump".to_string()));
        assert!(args.contains(&"--threads=8".to_string()));
        assert!(args.contains(&"--deferTableIndexes=off".to_string()));
        assert!(args.contains(&"--ignoreExistingObjects=false".to_string()));
        assert!(!args.iter().any(|a| a.starts_with("--schema=")));
    }

    #[test]
    fn test_load_args_with_rename_and_deferred_indexes() {
        let dir = PathBuf::from("/tmp/mysql-clone/shop_20240101_000000_ddl");
        let opts = LoadOptions {
            threads: 2,
            defer_indexes: DeferIndexes::All,
            ignore_existing: true,
            schema_override: Some("shop_staging".to_string()),
        };
        let args = load_args(&endpoint(), &dir, &opts);

        assert!(args.contains(&"--deferTableIndexes=all".to_string()));
        assert!(args.contains(&"--ignoreExistingObjects=true".to_string()));
        assert!(args.contains(&"--schema=shop_staging".to_string()));
    }

    #[test]
    fn test_connection_args_target_endpoint() {
        let args = connection_args(&endpoint());
        assert!(args.contains(&"--host".to_string()));
        assert!(args.contains(&"127.0.0.1".to_string()));
        assert!(args.contains(&"53211".to_string()));
        assert!(args.contains(&"--password=secret".to_string()));
    }
}
