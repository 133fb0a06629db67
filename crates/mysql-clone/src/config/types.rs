//! Configuration type definitions with auto-tuning based on system resources.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use sysinfo::System;
use tracing::info;

/// System resource information for auto-tuning.
#[derive(Debug, Clone)]
pub struct SystemResources {
    /// Number of CPU cores.
    pub cpu_cores: usize,
}

impl SystemResources {
    /// Detect system resources.
    pub fn detect() -> Self {
        let mut sys = System::new_all();
        sys.refresh_all();

        Self {
            cpu_cores: sys.cpus().len().max(1),
        }
    }

    /// Log detected system resources.
    pub fn log(&self) {
        info!("System resources: {} CPU cores", self.cpu_cores);
    }
}

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Source database reached over SSH.
    pub source: SourceConfig,

    /// Local target database.
    pub target: TargetConfig,

    /// Clone behavior configuration.
    #[serde(default)]
    pub clone: CloneConfig,
}

/// SSH host-key verification policy for the tunnel session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum HostKeyCheck {
    /// Fail on unknown or changed host keys.
    #[default]
    Strict,
    /// Accept and record previously unseen host keys.
    AcceptNew,
    /// Skip host-key verification entirely.
    Off,
}

impl HostKeyCheck {
    /// Value for ssh's `StrictHostKeyChecking` option.
    pub fn ssh_option_value(&self) -> &'static str {
        match self {
            HostKeyCheck::Strict => "yes",
            HostKeyCheck::AcceptNew => "accept-new",
            HostKeyCheck::Off => "no",
        }
    }
}

/// Source database (remote MySQL over SSH) configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// SSH host to tunnel through.
    pub ssh_host: String,

    /// SSH user.
    pub ssh_user: String,

    /// SSH port (default: 22).
    #[serde(default = "default_ssh_port")]
    pub ssh_port: u16,

    /// SSH identity file. Agent authentication is used when unset.
    #[serde(default)]
    pub ssh_identity: Option<PathBuf>,

    /// Host-key verification policy (default: strict).
    #[serde(default)]
    pub host_key_check: HostKeyCheck,

    /// Database host as seen from the SSH host (default: 127.0.0.1).
    #[serde(default = "default_db_host")]
    pub db_host: String,

    /// Database port (default: 3306).
    #[serde(default = "default_mysql_port")]
    pub db_port: u16,

    /// Database user.
    pub db_user: String,

    /// Database password.
    #[serde(skip_serializing)]
    pub db_password: String,

    /// Schema to clone.
    pub schema: String,
}

impl std::fmt::Debug for SourceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceConfig")
            .field("ssh_host", &self.ssh_host)
            .field("ssh_user", &self.ssh_user)
            .field("ssh_port", &self.ssh_port)
            .field("ssh_identity", &self.ssh_identity)
            .field("host_key_check", &self.host_key_check)
            .field("db_host", &self.db_host)
            .field("db_port", &self.db_port)
            .field("db_user", &self.db_user)
            .field("db_password", &"[REDACTED]")
            .field("schema", &self.schema)
            .finish()
    }
}

/// Target database (local MySQL) configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct TargetConfig {
    /// Docker container whose published 3306 port is the target endpoint.
    /// Mutually exclusive with `host`/`port`.
    #[serde(default)]
    pub container: Option<String>,

    /// Target host, when not using a container reference.
    #[serde(default)]
    pub host: Option<String>,

    /// Target port, when not using a container reference.
    #[serde(default)]
    pub port: Option<u16>,

    /// Database user.
    pub db_user: String,

    /// Database password.
    #[serde(skip_serializing)]
    pub db_password: String,

    /// Target schema name. When unset and `timestamp_schema` is false, the
    /// source schema name is reused.
    #[serde(default)]
    pub schema: Option<String>,

    /// Derive the target schema name as `{source}_{timestamp}`.
    #[serde(default)]
    pub timestamp_schema: bool,

    /// Character set used when the target schema is recreated.
    #[serde(default = "default_charset")]
    pub charset: String,

    /// Collation used when the target schema is recreated.
    #[serde(default = "default_collation")]
    pub collation: String,
}

impl std::fmt::Debug for TargetConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TargetConfig")
            .field("container", &self.container)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("db_user", &self.db_user)
            .field("db_password", &"[REDACTED]")
            .field("schema", &self.schema)
            .field("timestamp_schema", &self.timestamp_schema)
            .field("charset", &self.charset)
            .field("collation", &self.collation)
            .finish()
    }
}

/// Dump compression codec passed through to the export tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    #[default]
    Zstd,
    Gzip,
    None,
}

impl Compression {
    /// Value for the export tool's `compression` option.
    pub fn as_option_value(&self) -> &'static str {
        match self {
            Compression::Zstd => "zstd",
            Compression::Gzip => "gzip",
            Compression::None => "none",
        }
    }
}

/// Deferred-index policy passed through to the import tool.
///
/// Delays index construction until after bulk row insertion, trading
/// index-build latency for insert throughput.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DeferIndexes {
    #[default]
    None,
    Fulltext,
    Secondary,
    All,
}

impl DeferIndexes {
    /// Value for the import tool's `deferTableIndexes` option.
    ///
    /// The tool only distinguishes off/fulltext/all; `secondary` maps to
    /// `all`, which covers every non-primary index.
    pub fn as_option_value(&self) -> &'static str {
        match self {
            DeferIndexes::None => "off",
            DeferIndexes::Fulltext => "fulltext",
            DeferIndexes::Secondary | DeferIndexes::All => "all",
        }
    }
}

/// Clone behavior configuration.
///
/// Thread counts use `Option<T>` to distinguish between "not set" (use the
/// detected core count) and "explicitly set".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloneConfig {
    /// Root directory for transient dump artifacts.
    #[serde(default = "default_dump_base")]
    pub dump_base: PathBuf,

    /// Dump thread count. Defaults to the detected core count.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dump_threads: Option<usize>,

    /// Load thread count. Defaults to the detected core count.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub load_threads: Option<usize>,

    /// Dump compression codec (default: zstd).
    #[serde(default)]
    pub compression: Compression,

    /// Deferred-index policy for the load (default: none).
    #[serde(default)]
    pub defer_indexes: DeferIndexes,

    /// Skip objects that already exist in the target instead of failing.
    #[serde(default)]
    pub ignore_existing: bool,

    /// Keep dump directories after a successful load.
    #[serde(default)]
    pub keep_dump: bool,

    /// Drop the target schema before loading.
    #[serde(default)]
    pub drop_target: bool,

    /// Comma-separated table names to exclude from the data phase,
    /// optionally schema-qualified.
    #[serde(default)]
    pub exclude_tables_data: String,
}

impl Default for CloneConfig {
    fn default() -> Self {
        Self {
            dump_base: default_dump_base(),
            dump_threads: None,
            load_threads: None,
            compression: Compression::default(),
            defer_indexes: DeferIndexes::default(),
            ignore_existing: false,
            keep_dump: false,
            drop_target: false,
            exclude_tables_data: String::new(),
        }
    }
}

impl CloneConfig {
    /// Effective dump thread count.
    pub fn get_dump_threads(&self, resources: &SystemResources) -> usize {
        self.dump_threads.unwrap_or(resources.cpu_cores)
    }

    /// Effective load thread count.
    pub fn get_load_threads(&self, resources: &SystemResources) -> usize {
        self.load_threads.unwrap_or(resources.cpu_cores)
    }
}

fn default_ssh_port() -> u16 {
    22
}

fn default_db_host() -> String {
    "127.0.0.1".to_string()
}

fn default_mysql_port() -> u16 {
    3306
}

fn default_charset() -> String {
    "utf8mb4".to_string()
}

fn default_collation() -> String {
    "utf8mb4_0900_ai_ci".to_string()
}

fn default_dump_base() -> PathBuf {
    PathBuf::from("/tmp/mysql-clone")
}
