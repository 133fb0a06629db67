//! Clone orchestrator - main workflow coordinator.
//!
//! Runs one plan start to finish, one phase at a time: resolve the target
//! endpoint, allocate a local port, open the tunnel, resolve the table
//! set, plan, dump, prepare the target, load, restore, clean up. Each
//! phase depends on state or artifacts produced by the previous one, so
//! nothing runs concurrently; the only parallelism is the thread counts
//! handed to the external tool. Tunnel teardown is the one action
//! guaranteed on every exit path.

use crate::cleanup;
use crate::config::{Config, SystemResources};
use crate::dump::{DbEndpoint, DumpLoadExecutor, DumpOptions, DumpPhase, LoadOptions, LoadPhase};
use crate::endpoint;
use crate::error::{CloneError, Result};
use crate::plan::{build_plan, DumpLayout, DumpPlan};
use crate::ports;
use crate::tables::{self, TableSet};
use crate::target;
use crate::tunnel::Tunnel;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

/// Connection pool timeout.
const POOL_CONNECTION_TIMEOUT: Duration = Duration::from_secs(30);

/// Clone orchestrator.
pub struct Orchestrator {
    config: Config,
    executor: DumpLoadExecutor,
}

/// Result of a clone run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// Unique run identifier.
    pub run_id: String,

    /// Schema cloned from the source.
    pub source_schema: String,

    /// Effective target schema the data landed in.
    pub target_schema: String,

    /// Plan shape ("single-phase" or "two-phase").
    pub plan: String,

    /// Base tables found in the source schema.
    pub tables_total: usize,

    /// Tables whose data was excluded.
    pub tables_data_excluded: usize,

    /// Whether the data phase was skipped entirely.
    pub data_phase_skipped: bool,

    /// Dump directories produced by the run.
    pub dump_dirs: Vec<PathBuf>,

    /// Whether the dump directories were retained.
    pub dump_kept: bool,

    /// Whether this was a dry run (plan only, no data movement).
    pub dry_run: bool,

    /// When the run started.
    pub started_at: DateTime<Utc>,

    /// When the run completed.
    pub completed_at: DateTime<Utc>,

    /// Total duration in seconds.
    pub duration_seconds: f64,
}

impl RunReport {
    /// Convert to JSON string.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Artifact timestamp for a run: `%Y%m%d_%H%M%S`.
fn format_timestamp(at: DateTime<Utc>) -> String {
    at.format("%Y%m%d_%H%M%S").to_string()
}

impl Orchestrator {
    /// Create a new orchestrator.
    pub fn new(config: Config) -> Self {
        Self {
            config,
            executor: DumpLoadExecutor::default(),
        }
    }

    /// Use a non-default dump/load executor (e.g. a custom mysqlsh path).
    pub fn with_executor(mut self, executor: DumpLoadExecutor) -> Self {
        self.executor = executor;
        self
    }

    /// Run the clone.
    ///
    /// With `dry_run`, stops after planning: the tunnel is opened and the
    /// table set resolved, but no artifact is created and the target is
    /// not touched.
    pub async fn run(self, dry_run: bool) -> Result<RunReport> {
        let started_at = Utc::now();
        let run_id = uuid::Uuid::new_v4().to_string();
        let timestamp = format_timestamp(started_at);

        let resources = SystemResources::detect();
        resources.log();

        let effective_target = self.config.effective_target_schema(&timestamp);
        let rename = self.config.rename_requested(&effective_target);
        info!(
            "Starting clone run {}: {} -> {}",
            run_id, self.config.source.schema, effective_target
        );

        // Pre-flight: the target endpoint must resolve and accept
        // connections before any dump directory is created.
        let (target_host, target_port) = endpoint::resolve(&self.config.target).await?;
        let target_pool = connect_pool(
            &target_host,
            target_port,
            &self.config.target.db_user,
            &self.config.target.db_password,
            "target",
        )
        .await?;

        let local_port = ports::find_free_port()?;
        let mut tunnel = Tunnel::open(&self.config.source, local_port).await?;

        let mut produced: Vec<PathBuf> = Vec::new();
        let outcome = self
            .execute(
                &resources,
                &timestamp,
                &effective_target,
                rename,
                local_port,
                (&target_host, target_port),
                &target_pool,
                dry_run,
                &mut produced,
            )
            .await;

        // Scope-exit guarantee: the tunnel closes on success and failure
        // alike before anything else is unwound.
        tunnel.close().await;
        target_pool.close().await;

        match outcome {
            Ok((table_set, plan)) => {
                if !dry_run {
                    cleanup::purge(
                        &produced,
                        &self.config.source.schema,
                        &self.config.clone.dump_base,
                        self.config.clone.keep_dump,
                    );
                    info!(
                        "Clone complete: {} -> {}",
                        self.config.source.schema, effective_target
                    );
                }

                let completed_at = Utc::now();
                Ok(RunReport {
                    run_id,
                    source_schema: self.config.source.schema.clone(),
                    target_schema: effective_target,
                    plan: plan.shape().to_string(),
                    tables_total: table_set.all.len(),
                    tables_data_excluded: table_set.excluded.len(),
                    data_phase_skipped: table_set.all_excluded(),
                    dump_dirs: produced,
                    dump_kept: self.config.clone.keep_dump,
                    dry_run,
                    started_at,
                    completed_at,
                    duration_seconds: (completed_at - started_at).num_milliseconds() as f64
                        / 1000.0,
                })
            }
            Err(e) => {
                // No rollback: partial state is reported, not undone.
                if !produced.is_empty() {
                    warn!(
                        "Run failed; dump artifacts left in place for inspection: {:?}",
                        produced
                    );
                }
                warn!(
                    "Target schema '{}' may be partially loaded and requires manual cleanup",
                    effective_target
                );
                Err(e)
            }
        }
    }

    /// Everything that needs the tunnel: resolution, planning, dump,
    /// target preparation, load, restore.
    #[allow(clippy::too_many_arguments)]
    async fn execute(
        &self,
        resources: &SystemResources,
        timestamp: &str,
        effective_target: &str,
        rename: bool,
        local_port: u16,
        target_endpoint: (&str, u16),
        target_pool: &MySqlPool,
        dry_run: bool,
        produced: &mut Vec<PathBuf>,
    ) -> Result<(TableSet, DumpPlan)> {
        let source = &self.config.source;
        let clone_cfg = &self.config.clone;

        // Phase 1: resolve the table set through the tunnel.
        let source_pool = connect_pool(
            "127.0.0.1",
            local_port,
            &source.db_user,
            &source.db_password,
            "source (via tunnel)",
        )
        .await?;
        let table_set =
            tables::resolve(&source_pool, &source.schema, &clone_cfg.exclude_tables_data).await?;
        source_pool.close().await;

        info!(
            "Resolved {} base tables ({} excluded from data phase)",
            table_set.all.len(),
            table_set.excluded.len()
        );

        // Phase 2: plan.
        let exclusions_present = !table_set.excluded.is_empty();
        let layout = DumpLayout::new(&clone_cfg.dump_base, &source.schema, timestamp);
        let plan = build_plan(exclusions_present, rename, &layout, &table_set.included);

        if dry_run {
            info!("Dry run: stopping after planning ({})", plan.shape());
            return Ok((table_set, plan));
        }

        tokio::fs::create_dir_all(&clone_cfg.dump_base).await?;

        let source_db = DbEndpoint {
            host: "127.0.0.1".to_string(),
            port: local_port,
            user: source.db_user.clone(),
            password: source.db_password.clone(),
        };
        let target_db = DbEndpoint {
            host: target_endpoint.0.to_string(),
            port: target_endpoint.1,
            user: self.config.target.db_user.clone(),
            password: self.config.target.db_password.clone(),
        };
        let dump_opts = DumpOptions {
            threads: clone_cfg.get_dump_threads(resources),
            compression: clone_cfg.compression,
        };

        // Phase 3: dump.
        match &plan {
            DumpPlan::SinglePhase { dir } => {
                // A renamed load needs a table-scoped dump; the schema
                // override does not apply to schema-level dumps.
                let (phase, tables) = if rename {
                    (DumpPhase::FullTables, table_set.all.as_slice())
                } else {
                    (DumpPhase::Full, &[] as &[String])
                };
                self.executor
                    .dump(&source_db, phase, &source.schema, tables, dir, &dump_opts)
                    .await?;
                produced.push(dir.clone());
            }
            DumpPlan::TwoPhase {
                ddl_dir,
                data_dir,
                included_tables,
            } => {
                self.executor
                    .dump(&source_db, DumpPhase::Ddl, &source.schema, &[], ddl_dir, &dump_opts)
                    .await?;
                produced.push(ddl_dir.clone());

                if table_set.all_excluded() {
                    info!("All tables excluded: skipping data dump");
                } else {
                    self.executor
                        .dump(
                            &source_db,
                            DumpPhase::Data,
                            &source.schema,
                            included_tables,
                            data_dir,
                            &dump_opts,
                        )
                        .await?;
                    produced.push(data_dir.clone());
                }
            }
        }

        // Phase 4: prepare the target and load.
        let original_setting =
            target::prepare(target_pool, &self.config, effective_target, rename).await?;

        let load_opts = LoadOptions {
            threads: clone_cfg.get_load_threads(resources),
            defer_indexes: clone_cfg.defer_indexes,
            ignore_existing: clone_cfg.ignore_existing,
            schema_override: rename.then(|| effective_target.to_string()),
        };

        let load_result = self
            .load_phases(&plan, &table_set, &target_db, target_pool, effective_target, &load_opts)
            .await;

        // Phase 5: restore regardless of load outcome; the warning path
        // inside restore covers failures.
        target::restore(target_pool, original_setting).await;

        load_result?;
        Ok((table_set, plan))
    }

    /// Run the plan's load phases in order.
    ///
    /// In a two-phase plan the DDL load must succeed and produce a
    /// populated schema before the data load begins; any failure aborts
    /// the remaining phases.
    async fn load_phases(
        &self,
        plan: &DumpPlan,
        table_set: &TableSet,
        target_db: &DbEndpoint,
        target_pool: &MySqlPool,
        effective_target: &str,
        load_opts: &LoadOptions,
    ) -> Result<()> {
        match plan {
            DumpPlan::SinglePhase { dir } => {
                self.executor
                    .load(target_db, LoadPhase::Full, dir, load_opts)
                    .await?;
            }
            DumpPlan::TwoPhase {
                ddl_dir, data_dir, ..
            } => {
                // Index deferral only pays off while rows are streaming in;
                // the DDL-only load builds definitions as written.
                let ddl_opts = LoadOptions {
                    defer_indexes: crate::config::DeferIndexes::None,
                    ..load_opts.clone()
                };
                self.executor
                    .load(target_db, LoadPhase::Ddl, ddl_dir, &ddl_opts)
                    .await?;

                let created = target::count_tables(target_pool, effective_target).await?;
                if created == 0 && !table_set.all.is_empty() {
                    return Err(CloneError::import(
                        "ddl",
                        format!(
                            "DDL load reported success but schema '{}' has no tables",
                            effective_target
                        ),
                    ));
                }

                if table_set.all_excluded() {
                    info!("All tables excluded: skipping data load");
                } else {
                    self.executor
                        .load(target_db, LoadPhase::Data, data_dir, load_opts)
                        .await?;
                }
            }
        }

        Ok(())
    }
}

/// Open a small connection pool and verify it with a probe query.
async fn connect_pool(
    host: &str,
    port: u16,
    user: &str,
    password: &str,
    label: &str,
) -> Result<MySqlPool> {
    let options = MySqlConnectOptions::new()
        .host(host)
        .port(port)
        .username(user)
        .password(password);

    let pool = MySqlPoolOptions::new()
        .max_connections(2)
        .acquire_timeout(POOL_CONNECTION_TIMEOUT)
        .connect_with(options)
        .await
        .map_err(|e| {
            CloneError::Connectivity(format!("{} at {}:{}: {}", label, host, port, e))
        })?;

    sqlx::query("SELECT 1")
        .fetch_one(&pool)
        .await
        .map_err(|e| {
            CloneError::Connectivity(format!("{} at {}:{}: {}", label, host, port, e))
        })?;

    info!("Connected to {} at {}:{}", label, host, port);
    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_format_timestamp() {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(format_timestamp(at), "20240101_000000");
    }

    #[test]
    fn test_run_report_json_round_trip() {
        let report = RunReport {
            run_id: "test".to_string(),
            source_schema: "shop".to_string(),
            target_schema: "shop_staging".to_string(),
            plan: "two-phase".to_string(),
            tables_total: 4,
            tables_data_excluded: 2,
            data_phase_skipped: false,
            dump_dirs: vec![PathBuf::from("/tmp/mysql-clone/shop_20240101_000000_ddl")],
            dump_kept: false,
            dry_run: false,
            started_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            completed_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 5, 0).unwrap(),
            duration_seconds: 300.0,
        };

        let json = report.to_json().unwrap();
        assert!(json.contains("\"target_schema\": \"shop_staging\""));

        let parsed: RunReport = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.tables_total, 4);
        assert_eq!(parsed.plan, "two-phase");
    }
}
