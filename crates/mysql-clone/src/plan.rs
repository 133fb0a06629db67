//! Dump/load phase planning.
//!
//! A pure mapping from the run's two decision inputs - exclusions present,
//! rename requested - to a plan shape. The rename never changes the shape;
//! it is applied through the load options. Same inputs always yield the
//! same plan.

use std::path::{Path, PathBuf};
use tracing::info;

/// Naming scheme for a run's dump artifacts under the dump base.
///
/// Every artifact directory name begins with `{source}_{timestamp}`,
/// optionally suffixed `_ddl` or `_data`. The cleanup guard only ever
/// deletes paths matching this scheme.
#[derive(Debug, Clone)]
pub struct DumpLayout {
    base: PathBuf,
    source: String,
    timestamp: String,
}

impl DumpLayout {
    pub fn new(base: &Path, source: &str, timestamp: &str) -> Self {
        Self {
            base: base.to_path_buf(),
            source: source.to_string(),
            timestamp: timestamp.to_string(),
        }
    }

    /// Directory for a single-phase full dump.
    pub fn single_dir(&self) -> PathBuf {
        self.base.join(format!("{}_{}", self.source, self.timestamp))
    }

    /// Directory for the DDL-only dump of a two-phase run.
    pub fn ddl_dir(&self) -> PathBuf {
        self.base
            .join(format!("{}_{}_ddl", self.source, self.timestamp))
    }

    /// Directory for the data-only dump of a two-phase run.
    pub fn data_dir(&self) -> PathBuf {
        self.base
            .join(format!("{}_{}_data", self.source, self.timestamp))
    }
}

/// Shape of a run's dump/load phases. Produced once per run, never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DumpPlan {
    /// One full dump of the schema, one load.
    SinglePhase { dir: PathBuf },
    /// DDL-only dump of the full schema, then a data-only dump restricted
    /// to the included tables; loaded in the same order.
    TwoPhase {
        ddl_dir: PathBuf,
        data_dir: PathBuf,
        included_tables: Vec<String>,
    },
}

impl DumpPlan {
    /// Dump directories the plan will produce, in phase order.
    pub fn dirs(&self) -> Vec<PathBuf> {
        match self {
            DumpPlan::SinglePhase { dir } => vec![dir.clone()],
            DumpPlan::TwoPhase {
                ddl_dir, data_dir, ..
            } => vec![ddl_dir.clone(), data_dir.clone()],
        }
    }

    /// Human-readable shape name for logs and reports.
    pub fn shape(&self) -> &'static str {
        match self {
            DumpPlan::SinglePhase { .. } => "single-phase",
            DumpPlan::TwoPhase { .. } => "two-phase",
        }
    }
}

/// Map the run's decision inputs to a plan.
///
/// | exclusions | rename | plan                                  |
/// |------------|--------|---------------------------------------|
/// | no         | no     | SinglePhase: full schema dump         |
/// | no         | yes    | SinglePhase, rename applied at load   |
/// | yes        | no     | TwoPhase: DDL of full schema + data   |
/// | yes        | yes    | TwoPhase, rename applied at load      |
pub fn build_plan(
    exclusions_present: bool,
    rename_requested: bool,
    layout: &DumpLayout,
    included_tables: &[String],
) -> DumpPlan {
    let plan = if exclusions_present {
        DumpPlan::TwoPhase {
            ddl_dir: layout.ddl_dir(),
            data_dir: layout.data_dir(),
            included_tables: included_tables.to_vec(),
        }
    } else {
        DumpPlan::SinglePhase {
            dir: layout.single_dir(),
        }
    };

    info!(
        "Planned {} dump (exclusions={}, rename={})",
        plan.shape(),
        exclusions_present,
        rename_requested
    );
    plan
}
