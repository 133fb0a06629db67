//! Table-set resolution for selective data exclusion.
//!
//! Parses the user's exclusion specification, queries the live catalog for
//! the source schema's base tables, and partitions the catalog into
//! included and excluded sets. Every name - user-supplied or
//! catalog-derived - passes the strict identifier filter before it can
//! reach a generated statement or an export tool argument.

use crate::error::Result;
use crate::identifier;
use sqlx::{MySqlPool, Row};
use std::collections::BTreeSet;
use tracing::{debug, warn};

/// Partition of the source schema's base tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSet {
    /// All base tables, lexicographically ordered.
    pub all: Vec<String>,
    /// Tables whose data is included in the clone.
    pub included: Vec<String>,
    /// Tables excluded from the data phase (normalized, schema-matched).
    pub excluded: Vec<String>,
}

impl TableSet {
    /// True when every table's data is excluded and the data phase can be
    /// skipped entirely.
    pub fn all_excluded(&self) -> bool {
        self.included.is_empty()
    }
}

/// Resolve the included/excluded table sets for `schema`.
///
/// `exclusion_spec` is comma-separated; entries are bare table names or
/// schema-qualified (`schema.table`). The catalog is queried through the
/// tunnel, so the pool must already be connected.
pub async fn resolve(pool: &MySqlPool, schema: &str, exclusion_spec: &str) -> Result<TableSet> {
    let all = list_base_tables(pool, schema).await?;
    let exclusions = parse_exclusions(exclusion_spec, schema);
    Ok(partition(all, &exclusions))
}

/// Query the catalog for all base tables (views excluded) in `schema`,
/// lexicographic by name.
async fn list_base_tables(pool: &MySqlPool, schema: &str) -> Result<Vec<String>> {
    // CAST to CHAR to sidestep information_schema collation quirks.
    let rows = sqlx::query(
        r#"
        SELECT CAST(TABLE_NAME AS CHAR(255)) AS TABLE_NAME
        FROM information_schema.TABLES
        WHERE TABLE_SCHEMA = ? AND TABLE_TYPE = 'BASE TABLE'
        ORDER BY TABLE_NAME
        "#,
    )
    .bind(schema)
    .fetch_all(pool)
    .await?;

    let mut tables = Vec::with_capacity(rows.len());
    for row in rows {
        let name: String = row.get("TABLE_NAME");
        if identifier::is_safe(&name) {
            tables.push(name);
        } else {
            warn!("Skipping catalog table with unsafe name: {:?}", name);
        }
    }

    Ok(tables)
}

/// Parse a comma-separated exclusion specification into a normalized,
/// deduplicated set of bare table names.
///
/// A qualified entry is honored only when its schema component equals
/// `source_schema`; entries qualifying a different schema are silently
/// dropped (traced at debug level). Names failing the identifier filter
/// are dropped with a warning.
pub fn parse_exclusions(spec: &str, source_schema: &str) -> BTreeSet<String> {
    let mut names = BTreeSet::new();

    for raw in spec.split(',') {
        let entry = raw.trim();
        if entry.is_empty() {
            continue;
        }

        let table = match entry.split_once('.') {
            Some((schema_part, table_part)) => {
                let schema_part = identifier::unquote(schema_part);
                if schema_part != source_schema {
                    debug!(
                        "Dropping exclusion '{}': schema '{}' is not the source schema",
                        entry, schema_part
                    );
                    continue;
                }
                identifier::unquote(table_part)
            }
            None => identifier::unquote(entry),
        };

        if identifier::is_safe(&table) {
            names.insert(table);
        } else {
            warn!("Dropping exclusion with unsafe table name: {:?}", entry);
        }
    }

    names
}

/// Partition the catalog's table list against a normalized exclusion set.
///
/// `excluded` is the intersection of the requested exclusions with the
/// catalog, so `included ∪ excluded = all` and the two sets are disjoint.
fn partition(all: Vec<String>, exclusions: &BTreeSet<String>) -> TableSet {
    let mut included = Vec::new();
    let mut excluded = Vec::new();

    for table in &all {
        if exclusions.contains(table) {
            excluded.push(table.clone());
        } else {
            included.push(table.clone());
        }
    }

    for requested in exclusions {
        if !all.contains(requested) {
            debug!("Exclusion '{}' does not name a base table; ignored", requested);
        }
    }

    TableSet {
        all,
        included,
        excluded,
    }
}
