//! Target schema preparation and restoration.
//!
//! The import path streams table data files into the server, which
//! requires `local_infile`. The preparer records the original value so it
//! can be put back after the load; failing to toggle it is a warning, not
//! a fatal error - the load may still succeed on servers where the
//! setting is managed externally.

use crate::config::Config;
use crate::error::Result;
use crate::identifier;
use sqlx::MySqlPool;
use tracing::{debug, info, warn};

/// Prepare the target for a load.
///
/// Returns the original `local_infile` value when it had to be changed,
/// so [`restore`] can put it back. Drops (and, when renaming, recreates
/// with the configured charset/collation) the target schema when
/// `drop_target` is set; without a rename the load's own schema-creation
/// statement supplies charset and collation.
pub async fn prepare(
    pool: &MySqlPool,
    config: &Config,
    effective_schema: &str,
    renaming: bool,
) -> Result<Option<bool>> {
    let original = enable_local_infile(pool).await;

    if config.clone.drop_target {
        let quoted = identifier::quote(effective_schema);
        info!("Dropping target schema {}", effective_schema);
        sqlx::query(&format!("DROP DATABASE IF EXISTS {}", quoted))
            .execute(pool)
            .await?;

        if renaming {
            info!(
                "Recreating target schema {} ({} / {})",
                effective_schema, config.target.charset, config.target.collation
            );
            sqlx::query(&format!(
                "CREATE DATABASE {} CHARACTER SET {} COLLATE {}",
                quoted,
                identifier::quote(&config.target.charset),
                identifier::quote(&config.target.collation)
            ))
            .execute(pool)
            .await?;
        }
    }

    Ok(original)
}

/// Restore the target's `local_infile` to its pre-run value.
///
/// Failure is a non-fatal warning: the load has already succeeded.
pub async fn restore(pool: &MySqlPool, original: Option<bool>) {
    let Some(false) = original else {
        return;
    };

    match sqlx::query("SET GLOBAL local_infile = OFF").execute(pool).await {
        Ok(_) => info!("Restored local_infile to OFF"),
        Err(e) => warn!("Failed to restore local_infile (non-fatal): {}", e),
    }
}

/// Enable `local_infile` if it is off.
///
/// Returns `Some(false)` when the setting was off and has been enabled
/// (restoration needed), `None` when it was already on or could not be
/// read or changed.
async fn enable_local_infile(pool: &MySqlPool) -> Option<bool> {
    let current: i64 = match sqlx::query_scalar("SELECT @@GLOBAL.local_infile")
        .fetch_one(pool)
        .await
    {
        Ok(value) => value,
        Err(e) => {
            warn!("Could not read local_infile (non-fatal): {}", e);
            return None;
        }
    };

    if current != 0 {
        debug!("local_infile already enabled");
        return None;
    }

    match sqlx::query("SET GLOBAL local_infile = ON").execute(pool).await {
        Ok(_) => {
            info!("Enabled local_infile for the load");
            Some(false)
        }
        Err(e) => {
            // Typically a missing SYSTEM_VARIABLES_ADMIN privilege.
            warn!("Could not enable local_infile (non-fatal): {}", e);
            None
        }
    }
}

/// Verify that a DDL load produced a populated schema.
///
/// The two-phase ordering invariant requires the DDL load to have created
/// the target tables before the data load begins.
pub async fn count_tables(pool: &MySqlPool, schema: &str) -> Result<i64> {
    let count: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM information_schema.TABLES
        WHERE TABLE_SCHEMA = ? AND TABLE_TYPE = 'BASE TABLE'
        "#,
    )
    .bind(schema)
    .fetch_one(pool)
    .await?;

    Ok(count)
}
