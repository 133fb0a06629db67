//! Safety-guarded cleanup of transient dump artifacts.
//!
//! Deletion is allow-listed: a path is removed only when it sits directly
//! under the dump base and its name matches the run artifact scheme
//! `{source}_{timestamp}` with an optional `_ddl`/`_data` suffix. Anything
//! else is left untouched and reported, never silently skipped.

use std::path::Path;
use tracing::{info, warn};

/// Delete a run's dump artifacts unless retention is requested.
pub fn purge(paths: &[std::path::PathBuf], source: &str, base: &Path, keep_dump: bool) {
    if keep_dump {
        for path in paths {
            info!("Keeping dump artifact {}", path.display());
        }
        return;
    }

    for path in paths {
        if !is_run_artifact(path, source, base) {
            warn!(
                "Refusing to delete {}: not a {}_<timestamp> artifact under {}",
                path.display(),
                source,
                base.display()
            );
            continue;
        }

        match std::fs::remove_dir_all(path) {
            Ok(()) => info!("Removed dump artifact {}", path.display()),
            Err(e) => warn!("Failed to remove {} (non-fatal): {}", path.display(), e),
        }
    }
}

/// Check that `path` names a dump artifact of this source under `base`.
pub fn is_run_artifact(path: &Path, source: &str, base: &Path) -> bool {
    if path.parent() != Some(base) {
        return false;
    }

    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };

    let Some(rest) = name.strip_prefix(&format!("{}_", source)) else {
        return false;
    };

    let timestamp = rest
        .strip_suffix("_ddl")
        .or_else(|| rest.strip_suffix("_data"))
        .unwrap_or(rest);

    is_timestamp(timestamp)
}

/// `%Y%m%d_%H%M%S`: eight digits, an underscore, six digits.
fn is_timestamp(s: &str) -> bool {
    let bytes = s.as_bytes();
    bytes.len() == 15
        && bytes[8] == b'_'
        && bytes[..8].iter().all(u8::is_ascii_digit)
        && bytes[9..].iter().all(u8::is_ascii_digit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    const BASE: &str = "/tmp/mysql-clone";

    fn artifact(name: &str) -> PathBuf {
        Path::new(BASE).join(name)
    }

    // =========================================================================
    // Artifact pattern matching
    // =========================================================================

    #[test]
    fn test_accepts_run_artifacts() {
        let base = Path::new(BASE);
        assert!(is_run_artifact(&artifact("shop_20240101_000000"), "shop", base));
        assert!(is_run_artifact(&artifact("shop_20240101_000000_ddl"), "shop", base));
        assert!(is_run_artifact(&artifact("shop_20240101_000000_data"), "shop", base));
    }

    #[test]
    fn test_rejects_other_sources() {
        let base = Path::new("/tmp");
        assert!(!is_run_artifact(
            &PathBuf::from("/tmp/other_db_20240101_000000"),
            "mydb",
            base
        ));
    }

    #[test]
    fn test_rejects_paths_outside_base() {
        let base = Path::new(BASE);
        assert!(!is_run_artifact(
            &PathBuf::from("/var/lib/shop_20240101_000000"),
            "shop",
            base
        ));
        assert!(!is_run_artifact(
            &artifact("nested/shop_20240101_000000"),
            "shop",
            base
        ));
    }

    #[test]
    fn test_rejects_malformed_timestamps() {
        let base = Path::new(BASE);
        assert!(!is_run_artifact(&artifact("shop_20240101"), "shop", base));
        assert!(!is_run_artifact(&artifact("shop_not_a_timestamp"), "shop", base));
        assert!(!is_run_artifact(&artifact("shop_20240101_00000x"), "shop", base));
        assert!(!is_run_artifact(&artifact("shop_20240101_000000_bak"), "shop", base));
        assert!(!is_run_artifact(&artifact("shop"), "shop", base));
    }

    #[test]
    fn test_source_prefix_must_match_exactly() {
        let base = Path::new(BASE);
        // "shop2" artifacts are not "shop" artifacts.
        assert!(!is_run_artifact(&artifact("shop2_20240101_000000"), "shop", base));
        // A source that is a prefix of the directory name is not enough:
        // the remainder must be a bare timestamp.
        assert!(!is_run_artifact(&artifact("shop_db_20240101_000000"), "shop", base));
    }

    // =========================================================================
    // Purge behavior
    // =========================================================================

    #[test]
    fn test_purge_removes_matching_artifacts() {
        let tmp = tempfile::tempdir().unwrap();
        let base = tmp.path();
        let dir = base.join("shop_20240101_000000");
        std::fs::create_dir(&dir).unwrap();

        purge(&[dir.clone()], "shop", base, false);
        assert!(!dir.exists());
    }

    #[test]
    fn test_purge_leaves_foreign_paths_intact() {
        let tmp = tempfile::tempdir().unwrap();
        let base = tmp.path();
        let foreign = base.join("other_db_20240101_000000");
        std::fs::create_dir(&foreign).unwrap();

        purge(&[foreign.clone()], "mydb", base, false);
        assert!(foreign.exists());
    }

    #[test]
    fn test_purge_respects_retention() {
        let tmp = tempfile::tempdir().unwrap();
        let base = tmp.path();
        let dir = base.join("shop_20240101_000000_data");
        std::fs::create_dir(&dir).unwrap();

        purge(&[dir.clone()], "shop", base, true);
        assert!(dir.exists());
    }
}
