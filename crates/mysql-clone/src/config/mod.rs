//! Configuration loading and validation.

mod types;
mod validation;

pub use types::*;

use crate::error::Result;
use std::path::Path;

impl Config {
    /// Load configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        validation::validate(self)
    }

    /// Effective target schema name for a run stamped with `timestamp`.
    ///
    /// Explicit `target.schema` wins; `timestamp_schema` derives
    /// `{source}_{timestamp}`; otherwise the source name is reused.
    pub fn effective_target_schema(&self, timestamp: &str) -> String {
        if let Some(ref schema) = self.target.schema {
            schema.clone()
        } else if self.target.timestamp_schema {
            format!("{}_{}", self.source.schema, timestamp)
        } else {
            self.source.schema.clone()
        }
    }

    /// Whether the load renames the schema.
    pub fn rename_requested(&self, effective_target: &str) -> bool {
        effective_target != self.source.schema
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID_YAML: &str = r#"
source:
  ssh_host: db1.example.com
  ssh_user: deploy
  db_user: reader
  db_password: secret
  schema: shop
target:
  container: mysql-local
  db_user: root
  db_password: secret
"#;

    #[test]
    fn test_from_yaml_valid() {
        let config = Config::from_yaml(VALID_YAML).unwrap();
        assert_eq!(config.source.ssh_port, 22);
        assert_eq!(config.source.db_port, 3306);
        assert_eq!(config.source.db_host, "127.0.0.1");
        assert_eq!(config.target.charset, "utf8mb4");
        assert_eq!(config.clone.compression, Compression::Zstd);
        assert!(!config.clone.keep_dump);
    }

    #[test]
    fn test_from_yaml_invalid_reports_all_problems() {
        let yaml = r#"
source:
  ssh_host: ""
  ssh_user: deploy
  db_user: ""
  db_password: secret
  schema: shop
target:
  container: mysql-local
  db_user: root
  db_password: secret
"#;
        let err = Config::from_yaml(yaml).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("source.ssh_host"));
        assert!(message.contains("source.db_user"));
    }

    #[test]
    fn test_effective_target_schema_explicit() {
        let mut config = Config::from_yaml(VALID_YAML).unwrap();
        config.target.schema = Some("shop_staging".to_string());
        assert_eq!(
            config.effective_target_schema("20240101_000000"),
            "shop_staging"
        );
        assert!(config.rename_requested("shop_staging"));
    }

    #[test]
    fn test_effective_target_schema_timestamp_derived() {
        let mut config = Config::from_yaml(VALID_YAML).unwrap();
        config.target.timestamp_schema = true;
        assert_eq!(
            config.effective_target_schema("20240101_000000"),
            "shop_20240101_000000"
        );
    }

    #[test]
    fn test_effective_target_schema_defaults_to_source() {
        let config = Config::from_yaml(VALID_YAML).unwrap();
        let effective = config.effective_target_schema("20240101_000000");
        assert_eq!(effective, "shop");
        assert!(!config.rename_requested(&effective));
    }

    #[test]
    fn test_defer_indexes_option_values() {
        assert_eq!(DeferIndexes::None.as_option_value(), "off");
        assert_eq!(DeferIndexes::Fulltext.as_option_value(), "fulltext");
        assert_eq!(DeferIndexes::Secondary.as_option_value(), "all");
        assert_eq!(DeferIndexes::All.as_option_value(), "all");
    }

    #[test]
    fn test_clone_config_thread_defaults() {
        let resources = SystemResources { cpu_cores: 8 };
        let mut clone = CloneConfig::default();
        assert_eq!(clone.get_dump_threads(&resources), 8);
        assert_eq!(clone.get_load_threads(&resources), 8);

        clone.dump_threads = Some(4);
        assert_eq!(clone.get_dump_threads(&resources), 4);
    }
}
