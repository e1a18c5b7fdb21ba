//! Configuration handling for mysql_baseline

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::error::{Error, Result};
use crate::export::ExportOptions;
use crate::utils::naming::TablePrefix;

/// Load configuration from a TOML file
pub fn load_from_file(path: &str) -> Result<Config> {
    let config_str = fs::read_to_string(path)
        .map_err(|e| Error::ConfigError(format!("Failed to read config file: {}", e)))?;

    let config: Config = toml::from_str(&config_str)
        .map_err(|e| Error::ConfigError(format!("Failed to parse config file: {}", e)))?;

    config.validate()?;
    Ok(config)
}

/// Represents the complete mysql_baseline configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    #[serde(default)]
    pub naming: NamingConfig,
    #[serde(default)]
    pub baseline: BaselineConfig,
    #[serde(default)]
    pub models: ModelsConfig,
    /// Tables whose rows are exported as INSERT statements, keyed by logical name
    #[serde(default)]
    pub insert_tables: IndexMap<String, ExportOptions>,
    pub logging: Option<LoggingConfig>,
    #[serde(default)]
    pub performance: PerformanceConfig,
}

impl Config {
    /// Check values that serde cannot express as types
    pub fn validate(&self) -> Result<()> {
        if self.database.url.is_empty() {
            return Err(Error::ConfigError("database.url must not be empty".to_string()));
        }

        for (table, options) in &self.insert_tables {
            if options.batch_size == 0 {
                return Err(Error::ConfigError(format!(
                    "insert_tables.{}.batch_size must be greater than zero",
                    table
                )));
            }
        }

        if self.performance.concurrency == 0 {
            return Err(Error::ConfigError(
                "performance.concurrency must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}

/// Database connection configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub pool_size: Option<u32>,
    pub timeout_seconds: Option<u64>,
}

/// Table naming configuration
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct NamingConfig {
    /// Prefix every physical table carries on this connection
    #[serde(default)]
    pub table_prefix: String,
    /// Prefix hard-coded in model sources, swapped for `table_prefix` when they differ
    #[serde(default)]
    pub default_prefix: String,
}

impl NamingConfig {
    pub fn table_prefix(&self) -> TablePrefix {
        TablePrefix::new(&self.table_prefix, &self.default_prefix)
    }
}

/// Baseline file and comparison behaviour
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct BaselineConfig {
    #[serde(default = "default_baseline_directory")]
    pub directory: String,
    #[serde(default = "default_schema_file")]
    pub schema_file: String,
    #[serde(default = "default_insert_file")]
    pub insert_file: String,
    /// Emit DROP statements for columns, indexes and tables missing from the live side
    #[serde(default = "default_true")]
    pub strict: bool,
    /// Normalize the next auto-increment value to 1 before snapshotting
    #[serde(default = "default_true")]
    pub reset_auto_increment: bool,
}

impl BaselineConfig {
    pub fn schema_path(&self) -> PathBuf {
        PathBuf::from(&self.directory).join(&self.schema_file)
    }

    pub fn insert_path(&self) -> PathBuf {
        PathBuf::from(&self.directory).join(&self.insert_file)
    }
}

impl Default for BaselineConfig {
    fn default() -> Self {
        Self {
            directory: default_baseline_directory(),
            schema_file: default_schema_file(),
            insert_file: default_insert_file(),
            strict: true,
            reset_auto_increment: true,
        }
    }
}

/// Model discovery configuration
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct ModelsConfig {
    #[serde(default)]
    pub paths: Vec<String>,
    /// Tables never tracked, even when a model declares them
    #[serde(default)]
    pub ignore_tables: Vec<String>,
    /// Only snapshot tables that have a model
    #[serde(default)]
    pub filter_no_model_table: bool,
}

/// Logging configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<String>,
    #[serde(default = "default_log_format")]
    pub format: String,
    #[serde(default = "default_true")]
    pub stdout: bool,
}

/// Performance configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PerformanceConfig {
    /// Tables introspected at the same time during a snapshot
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
        }
    }
}

fn default_baseline_directory() -> String {
    "runtime/baseline".to_string()
}

fn default_schema_file() -> String {
    "db_schema.json".to_string()
}

fn default_insert_file() -> String {
    "db_insert.sql".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_concurrency() -> usize {
    4
}

fn default_true() -> bool {
    true
}
