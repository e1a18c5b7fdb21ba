//! mysql_baseline: snapshot MySQL table structures and reconcile drift
//!
//! A baseline records the structure of every tracked table. Checking a
//! database against it yields the `ALTER TABLE` statements that reshape the
//! baseline tables into the live ones, and a snapshot writes a new baseline
//! together with the INSERT export of the configured seed tables.

extern crate self as mysql_baseline;

pub mod check;
pub mod config;
pub mod db;
pub mod error;
pub mod export;
pub mod models;
pub mod schema;
pub mod utils;

use std::path::PathBuf;

// Re-export main types for easier access
pub use check::CheckReport;
pub use config::Config;
pub use db::connection::DatabaseConnection;
pub use error::{Error, Result};
pub use models::registry::ModelRegistry;
pub use mysql_baseline_macros::BaselineModel;
pub use schema::analyzer::SchemaAnalyzer;
pub use schema::baseline::BaselineFile;
pub use schema::diff::TableDiff;
pub use schema::generator::FixSqlGenerator;

use schema::analyzer::Snapshot;
use schema::introspect::IntrospectOptions;
use schema::types::Baseline;

/// Initialize a client with the specified configuration file
pub async fn init(config_path: &str) -> Result<BaselineClient> {
    let config = config::load_from_file(config_path)?;
    BaselineClient::new(config).await
}

/// The main client tying configuration, database and models together
pub struct BaselineClient {
    config: Config,
    db_connection: DatabaseConnection,
    model_registry: ModelRegistry,
    schema_analyzer: SchemaAnalyzer<DatabaseConnection>,
}

impl BaselineClient {
    /// Create a new client from configuration
    pub async fn new(config: Config) -> Result<Self> {
        let db_connection = DatabaseConnection::connect(&config.database).await?;
        let model_registry = ModelRegistry::new(&config.models);
        let schema_analyzer = SchemaAnalyzer::new(db_connection.clone(), config.naming.table_prefix())
            .with_concurrency(config.performance.concurrency);

        Ok(Self {
            config,
            db_connection,
            model_registry,
            schema_analyzer,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Scan directories for model definitions and register them
    pub fn register_models(&mut self) -> Result<()> {
        self.model_registry.scan()
    }

    /// Load the baseline file, `None` when it does not exist yet
    pub fn load_baseline(&self) -> Result<Option<BaselineFile>> {
        BaselineFile::load(&self.config.baseline.schema_path())
    }

    fn introspect_options(&self) -> IntrospectOptions {
        IntrospectOptions::for_baseline(self.config.baseline.reset_auto_increment)
    }

    /// Compare the live database with a baseline
    pub async fn check(&self, baseline: &Baseline) -> Result<CheckReport> {
        let live_tables = self.schema_analyzer.live_tables().await?;
        let generator = FixSqlGenerator::new(self.schema_analyzer.prefix());

        tracing::info!(tables = baseline.len(), "Comparing database with baseline");
        let report = check::check_against_baseline(
            &self.schema_analyzer,
            &generator,
            baseline,
            &live_tables,
            &self.model_registry.model_tables(),
            self.config.baseline.strict,
            &self.introspect_options(),
        )
        .await;

        Ok(report)
    }

    /// Write a new baseline file from the live database
    ///
    /// Schemas in `cached`, typically the `live` map of a check report, are
    /// reused instead of being read again. When no schema is captured the
    /// previous baseline file is removed.
    pub async fn snapshot(&self, cached: &Baseline) -> Result<Snapshot> {
        let live_tables = self.schema_analyzer.live_tables().await?;
        let tables = check::snapshot_tables(
            &live_tables,
            &self.model_registry.model_tables(),
            self.config.models.filter_no_model_table,
        );

        tracing::info!(tables = tables.len(), "Generating baseline");
        let snapshot = check::snapshot_baseline(
            &self.schema_analyzer,
            &tables,
            cached,
            &self.introspect_options(),
        )
        .await;

        let path = self.config.baseline.schema_path();
        if snapshot.schemas.is_empty() {
            schema::baseline::remove_stale(&path)?;
            tracing::warn!("No table schema captured, no baseline written");
            return Ok(snapshot);
        }

        BaselineFile::new(snapshot.schemas.clone())?.save(&path)?;
        Ok(snapshot)
    }

    /// Write the INSERT export of the configured tables
    ///
    /// Returns the written path, `None` when there was nothing to export. A
    /// stale export file is removed in that case.
    pub async fn export_inserts(&self) -> Result<Option<PathBuf>> {
        let path = self.config.baseline.insert_path();

        let exported = export::export_tables(
            &self.db_connection,
            &self.config.insert_tables,
            self.schema_analyzer.prefix(),
        )
        .await;

        let Some(sql) = exported else {
            schema::baseline::remove_stale(&path)?;
            tracing::warn!("No insert statements generated");
            return Ok(None);
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, sql)?;
        tracing::info!(path = %path.display(), "Insert file written");

        Ok(Some(path))
    }
}
