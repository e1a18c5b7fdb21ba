//! Database schema analyzer
//!
//! This module drives an [`Introspector`] to build table schemas and whole
//! database snapshots.

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use indexmap::IndexMap;

use crate::error::Result;
use crate::schema::introspect::{
    build_table_schema, ColumnRow, IndexRow, IntrospectOptions, TableStatusRow,
};
use crate::schema::types::TableSchema;
use crate::utils::naming::TablePrefix;

/// Source of raw table metadata
///
/// Table names given to these methods are physical names, prefix included.
#[async_trait]
pub trait Introspector: Send + Sync {
    /// List every table of the database
    async fn list_tables(&self) -> Result<Vec<String>>;

    /// Status row of a table, `None` when the table does not exist
    async fn table_status(&self, table: &str) -> Result<Option<TableStatusRow>>;

    /// Column rows of a table in ordinal order
    async fn columns(&self, table: &str) -> Result<Vec<ColumnRow>>;

    /// Index rows of a table, grouped by key and in sequence order
    async fn indexes(&self, table: &str) -> Result<Vec<IndexRow>>;
}

/// A table that could not be introspected
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableFailure {
    pub table: String,
    pub reason: String,
}

/// Result of introspecting a list of tables
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    /// Schemas keyed by logical table name, in request order
    pub schemas: IndexMap<String, TableSchema>,
    /// Tables that were skipped
    pub failures: Vec<TableFailure>,
}

/// Schema analyzer for database schema introspection
pub struct SchemaAnalyzer<S> {
    source: S,
    prefix: TablePrefix,
    concurrency: usize,
}

impl<S: Introspector> SchemaAnalyzer<S> {
    /// Create a new schema analyzer
    pub fn new(source: S, prefix: TablePrefix) -> Self {
        Self {
            source,
            prefix,
            concurrency: 1,
        }
    }

    /// Number of tables introspected at once by [`SchemaAnalyzer::snapshot_all`]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn prefix(&self) -> &TablePrefix {
        &self.prefix
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Logical names of every table in the database
    pub async fn live_tables(&self) -> Result<Vec<String>> {
        let tables = self.source.list_tables().await?;
        Ok(tables
            .iter()
            .map(|table| self.prefix.strip(table).to_string())
            .collect())
    }

    /// Introspect one table, `None` when it does not exist
    pub async fn table_schema(
        &self,
        table: &str,
        options: &IntrospectOptions,
    ) -> Result<Option<TableSchema>> {
        let table_name = self.prefix.resolve(table);

        let Some(status) = self.source.table_status(&table_name).await? else {
            tracing::debug!(table = %table_name, "Table status not found");
            return Ok(None);
        };

        let columns = self.source.columns(&status.name).await?;
        let indexes = self.source.indexes(&status.name).await?;

        build_table_schema(&status, &columns, &indexes, options).map(Some)
    }

    /// Introspect several tables at once, results in request order
    pub async fn introspect_many(
        &self,
        tables: &[String],
        options: &IntrospectOptions,
    ) -> Vec<(String, Result<Option<TableSchema>>)> {
        stream::iter(tables.iter())
            .map(|table| async move { (table.clone(), self.table_schema(table, options).await) })
            .buffered(self.concurrency)
            .collect()
            .await
    }

    /// Introspect every table, skipping those that fail
    pub async fn snapshot_all(&self, tables: &[String], options: &IntrospectOptions) -> Snapshot {
        let results = self.introspect_many(tables, options).await;

        let mut snapshot = Snapshot::default();
        for (table, result) in results {
            match result {
                Ok(Some(schema)) => {
                    tracing::info!(table = %table, "Table schema captured");
                    snapshot.schemas.insert(table, schema);
                }
                Ok(None) => {
                    tracing::warn!(table = %table, "Table not found, skipping");
                    snapshot.failures.push(TableFailure {
                        table,
                        reason: "table not found".to_string(),
                    });
                }
                Err(e) => {
                    tracing::warn!(table = %table, error = %e, "Failed to introspect table, skipping");
                    snapshot.failures.push(TableFailure {
                        table,
                        reason: e.to_string(),
                    });
                }
            }
        }

        snapshot
    }
}
