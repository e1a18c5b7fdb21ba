//! Baseline check and snapshot workflows
//!
//! The check compares every table recorded in a baseline with its live
//! counterpart and collects the fix SQL, plus the tables that appeared,
//! disappeared or have no model. The snapshot rebuilds the baseline from the
//! live database.

use indexmap::IndexMap;
use std::collections::BTreeSet;

use crate::schema::analyzer::{Introspector, SchemaAnalyzer, Snapshot, TableFailure};
use crate::schema::generator::FixSqlGenerator;
use crate::schema::introspect::IntrospectOptions;
use crate::schema::types::Baseline;

/// Outcome of a baseline check
#[derive(Debug, Clone, Default)]
pub struct CheckReport {
    /// Fix statements per logical table name, in baseline order
    pub fix_sql: IndexMap<String, Vec<String>>,
    /// Live tables that the baseline does not know
    pub added_tables: Vec<String>,
    /// Baseline tables missing from the database
    pub removed_tables: Vec<String>,
    /// Live tables without a model
    pub no_model_tables: Vec<String>,
    /// Tables that could not be introspected
    pub failures: Vec<TableFailure>,
    /// Live schemas read during the check
    pub live: Baseline,
}

impl CheckReport {
    pub fn has_differences(&self) -> bool {
        !self.fix_sql.is_empty() || !self.added_tables.is_empty() || !self.removed_tables.is_empty()
    }

    /// Number of tables that need attention
    pub fn pending_count(&self) -> usize {
        self.fix_sql.len() + self.added_tables.len() + self.removed_tables.len()
    }
}

/// Check `baseline` against the live database
///
/// `live_tables` and `model_tables` hold logical names. The fix SQL of each
/// table reshapes its baseline definition into the live one.
pub async fn check_against_baseline<S: Introspector>(
    analyzer: &SchemaAnalyzer<S>,
    generator: &FixSqlGenerator<'_>,
    baseline: &Baseline,
    live_tables: &[String],
    model_tables: &BTreeSet<String>,
    strict: bool,
    options: &IntrospectOptions,
) -> CheckReport {
    let mut report = CheckReport::default();

    report.added_tables = live_tables
        .iter()
        .filter(|table| !baseline.contains_key(*table))
        .cloned()
        .collect();

    if !live_tables.is_empty() {
        report.removed_tables = baseline
            .keys()
            .filter(|table| !live_tables.contains(*table))
            .cloned()
            .collect();
    }

    let tables: Vec<String> = baseline.keys().cloned().collect();
    let results = analyzer.introspect_many(&tables, options).await;

    for (table, result) in results {
        let live = match result {
            Ok(live) => live,
            Err(e) => {
                tracing::warn!(table = %table, error = %e, "Failed to read live table, skipping");
                report.failures.push(TableFailure {
                    table,
                    reason: e.to_string(),
                });
                continue;
            }
        };

        let statements = generator.fix_sql(baseline.get(&table), live.as_ref(), strict);
        if statements.is_empty() {
            tracing::info!(table = %table, "Table matches baseline");
        } else {
            tracing::info!(table = %table, statements = statements.len(), "Table needs fixing");
            report.fix_sql.insert(table.clone(), statements);
        }

        if let Some(schema) = live {
            report.live.insert(table, schema);
        }
    }

    report.no_model_tables = live_tables
        .iter()
        .filter(|table| !model_tables.contains(*table))
        .cloned()
        .collect();

    report
}

/// Tables that go into a new baseline
pub fn snapshot_tables(
    live_tables: &[String],
    model_tables: &BTreeSet<String>,
    filter_no_model_table: bool,
) -> Vec<String> {
    live_tables
        .iter()
        .filter(|table| !filter_no_model_table || model_tables.contains(*table))
        .cloned()
        .collect()
}

/// Build a new baseline, reusing schemas already read by a check
pub async fn snapshot_baseline<S: Introspector>(
    analyzer: &SchemaAnalyzer<S>,
    tables: &[String],
    cached: &Baseline,
    options: &IntrospectOptions,
) -> Snapshot {
    let missing: Vec<String> = tables
        .iter()
        .filter(|table| !cached.contains_key(*table))
        .cloned()
        .collect();

    let mut fresh = analyzer.snapshot_all(&missing, options).await;

    let mut snapshot = Snapshot {
        failures: std::mem::take(&mut fresh.failures),
        ..Snapshot::default()
    };
    for table in tables {
        let schema = match cached.get(table) {
            Some(schema) => schema.clone(),
            None => match fresh.schemas.shift_remove(table) {
                Some(schema) => schema,
                None => continue,
            },
        };
        snapshot.schemas.insert(table.clone(), schema);
    }

    snapshot
}
