//! Schema module for mysql_baseline
//!
//! This module handles table schema introspection, comparison and fix-SQL
//! generation, plus the baseline file that stores snapshots.

pub mod analyzer;
pub mod baseline;
pub mod diff;
pub mod fragment;
pub mod generator;
pub mod introspect;
pub mod types;

// Re-export key types
pub use analyzer::{Introspector, SchemaAnalyzer, Snapshot, TableFailure};
pub use baseline::BaselineFile;
pub use diff::{DiffSet, TableDiff};
pub use generator::FixSqlGenerator;
pub use introspect::{ColumnRow, IndexRow, IntrospectOptions, TableStatusRow};
pub use types::{Baseline, Column, Index, IndexKind, TableSchema};
