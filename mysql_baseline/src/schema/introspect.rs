//! Introspection adapter
//!
//! Maps the raw rows of `SHOW TABLE STATUS`, `SHOW FULL COLUMNS` and
//! `SHOW INDEX` into a typed [`TableSchema`].

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::schema::types::{Column, Index, TableSchema};

/// One row of `SHOW TABLE STATUS`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableStatusRow {
    pub name: String,
    pub collation: Option<String>,
    pub engine: Option<String>,
    pub auto_increment: Option<u64>,
}

/// One row of `SHOW FULL COLUMNS`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnRow {
    pub field: String,
    /// Full type string such as `int(10) unsigned`
    pub column_type: String,
    /// `YES` or `NO`
    pub null: String,
    pub default: Option<String>,
    pub extra: String,
    pub comment: Option<String>,
}

/// One row of `SHOW INDEX`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexRow {
    pub key_name: String,
    pub column_name: String,
    pub non_unique: bool,
}

/// Options controlling how raw rows become a schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntrospectOptions {
    /// Normalize the next auto-increment value to 1
    pub reset_auto_increment: bool,
    /// Keep column default values
    pub include_default: bool,
    /// Keep column comments, an absent comment becoming empty
    pub include_comment: bool,
}

impl Default for IntrospectOptions {
    fn default() -> Self {
        Self {
            reset_auto_increment: false,
            include_default: true,
            include_comment: true,
        }
    }
}

impl IntrospectOptions {
    /// Options used for baseline snapshots
    pub fn for_baseline(reset_auto_increment: bool) -> Self {
        Self {
            reset_auto_increment,
            ..Self::default()
        }
    }
}

/// Split a full column type into `(type, length, signed)`
///
/// `int(10) unsigned` -> `("int", "10", false)`, `decimal(10,2)` ->
/// `("decimal", "10,2", true)`, `text` -> `("text", "", true)`.
pub fn parse_column_type(column_type: &str) -> (String, String, bool) {
    let (base, qualifier) = match column_type.split_once(' ') {
        Some((base, qualifier)) => (base, qualifier.trim()),
        None => (column_type, ""),
    };

    let (data_type, length) = match base.split_once('(') {
        Some((data_type, rest)) => (data_type, rest.trim_end_matches(')')),
        None => (base, ""),
    };

    (data_type.to_string(), length.to_string(), qualifier.is_empty())
}

/// Build a column from its `SHOW FULL COLUMNS` row
pub fn column_from_row(row: &ColumnRow, options: &IntrospectOptions) -> Result<Column> {
    if row.field.is_empty() || row.column_type.is_empty() {
        return Err(Error::SchemaAnalysisError(format!(
            "Column row is missing its name or type: {:?}",
            row
        )));
    }

    let (data_type, length, signed) = parse_column_type(&row.column_type);

    Ok(Column {
        name: row.field.clone(),
        data_type,
        length,
        nullable: row.null != "NO",
        default: if options.include_default {
            row.default.clone()
        } else {
            None
        },
        signed,
        auto_increment: row.extra == "auto_increment",
        comment: if options.include_comment {
            Some(row.comment.clone().unwrap_or_default())
        } else {
            None
        },
        rename_from: None,
        position: None,
    })
}

/// Build a table schema from the raw introspection rows
pub fn build_table_schema(
    status: &TableStatusRow,
    columns: &[ColumnRow],
    indexes: &[IndexRow],
    options: &IntrospectOptions,
) -> Result<TableSchema> {
    let mut table = TableSchema::new(
        &status.name,
        status.collation.as_deref().unwrap_or_default(),
        status.engine.as_deref().unwrap_or_default(),
    );

    table.auto_increment = match status.auto_increment {
        Some(_) if options.reset_auto_increment => Some(1),
        other => other,
    };

    for row in columns {
        table.add_column(column_from_row(row, options)?);
    }

    for row in indexes {
        if !table.columns.contains_key(&row.column_name) {
            tracing::warn!(
                table = %table.table_name,
                index = %row.key_name,
                column = %row.column_name,
                "Index references a column missing from the column listing"
            );
        }

        match table.indexes.get_mut(&row.key_name) {
            Some(index) => index.fields.push(row.column_name.clone()),
            None => table.add_index(Index::new(
                &row.key_name,
                !row.non_unique,
                vec![row.column_name.clone()],
            )),
        }
    }

    Ok(table)
}
