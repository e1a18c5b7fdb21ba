//! SQL fragments for columns, indexes and whole tables

use crate::schema::types::{Column, Index, IndexKind, TableSchema};
use crate::utils::naming::{quote_identifier, quote_identifier_list, TablePrefix};

/// Types that take the UNSIGNED qualifier besides the integer family
const UNSIGNED_CAPABLE: [&str; 3] = ["decimal", "float", "double"];

/// Render a column definition without its name
///
/// Attribute order is fixed:
/// `TYPE(LENGTH) [UNSIGNED] [NOT NULL] [DEFAULT '..'] [AUTO_INCREMENT] [COMMENT '..']`.
/// DEFAULT is rendered whenever a default is present, even an empty one.
pub fn column_fragment(column: &Column) -> String {
    let mut sql = column.data_type.clone();

    if !column.length.is_empty() {
        sql.push_str(&format!("({})", column.length));
    }

    let data_type = column.data_type.to_lowercase();
    if !column.signed
        && (data_type.contains("int") || UNSIGNED_CAPABLE.contains(&data_type.as_str()))
    {
        sql.push_str(" UNSIGNED");
    }

    if !column.nullable {
        sql.push_str(" NOT NULL");
    }

    if let Some(default) = &column.default {
        sql.push_str(&format!(" DEFAULT '{}'", default));
    }

    if column.auto_increment {
        sql.push_str(" AUTO_INCREMENT");
    }

    if let Some(comment) = column.comment.as_deref().filter(|c| !c.is_empty()) {
        sql.push_str(&format!(" COMMENT '{}'", comment));
    }

    sql
}

/// Render a column definition with AUTO_INCREMENT left out
pub fn column_fragment_without_auto_increment(column: &Column) -> String {
    if !column.auto_increment {
        return column_fragment(column);
    }
    let mut plain = column.clone();
    plain.auto_increment = false;
    column_fragment(&plain)
}

/// Render an index for use in `ALTER TABLE .. ADD`
pub fn index_fragment(index: &Index) -> String {
    let fields = quote_identifier_list(&index.fields);

    match index.kind {
        IndexKind::Index => format!("INDEX {} ({})", quote_identifier(&index.name), fields),
        IndexKind::Unique => format!("UNIQUE {} ({})", quote_identifier(&index.name), fields),
        IndexKind::Primary => format!("PRIMARY KEY ({})", fields),
    }
}

/// Render the index part that drops it in `ALTER TABLE .. DROP`
pub fn drop_index_fragment(index_name: &str, kind: IndexKind) -> String {
    match kind {
        IndexKind::Primary => "PRIMARY KEY".to_string(),
        IndexKind::Unique | IndexKind::Index => format!("INDEX {}", quote_identifier(index_name)),
    }
}

/// Generate SQL to create a table
pub fn create_table_sql(table: &TableSchema, prefix: &TablePrefix) -> String {
    let table_name = prefix.resolve(&table.table_name);
    let mut definitions = Vec::new();

    for column in table.columns.values() {
        definitions.push(format!(
            "  {} {}",
            quote_identifier(&column.name),
            column_fragment(column)
        ));
    }

    for index in table.indexes.values() {
        let fields = quote_identifier_list(&index.fields);
        definitions.push(match index.kind {
            IndexKind::Index => format!("  KEY {} ({})", quote_identifier(&index.name), fields),
            IndexKind::Unique => {
                format!("  UNIQUE KEY {} ({})", quote_identifier(&index.name), fields)
            }
            IndexKind::Primary => format!("  PRIMARY KEY ({})", fields),
        });
    }

    format!(
        "CREATE TABLE IF NOT EXISTS {} (\n{}\n) ENGINE={} DEFAULT CHARSET={}",
        quote_identifier(&table_name),
        definitions.join(",\n"),
        table.engine,
        table.charset_name()
    )
}

/// Generate SQL to drop a table
pub fn drop_table_sql(table_name: &str, prefix: &TablePrefix) -> String {
    format!("DROP TABLE IF EXISTS {}", quote_identifier(&prefix.resolve(table_name)))
}
