//! MySQL metadata and row queries
//!
//! Implements [`Introspector`] and [`RowSource`] over a [`DatabaseConnection`].
//! Metadata comes from `SHOW` statements whose text columns some servers
//! report as binary, so metadata values are decoded leniently. Exported
//! binary columns are read as raw bytes.

use async_trait::async_trait;
use sqlx::mysql::MySqlRow;
use sqlx::{ColumnIndex, Row};

use crate::db::connection::DatabaseConnection;
use crate::error::Result;
use crate::export::{escape_value, is_binary_type, CellValue, ExportColumn, RowSource};
use crate::schema::analyzer::Introspector;
use crate::schema::introspect::{ColumnRow, IndexRow, TableStatusRow};
use crate::utils::naming::{quote_identifier, quote_identifier_list};

#[async_trait]
impl Introspector for DatabaseConnection {
    async fn list_tables(&self) -> Result<Vec<String>> {
        let rows = sqlx::query("SHOW TABLES").fetch_all(self.pool()).await?;

        let mut tables = Vec::with_capacity(rows.len());
        for row in &rows {
            if let Some(name) = text(row, 0usize)? {
                tables.push(name);
            }
        }
        Ok(tables)
    }

    async fn table_status(&self, table: &str) -> Result<Option<TableStatusRow>> {
        let sql = format!("SHOW TABLE STATUS LIKE '{}'", like_literal(table));
        let rows = sqlx::query(&sql).fetch_all(self.pool()).await?;

        for row in &rows {
            let name = text(row, "Name")?.unwrap_or_default();
            if name != table {
                continue;
            }

            return Ok(Some(TableStatusRow {
                name,
                collation: text(row, "Collation")?,
                engine: text(row, "Engine")?,
                auto_increment: number(row, "Auto_increment")?,
            }));
        }

        Ok(None)
    }

    async fn columns(&self, table: &str) -> Result<Vec<ColumnRow>> {
        let sql = format!("SHOW FULL COLUMNS FROM {}", quote_identifier(table));
        let rows = sqlx::query(&sql).fetch_all(self.pool()).await?;

        rows.iter()
            .map(|row| -> Result<ColumnRow> {
                Ok(ColumnRow {
                    field: text(row, "Field")?.unwrap_or_default(),
                    column_type: text(row, "Type")?.unwrap_or_default(),
                    null: text(row, "Null")?.unwrap_or_default(),
                    default: text(row, "Default")?,
                    extra: text(row, "Extra")?.unwrap_or_default(),
                    comment: text(row, "Comment")?,
                })
            })
            .collect()
    }

    async fn indexes(&self, table: &str) -> Result<Vec<IndexRow>> {
        let sql = format!("SHOW INDEX FROM {}", quote_identifier(table));
        let rows = sqlx::query(&sql).fetch_all(self.pool()).await?;

        let mut indexes = Vec::with_capacity(rows.len());
        for row in &rows {
            let key_name = text(row, "Key_name")?.unwrap_or_default();

            // Functional key parts have no column
            let Some(column_name) = text(row, "Column_name")? else {
                tracing::warn!(table = %table, index = %key_name, "Skipping index part without a column");
                continue;
            };

            indexes.push(IndexRow {
                key_name,
                column_name,
                non_unique: number(row, "Non_unique")? != Some(0),
            });
        }
        Ok(indexes)
    }
}

#[async_trait]
impl RowSource for DatabaseConnection {
    async fn columns(&self, table: &str) -> Result<Vec<ExportColumn>> {
        let sql = format!("SHOW FULL COLUMNS FROM {}", quote_identifier(table));
        let rows = sqlx::query(&sql).fetch_all(self.pool()).await?;

        let mut columns = Vec::with_capacity(rows.len());
        for row in &rows {
            let Some(name) = text(row, "Field")? else {
                continue;
            };

            let mut column = ExportColumn::new(name);
            if is_binary_type(&text(row, "Type")?.unwrap_or_default()) {
                column = column.binary();
            }
            if text(row, "Key")?.as_deref() == Some("PRI") {
                column = column.primary_key();
            }
            columns.push(column);
        }
        Ok(columns)
    }

    async fn fetch_batch(
        &self,
        table: &str,
        columns: &[ExportColumn],
        filter: Option<&str>,
        order_by: &[String],
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Vec<CellValue>>> {
        let sql = select_batch_sql(table, columns, filter, order_by, offset, limit);
        let rows = sqlx::query(&sql).fetch_all(self.pool()).await?;

        rows.iter()
            .map(|row| {
                columns
                    .iter()
                    .enumerate()
                    .map(|(i, column)| -> Result<CellValue> {
                        if column.binary {
                            let bytes: Option<Vec<u8>> = row.try_get(i)?;
                            Ok(bytes.map_or(CellValue::Null, CellValue::Bytes))
                        } else {
                            Ok(CellValue::from(text(row, i)?))
                        }
                    })
                    .collect::<Result<Vec<CellValue>>>()
            })
            .collect()
    }
}

/// `SELECT` of one page of a table
///
/// Text columns are cast to CHAR, binary columns are read as stored.
fn select_batch_sql(
    table: &str,
    columns: &[ExportColumn],
    filter: Option<&str>,
    order_by: &[String],
    offset: usize,
    limit: usize,
) -> String {
    let projection: Vec<String> = columns
        .iter()
        .map(|c| {
            let name = quote_identifier(&c.name);
            if c.binary {
                name
            } else {
                format!("CAST({} AS CHAR) AS {}", name, name)
            }
        })
        .collect();

    let mut sql = format!("SELECT {} FROM {}", projection.join(", "), quote_identifier(table));

    if let Some(filter) = filter.map(str::trim).filter(|f| !f.is_empty()) {
        sql.push_str(&format!(" WHERE {}", filter));
    }

    // Pages must neither overlap nor skip rows
    if !order_by.is_empty() {
        sql.push_str(&format!(" ORDER BY {}", quote_identifier_list(order_by)));
    }

    sql.push_str(&format!(" LIMIT {} OFFSET {}", limit, offset));
    sql
}

/// Escape a table name for an exact `LIKE` match
fn like_literal(name: &str) -> String {
    escape_value(name).replace('%', "\\%").replace('_', "\\_")
}

/// Decode a text column that may arrive as a binary string
fn text<I>(row: &MySqlRow, index: I) -> Result<Option<String>>
where
    I: ColumnIndex<MySqlRow> + Copy,
{
    match row.try_get::<Option<String>, _>(index) {
        Ok(value) => Ok(value),
        Err(_) => {
            let bytes: Option<Vec<u8>> = row.try_get(index)?;
            Ok(bytes.map(|b| String::from_utf8_lossy(&b).into_owned()))
        }
    }
}

/// Decode a numeric column whatever its reported signedness
fn number<I>(row: &MySqlRow, index: I) -> Result<Option<u64>>
where
    I: ColumnIndex<MySqlRow> + Copy,
{
    if let Ok(value) = row.try_get::<Option<u64>, _>(index) {
        return Ok(value);
    }
    if let Ok(value) = row.try_get::<Option<i64>, _>(index) {
        return Ok(value.map(|n| n.max(0) as u64));
    }
    Ok(text(row, index)?.and_then(|s| s.trim().parse().ok()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn names(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn test_select_batch_sql() {
        let columns = vec![ExportColumn::new("id").primary_key(), ExportColumn::new("name")];
        let sql = select_batch_sql("jc_vip", &columns, Some("status = 1"), &names(&["id"]), 200, 100);
        assert_eq!(
            sql,
            "SELECT CAST(`id` AS CHAR) AS `id`, CAST(`name` AS CHAR) AS `name` FROM `jc_vip` WHERE status = 1 ORDER BY `id` LIMIT 100 OFFSET 200"
        );
    }

    #[test]
    fn test_select_batch_sql_orders_by_every_key_column() {
        let columns = vec![
            ExportColumn::new("status"),
            ExportColumn::new("site_id").primary_key(),
            ExportColumn::new("user_id").primary_key(),
        ];
        let sql = select_batch_sql("jc_member", &columns, None, &names(&["site_id", "user_id"]), 100, 100);
        assert_eq!(
            sql,
            "SELECT CAST(`status` AS CHAR) AS `status`, CAST(`site_id` AS CHAR) AS `site_id`, CAST(`user_id` AS CHAR) AS `user_id` FROM `jc_member` ORDER BY `site_id`,`user_id` LIMIT 100 OFFSET 100"
        );
    }

    #[test]
    fn test_select_batch_sql_reads_binary_columns_raw() {
        let columns = vec![ExportColumn::new("id"), ExportColumn::new("digest").binary()];
        let sql = select_batch_sql("jc_files", &columns, None, &names(&["id", "digest"]), 0, 10);
        assert_eq!(
            sql,
            "SELECT CAST(`id` AS CHAR) AS `id`, `digest` FROM `jc_files` ORDER BY `id`,`digest` LIMIT 10 OFFSET 0"
        );
    }

    #[test]
    fn test_select_batch_sql_ignores_blank_filter() {
        let columns = vec![ExportColumn::new("id")];
        let sql = select_batch_sql("jc_router", &columns, Some("  "), &names(&["id"]), 0, 10);
        assert_eq!(sql, "SELECT CAST(`id` AS CHAR) AS `id` FROM `jc_router` ORDER BY `id` LIMIT 10 OFFSET 0");
    }

    #[test]
    fn test_like_literal_matches_exactly() {
        assert_eq!(like_literal("jc_user's"), "jc\\_user\\'s");
        assert_eq!(like_literal("100%"), "100\\%");
    }
}
