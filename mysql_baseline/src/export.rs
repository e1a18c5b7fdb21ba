//! Bulk INSERT export
//!
//! Renders table rows as one multi-row `INSERT` statement, optionally
//! preceded by a `TRUNCATE TABLE` line.

use async_trait::async_trait;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::utils::naming::{quote_identifier, quote_identifier_list, TablePrefix};

/// Placed between the exports of two tables in the insert file
pub const INSERT_SEPARATOR: &str = "\n-- --------------------------------------------------------\n\n";

/// Per-table export options, configured under `[insert_tables.<name>]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportOptions {
    /// Emit `TRUNCATE TABLE` before the insert
    #[serde(default)]
    pub truncate: bool,
    /// Use `INSERT IGNORE`
    #[serde(default)]
    pub ignore: bool,
    /// Rows fetched per round trip
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Raw SQL condition appended as `WHERE`
    #[serde(default)]
    pub filter: Option<String>,
}

fn default_batch_size() -> usize {
    100
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            truncate: false,
            ignore: false,
            batch_size: default_batch_size(),
            filter: None,
        }
    }
}

/// Rendered export of one table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertExport {
    pub sql: String,
    pub row_count: usize,
}

/// Escape a value for a single-quoted MySQL string literal
pub fn escape_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len() + 2);
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '\0' => escaped.push_str("\\0"),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\'' => escaped.push_str("\\'"),
            '"' => escaped.push_str("\\\""),
            '\x1a' => escaped.push_str("\\Z"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Render one value as a SQL literal, `NULL` for a missing value
pub fn sql_literal(value: Option<&str>) -> String {
    match value {
        Some(v) => format!("'{}'", escape_value(v)),
        None => "NULL".to_string(),
    }
}

/// Render raw bytes as a hexadecimal literal
///
/// The bytes are written as they are stored, no character set applies.
pub fn binary_literal(bytes: &[u8]) -> String {
    if bytes.is_empty() {
        return "''".to_string();
    }

    let mut literal = String::with_capacity(2 + bytes.len() * 2);
    literal.push_str("0x");
    for byte in bytes {
        literal.push_str(&format!("{:02X}", byte));
    }
    literal
}

/// Whether a column type stores raw bytes rather than text
pub fn is_binary_type(column_type: &str) -> bool {
    let base = column_type
        .split(|c: char| c == '(' || c.is_whitespace())
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase();

    matches!(
        base.as_str(),
        "binary" | "varbinary" | "tinyblob" | "blob" | "mediumblob" | "longblob"
    )
}

/// One value read from a table
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CellValue {
    Null,
    Text(String),
    Bytes(Vec<u8>),
}

impl CellValue {
    pub fn to_sql(&self) -> String {
        match self {
            CellValue::Null => sql_literal(None),
            CellValue::Text(text) => sql_literal(Some(text)),
            CellValue::Bytes(bytes) => binary_literal(bytes),
        }
    }
}

impl From<Option<String>> for CellValue {
    fn from(value: Option<String>) -> Self {
        value.map_or(CellValue::Null, CellValue::Text)
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

/// A column as the export reads it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportColumn {
    pub name: String,
    /// Read as raw bytes and written as a hex literal
    pub binary: bool,
    /// Part of the primary key
    pub primary_key: bool,
}

impl ExportColumn {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            binary: false,
            primary_key: false,
        }
    }

    pub fn binary(mut self) -> Self {
        self.binary = true;
        self
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }
}

/// Columns that give the pages of a table a total order
///
/// The primary key when there is one, otherwise every column. Rows that tie
/// on every column are identical, so their relative order does not matter.
pub fn page_order(columns: &[ExportColumn]) -> Vec<String> {
    let keys: Vec<String> = columns
        .iter()
        .filter(|c| c.primary_key)
        .map(|c| c.name.clone())
        .collect();

    if keys.is_empty() {
        columns.iter().map(|c| c.name.clone()).collect()
    } else {
        keys
    }
}

/// Accumulates rows into a single multi-row INSERT statement
pub struct InsertStatementBuilder {
    header: String,
    tuples: Vec<String>,
}

impl InsertStatementBuilder {
    pub fn new(table: &str, columns: &[String], options: &ExportOptions) -> Self {
        let table = quote_identifier(table);

        let mut header = String::new();
        if options.truncate {
            header.push_str(&format!("TRUNCATE TABLE {};\n", table));
        }
        header.push_str(&format!(
            "INSERT {}INTO {} ({}) VALUES \n",
            if options.ignore { "IGNORE " } else { "" },
            table,
            quote_identifier_list(columns)
        ));

        Self {
            header,
            tuples: Vec::new(),
        }
    }

    pub fn push_row(&mut self, row: &[CellValue]) {
        let values: Vec<String> = row.iter().map(CellValue::to_sql).collect();
        self.tuples.push(format!("({})", values.join(",")));
    }

    pub fn row_count(&self) -> usize {
        self.tuples.len()
    }

    /// Finish the statement, `None` when no row was pushed
    pub fn finish(self) -> Option<InsertExport> {
        if self.tuples.is_empty() {
            return None;
        }

        let row_count = self.tuples.len();
        let sql = format!("{}{};\n", self.header, self.tuples.join(",\n"));
        Some(InsertExport { sql, row_count })
    }
}

/// Render already fetched rows, `None` when there is nothing to export
pub fn export_insert_statements(
    table: &str,
    columns: &[String],
    rows: &[Vec<CellValue>],
    options: &ExportOptions,
) -> Option<InsertExport> {
    if columns.is_empty() || rows.is_empty() {
        return None;
    }

    let mut builder = InsertStatementBuilder::new(table, columns, options);
    for row in rows {
        builder.push_row(row);
    }
    builder.finish()
}

/// Source of table rows
#[async_trait]
pub trait RowSource: Send + Sync {
    /// Columns of a table in ordinal order
    async fn columns(&self, table: &str) -> Result<Vec<ExportColumn>>;

    /// One page of rows sorted by `order_by`
    ///
    /// Binary columns come back as [`CellValue::Bytes`], the others as text.
    async fn fetch_batch(
        &self,
        table: &str,
        columns: &[ExportColumn],
        filter: Option<&str>,
        order_by: &[String],
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Vec<CellValue>>>;
}

/// Export a whole table, paging the source `batch_size` rows at a time
pub async fn export_table<R: RowSource + ?Sized>(
    source: &R,
    table: &str,
    options: &ExportOptions,
) -> Result<Option<InsertExport>> {
    if options.batch_size == 0 {
        return Err(Error::ValidationError(format!(
            "batch_size for table {} must be greater than zero",
            table
        )));
    }

    let columns = source.columns(table).await?;
    if columns.is_empty() {
        tracing::warn!(table = %table, "Table has no columns, nothing to export");
        return Ok(None);
    }

    let names: Vec<String> = columns.iter().map(|c| c.name.clone()).collect();
    let order_by = page_order(&columns);
    let mut builder = InsertStatementBuilder::new(table, &names, options);
    let mut offset = 0;

    loop {
        let batch = source
            .fetch_batch(
                table,
                &columns,
                options.filter.as_deref(),
                &order_by,
                offset,
                options.batch_size,
            )
            .await?;

        for row in &batch {
            if row.len() != columns.len() {
                return Err(Error::ExportError(format!(
                    "Row of {} has {} values for {} columns",
                    table,
                    row.len(),
                    columns.len()
                )));
            }
            builder.push_row(row);
        }

        tracing::debug!(table = %table, offset, fetched = batch.len(), "Fetched export batch");

        if batch.len() < options.batch_size {
            break;
        }
        offset += batch.len();
    }

    tracing::info!(table = %table, rows = builder.row_count(), "Table exported");
    Ok(builder.finish())
}

/// Export every configured table and join the results
///
/// Tables that fail or hold no rows are logged and left out. Returns `None`
/// when nothing was exported.
pub async fn export_tables<R: RowSource + ?Sized>(
    source: &R,
    tables: &IndexMap<String, ExportOptions>,
    prefix: &TablePrefix,
) -> Option<String> {
    let mut exports = Vec::with_capacity(tables.len());

    for (table, options) in tables {
        let table_name = prefix.resolve(table);
        match export_table(source, &table_name, options).await {
            Ok(Some(export)) => exports.push(export.sql),
            Ok(None) => tracing::warn!(table = %table_name, "No rows to export"),
            Err(e) => tracing::warn!(table = %table_name, error = %e, "Failed to export table, skipping"),
        }
    }

    if exports.is_empty() {
        None
    } else {
        Some(exports.join(INSERT_SEPARATOR))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use std::sync::Mutex;

    fn unescape(value: &str) -> String {
        let mut out = String::new();
        let mut chars = value.chars();
        while let Some(c) = chars.next() {
            if c != '\\' {
                out.push(c);
                continue;
            }
            match chars.next() {
                Some('0') => out.push('\0'),
                Some('n') => out.push('\n'),
                Some('r') => out.push('\r'),
                Some('Z') => out.push('\x1a'),
                Some(other) => out.push(other),
                None => out.push('\\'),
            }
        }
        out
    }

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[rstest]
    #[case("plain", "plain")]
    #[case("it's", "it\\'s")]
    #[case("say \"hi\"", "say \\\"hi\\\"")]
    #[case("a\\b", "a\\\\b")]
    #[case("line\nbreak\r", "line\\nbreak\\r")]
    #[case("nul\0ctrl\x1a", "nul\\0ctrl\\Z")]
    #[case("O'Brien\n", "O\\'Brien\\n")]
    fn test_escape_value(#[case] raw: &str, #[case] escaped: &str) {
        assert_eq!(escape_value(raw), escaped);
        assert_eq!(unescape(escaped), raw);
    }

    #[test]
    fn test_binary_values_keep_their_bytes() {
        // not valid UTF-8, and holds a quote and a NUL
        let bytes = vec![0xFF, 0x00, 0x27, 0xC3];
        assert!(String::from_utf8(bytes.clone()).is_err());

        assert_eq!(binary_literal(&bytes), "0xFF0027C3");
        assert_eq!(CellValue::Bytes(bytes.clone()).to_sql(), "0xFF0027C3");
        assert_eq!(CellValue::Bytes(Vec::new()).to_sql(), "''");
        assert_eq!(CellValue::Null.to_sql(), sql_literal(None));
        assert_eq!(CellValue::from("O'Brien\n").to_sql(), sql_literal(Some("O'Brien\n")));

        let rows = vec![vec![CellValue::from("1"), CellValue::Bytes(bytes)]];
        let export = export_insert_statements("jc_files", &strings(&["id", "hash"]), &rows, &ExportOptions::default())
            .unwrap();
        assert_eq!(export.sql, "INSERT INTO `jc_files` (`id`,`hash`) VALUES \n('1',0xFF0027C3);\n");
    }

    #[rstest]
    #[case("varbinary(16)", true)]
    #[case("BINARY(4)", true)]
    #[case("longblob", true)]
    #[case("bit(1)", false)]
    #[case("varchar(255)", false)]
    #[case("text", false)]
    #[case("int(10) unsigned", false)]
    fn test_is_binary_type(#[case] column_type: &str, #[case] binary: bool) {
        assert_eq!(is_binary_type(column_type), binary);
    }

    #[test]
    fn test_page_order_prefers_primary_key() {
        let keyed = vec![
            ExportColumn::new("status"),
            ExportColumn::new("site_id").primary_key(),
            ExportColumn::new("user_id").primary_key(),
        ];
        assert_eq!(page_order(&keyed), strings(&["site_id", "user_id"]));

        let keyless = vec![ExportColumn::new("status"), ExportColumn::new("label")];
        assert_eq!(page_order(&keyless), strings(&["status", "label"]));
    }

    #[test]
    fn test_export_with_truncate() {
        let rows = vec![
            vec![CellValue::from("1"), CellValue::from("home")],
            vec![CellValue::from("2"), CellValue::Null],
        ];
        let options = ExportOptions {
            truncate: true,
            ..ExportOptions::default()
        };

        let export = export_insert_statements("jc_router", &strings(&["id", "path"]), &rows, &options).unwrap();

        assert_eq!(export.row_count, 2);
        assert_eq!(
            export.sql,
            "TRUNCATE TABLE `jc_router`;\nINSERT INTO `jc_router` (`id`,`path`) VALUES \n('1','home'),\n('2',NULL);\n"
        );
    }

    #[test]
    fn test_export_with_ignore() {
        let rows = vec![vec![CellValue::from("o'k")]];
        let options = ExportOptions {
            ignore: true,
            ..ExportOptions::default()
        };

        let export = export_insert_statements("jc_vip", &strings(&["name"]), &rows, &options).unwrap();
        assert_eq!(export.sql, "INSERT IGNORE INTO `jc_vip` (`name`) VALUES \n('o\\'k');\n");
    }

    #[test]
    fn test_nothing_to_export() {
        let options = ExportOptions::default();
        assert!(export_insert_statements("t", &strings(&["id"]), &[], &options).is_none());
        assert!(export_insert_statements("t", &[], &[vec![]], &options).is_none());
    }

    /// One recorded page request
    #[derive(Debug, Clone)]
    struct Page {
        offset: usize,
        limit: usize,
        filter: Option<String>,
        order_by: Vec<String>,
    }

    /// Serves `total` numbered rows and records each page request
    struct NumberedRows {
        total: usize,
        pages: Mutex<Vec<Page>>,
    }

    #[async_trait]
    impl RowSource for NumberedRows {
        async fn columns(&self, _table: &str) -> Result<Vec<ExportColumn>> {
            Ok(vec![
                ExportColumn::new("label"),
                ExportColumn::new("id").primary_key(),
            ])
        }

        async fn fetch_batch(
            &self,
            _table: &str,
            _columns: &[ExportColumn],
            filter: Option<&str>,
            order_by: &[String],
            offset: usize,
            limit: usize,
        ) -> Result<Vec<Vec<CellValue>>> {
            self.pages.lock().unwrap().push(Page {
                offset,
                limit,
                filter: filter.map(str::to_string),
                order_by: order_by.to_vec(),
            });

            Ok((offset..self.total.min(offset + limit))
                .map(|i| vec![CellValue::Text(format!("row {}", i)), CellValue::Text(i.to_string())])
                .collect())
        }
    }

    #[tokio::test]
    async fn test_export_table_pages_through_rows() {
        let source = NumberedRows {
            total: 5,
            pages: Mutex::new(Vec::new()),
        };
        let options = ExportOptions {
            batch_size: 2,
            filter: Some("id > 0".to_string()),
            ..ExportOptions::default()
        };

        let export = export_table(&source, "jc_items", &options).await.unwrap().unwrap();

        assert_eq!(export.row_count, 5);
        assert!(export.sql.ends_with("('row 4','4');\n"));

        let pages = source.pages.lock().unwrap().clone();
        let offsets: Vec<usize> = pages.iter().map(|p| p.offset).collect();
        assert_eq!(offsets, vec![0, 2, 4]);
        assert!(pages.iter().all(|p| p.limit == 2 && p.filter.as_deref() == Some("id > 0")));
        // every page sorts by the key, not by the leading column
        assert!(pages.iter().all(|p| p.order_by == strings(&["id"])));
    }

    #[tokio::test]
    async fn test_export_empty_table() {
        let source = NumberedRows {
            total: 0,
            pages: Mutex::new(Vec::new()),
        };

        let export = export_table(&source, "jc_items", &ExportOptions::default()).await.unwrap();
        assert!(export.is_none());
    }

    #[tokio::test]
    async fn test_export_tables_joins_with_separator() {
        let source = NumberedRows {
            total: 1,
            pages: Mutex::new(Vec::new()),
        };
        let mut tables = IndexMap::new();
        tables.insert("router".to_string(), ExportOptions::default());
        tables.insert(
            "vip".to_string(),
            ExportOptions {
                batch_size: 0,
                ..ExportOptions::default()
            },
        );
        tables.insert(
            "menu".to_string(),
            ExportOptions {
                ignore: true,
                ..ExportOptions::default()
            },
        );

        let sql = export_tables(&source, &tables, &TablePrefix::new("jc_", ""))
            .await
            .unwrap();

        assert_eq!(
            sql,
            format!(
                "INSERT INTO `jc_router` (`label`,`id`) VALUES \n('row 0','0');\n{}INSERT IGNORE INTO `jc_menu` (`label`,`id`) VALUES \n('row 0','0');\n",
                INSERT_SEPARATOR
            )
        );
    }

    #[tokio::test]
    async fn test_zero_batch_size_is_rejected() {
        let source = NumberedRows {
            total: 3,
            pages: Mutex::new(Vec::new()),
        };
        let options = ExportOptions {
            batch_size: 0,
            ..ExportOptions::default()
        };

        let result = export_table(&source, "jc_items", &options).await;
        assert!(matches!(result, Err(Error::ValidationError(_))));
    }
}
