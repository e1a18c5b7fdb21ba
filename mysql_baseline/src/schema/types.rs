//! Type definitions for MySQL schema objects

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Name MySQL reserves for the primary key index
pub const PRIMARY_KEY_NAME: &str = "PRIMARY";

/// Integer types whose display width carries no meaning
pub const INTEGER_TYPES: [&str; 4] = ["int", "tinyint", "smallint", "bigint"];

/// Snapshot of every tracked table, keyed by logical (unprefixed) table name
pub type Baseline = IndexMap<String, TableSchema>;

/// Represents a single MySQL table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSchema {
    /// Physical table name, prefix included
    pub table_name: String,
    /// Collation such as `utf8mb4_general_ci`
    pub charset: String,
    pub engine: String,
    /// Next auto-increment value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_increment: Option<u64>,
    #[serde(default)]
    pub columns: IndexMap<String, Column>,
    #[serde(default)]
    pub indexes: IndexMap<String, Index>,
}

impl TableSchema {
    /// Create an empty table
    pub fn new(table_name: &str, charset: &str, engine: &str) -> Self {
        Self {
            table_name: table_name.to_string(),
            charset: charset.to_string(),
            engine: engine.to_string(),
            auto_increment: None,
            columns: IndexMap::new(),
            indexes: IndexMap::new(),
        }
    }

    /// Add a column to the table, replacing any column with the same name
    pub fn add_column(&mut self, column: Column) {
        self.columns.insert(column.name.clone(), column);
    }

    /// Add an index to the table, replacing any index with the same name
    pub fn add_index(&mut self, index: Index) {
        self.indexes.insert(index.name.clone(), index);
    }

    /// Builder-style variant of [`TableSchema::add_column`]
    pub fn with_column(mut self, column: Column) -> Self {
        self.add_column(column);
        self
    }

    /// Builder-style variant of [`TableSchema::add_index`]
    pub fn with_index(mut self, index: Index) -> Self {
        self.add_index(index);
        self
    }

    /// Charset name of the table collation (`utf8mb4_general_ci` -> `utf8mb4`)
    pub fn charset_name(&self) -> &str {
        charset_name(&self.charset)
    }

    /// The column currently carrying AUTO_INCREMENT, if any
    pub fn auto_increment_column(&self) -> Option<&Column> {
        self.columns.values().find(|column| column.auto_increment)
    }

    /// Check the structural invariants of the table
    pub fn validate(&self) -> Result<()> {
        for (key, column) in &self.columns {
            if column.name.is_empty() || column.data_type.is_empty() {
                return Err(Error::ValidationError(format!(
                    "Column `{}` of table `{}` needs both a name and a type",
                    key, self.table_name
                )));
            }
            if key != &column.name {
                return Err(Error::ValidationError(format!(
                    "Column key `{}` does not match column name `{}`",
                    key, column.name
                )));
            }
        }

        for index in self.indexes.values() {
            index.validate()?;
            if let Some(missing) = index.fields.iter().find(|f| !self.columns.contains_key(*f)) {
                return Err(Error::ValidationError(format!(
                    "Index `{}` of table `{}` references unknown column `{}`",
                    index.name, self.table_name, missing
                )));
            }
        }

        Ok(())
    }
}

/// Charset token of a collation string: everything before the first `_`
pub fn charset_name(collation: &str) -> &str {
    collation.split('_').next().unwrap_or(collation)
}

/// Represents a MySQL column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    /// Base type, e.g. `int` or `varchar`
    #[serde(rename = "type")]
    pub data_type: String,
    /// Parenthesized type parameter, empty when the type has none
    #[serde(default)]
    pub length: String,
    pub nullable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    #[serde(default = "default_signed")]
    pub signed: bool,
    #[serde(default)]
    pub auto_increment: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    /// Name of an existing column this one replaces
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rename_from: Option<String>,
    /// Placement clause appended to ADD statements, e.g. ``AFTER `id` ``
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,
}

fn default_signed() -> bool {
    true
}

impl Column {
    /// Create a new nullable, signed column with the given name and type
    pub fn new(name: &str, data_type: &str) -> Self {
        Self {
            name: name.to_string(),
            data_type: data_type.to_string(),
            length: String::new(),
            nullable: true,
            default: None,
            signed: true,
            auto_increment: false,
            comment: None,
            rename_from: None,
            position: None,
        }
    }

    pub fn length(mut self, length: &str) -> Self {
        self.length = length.to_string();
        self
    }

    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    pub fn default(mut self, default: &str) -> Self {
        self.default = Some(default.to_string());
        self
    }

    pub fn unsigned(mut self) -> Self {
        self.signed = false;
        self
    }

    pub fn auto_increment(mut self, auto_increment: bool) -> Self {
        self.auto_increment = auto_increment;
        self
    }

    pub fn comment(mut self, comment: &str) -> Self {
        self.comment = Some(comment.to_string());
        self
    }

    pub fn rename_from(mut self, old_name: &str) -> Self {
        self.rename_from = Some(old_name.to_string());
        self
    }

    pub fn position(mut self, position: &str) -> Self {
        self.position = Some(position.to_string());
        self
    }

    /// Whether the type belongs to the integer family with a meaningless display width
    pub fn is_integer_type(&self) -> bool {
        INTEGER_TYPES.contains(&self.data_type.to_lowercase().as_str())
    }

    /// Compare the attributes that end up in the column definition
    ///
    /// Length is ignored when both sides are integer types. `rename_from` and
    /// `position` are placement hints, not attributes.
    pub fn same_definition(&self, other: &Column) -> bool {
        let ignore_length = self.is_integer_type() && other.is_integer_type();

        self.name == other.name
            && self.data_type == other.data_type
            && (ignore_length || self.length == other.length)
            && self.nullable == other.nullable
            && self.default == other.default
            && self.signed == other.signed
            && self.auto_increment == other.auto_increment
            && self.comment == other.comment
    }
}

/// Kind of a MySQL index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexKind {
    Primary,
    Unique,
    Index,
}

/// Represents a MySQL index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Index {
    pub name: String,
    pub kind: IndexKind,
    /// Indexed columns in index order
    pub fields: Vec<String>,
}

impl Index {
    /// Create an index; the name `PRIMARY` always yields the primary key
    pub fn new(name: &str, unique: bool, fields: Vec<String>) -> Self {
        let kind = if name == PRIMARY_KEY_NAME {
            IndexKind::Primary
        } else if unique {
            IndexKind::Unique
        } else {
            IndexKind::Index
        };

        Self {
            name: name.to_string(),
            kind,
            fields,
        }
    }

    /// Create the primary key over the given columns
    pub fn primary(fields: Vec<String>) -> Self {
        Self::new(PRIMARY_KEY_NAME, true, fields)
    }

    pub fn is_primary(&self) -> bool {
        self.kind == IndexKind::Primary
    }

    /// `kind == Primary` must hold exactly when the name is `PRIMARY`
    pub fn validate(&self) -> Result<()> {
        if (self.name == PRIMARY_KEY_NAME) != (self.kind == IndexKind::Primary) {
            return Err(Error::ValidationError(format!(
                "Index `{}` has kind {:?}; only `{}` may be the primary key",
                self.name, self.kind, PRIMARY_KEY_NAME
            )));
        }
        if self.fields.is_empty() {
            return Err(Error::ValidationError(format!(
                "Index `{}` has no columns",
                self.name
            )));
        }
        Ok(())
    }
}
