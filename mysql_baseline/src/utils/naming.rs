//! Naming utilities for mysql_baseline
//!
//! Table prefix resolution and identifier quoting.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Matches `{{%name}}` (prefixed) and `{{name}}` (verbatim) table references
static TABLE_TEMPLATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{(%?)([^}]+)\}\}").expect("valid table template regex"));

/// Table-name prefix settings for one connection
///
/// `prefix` is the prefix every physical table carries. `default_prefix` is the
/// prefix model sources were written against; when the two differ, names that
/// start with the default prefix get it swapped for the real one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TablePrefix {
    pub prefix: String,
    pub default_prefix: String,
}

impl TablePrefix {
    pub fn new(prefix: &str, default_prefix: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
            default_prefix: default_prefix.to_string(),
        }
    }

    /// Resolve a logical table name into the physical one
    pub fn resolve(&self, table_name: &str) -> String {
        if table_name.is_empty() {
            return String::new();
        }

        let mut name = if table_name.contains("{{") {
            TABLE_TEMPLATE
                .replace_all(table_name, |caps: &regex::Captures| {
                    if caps[1].is_empty() {
                        caps[2].to_string()
                    } else {
                        format!("{}{}", self.prefix, &caps[2])
                    }
                })
                .into_owned()
        } else {
            table_name.to_string()
        };

        if !self.default_prefix.is_empty()
            && !self.prefix.is_empty()
            && self.default_prefix != self.prefix
            && name.starts_with(&self.default_prefix)
        {
            name = name.replacen(&self.default_prefix, &self.prefix, 1);
        }

        if self.prefix.is_empty() || name.starts_with(&self.prefix) {
            name
        } else {
            format!("{}{}", self.prefix, name)
        }
    }

    /// Strip the prefix from a physical table name
    pub fn strip<'a>(&self, table_name: &'a str) -> &'a str {
        if self.prefix.is_empty() {
            return table_name;
        }
        table_name.strip_prefix(self.prefix.as_str()).unwrap_or(table_name)
    }
}

/// Quote a MySQL identifier with backticks
pub fn quote_identifier(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// Quote every identifier and join them with commas
pub fn quote_identifier_list(names: &[String]) -> String {
    names
        .iter()
        .map(|name| quote_identifier(name))
        .collect::<Vec<_>>()
        .join(",")
}
