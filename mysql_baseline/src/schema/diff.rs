//! Schema difference calculator
//!
//! This module compares two table schemas and classifies their differences.
//!
//! Direction matters: `TableDiff::compare(reference, baseline)` reports as
//! *added* what only `reference` has and as *removed* what only `baseline`
//! has. The fix-SQL generator relies on this to decide between ADD and DROP.

use indexmap::IndexMap;
use serde::Serialize;

use crate::schema::types::TableSchema;

/// Names classified by a comparison, in deterministic order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DiffSet {
    /// Present only on the reference side, in reference order
    pub added: Vec<String>,
    /// Present only on the baseline side, in baseline order
    pub removed: Vec<String>,
    /// Present on both sides with different definitions, in reference order
    pub changed: Vec<String>,
}

impl DiffSet {
    fn between<T>(
        reference: &IndexMap<String, T>,
        baseline: &IndexMap<String, T>,
        same: impl Fn(&T, &T) -> bool,
    ) -> Self {
        let added = reference
            .keys()
            .filter(|name| !baseline.contains_key(*name))
            .cloned()
            .collect();

        let removed = baseline
            .keys()
            .filter(|name| !reference.contains_key(*name))
            .cloned()
            .collect();

        let changed = reference
            .iter()
            .filter_map(|(name, left)| match baseline.get(name) {
                Some(right) if !same(left, right) => Some(name.clone()),
                _ => None,
            })
            .collect();

        Self {
            added,
            removed,
            changed,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.changed.is_empty()
    }
}

/// Represents the differences between two versions of one table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TableDiff {
    pub table_name_changed: bool,
    pub engine_changed: bool,
    pub charset_changed: bool,
    pub fields: DiffSet,
    pub indexes: DiffSet,
}

impl TableDiff {
    /// Compare `reference` (the schema being checked) against `baseline`
    pub fn compare(reference: &TableSchema, baseline: &TableSchema) -> Self {
        Self {
            table_name_changed: reference.table_name != baseline.table_name,
            engine_changed: reference.engine != baseline.engine,
            charset_changed: reference.charset != baseline.charset,
            fields: DiffSet::between(&reference.columns, &baseline.columns, |a, b| {
                a.same_definition(b)
            }),
            indexes: DiffSet::between(&reference.indexes, &baseline.indexes, |a, b| a == b),
        }
    }

    /// Check if the diff is empty (no changes needed)
    pub fn is_empty(&self) -> bool {
        !self.table_name_changed
            && !self.engine_changed
            && !self.charset_changed
            && self.fields.is_empty()
            && self.indexes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::types::{Column, Index};
    use pretty_assertions::assert_eq;

    fn users() -> TableSchema {
        TableSchema::new("jc_users", "utf8mb4_general_ci", "InnoDB")
            .with_column(Column::new("id", "int").length("11").nullable(false).unsigned().auto_increment(true))
            .with_column(Column::new("name", "varchar").length("64").nullable(false).default(""))
            .with_column(Column::new("age", "tinyint").length("3").default("0"))
            .with_index(Index::primary(vec!["id".to_string()]))
            .with_index(Index::new("name_age", false, vec!["name".to_string(), "age".to_string()]))
    }

    #[test]
    fn test_compare_identical_is_empty() {
        let diff = TableDiff::compare(&users(), &users());
        assert!(diff.is_empty());
        assert_eq!(diff, TableDiff::default());
    }

    #[test]
    fn test_integer_display_width_is_ignored() {
        let mut wider = users();
        wider.add_column(Column::new("age", "tinyint").length("4").default("0"));

        let diff = TableDiff::compare(&users(), &wider);
        assert!(diff.fields.changed.is_empty());
    }

    #[test]
    fn test_varchar_length_is_compared() {
        let mut wider = users();
        wider.add_column(Column::new("name", "varchar").length("128").nullable(false).default(""));

        let diff = TableDiff::compare(&users(), &wider);
        assert_eq!(diff.fields.changed, vec!["name".to_string()]);
    }

    #[test]
    fn test_direction_of_added_and_removed() {
        let extended = users().with_column(Column::new("email", "varchar").length("255"));

        let forward = TableDiff::compare(&extended, &users());
        assert_eq!(forward.fields.added, vec!["email".to_string()]);
        assert!(forward.fields.removed.is_empty());

        let backward = TableDiff::compare(&users(), &extended);
        assert_eq!(backward.fields.removed, vec!["email".to_string()]);
        assert!(backward.fields.added.is_empty());
    }

    #[test]
    fn test_default_presence_is_a_change() {
        let mut without_default = users();
        without_default.add_column(Column::new("name", "varchar").length("64").nullable(false));

        let diff = TableDiff::compare(&users(), &without_default);
        assert_eq!(diff.fields.changed, vec!["name".to_string()]);
    }

    #[test]
    fn test_index_field_order_matters() {
        let mut reordered = users();
        reordered.add_index(Index::new("name_age", false, vec!["age".to_string(), "name".to_string()]));

        let diff = TableDiff::compare(&users(), &reordered);
        assert_eq!(diff.indexes.changed, vec!["name_age".to_string()]);
        assert!(diff.fields.is_empty());
    }

    #[test]
    fn test_table_level_flags() {
        let mut other = users();
        other.engine = "MyISAM".to_string();
        other.charset = "latin1_swedish_ci".to_string();
        other.table_name = "jc_members".to_string();

        let diff = TableDiff::compare(&users(), &other);
        assert!(diff.engine_changed);
        assert!(diff.charset_changed);
        assert!(diff.table_name_changed);
        assert!(diff.fields.is_empty());
    }
}
