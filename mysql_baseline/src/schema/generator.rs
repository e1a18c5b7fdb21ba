//! Fix-SQL generator
//!
//! This module turns the difference between two versions of a table into the
//! ordered `ALTER TABLE` statements that reshape the first into the second.

use indexmap::IndexMap;

use crate::schema::diff::TableDiff;
use crate::schema::fragment::{
    column_fragment, column_fragment_without_auto_increment, create_table_sql,
    drop_index_fragment, drop_table_sql, index_fragment,
};
use crate::schema::types::{Column, TableSchema};
use crate::utils::naming::{quote_identifier, TablePrefix};

/// Generates the statements that bring a table in line with a reference shape
pub struct FixSqlGenerator<'a> {
    prefix: &'a TablePrefix,
}

impl<'a> FixSqlGenerator<'a> {
    /// Create a new generator resolving table names through `prefix`
    pub fn new(prefix: &'a TablePrefix) -> Self {
        Self { prefix }
    }

    /// Generate the statements that turn `subject` into `target`
    ///
    /// A missing subject yields a CREATE TABLE for the target. A missing
    /// target yields nothing, or a DROP TABLE in strict mode.
    pub fn fix_sql(
        &self,
        subject: Option<&TableSchema>,
        target: Option<&TableSchema>,
        strict: bool,
    ) -> Vec<String> {
        match (subject, target) {
            (None, Some(target)) => vec![create_table_sql(target, self.prefix)],
            (Some(subject), None) if strict => {
                vec![drop_table_sql(&subject.table_name, self.prefix)]
            }
            (Some(subject), Some(target)) => {
                let diff = TableDiff::compare(subject, target);
                self.fix_sql_with_diff(subject, target, &diff, strict)
            }
            _ => Vec::new(),
        }
    }

    /// Generate the statements for an already computed diff
    ///
    /// `diff` must be `TableDiff::compare(subject, target)`: fields and indexes
    /// it reports as removed exist only in `target` and get added, those
    /// reported as added exist only in `subject` and are dropped in strict mode.
    pub fn fix_sql_with_diff(
        &self,
        subject: &TableSchema,
        target: &TableSchema,
        diff: &TableDiff,
        strict: bool,
    ) -> Vec<String> {
        // Compare physical names, a default-prefix name and its real-prefix
        // twin are the same table
        let subject_name = self.prefix.resolve(&subject.table_name);
        if diff.table_name_changed && subject_name != self.prefix.resolve(&target.table_name) {
            return vec![create_table_sql(target, self.prefix)];
        }

        let alter = format!("ALTER TABLE {}", quote_identifier(&subject_name));
        let mut statements = Vec::new();

        if diff.engine_changed {
            statements.push(format!("{} ENGINE = {}", alter, target.engine));
        }

        if diff.charset_changed {
            statements.push(format!("{} DEFAULT CHARSET = {}", alter, target.charset_name()));
        }

        // Columns of the subject as they stand after each emitted statement
        let mut working: IndexMap<String, Column> = subject.columns.clone();
        let mut relocated: Option<&Column> = None;

        for name in &diff.fields.removed {
            let Some(column) = target.columns.get(name) else {
                continue;
            };

            let renamed = column
                .rename_from
                .as_deref()
                .filter(|old| working.contains_key(*old));

            let fragment = if column.auto_increment {
                // Only one AUTO_INCREMENT column may exist at a time: strip it
                // from the current holder first, restore it on this column last
                relocated = Some(column);
                if let Some(current) = working
                    .values_mut()
                    .find(|c| c.auto_increment && Some(c.name.as_str()) != renamed)
                {
                    statements.push(format!(
                        "{} CHANGE {} {} {}",
                        alter,
                        quote_identifier(&current.name),
                        quote_identifier(&current.name),
                        column_fragment_without_auto_increment(current)
                    ));
                    current.auto_increment = false;
                }
                column_fragment_without_auto_increment(column)
            } else {
                column_fragment(column)
            };

            match renamed {
                Some(old_name) => {
                    statements.push(format!(
                        "{} CHANGE {} {} {}",
                        alter,
                        quote_identifier(old_name),
                        quote_identifier(&column.name),
                        fragment
                    ));
                    working.shift_remove(old_name);
                }
                None => {
                    let position = column
                        .position
                        .as_deref()
                        .map(|p| format!(" {}", p))
                        .unwrap_or_default();
                    statements.push(format!(
                        "{} ADD {} {}{}",
                        alter,
                        quote_identifier(&column.name),
                        fragment,
                        position
                    ));
                }
            }
            let mut added = column.clone();
            // Added without AUTO_INCREMENT, only the trailing restore sets it
            added.auto_increment = false;
            working.insert(column.name.clone(), added);
        }

        for name in &diff.fields.changed {
            if !working.contains_key(name) {
                continue;
            }
            if let Some(column) = target.columns.get(name) {
                statements.push(format!(
                    "{} CHANGE {} {} {}",
                    alter,
                    quote_identifier(name),
                    quote_identifier(name),
                    column_fragment(column)
                ));
            }
        }

        if strict {
            for name in &diff.fields.added {
                if working.contains_key(name) {
                    statements.push(format!("{} DROP {}", alter, quote_identifier(name)));
                }
            }
        }

        for name in &diff.indexes.removed {
            if let Some(index) = target.indexes.get(name) {
                statements.push(format!("{} ADD {}", alter, index_fragment(index)));
            }
        }

        for name in &diff.indexes.changed {
            if let (Some(old), Some(new)) = (subject.indexes.get(name), target.indexes.get(name)) {
                statements.push(format!(
                    "{} DROP {}, ADD {}",
                    alter,
                    drop_index_fragment(&old.name, old.kind),
                    index_fragment(new)
                ));
            }
        }

        if strict {
            for name in &diff.indexes.added {
                statements.push(format!("{} DROP INDEX {}", alter, quote_identifier(name)));
            }
        }

        if let Some(column) = relocated {
            statements.push(format!(
                "{} CHANGE {} {} {}",
                alter,
                quote_identifier(&column.name),
                quote_identifier(&column.name),
                column_fragment(column)
            ));
        }

        tracing::debug!(
            table = %subject_name,
            statements = statements.len(),
            "Generated fix SQL"
        );

        statements
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::types::Index;
    use pretty_assertions::assert_eq;

    fn id_column() -> Column {
        Column::new("id", "int")
            .length("11")
            .nullable(false)
            .unsigned()
            .auto_increment(true)
    }

    fn users() -> TableSchema {
        TableSchema::new("jc_users", "utf8mb4_general_ci", "InnoDB")
            .with_column(id_column())
            .with_column(Column::new("name", "varchar").length("64").nullable(false).default(""))
            .with_index(Index::primary(vec!["id".to_string()]))
    }

    fn prefix() -> TablePrefix {
        TablePrefix::new("jc_", "")
    }

    #[test]
    fn test_identical_tables_need_nothing() {
        let prefix = prefix();
        let generator = FixSqlGenerator::new(&prefix);
        assert!(generator.fix_sql(Some(&users()), Some(&users()), true).is_empty());
    }

    #[test]
    fn test_create_when_subject_missing() {
        let prefix = prefix();
        let generator = FixSqlGenerator::new(&prefix);

        let statements = generator.fix_sql(None, Some(&users()), false);
        assert_eq!(statements, vec![create_table_sql(&users(), &prefix)]);
    }

    #[test]
    fn test_drop_when_target_missing() {
        let prefix = prefix();
        let generator = FixSqlGenerator::new(&prefix);

        assert_eq!(
            generator.fix_sql(Some(&users()), None, true),
            vec!["DROP TABLE IF EXISTS `jc_users`".to_string()]
        );
        assert!(generator.fix_sql(Some(&users()), None, false).is_empty());
        assert!(generator.fix_sql(None, None, true).is_empty());
    }

    #[test]
    fn test_renamed_table_is_recreated() {
        let prefix = prefix();
        let generator = FixSqlGenerator::new(&prefix);
        let mut members = users();
        members.table_name = "jc_members".to_string();

        let statements = generator.fix_sql(Some(&users()), Some(&members), true);
        assert_eq!(statements, vec![create_table_sql(&members, &prefix)]);
    }

    #[test]
    fn test_default_prefix_table_is_altered() {
        let prefix = TablePrefix::new("ims_", "jc_");
        let generator = FixSqlGenerator::new(&prefix);

        let subject = TableSchema::new("jc_users", "utf8mb4_general_ci", "InnoDB").with_column(id_column());
        let target = TableSchema::new("ims_users", "utf8mb4_general_ci", "InnoDB")
            .with_column(id_column())
            .with_column(Column::new("email", "varchar").length("255"));

        assert_eq!(
            generator.fix_sql(Some(&subject), Some(&target), true),
            vec!["ALTER TABLE `ims_users` ADD `email` varchar(255)"]
        );
        assert!(generator.fix_sql(Some(&subject), Some(&subject), true).is_empty());
    }

    #[test]
    fn test_statement_order() {
        let prefix = prefix();
        let generator = FixSqlGenerator::new(&prefix);

        let subject = users()
            .with_column(Column::new("legacy", "varchar").length("16"))
            .with_index(Index::new("legacy", false, vec!["legacy".to_string()]));

        let mut target = users()
            .with_column(Column::new("email", "varchar").length("255").nullable(false).position("AFTER `name`"))
            .with_index(Index::new("email", true, vec!["email".to_string()]));
        target.engine = "MyISAM".to_string();
        target.charset = "utf8_general_ci".to_string();
        target.add_column(Column::new("name", "varchar").length("128").nullable(false).default(""));

        let statements = generator.fix_sql(Some(&subject), Some(&target), true);
        assert_eq!(
            statements,
            vec![
                "ALTER TABLE `jc_users` ENGINE = MyISAM",
                "ALTER TABLE `jc_users` DEFAULT CHARSET = utf8",
                "ALTER TABLE `jc_users` ADD `email` varchar(255) NOT NULL AFTER `name`",
                "ALTER TABLE `jc_users` CHANGE `name` `name` varchar(128) NOT NULL DEFAULT ''",
                "ALTER TABLE `jc_users` DROP `legacy`",
                "ALTER TABLE `jc_users` ADD UNIQUE `email` (`email`)",
                "ALTER TABLE `jc_users` DROP INDEX `legacy`",
            ]
        );
    }

    #[test]
    fn test_non_strict_is_additive() {
        let prefix = prefix();
        let generator = FixSqlGenerator::new(&prefix);

        let subject = users()
            .with_column(Column::new("legacy", "varchar").length("16"))
            .with_index(Index::new("legacy", false, vec!["legacy".to_string()]));
        let target = users().with_column(Column::new("email", "varchar").length("255"));

        let statements = generator.fix_sql(Some(&subject), Some(&target), false);
        assert_eq!(statements, vec!["ALTER TABLE `jc_users` ADD `email` varchar(255)"]);
    }

    #[test]
    fn test_changed_primary_key() {
        let prefix = prefix();
        let generator = FixSqlGenerator::new(&prefix);

        let target = users()
            .with_index(Index::primary(vec!["id".to_string(), "name".to_string()]))
            .with_index(Index::new("name", false, vec!["name".to_string()]));
        let subject = users().with_index(Index::new("name", true, vec!["name".to_string()]));

        let statements = generator.fix_sql(Some(&subject), Some(&target), true);
        assert_eq!(
            statements,
            vec![
                "ALTER TABLE `jc_users` DROP PRIMARY KEY, ADD PRIMARY KEY (`id`,`name`)",
                "ALTER TABLE `jc_users` DROP INDEX `name`, ADD INDEX `name` (`name`)",
            ]
        );
    }

    #[test]
    fn test_auto_increment_relocation() {
        let prefix = prefix();
        let generator = FixSqlGenerator::new(&prefix);

        let target = TableSchema::new("jc_users", "utf8mb4_general_ci", "InnoDB")
            .with_column(Column::new("id", "int").length("11").nullable(false).unsigned())
            .with_column(Column::new("id2", "bigint").length("20").nullable(false).unsigned().auto_increment(true))
            .with_column(Column::new("name", "varchar").length("64").nullable(false).default(""))
            .with_index(Index::primary(vec!["id2".to_string()]));

        let statements = generator.fix_sql(Some(&users()), Some(&target), true);
        assert_eq!(
            statements,
            vec![
                "ALTER TABLE `jc_users` CHANGE `id` `id` int(11) UNSIGNED NOT NULL",
                "ALTER TABLE `jc_users` ADD `id2` bigint(20) UNSIGNED NOT NULL",
                "ALTER TABLE `jc_users` CHANGE `id` `id` int(11) UNSIGNED NOT NULL",
                "ALTER TABLE `jc_users` DROP PRIMARY KEY, ADD PRIMARY KEY (`id2`)",
                "ALTER TABLE `jc_users` CHANGE `id2` `id2` bigint(20) UNSIGNED NOT NULL AUTO_INCREMENT",
            ]
        );

        let restores = statements.iter().filter(|s| s.contains("AUTO_INCREMENT")).count();
        assert_eq!(restores, 1);
        assert!(statements.last().unwrap().ends_with("AUTO_INCREMENT"));
    }

    #[test]
    fn test_auto_increment_holder_is_stripped_once() {
        let prefix = prefix();
        let generator = FixSqlGenerator::new(&prefix);

        let target = users()
            .with_column(Column::new("seq", "int").length("11").nullable(false).auto_increment(true))
            .with_column(Column::new("serial", "int").length("11").nullable(false).auto_increment(true));

        let statements = generator.fix_sql(Some(&users()), Some(&target), false);
        assert_eq!(
            statements,
            vec![
                "ALTER TABLE `jc_users` CHANGE `id` `id` int(11) UNSIGNED NOT NULL",
                "ALTER TABLE `jc_users` ADD `seq` int(11) NOT NULL",
                "ALTER TABLE `jc_users` ADD `serial` int(11) NOT NULL",
                "ALTER TABLE `jc_users` CHANGE `serial` `serial` int(11) NOT NULL AUTO_INCREMENT",
            ]
        );
    }

    #[test]
    fn test_rename_consumes_old_column() {
        let prefix = prefix();
        let generator = FixSqlGenerator::new(&prefix);

        let subject = users().with_column(Column::new("nick", "varchar").length("32"));
        let target = users().with_column(Column::new("nickname", "varchar").length("64").rename_from("nick"));

        let statements = generator.fix_sql(Some(&subject), Some(&target), true);
        assert_eq!(
            statements,
            vec!["ALTER TABLE `jc_users` CHANGE `nick` `nickname` varchar(64)"]
        );
    }

    #[test]
    fn test_rename_with_missing_source_adds() {
        let prefix = prefix();
        let generator = FixSqlGenerator::new(&prefix);

        let target = users().with_column(Column::new("nickname", "varchar").length("64").rename_from("nick"));

        let statements = generator.fix_sql(Some(&users()), Some(&target), true);
        assert_eq!(statements, vec!["ALTER TABLE `jc_users` ADD `nickname` varchar(64)"]);
    }

    #[test]
    fn test_subject_is_not_mutated() {
        let prefix = prefix();
        let generator = FixSqlGenerator::new(&prefix);

        let subject = users().with_column(Column::new("nick", "varchar").length("32"));
        let before = subject.clone();
        let target = users().with_column(Column::new("nickname", "varchar").length("64").rename_from("nick"));

        generator.fix_sql(Some(&subject), Some(&target), true);
        assert_eq!(subject, before);
    }
}
