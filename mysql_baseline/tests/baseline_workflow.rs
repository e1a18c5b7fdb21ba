//! Offline baseline round trip: save, reload, compare.

use pretty_assertions::assert_eq;
use tempfile::tempdir;

use mysql_baseline::schema::types::{Baseline, Column, Index, TableSchema};
use mysql_baseline::utils::naming::TablePrefix;
use mysql_baseline::{BaselineFile, Error, FixSqlGenerator, TableDiff};

fn users_v1() -> TableSchema {
    TableSchema::new("jc_users", "utf8mb4_general_ci", "InnoDB")
        .with_column(
            Column::new("id", "int")
                .length("10")
                .nullable(false)
                .unsigned()
                .auto_increment(true)
                .comment(""),
        )
        .with_column(Column::new("name", "varchar").length("64").nullable(false).default("").comment(""))
        .with_index(Index::primary(vec!["id".to_string()]))
}

fn users_v2() -> TableSchema {
    users_v1()
        .with_column(Column::new("email", "varchar").length("255").nullable(false).default("").comment("login"))
        .with_index(Index::new("uniq_email", true, vec!["email".to_string()]))
}

fn baseline(users: TableSchema) -> Baseline {
    let mut tables = Baseline::new();
    tables.insert("users".to_string(), users);
    tables
}

#[test]
fn reloaded_baseline_compares_clean() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("runtime/baseline/db_schema.json");

    BaselineFile::new(baseline(users_v1())).unwrap().save(&path).unwrap();
    let reloaded = BaselineFile::load(&path).unwrap().unwrap();

    assert!(TableDiff::compare(&reloaded.tables["users"], &users_v1()).is_empty());
}

#[test]
fn reloaded_baseline_drives_fix_sql() {
    let dir = tempdir().unwrap();
    let old_path = dir.path().join("old.json");
    let new_path = dir.path().join("new.json");

    BaselineFile::new(baseline(users_v1())).unwrap().save(&old_path).unwrap();
    BaselineFile::new(baseline(users_v2())).unwrap().save(&new_path).unwrap();

    let old = BaselineFile::load(&old_path).unwrap().unwrap().tables;
    let new = BaselineFile::load(&new_path).unwrap().unwrap().tables;

    let prefix = TablePrefix::new("jc_", "jc_");
    let generator = FixSqlGenerator::new(&prefix);

    let upgrade = generator.fix_sql(old.get("users"), new.get("users"), true);
    assert_eq!(
        upgrade,
        vec![
            "ALTER TABLE `jc_users` ADD `email` varchar(255) NOT NULL DEFAULT '' COMMENT 'login'".to_string(),
            "ALTER TABLE `jc_users` ADD UNIQUE `uniq_email` (`email`)".to_string(),
        ]
    );

    let downgrade = generator.fix_sql(new.get("users"), old.get("users"), true);
    assert_eq!(
        downgrade,
        vec![
            "ALTER TABLE `jc_users` DROP `email`".to_string(),
            "ALTER TABLE `jc_users` DROP INDEX `uniq_email`".to_string(),
        ]
    );

    assert!(generator.fix_sql(new.get("users"), old.get("users"), false).is_empty());
}

#[test]
fn corrupted_baseline_is_an_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("db_schema.json");
    std::fs::write(&path, "{\"version\": 1").unwrap();

    assert!(matches!(BaselineFile::load(&path), Err(Error::SerializationError(_))));
}
