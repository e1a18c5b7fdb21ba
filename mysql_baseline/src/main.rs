//! mysql-baseline CLI
//!
//! Command-line tool for checking a MySQL database against its baseline and
//! regenerating the baseline files.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};

use mysql_baseline::config::{self, Config};
use mysql_baseline::schema::types::Baseline;
use mysql_baseline::utils::logging;
use mysql_baseline::utils::naming::TablePrefix;
use mysql_baseline::{BaselineClient, BaselineFile, CheckReport, FixSqlGenerator};

/// Snapshot MySQL table structures and generate the SQL that reconciles drift.
#[derive(Parser)]
#[command(name = "mysql-baseline")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file.
    #[arg(short, long, default_value = "mysql-baseline.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compare the database with the baseline and print the fix SQL.
    Check {
        /// Regenerate the baseline when differences are found (y/n).
        #[arg(short, long)]
        generate: Option<String>,

        /// Keep checking when no baseline exists yet (y/n).
        #[arg(long)]
        continue_if_empty: Option<String>,
    },

    /// Regenerate the baseline and insert files.
    Snapshot,

    /// Compare two baseline files without touching a database.
    Compare {
        /// Baseline holding the tables to fix.
        left: PathBuf,

        /// Baseline holding the wanted structure.
        right: PathBuf,

        /// Also drop what only the left baseline has.
        #[arg(long)]
        strict: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Check {
            generate,
            continue_if_empty,
        } => {
            let config = load_config(&cli.config)?;
            let client = connect(config).await?;
            check(client, generate, continue_if_empty).await
        }
        Commands::Snapshot => {
            let config = load_config(&cli.config)?;
            let client = connect(config).await?;
            snapshot(&client, &Baseline::new()).await
        }
        Commands::Compare {
            left,
            right,
            strict,
        } => {
            let prefix = if cli.config.exists() {
                let config = load_config(&cli.config)?;
                config.naming.table_prefix()
            } else {
                logging::init_default()?;
                TablePrefix::default()
            };
            compare(&left, &right, strict, &prefix)
        }
    }
}

fn load_config(path: &Path) -> anyhow::Result<Config> {
    let path = path.to_string_lossy();
    let config = config::load_from_file(&path).with_context(|| format!("loading {}", path))?;
    logging::init_logging(&config.logging)?;
    Ok(config)
}

async fn connect(config: Config) -> anyhow::Result<BaselineClient> {
    let mut client = BaselineClient::new(config)
        .await
        .context("connecting to the database")?;
    client.register_models()?;
    Ok(client)
}

async fn check(
    client: BaselineClient,
    generate: Option<String>,
    continue_if_empty: Option<String>,
) -> anyhow::Result<()> {
    let baseline = match client.load_baseline()? {
        Some(file) => file.tables,
        None => Baseline::new(),
    };

    if baseline.is_empty() {
        let proceed = answer(
            continue_if_empty,
            "No baseline found. Continue checking? [y/N]",
        )?;
        if !proceed {
            println!("Check aborted");
            return Ok(());
        }
        println!("No baseline to compare with, skipping table comparison");
    }

    let report = client.check(&baseline).await?;
    print_report(&report);

    if !report.has_differences() {
        return Ok(());
    }

    println!();
    if answer(generate, "Differences found. Generate a new baseline? [y/N]")? {
        snapshot(&client, &report.live).await?;
    } else {
        println!("Baseline left unchanged");
    }

    Ok(())
}

async fn snapshot(client: &BaselineClient, cached: &Baseline) -> anyhow::Result<()> {
    let snapshot = client.snapshot(cached).await?;
    for failure in &snapshot.failures {
        println!("Skipped {}: {}", failure.table, failure.reason);
    }
    if snapshot.schemas.is_empty() {
        println!("No table structure to write");
    } else {
        println!(
            "Baseline written to {} ({} tables)",
            client.config().baseline.schema_path().display(),
            snapshot.schemas.len()
        );
    }

    match client.export_inserts().await? {
        Some(path) => println!("Insert statements written to {}", path.display()),
        None => println!("No insert statements to write"),
    }

    Ok(())
}

fn compare(left: &Path, right: &Path, strict: bool, prefix: &TablePrefix) -> anyhow::Result<()> {
    let left_tables = read_baseline(left)?;
    let right_tables = read_baseline(right)?;
    let generator = FixSqlGenerator::new(prefix);

    let mut tables: Vec<&String> = left_tables.keys().collect();
    tables.extend(right_tables.keys().filter(|t| !left_tables.contains_key(*t)));

    let mut pending = 0;
    for table in tables {
        let statements = generator.fix_sql(left_tables.get(table), right_tables.get(table), strict);
        if statements.is_empty() {
            continue;
        }
        pending += 1;
        println!("[{}]", table);
        for statement in statements {
            println!("{};", statement);
        }
    }

    if pending == 0 {
        println!("Baselines match");
    }
    Ok(())
}

fn read_baseline(path: &Path) -> anyhow::Result<Baseline> {
    match BaselineFile::load(path).with_context(|| format!("reading {}", path.display()))? {
        Some(file) => Ok(file.tables),
        None => bail!("baseline file {} does not exist", path.display()),
    }
}

fn print_report(report: &CheckReport) {
    println!("Check finished, {} tables need attention", report.pending_count());

    for failure in &report.failures {
        println!("Could not read {}: {}", failure.table, failure.reason);
    }

    print_list("Tables without a model", &report.no_model_tables);
    print_list("Tables removed from the database", &report.removed_tables);
    print_list("Tables added to the database", &report.added_tables);

    if report.fix_sql.is_empty() {
        println!("No table needs fixing");
    } else {
        println!("Fix SQL:");
        for (table, statements) in &report.fix_sql {
            println!("[{}]", table);
            for statement in statements {
                println!("{};", statement);
            }
        }
    }
}

fn print_list(title: &str, tables: &[String]) {
    if tables.is_empty() {
        return;
    }
    println!("{} ({}):", title, tables.len());
    for table in tables {
        println!("  {}", table);
    }
}

/// Resolve a y/n flag, prompting on stdin when it was not given
fn answer(flag: Option<String>, prompt: &str) -> anyhow::Result<bool> {
    let value = match flag {
        Some(value) => value,
        None => {
            print!("{} ", prompt);
            io::stdout().flush()?;
            let mut input = String::new();
            io::stdin().read_line(&mut input)?;
            input
        }
    };
    Ok(value.trim().eq_ignore_ascii_case("y"))
}
