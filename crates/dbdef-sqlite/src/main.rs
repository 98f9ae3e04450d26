//! dbdef CLI
//!
//! Command-line tool for reconciling SQLite tables with JSON table
//! definitions.

use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

use dbdef::prelude::*;
use dbdef_sqlite::SqliteDriver;

/// Declarative table definitions for SQLite.
#[derive(Parser)]
#[command(name = "dbdef")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Database URL (SQLite path or connection string).
    #[arg(short, long, env = "DATABASE_URL", default_value = "sqlite:dbdef.sqlite3")]
    database: String,

    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List tables.
    Tables,

    /// Print the shape of a table as JSON.
    Show {
        /// Table name.
        table: String,
    },

    /// Show the changes a definition file would make, without applying them.
    Plan {
        /// JSON table definition.
        file: PathBuf,
    },

    /// Bring a table in line with a definition file.
    Apply {
        /// JSON table definition.
        file: PathBuf,

        /// Drop columns and indexes missing from the definition.
        #[arg(long)]
        drop: bool,

        /// Fail instead of keeping columns and indexes that are not dropped.
        #[arg(long)]
        strict: bool,
    },

    /// Exit with an error unless the table contains the definition's shape.
    Check {
        /// JSON table definition.
        file: PathBuf,
    },

    /// Drop a table.
    Drop {
        /// Table name.
        table: String,
    },
}

fn load_definition(path: &Path) -> anyhow::Result<TableDef> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("Invalid table definition in {}", path.display()))
}

fn print_shape(shape: &TableShape) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(shape)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .without_time()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let driver = SqliteDriver::connect(&cli.database).await?;

    match cli.command {
        Commands::Tables => {
            for table in driver.get_all_tables().await? {
                println!("{table}");
            }
        }

        Commands::Show { table } => {
            let Some(def) = driver.get_table_def(&table).await? else {
                bail!("Table '{table}' does not exist");
            };
            print_shape(&def.shape())?;
        }

        Commands::Plan { file } => {
            let desired = load_definition(&file)?;
            let db = DbDef::new(driver);
            let executed = db.resume(desired).dry_run().await?;
            print!("{}", executed.plan());
            print_shape(&executed.serialize())?;
        }

        Commands::Apply { file, drop, strict } => {
            let mut desired = load_definition(&file)?;
            if drop {
                desired.options.set(DROP, true);
            }
            let mode = if strict {
                DropMode::Strict
            } else {
                DropMode::Skip
            };

            let db = DbDef::new(driver).drop_mode(mode);
            let executed = db.resume(desired).exec().await?;
            print!("{}", executed.plan());
            print_shape(&executed.serialize())?;
        }

        Commands::Check { file } => {
            let expected = load_definition(&file)?;
            let Some(actual) = driver.get_table_def(&expected.name).await? else {
                bail!("Table '{}' does not exist", expected.name);
            };

            let mismatches = actual.shape().mismatches(&expected.shape());
            if !mismatches.is_empty() {
                for mismatch in &mismatches {
                    println!("{mismatch}");
                }
                bail!(
                    "Table '{}' does not match {}",
                    expected.name,
                    file.display()
                );
            }
            info!(table = %expected.name, "Table matches definition");
        }

        Commands::Drop { table } => {
            driver.drop_table(&table).await?;
            info!(table = %table, "Dropped table");
        }
    }

    Ok(())
}
