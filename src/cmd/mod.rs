mod dump;

use crate::config::ConfigOverrides;
use clap::builder::BoolishValueParser;
use clap::{ArgAction, CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use std::io;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "migration-dumper")]
#[command(version)]
#[command(about = "Dump a database schema and its data into a Yii migration class", long_about = None)]
pub struct Cli {
    /// Verbose diagnostics (-v debug, -vv trace); RUST_LOG takes precedence
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a migration that recreates the schema and reloads the data
    Dump {
        /// Migration label, appended to the timestamped class name
        #[arg(default_value = crate::migration::DEFAULT_LABEL)]
        label: String,

        /// Only dump tables starting with one of these prefixes (comma-separated)
        #[arg(long)]
        prefix: Option<String>,

        /// Connection name from the config file, or a descriptor
        /// (duckdb:<path>, dump:<path>, *.sql[.gz|.bz2|.xz|.zst], *.duckdb)
        #[arg(long, alias = "dbConnection", value_name = "NAME|DESCRIPTOR")]
        db_connection: Option<String>,

        /// Generate createTable, foreign key and index statements
        #[arg(long, alias = "createSchema", value_name = "1|0", value_parser = BoolishValueParser::new())]
        create_schema: Option<bool>,

        /// Generate one insert per row
        #[arg(long, alias = "insertData", value_name = "1|0", value_parser = BoolishValueParser::new())]
        insert_data: Option<bool>,

        /// Truncate each table before anything else
        #[arg(long, alias = "truncateTable", value_name = "1|0", value_parser = BoolishValueParser::new())]
        truncate_table: Option<bool>,

        /// Keep foreign key checks on (0 disables them around the migration on MySQL)
        #[arg(long, alias = "foreignKeyChecks", value_name = "1|0", value_parser = BoolishValueParser::new())]
        foreign_key_checks: Option<bool>,

        /// Skip the migration bookkeeping table
        #[arg(long, alias = "ignoreMigrationTable", value_name = "1|0", value_parser = BoolishValueParser::new())]
        ignore_migration_table: Option<bool>,

        /// Skip foreign keys and indexes when the migration runs on SQLite
        #[arg(long, alias = "sqliteChecks", value_name = "1|0", value_parser = BoolishValueParser::new())]
        sqlite_checks: Option<bool>,

        /// Output directory, as a path or a path alias (application.migrations)
        #[arg(long, alias = "migrationPath")]
        migration_path: Option<String>,

        /// SQL dialect of a dump source: mysql, postgres, sqlite (auto-detected if not specified)
        #[arg(short, long)]
        dialect: Option<String>,

        /// YAML config file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Show progress while processing tables
        #[arg(short, long)]
        progress: bool,

        /// Output a JSON summary
        #[arg(long)]
        json: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

pub fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Dump {
            label,
            prefix,
            db_connection,
            create_schema,
            insert_data,
            truncate_table,
            foreign_key_checks,
            ignore_migration_table,
            sqlite_checks,
            migration_path,
            dialect,
            config,
            progress,
            json,
        } => {
            let overrides = ConfigOverrides {
                prefix,
                db_connection,
                create_schema,
                insert_data,
                truncate_table,
                foreign_key_checks,
                ignore_migration_table,
                sqlite_checks,
                migration_path,
                dialect,
            };
            dump::run(label, config, overrides, progress, json)
        }
        Commands::Completions { shell } => {
            generate(
                shell,
                &mut Cli::command(),
                "migration-dumper",
                &mut io::stdout(),
            );
            Ok(())
        }
    }
}
