//! Dump run configuration.
//!
//! Values come from three layers, highest first: command-line flags, a YAML
//! file given with `--config`, and the built-in defaults.
//!
//! ```yaml
//! prefix: "tbl_,app_"
//! db_connection: main
//! insert_data: false
//! migration_path: application.migrations
//! connections:
//!   main: duckdb:var/app.duckdb
//! aliases:
//!   application: protected
//! ```

use crate::codegen::GeneratorOptions;
use crate::filter::TableFilter;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Complete configuration of a dump run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DumpConfig {
    /// Comma-separated table name prefixes; empty selects every table
    pub prefix: String,
    /// Connection name from `connections`, or a descriptor
    #[serde(alias = "dbConnection")]
    pub db_connection: String,
    #[serde(alias = "createSchema")]
    pub create_schema: bool,
    #[serde(alias = "insertData")]
    pub insert_data: bool,
    #[serde(alias = "truncateTable")]
    pub truncate_table: bool,
    #[serde(alias = "foreignKeyChecks")]
    pub foreign_key_checks: bool,
    #[serde(alias = "ignoreMigrationTable")]
    pub ignore_migration_table: bool,
    #[serde(alias = "sqliteChecks")]
    pub sqlite_checks: bool,
    /// Output directory, as a path or a path alias
    #[serde(alias = "migrationPath")]
    pub migration_path: String,
    /// Bookkeeping table skipped by `ignore_migration_table`
    #[serde(alias = "migrationTable")]
    pub migration_table: String,
    /// Dialect override for dump sources
    pub dialect: Option<String>,
    /// Named connection descriptors
    pub connections: BTreeMap<String, String>,
    /// Path alias roots, e.g. `application: protected`
    pub aliases: BTreeMap<String, PathBuf>,
}

impl Default for DumpConfig {
    fn default() -> Self {
        Self {
            prefix: String::new(),
            db_connection: "db".to_string(),
            create_schema: true,
            insert_data: true,
            truncate_table: false,
            foreign_key_checks: true,
            ignore_migration_table: true,
            sqlite_checks: false,
            migration_path: "migrations".to_string(),
            migration_table: "migration".to_string(),
            dialect: None,
            connections: BTreeMap::new(),
            aliases: BTreeMap::new(),
        }
    }
}

/// Values given on the command line; `None` leaves the lower layer in place
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub prefix: Option<String>,
    pub db_connection: Option<String>,
    pub create_schema: Option<bool>,
    pub insert_data: Option<bool>,
    pub truncate_table: Option<bool>,
    pub foreign_key_checks: Option<bool>,
    pub ignore_migration_table: Option<bool>,
    pub sqlite_checks: Option<bool>,
    pub migration_path: Option<String>,
    pub dialect: Option<String>,
}

impl DumpConfig {
    /// Load configuration from a YAML file; missing keys keep their defaults
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: DumpConfig = serde_yaml_ng::from_str(&content)?;
        Ok(config)
    }

    /// Apply command-line values on top of this configuration
    pub fn merge(mut self, overrides: ConfigOverrides) -> Self {
        fn set<T>(target: &mut T, value: Option<T>) {
            if let Some(v) = value {
                *target = v;
            }
        }

        set(&mut self.prefix, overrides.prefix);
        set(&mut self.db_connection, overrides.db_connection);
        set(&mut self.create_schema, overrides.create_schema);
        set(&mut self.insert_data, overrides.insert_data);
        set(&mut self.truncate_table, overrides.truncate_table);
        set(&mut self.foreign_key_checks, overrides.foreign_key_checks);
        set(&mut self.ignore_migration_table, overrides.ignore_migration_table);
        set(&mut self.sqlite_checks, overrides.sqlite_checks);
        set(&mut self.migration_path, overrides.migration_path);
        if overrides.dialect.is_some() {
            self.dialect = overrides.dialect;
        }
        self
    }

    pub fn generator_options(&self) -> GeneratorOptions {
        GeneratorOptions {
            create_schema: self.create_schema,
            insert_data: self.insert_data,
            truncate_table: self.truncate_table,
            foreign_key_checks: self.foreign_key_checks,
            sqlite_checks: self.sqlite_checks,
        }
    }

    pub fn table_filter(&self) -> TableFilter {
        TableFilter::from_prefix_list(
            &self.prefix,
            self.ignore_migration_table,
            self.migration_table.clone(),
        )
    }

    /// Descriptor to connect to: the named connection if one exists,
    /// otherwise `db_connection` itself
    pub fn connection_descriptor(&self) -> &str {
        self.connections
            .get(&self.db_connection)
            .map(String::as_str)
            .unwrap_or(&self.db_connection)
    }

    /// Output directory with path aliases resolved.
    ///
    /// `application.migrations` becomes `<aliases.application>/migrations`
    /// when `application` is a known alias; anything else is a plain path.
    pub fn migration_dir(&self) -> PathBuf {
        resolve_path_alias(&self.migration_path, &self.aliases)
    }
}

/// Resolve a dotted path alias against known alias roots
pub fn resolve_path_alias(alias: &str, roots: &BTreeMap<String, PathBuf>) -> PathBuf {
    let mut segments = alias.split('.');
    let root = segments.next().unwrap_or_default();

    match roots.get(root) {
        Some(base) => segments.fold(base.clone(), |path, segment| path.join(segment)),
        None => PathBuf::from(alias),
    }
}
