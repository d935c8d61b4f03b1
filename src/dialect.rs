//! SQL dialects and the capabilities the generator asks about.

use once_cell::sync::Lazy;
use regex::bytes::Regex;
use std::fmt;
use std::str::FromStr;

/// SQL dialect of the source database
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dialect {
    /// MySQL / MariaDB (backtick quoting, `SET FOREIGN_KEY_CHECKS`)
    #[default]
    MySql,
    /// PostgreSQL
    Postgres,
    /// SQLite (no foreign key enforcement by default)
    Sqlite,
    /// DuckDB embedded database
    DuckDb,
}

impl Dialect {
    pub const ALL: [Dialect; 4] = [Dialect::MySql, Dialect::Postgres, Dialect::Sqlite, Dialect::DuckDb];

    /// Whether foreign key checks can be switched off for the session.
    pub fn supports_foreign_key_toggle(self) -> bool {
        matches!(self, Dialect::MySql)
    }

    /// Whether backslash is an escape character inside string literals.
    pub fn uses_backslash_escapes(self) -> bool {
        matches!(self, Dialect::MySql)
    }

    /// Whether the engine enforces foreign keys at all.
    pub fn enforces_foreign_keys(self) -> bool {
        !matches!(self, Dialect::Sqlite)
    }

    /// Trailing options passed to every `createTable` call.
    pub fn table_options(self) -> &'static str {
        match self {
            Dialect::MySql => "ENGINE=InnoDB DEFAULT CHARSET=utf8",
            _ => "",
        }
    }

    /// The dialect whose engine ignores foreign keys, if any. Relation
    /// blocks are skipped at runtime on its connections.
    pub fn without_foreign_key_enforcement() -> Option<Dialect> {
        Self::ALL.into_iter().find(|d| !d.enforces_foreign_keys())
    }

    /// Driver name as reported by `CDbConnection::getDriverName()`.
    pub fn driver_name(self) -> &'static str {
        match self {
            Dialect::MySql => "mysql",
            Dialect::Postgres => "pgsql",
            Dialect::Sqlite => "sqlite",
            Dialect::DuckDb => "duckdb",
        }
    }
}

impl FromStr for Dialect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mysql" | "mariadb" => Ok(Dialect::MySql),
            "postgres" | "postgresql" | "pg" | "pgsql" => Ok(Dialect::Postgres),
            "sqlite" | "sqlite3" => Ok(Dialect::Sqlite),
            "duckdb" => Ok(Dialect::DuckDb),
            _ => Err(format!(
                "Unknown dialect: {}. Valid options: mysql, postgres, sqlite, duckdb",
                s
            )),
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dialect::MySql => write!(f, "mysql"),
            Dialect::Postgres => write!(f, "postgres"),
            Dialect::Sqlite => write!(f, "sqlite"),
            Dialect::DuckDb => write!(f, "duckdb"),
        }
    }
}

static POSTGRES_MARKERS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?im)^\s*(?:SET\s+client_encoding|COPY\s+\S+.*FROM\s+stdin|SELECT\s+pg_catalog\.)|PostgreSQL database dump").unwrap()
});

static SQLITE_MARKERS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?im)^\s*(?:PRAGMA\s+foreign_keys|BEGIN\s+TRANSACTION\s*;)|\bAUTOINCREMENT\b|sqlite_sequence").unwrap()
});

static MYSQL_MARKERS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)MySQL dump|MariaDB dump|/\*!\d+|\bENGINE\s*=|\bAUTO_INCREMENT\b|`").unwrap()
});

/// Guess the dialect of a SQL dump from its first few kilobytes.
///
/// MySQL markers win over everything else since mysqldump output is the
/// common case; unrecognised input falls back to MySQL.
pub fn detect_dialect(header: &[u8]) -> Dialect {
    if MYSQL_MARKERS_RE.is_match(header) {
        Dialect::MySql
    } else if POSTGRES_MARKERS_RE.is_match(header) {
        Dialect::Postgres
    } else if SQLITE_MARKERS_RE.is_match(header) {
        Dialect::Sqlite
    } else {
        Dialect::MySql
    }
}
