//! Schema providers: the sources a migration is dumped from.
//!
//! A provider answers catalog questions (tables, foreign keys, secondary
//! indexes) and streams table rows. Three are supplied:
//! - [`DumpProvider`] reads a SQL dump file as if it were a database
//! - [`DuckDbProvider`] introspects a DuckDB database file
//! - [`MemoryProvider`] serves in-memory tables, mainly for tests

mod dump;
mod duckdb;
mod memory;

pub use self::duckdb::DuckDbProvider;
pub use dump::{Compression, DumpProvider};
pub use memory::{foreign_key, CallCounts, MemoryProvider};

use crate::dialect::Dialect;
use crate::error::{DumpError, Result};
use crate::filter::TableFilter;
use crate::schema::{parse_foreign_keys, ForeignKeyMap, IndexRow, Row, Table};
use std::fmt;
use std::path::{Path, PathBuf};

/// Catalog and row access for one source database connection.
pub trait SchemaProvider {
    /// Dialect of the source, queried once per run
    fn dialect(&self) -> Dialect;

    /// Connection descriptor as given by the user
    fn descriptor(&self) -> &str;

    /// Tables passing `filter`, in the source's catalog order
    fn list_tables(&self, filter: &TableFilter) -> Result<Vec<Table>>;

    /// `SHOW CREATE TABLE` style DDL text for a table
    fn raw_foreign_key_ddl(&self, table: &str) -> Result<String>;

    /// Foreign keys of a table, by constrained column in discovery order
    fn foreign_keys(&self, table: &str) -> Result<ForeignKeyMap> {
        let ddl = self.raw_foreign_key_ddl(table)?;
        Ok(parse_foreign_keys(&ddl).into_iter().collect())
    }

    /// Secondary index rows (primary key excluded), one per indexed column
    fn secondary_indexes(&self, table: &str) -> Result<Vec<IndexRow>>;

    /// Stream every row of `table` to `visit`, in the source's natural order.
    ///
    /// The scan is single-pass; an error from `visit` stops it and is
    /// returned unchanged.
    fn scan_rows(&self, table: &Table, visit: &mut dyn FnMut(Row) -> Result<()>) -> Result<()>;
}

/// Kind of source a connection descriptor points at
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceKind {
    /// SQL dump file, optionally compressed
    Dump(PathBuf),
    /// DuckDB database file
    DuckDb(PathBuf),
}

impl SourceKind {
    /// Classify a descriptor: `duckdb:<path>`, `dump:<path>`, or a bare path
    /// recognised by its extension.
    pub fn parse(descriptor: &str) -> Option<Self> {
        if let Some(path) = descriptor.strip_prefix("duckdb:") {
            return Some(SourceKind::DuckDb(PathBuf::from(path)));
        }
        if let Some(path) = descriptor.strip_prefix("dump:") {
            return Some(SourceKind::Dump(PathBuf::from(path)));
        }

        let path = Path::new(descriptor);
        if is_duckdb_path(path) {
            Some(SourceKind::DuckDb(path.to_path_buf()))
        } else if is_dump_path(path) {
            Some(SourceKind::Dump(path.to_path_buf()))
        } else {
            None
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            SourceKind::Dump(p) | SourceKind::DuckDb(p) => p,
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::Dump(p) => write!(f, "dump:{}", p.display()),
            SourceKind::DuckDb(p) => write!(f, "duckdb:{}", p.display()),
        }
    }
}

fn is_duckdb_path(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()).map(|e| e.to_lowercase()).as_deref(),
        Some("duckdb" | "ddb" | "db")
    )
}

fn is_dump_path(path: &Path) -> bool {
    let inner = match Compression::from_path(path) {
        Compression::None => path.to_path_buf(),
        _ => path.with_extension(""),
    };
    inner
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("sql"))
}

/// Open the source a descriptor points at.
///
/// `dialect` overrides auto-detection for dump files and is ignored for
/// DuckDB sources.
pub fn open(descriptor: &str, dialect: Option<Dialect>) -> Result<Box<dyn SchemaProvider>> {
    let kind = SourceKind::parse(descriptor).ok_or_else(|| {
        DumpError::connection(
            descriptor,
            "unrecognised connection (expected duckdb:<path>, dump:<path>, *.sql[.gz|.bz2|.xz|.zst] or *.duckdb)",
        )
    })?;

    match kind {
        SourceKind::Dump(path) => {
            let provider = DumpProvider::open(descriptor, &path, dialect)?;
            Ok(Box::new(provider))
        }
        SourceKind::DuckDb(path) => {
            let provider = DuckDbProvider::open(descriptor, &path)?;
            Ok(Box::new(provider))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_kind_prefixes() {
        assert_eq!(
            SourceKind::parse("duckdb:data/app.bin"),
            Some(SourceKind::DuckDb(PathBuf::from("data/app.bin")))
        );
        assert_eq!(
            SourceKind::parse("dump:backup.txt"),
            Some(SourceKind::Dump(PathBuf::from("backup.txt")))
        );
    }

    #[test]
    fn test_source_kind_extensions() {
        assert!(matches!(SourceKind::parse("app.duckdb"), Some(SourceKind::DuckDb(_))));
        assert!(matches!(SourceKind::parse("dump.sql"), Some(SourceKind::Dump(_))));
        assert!(matches!(SourceKind::parse("dump.SQL.gz"), Some(SourceKind::Dump(_))));
        assert!(matches!(SourceKind::parse("dump.sql.zst"), Some(SourceKind::Dump(_))));
        assert_eq!(SourceKind::parse("db"), None);
        assert_eq!(SourceKind::parse("archive.tar.gz"), None);
    }

    #[test]
    fn test_open_unknown_descriptor_is_connection_failure() {
        match open("db", None) {
            Err(DumpError::ConnectionFailure { descriptor, .. }) => assert_eq!(descriptor, "db"),
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("expected a connection failure"),
        }
    }

    #[test]
    fn test_open_missing_dump_is_connection_failure() {
        let err = open("dump:/nonexistent/dir/file.sql", None).err();
        assert!(matches!(err, Some(DumpError::ConnectionFailure { .. })));
    }
}
