//! Error types for a dump run.
//!
//! Every kind is fatal: a run either produces one complete migration file or
//! nothing at all.

use std::path::PathBuf;
use thiserror::Error;

/// Boxed underlying cause carried by the fatal error kinds.
pub type BoxedSource = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum DumpError {
    /// The migration output directory is missing (checked before any DB work)
    #[error("the migration directory does not exist: {}", .0.display())]
    InvalidOutputDirectory(PathBuf),

    /// The migration label does not match `^[A-Za-z_][A-Za-z0-9_]+$`
    #[error("invalid migration name '{0}'")]
    InvalidMigrationLabel(String),

    /// The source database could not be opened
    #[error("failed to connect to '{descriptor}': {source}")]
    ConnectionFailure {
        descriptor: String,
        #[source]
        source: BoxedSource,
    },

    /// A metadata or row query failed; aborts the whole batch
    #[error("failed to introspect table '{table}': {source}")]
    IntrospectionFailure {
        table: String,
        #[source]
        source: BoxedSource,
    },

    /// The migration file could not be written
    #[error("failed to write migration file {}: {source}", .path.display())]
    WriteFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl DumpError {
    pub fn connection(descriptor: impl Into<String>, source: impl Into<BoxedSource>) -> Self {
        DumpError::ConnectionFailure {
            descriptor: descriptor.into(),
            source: source.into(),
        }
    }

    pub fn introspection(table: impl Into<String>, source: impl Into<BoxedSource>) -> Self {
        DumpError::IntrospectionFailure {
            table: table.into(),
            source: source.into(),
        }
    }

    pub fn write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        DumpError::WriteFailure {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, DumpError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_subject() {
        let err = DumpError::InvalidMigrationLabel("1abc".to_string());
        assert_eq!(err.to_string(), "invalid migration name '1abc'");

        let err = DumpError::introspection("users", "query failed");
        assert_eq!(
            err.to_string(),
            "failed to introspect table 'users': query failed"
        );

        let err = DumpError::connection("duckdb:app.duckdb", "no such file");
        assert!(err.to_string().contains("duckdb:app.duckdb"));
    }

    #[test]
    fn test_write_failure_keeps_source() {
        use std::error::Error as _;

        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = DumpError::write("/tmp/out/m1.php", io);
        assert!(err.to_string().contains("/tmp/out/m1.php"));
        assert!(err.source().is_some());
    }
}
