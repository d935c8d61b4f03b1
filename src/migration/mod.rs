//! Migration emission: one run from validated inputs to a written file.
//!
//! A run goes through these phases, and any failure ends it without a file:
//!
//! 1. validate the output directory (at construction) and the label
//! 2. list the selected tables
//! 3. generate fragments table by table
//! 4. render the class and write it atomically

mod name;
mod template;

pub use name::{validate_label, MigrationName, DEFAULT_LABEL};
pub use template::render_migration;

use crate::codegen::{CodeGenerator, GeneratorOptions};
use crate::error::{DumpError, Result};
use crate::filter::TableFilter;
use crate::provider::SchemaProvider;
use chrono::NaiveDateTime;
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// Outcome of a successful run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmitReport {
    /// Migration class name
    pub id: String,
    /// Written file
    pub path: PathBuf,
    /// Tables included, in output order
    pub tables: Vec<String>,
    /// Insert statements written
    pub rows: usize,
    /// Whether the migration adds foreign keys
    pub foreign_keys_emitted: bool,
}

type ProgressFn = Box<dyn Fn(usize, usize, &str)>;

/// Writes one migration per [`emit`](MigrationEmitter::emit) call into a
/// fixed directory
pub struct MigrationEmitter {
    output_dir: PathBuf,
    options: GeneratorOptions,
    timestamp: Option<NaiveDateTime>,
    progress_fn: Option<ProgressFn>,
}

impl MigrationEmitter {
    /// Fails with `InvalidOutputDirectory` unless `output_dir` is an
    /// existing directory.
    pub fn new(output_dir: impl Into<PathBuf>) -> Result<Self> {
        let output_dir = output_dir.into();
        if !output_dir.is_dir() {
            return Err(DumpError::InvalidOutputDirectory(output_dir));
        }
        Ok(Self {
            output_dir,
            options: GeneratorOptions::default(),
            timestamp: None,
            progress_fn: None,
        })
    }

    pub fn with_options(mut self, options: GeneratorOptions) -> Self {
        self.options = options;
        self
    }

    /// Fix the identifier timestamp instead of using the current time
    pub fn with_timestamp(mut self, timestamp: NaiveDateTime) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Called after each table with (done, total, table name)
    pub fn with_progress<F: Fn(usize, usize, &str) + 'static>(mut self, f: F) -> Self {
        self.progress_fn = Some(Box::new(f));
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    fn migration_name(&self, label: &str) -> Result<MigrationName> {
        match self.timestamp {
            Some(ts) => MigrationName::new(label, ts),
            None => MigrationName::now(label),
        }
    }

    /// Dump the tables `filter` selects from `provider` into a new migration.
    ///
    /// The label is checked before the provider is touched. Nothing is
    /// written unless every table was processed.
    pub fn emit(
        &self,
        provider: &dyn SchemaProvider,
        filter: &TableFilter,
        label: &str,
    ) -> Result<EmitReport> {
        let name = self.migration_name(label)?;
        debug!(id = %name, "migration name validated");

        let tables: Vec<_> = provider
            .list_tables(filter)?
            .into_iter()
            .filter(|t| filter.should_include(&t.name))
            .collect();
        info!(
            source = provider.descriptor(),
            dialect = %provider.dialect(),
            tables = tables.len(),
            "querying tables"
        );

        let mut generator = CodeGenerator::new(provider, self.options);
        for (i, table) in tables.iter().enumerate() {
            generator.process_table(table)?;
            if let Some(ref progress) = self.progress_fn {
                progress(i + 1, tables.len(), &table.name);
            }
        }
        let code = generator.finish();

        let path = self.output_dir.join(name.file_name());
        write_atomic(&path, &render_migration(&name, &code.up))?;
        info!(path = %path.display(), rows = code.rows, "migration written");

        Ok(EmitReport {
            id: name.id().to_string(),
            path,
            tables: code.tables,
            rows: code.rows,
            foreign_keys_emitted: code.foreign_keys_emitted,
        })
    }
}

/// Write `contents` to `path` via a temporary file in the same directory,
/// so the target either appears complete or not at all.
pub fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| DumpError::write(path, e))?;
    tmp.write_all(contents.as_bytes())
        .and_then(|_| tmp.flush())
        .map_err(|e| DumpError::write(path, e))?;
    tmp.persist(path).map_err(|e| DumpError::write(path, e.error))?;
    Ok(())
}
