//! SQL dump files as a schema source.
//!
//! The dump is read twice at most: once at open to build the schema from its
//! DDL statements, and once per scanned table to decode INSERT and COPY rows.

use super::SchemaProvider;
use crate::dialect::{detect_dialect, Dialect};
use crate::error::{DumpError, Result};
use crate::filter::TableFilter;
use crate::parser::mysql_insert::parse_insert_rows;
use crate::parser::postgres_copy::parse_copy_rows;
use crate::parser::{determine_buffer_size, Parser, StatementType};
use crate::schema::{IndexRow, Row, SchemaBuilder, Table, TableDefinition};
use ahash::AHashMap;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Bytes inspected for dialect detection
const DIALECT_SNIFF_SIZE: u64 = 64 * 1024;

/// Compression format detected from file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    None,
    Gzip,
    Bzip2,
    Xz,
    Zstd,
}

impl Compression {
    /// Detect compression format from file extension
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase());

        match ext.as_deref() {
            Some("gz" | "gzip") => Compression::Gzip,
            Some("bz2" | "bzip2") => Compression::Bzip2,
            Some("xz" | "lzma") => Compression::Xz,
            Some("zst" | "zstd") => Compression::Zstd,
            _ => Compression::None,
        }
    }

    /// Wrap a reader with the appropriate decompressor
    pub fn wrap_reader<'a>(&self, reader: Box<dyn Read + 'a>) -> io::Result<Box<dyn Read + 'a>> {
        Ok(match self {
            Compression::None => reader,
            Compression::Gzip => Box::new(flate2::read::GzDecoder::new(reader)),
            Compression::Bzip2 => Box::new(bzip2::read::BzDecoder::new(reader)),
            Compression::Xz => Box::new(xz2::read::XzDecoder::new(reader)),
            Compression::Zstd => Box::new(zstd::stream::read::Decoder::new(reader)?),
        })
    }
}

impl std::fmt::Display for Compression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Compression::None => write!(f, "none"),
            Compression::Gzip => write!(f, "gzip"),
            Compression::Bzip2 => write!(f, "bzip2"),
            Compression::Xz => write!(f, "xz"),
            Compression::Zstd => write!(f, "zstd"),
        }
    }
}

/// A SQL dump file opened as a read-only database
#[derive(Debug)]
pub struct DumpProvider {
    descriptor: String,
    path: PathBuf,
    compression: Compression,
    dialect: Dialect,
    tables: Vec<TableDefinition>,
    positions: AHashMap<String, usize>,
}

impl DumpProvider {
    /// Open a dump file and parse its schema.
    ///
    /// The dialect is detected from the file header unless given.
    pub fn open(descriptor: &str, path: &Path, dialect: Option<Dialect>) -> Result<Self> {
        if !path.is_file() {
            return Err(DumpError::connection(
                descriptor,
                format!("dump file does not exist: {}", path.display()),
            ));
        }

        let compression = Compression::from_path(path);
        let dialect = match dialect {
            Some(d) => d,
            None => sniff_dialect(path, compression)
                .map_err(|e| DumpError::connection(descriptor, e))?,
        };
        debug!(path = %path.display(), %compression, %dialect, "opening dump");

        let mut provider = Self {
            descriptor: descriptor.to_string(),
            path: path.to_path_buf(),
            compression,
            dialect,
            tables: Vec::new(),
            positions: AHashMap::new(),
        };
        provider
            .load_schema()
            .map_err(|e| DumpError::connection(descriptor, e))?;
        Ok(provider)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn compression(&self) -> Compression {
        self.compression
    }

    fn reader(&self) -> io::Result<Parser<Box<dyn Read>>> {
        let file = File::open(&self.path)?;
        let file_size = file.metadata()?.len();
        let reader = self.compression.wrap_reader(Box::new(file))?;
        Ok(Parser::new(reader, determine_buffer_size(file_size)))
    }

    fn load_schema(&mut self) -> io::Result<()> {
        let mut parser = self.reader()?;
        let mut builder = SchemaBuilder::new();

        while let Some(stmt) = parser.read_statement()? {
            let (stmt_type, _) = Parser::<&[u8]>::parse_statement(&stmt);
            if stmt_type == StatementType::Copy {
                parser.read_copy_data()?;
                continue;
            }
            if !stmt_type.is_schema() {
                continue;
            }

            let text = String::from_utf8_lossy(&stmt);
            match stmt_type {
                StatementType::CreateTable => {
                    builder.parse_create_table(&text);
                }
                StatementType::AlterTable => {
                    builder.parse_alter_table(&text);
                }
                StatementType::CreateIndex => {
                    builder.parse_create_index(&text);
                }
                _ => {}
            }
        }

        self.tables = builder.build();
        self.positions = self
            .tables
            .iter()
            .enumerate()
            .map(|(i, def)| (def.table.name.to_lowercase(), i))
            .collect();
        debug!(tables = self.tables.len(), "dump schema loaded");
        Ok(())
    }

    fn definition(&self, table: &str) -> Result<&TableDefinition> {
        self.positions
            .get(&table.to_lowercase())
            .map(|&i| &self.tables[i])
            .ok_or_else(|| DumpError::introspection(table, "table not found in dump"))
    }

    fn scan(&self, table: &Table, visit: &mut dyn FnMut(Row) -> Result<()>) -> anyhow::Result<()> {
        let mut parser = self.reader()?;

        while let Some(stmt) = parser.read_statement()? {
            let (stmt_type, name) = Parser::<&[u8]>::parse_statement(&stmt);
            match stmt_type {
                StatementType::Insert if name.eq_ignore_ascii_case(&table.name) => {
                    for row in parse_insert_rows(&stmt, table)? {
                        visit(row)?;
                    }
                }
                StatementType::Copy => {
                    let data = parser.read_copy_data()?;
                    if name.eq_ignore_ascii_case(&table.name) {
                        let header = String::from_utf8_lossy(&stmt);
                        for row in parse_copy_rows(&header, &data, table) {
                            visit(row)?;
                        }
                    }
                }
                _ => {}
            }
        }

        Ok(())
    }
}

fn sniff_dialect(path: &Path, compression: Compression) -> io::Result<Dialect> {
    let file = File::open(path)?;
    let mut reader = compression.wrap_reader(Box::new(file))?.take(DIALECT_SNIFF_SIZE);
    let mut header = Vec::new();
    reader.read_to_end(&mut header)?;
    Ok(detect_dialect(&header))
}

impl SchemaProvider for DumpProvider {
    fn dialect(&self) -> Dialect {
        self.dialect
    }

    fn descriptor(&self) -> &str {
        &self.descriptor
    }

    fn list_tables(&self, filter: &TableFilter) -> Result<Vec<Table>> {
        Ok(self
            .tables
            .iter()
            .filter(|def| filter.should_include(&def.table.name))
            .map(|def| def.table.clone())
            .collect())
    }

    fn raw_foreign_key_ddl(&self, table: &str) -> Result<String> {
        Ok(self.definition(table)?.ddl_text())
    }

    fn secondary_indexes(&self, table: &str) -> Result<Vec<IndexRow>> {
        Ok(self.definition(table)?.index_rows.clone())
    }

    fn scan_rows(&self, table: &Table, visit: &mut dyn FnMut(Row) -> Result<()>) -> Result<()> {
        // Errors raised by `visit` pass through untouched
        let mut visit_error = None;
        let mut forward = |row: Row| -> Result<()> {
            visit(row).map_err(|e| {
                visit_error = Some(e);
                DumpError::introspection(&table.name, "row visitor failed")
            })
        };

        match self.scan(table, &mut forward) {
            Ok(()) => Ok(()),
            Err(e) => Err(visit_error.unwrap_or_else(|| DumpError::introspection(&table.name, e))),
        }
    }
}
