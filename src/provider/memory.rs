//! In-memory schema source.

use super::SchemaProvider;
use crate::dialect::Dialect;
use crate::error::{DumpError, Result};
use crate::filter::TableFilter;
use crate::schema::{ForeignKey, ForeignKeyMap, IndexRow, Row, Table};
use std::cell::Cell;

/// Number of provider calls per operation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub list_tables: usize,
    pub raw_foreign_key_ddl: usize,
    pub foreign_keys: usize,
    pub secondary_indexes: usize,
    pub scan_rows: usize,
}

impl CallCounts {
    pub fn total(&self) -> usize {
        self.list_tables
            + self.raw_foreign_key_ddl
            + self.foreign_keys
            + self.secondary_indexes
            + self.scan_rows
    }
}

#[derive(Debug, Clone)]
struct MemoryTable {
    table: Table,
    indexes: Vec<IndexRow>,
    rows: Vec<Row>,
    ddl: String,
}

/// Tables, indexes and rows held in memory, in insertion order
#[derive(Debug, Default)]
pub struct MemoryProvider {
    dialect: Dialect,
    tables: Vec<MemoryTable>,
    failing_table: Option<String>,
    calls: Cell<CallCounts>,
}

impl MemoryProvider {
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            ..Self::default()
        }
    }

    /// Add a table; its `foreign_keys` are served as structured metadata
    pub fn with_table(mut self, table: Table) -> Self {
        self.tables.push(MemoryTable {
            table,
            indexes: Vec::new(),
            rows: Vec::new(),
            ddl: String::new(),
        });
        self
    }

    /// Attach raw index rows to the most recently added table
    pub fn with_indexes(mut self, rows: Vec<IndexRow>) -> Self {
        if let Some(last) = self.tables.last_mut() {
            last.indexes.extend(rows);
        }
        self
    }

    /// Attach data rows to the most recently added table
    pub fn with_rows(mut self, rows: Vec<Row>) -> Self {
        if let Some(last) = self.tables.last_mut() {
            last.rows.extend(rows);
        }
        self
    }

    /// Attach `SHOW CREATE TABLE` text to the most recently added table
    pub fn with_ddl(mut self, ddl: impl Into<String>) -> Self {
        if let Some(last) = self.tables.last_mut() {
            last.ddl = ddl.into();
        }
        self
    }

    /// Make every per-table query for `table` fail
    pub fn failing_on(mut self, table: impl Into<String>) -> Self {
        self.failing_table = Some(table.into());
        self
    }

    /// Calls made so far
    pub fn calls(&self) -> CallCounts {
        self.calls.get()
    }

    fn record(&self, f: impl FnOnce(&mut CallCounts)) {
        let mut counts = self.calls.get();
        f(&mut counts);
        self.calls.set(counts);
    }

    fn get(&self, table: &str) -> Result<&MemoryTable> {
        if self.failing_table.as_deref() == Some(table) {
            return Err(DumpError::introspection(table, "simulated query failure"));
        }
        self.tables
            .iter()
            .find(|t| t.table.name == table)
            .ok_or_else(|| DumpError::introspection(table, "no such table"))
    }
}

impl SchemaProvider for MemoryProvider {
    fn dialect(&self) -> Dialect {
        self.dialect
    }

    fn descriptor(&self) -> &str {
        "memory"
    }

    fn list_tables(&self, filter: &TableFilter) -> Result<Vec<Table>> {
        self.record(|c| c.list_tables += 1);
        Ok(self
            .tables
            .iter()
            .filter(|t| filter.should_include(&t.table.name))
            .map(|t| t.table.clone())
            .collect())
    }

    fn raw_foreign_key_ddl(&self, table: &str) -> Result<String> {
        self.record(|c| c.raw_foreign_key_ddl += 1);
        Ok(self.get(table)?.ddl.clone())
    }

    fn foreign_keys(&self, table: &str) -> Result<ForeignKeyMap> {
        self.record(|c| c.foreign_keys += 1);
        let entry = self.get(table)?;
        let mut map = entry.table.foreign_keys.clone();
        if !entry.ddl.is_empty() {
            map.extend(crate::schema::parse_foreign_keys(&entry.ddl));
        }
        Ok(map)
    }

    fn secondary_indexes(&self, table: &str) -> Result<Vec<IndexRow>> {
        self.record(|c| c.secondary_indexes += 1);
        Ok(self.get(table)?.indexes.clone())
    }

    fn scan_rows(&self, table: &Table, visit: &mut dyn FnMut(Row) -> Result<()>) -> Result<()> {
        self.record(|c| c.scan_rows += 1);
        for row in &self.get(&table.name)?.rows {
            visit(row.clone())?;
        }
        Ok(())
    }
}

/// Convenience constructor for foreign keys in fixtures
pub fn foreign_key(column: &str, referenced_table: &str, referenced_column: &str) -> ForeignKey {
    ForeignKey {
        column: column.to_string(),
        referenced_table: referenced_table.to_string(),
        referenced_column: referenced_column.to_string(),
        on_delete: None,
        on_update: None,
    }
}
