//! DuckDB database files as a schema source.

use super::SchemaProvider;
use crate::dialect::Dialect;
use crate::error::{DumpError, Result};
use crate::filter::TableFilter;
use crate::schema::{parse_create_index, Column, IndexRow, Row, Table, Value};
use duckdb::types::ValueRef;
use duckdb::{params, Connection};
use std::path::Path;
use tracing::debug;

/// A live DuckDB connection
pub struct DuckDbProvider {
    descriptor: String,
    conn: Connection,
}

impl DuckDbProvider {
    /// Open an existing database file.
    ///
    /// A missing file is a connection failure; DuckDB would otherwise
    /// create an empty database.
    pub fn open(descriptor: &str, path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(DumpError::connection(
                descriptor,
                format!("database file does not exist: {}", path.display()),
            ));
        }
        let conn = Connection::open(path).map_err(|e| DumpError::connection(descriptor, e))?;
        debug!(path = %path.display(), "opened duckdb database");
        Ok(Self::from_connection(descriptor, conn))
    }

    /// Wrap an already open connection (e.g. an in-memory database)
    pub fn from_connection(descriptor: &str, conn: Connection) -> Self {
        Self {
            descriptor: descriptor.to_string(),
            conn,
        }
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    fn table_names(&self) -> duckdb::Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT table_name FROM information_schema.tables \
             WHERE table_schema = 'main' AND table_type = 'BASE TABLE' \
             ORDER BY table_name",
        )?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<duckdb::Result<Vec<_>>>()?;
        Ok(names)
    }

    fn columns(&self, table: &str) -> duckdb::Result<Vec<Column>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT name, type, \"notnull\", dflt_value, pk FROM pragma_table_info({})",
            quote_literal(table)
        ))?;
        let mut rows = stmt.query([])?;

        let mut columns = Vec::new();
        while let Some(row) = rows.next()? {
            let raw_default: Option<String> = row.get(3)?;
            let auto_increment = raw_default
                .as_deref()
                .is_some_and(|d| d.trim_start().to_lowercase().starts_with("nextval("));

            let is_primary_key: bool = row.get(4)?;
            columns.push(Column {
                name: row.get(0)?,
                db_type: row.get(1)?,
                is_nullable: !row.get::<_, bool>(2)? && !is_primary_key,
                default: if auto_increment {
                    None
                } else {
                    raw_default.as_deref().and_then(parse_default_literal)
                },
                is_primary_key,
                auto_increment,
            });
        }
        Ok(columns)
    }

    fn scan(&self, table: &Table, visit: &mut dyn FnMut(Row) -> Result<()>) -> Result<()> {
        let query_err = |e: duckdb::Error| DumpError::introspection(&table.name, e);

        let mut stmt = self
            .conn
            .prepare(&format!("SELECT * FROM {}", quote_ident(&table.name)))
            .map_err(query_err)?;
        let mut rows = stmt.query([]).map_err(query_err)?;

        let mut names: Vec<String> = Vec::new();
        while let Some(row) = rows.next().map_err(query_err)? {
            if names.is_empty() {
                let statement = row.as_ref();
                names = (0..statement.column_count())
                    .map(|i| {
                        statement
                            .column_name(i)
                            .map(|s| s.to_string())
                            .unwrap_or_else(|_| format!("column_{}", i + 1))
                    })
                    .collect();
            }

            let mut out = Row::new();
            for (i, name) in names.iter().enumerate() {
                let value = row.get_ref(i).map_err(query_err)?;
                out.push(name.as_str(), row_value(value));
            }
            visit(out)?;
        }
        Ok(())
    }
}

impl SchemaProvider for DuckDbProvider {
    fn dialect(&self) -> Dialect {
        Dialect::DuckDb
    }

    fn descriptor(&self) -> &str {
        &self.descriptor
    }

    fn list_tables(&self, filter: &TableFilter) -> Result<Vec<Table>> {
        let names = self
            .table_names()
            .map_err(|e| DumpError::introspection("information_schema.tables", e))?;

        let mut tables = Vec::new();
        for name in names.into_iter().filter(|n| filter.should_include(n)) {
            let columns = self
                .columns(&name)
                .map_err(|e| DumpError::introspection(&name, e))?;
            let mut table = Table::new(name);
            table.columns = columns;
            tables.push(table);
        }
        Ok(tables)
    }

    fn raw_foreign_key_ddl(&self, table: &str) -> Result<String> {
        let sql: Option<String> = self
            .conn
            .query_row(
                "SELECT sql FROM duckdb_tables() WHERE schema_name = 'main' AND table_name = ?",
                params![table],
                |row| row.get(0),
            )
            .map_err(|e| DumpError::introspection(table, e))?;
        Ok(sql.unwrap_or_default())
    }

    fn secondary_indexes(&self, table: &str) -> Result<Vec<IndexRow>> {
        let query = || -> duckdb::Result<Vec<Option<String>>> {
            let mut stmt = self.conn.prepare(
                "SELECT sql FROM duckdb_indexes() \
                 WHERE schema_name = 'main' AND table_name = ? ORDER BY index_name",
            )?;
            let sqls = stmt
                .query_map(params![table], |row| row.get::<_, Option<String>>(0))?
                .collect::<duckdb::Result<Vec<_>>>()?;
            Ok(sqls)
        };
        let sqls = query().map_err(|e| DumpError::introspection(table, e))?;

        Ok(sqls
            .iter()
            .flatten()
            .filter_map(|sql| parse_create_index(sql))
            .flat_map(|(_, rows)| rows)
            .collect())
    }

    fn scan_rows(&self, table: &Table, visit: &mut dyn FnMut(Row) -> Result<()>) -> Result<()> {
        self.scan(table, visit)
    }
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Turn a catalog default expression into the raw default value:
/// `'abc'` -> `abc`, `NULL` -> none, anything else verbatim.
fn parse_default_literal(raw: &str) -> Option<String> {
    let raw = raw.trim();
    let raw = raw
        .strip_prefix("CAST(")
        .and_then(|inner| inner.rsplit_once(" AS "))
        .map_or(raw, |(value, _)| value.trim());

    if raw.eq_ignore_ascii_case("NULL") {
        return None;
    }
    if raw.len() >= 2 && raw.starts_with('\'') && raw.ends_with('\'') {
        return Some(raw[1..raw.len() - 1].replace("''", "'"));
    }
    Some(raw.to_string())
}

/// Convert a DuckDB value for the migration; blobs keep their bytes
fn row_value(value: ValueRef<'_>) -> Value {
    let text = match value {
        ValueRef::Null => return Value::Null,
        ValueRef::Boolean(b) => if b { "1" } else { "0" }.to_string(),
        ValueRef::TinyInt(n) => n.to_string(),
        ValueRef::SmallInt(n) => n.to_string(),
        ValueRef::Int(n) => n.to_string(),
        ValueRef::BigInt(n) => n.to_string(),
        ValueRef::HugeInt(n) => n.to_string(),
        ValueRef::UTinyInt(n) => n.to_string(),
        ValueRef::USmallInt(n) => n.to_string(),
        ValueRef::UInt(n) => n.to_string(),
        ValueRef::UBigInt(n) => n.to_string(),
        ValueRef::Float(f) => f.to_string(),
        ValueRef::Double(f) => f.to_string(),
        ValueRef::Decimal(d) => d.to_string(),
        ValueRef::Text(s) | ValueRef::Blob(s) => return Value::from_bytes(s.to_vec()),
        ValueRef::Timestamp(_, ts) => {
            // Microseconds since epoch
            let secs = ts.div_euclid(1_000_000);
            let nanos = (ts.rem_euclid(1_000_000) * 1000) as u32;
            match chrono::DateTime::from_timestamp(secs, nanos) {
                Some(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
                None => ts.to_string(),
            }
        }
        ValueRef::Date32(days) => {
            // 719163 = days from 0001-01-01 to 1970-01-01
            match chrono::NaiveDate::from_num_days_from_ce_opt(719_163 + days) {
                Some(date) => date.format("%Y-%m-%d").to_string(),
                None => days.to_string(),
            }
        }
        ValueRef::Time64(_, micros) => {
            let secs = (micros / 1_000_000) as u32;
            let nanos = ((micros % 1_000_000) * 1000) as u32;
            match chrono::NaiveTime::from_num_seconds_from_midnight_opt(secs, nanos) {
                Some(time) => time.format("%H:%M:%S").to_string(),
                None => micros.to_string(),
            }
        }
        other => format!("{:?}", other),
    };
    Value::Text(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_default_literal() {
        assert_eq!(parse_default_literal("'it''s'"), Some("it's".to_string()));
        assert_eq!(parse_default_literal("42"), Some("42".to_string()));
        assert_eq!(parse_default_literal("NULL"), None);
        assert_eq!(
            parse_default_literal("CAST('t' AS BOOLEAN)"),
            Some("t".to_string())
        );
        assert_eq!(
            parse_default_literal("CURRENT_TIMESTAMP"),
            Some("CURRENT_TIMESTAMP".to_string())
        );
    }

    #[test]
    fn test_quoting() {
        assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
        assert_eq!(quote_literal("o'neil"), "'o''neil'");
    }

    #[test]
    fn test_row_value() {
        assert_eq!(row_value(ValueRef::Null), Value::Null);
        assert_eq!(row_value(ValueRef::Boolean(true)), Value::from("1"));
        assert_eq!(row_value(ValueRef::Text(b"abc")), Value::from("abc"));
        assert_eq!(row_value(ValueRef::Date32(0)), Value::from("1970-01-01"));
    }

    #[test]
    fn test_blob_bytes_are_kept() {
        assert_eq!(row_value(ValueRef::Blob(b"abc")), Value::from("abc"));
        assert_eq!(
            row_value(ValueRef::Blob(&[0x00, 0xff, 0x10])),
            Value::Binary(vec![0x00, 0xff, 0x10])
        );
    }
}
