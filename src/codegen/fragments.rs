//! Per-table fragments: schema, foreign keys, indexes, data and truncation.

use super::statement::Statement;
use crate::dialect::Dialect;
use crate::schema::{Column, ForeignKeyMap, Index, Row, Table};

/// Column type as written into `createTable`: the native type plus
/// ` NOT NULL`, ` DEFAULT '<value>'` and ` AUTO_INCREMENT` as they apply.
/// The default is quoted for `dialect`'s string literal rules.
pub fn resolve_column_type(column: &Column, dialect: Dialect) -> String {
    let mut resolved = column.db_type.clone();

    if !column.is_nullable {
        resolved.push_str(" NOT NULL");
    }
    if let Some(default) = &column.default {
        resolved.push_str(&format!(" DEFAULT '{}'", sql_string_body(default, dialect)));
    }
    if column.auto_increment {
        resolved.push_str(" AUTO_INCREMENT");
    }

    resolved
}

/// Contents of a single-quoted SQL string literal
fn sql_string_body(value: &str, dialect: Dialect) -> String {
    let value = if dialect.uses_backslash_escapes() {
        value.replace('\\', "\\\\")
    } else {
        value.to_string()
    };
    value.replace('\'', "''")
}

/// `createTable` call for a table, primary key entry included when the
/// table has one
pub fn schema_fragment(table: &Table, dialect: Dialect) -> Vec<Statement> {
    let columns = table
        .columns
        .iter()
        .map(|c| (c.name.clone(), resolve_column_type(c, dialect)))
        .collect();

    vec![
        Statement::Comment(format!("Schema for table '{}'", table.name)),
        Statement::CreateTable {
            table: table.name.clone(),
            columns,
            primary_key: table.primary_key().into_iter().map(str::to_string).collect(),
        },
    ]
}

/// One `addForeignKey` per entry, named `fk_<table>_<n>` from 1.
///
/// Empty when the table has no foreign keys.
pub fn foreign_key_fragment(
    table: &str,
    foreign_keys: &ForeignKeyMap,
    excluded_driver: Option<&str>,
) -> Vec<Statement> {
    if foreign_keys.is_empty() {
        return Vec::new();
    }

    let statements = foreign_keys
        .iter()
        .enumerate()
        .map(|(i, fk)| Statement::AddForeignKey {
            name: format!("fk_{}_{}", table, i + 1),
            table: table.to_string(),
            column: fk.column.clone(),
            referenced_table: fk.referenced_table.clone(),
            referenced_column: fk.referenced_column.clone(),
            on_delete: fk.on_delete,
            on_update: fk.on_update,
        })
        .collect();

    wrap_block(format!("Foreign keys for table '{}'", table), statements, excluded_driver)
}

/// One `createIndex` per index, named `<table>_<n>` from 1.
///
/// Empty when no index survived grouping.
pub fn index_fragment(table: &str, indexes: &[Index], excluded_driver: Option<&str>) -> Vec<Statement> {
    if indexes.is_empty() {
        return Vec::new();
    }

    let statements = indexes
        .iter()
        .enumerate()
        .map(|(i, index)| Statement::CreateIndex {
            name: format!("{}_{}", table, i + 1),
            table: table.to_string(),
            columns: index.columns.clone(),
            unique: index.is_unique,
        })
        .collect();

    wrap_block(format!("Indexes for table '{}'", table), statements, excluded_driver)
}

/// Comment, then the statements, inside one driver-exclusion block if asked
fn wrap_block(comment: String, statements: Vec<Statement>, excluded_driver: Option<&str>) -> Vec<Statement> {
    let mut block = vec![Statement::Comment(comment)];
    match excluded_driver {
        Some(driver) => {
            block.push(Statement::UnlessDriver(driver.to_string()));
            block.extend(statements);
            block.push(Statement::EndIf);
        }
        None => block.extend(statements),
    }
    block
}

/// `insert` call for one row, columns in the row's own order
pub fn insert_statement(table: &str, row: &Row) -> Statement {
    Statement::Insert {
        table: table.to_string(),
        values: row
            .iter()
            .map(|(column, value)| (column.to_string(), value.clone()))
            .collect(),
    }
}

pub fn truncate_statement(table: &str) -> Statement {
    Statement::TruncateTable {
        table: table.to_string(),
    }
}
