//! DDL parsing for schema extraction.
//!
//! Parses CREATE TABLE, ALTER TABLE and CREATE INDEX statements to extract:
//! - Column definitions with type, nullability, default and auto-increment
//! - Primary key constraints
//! - Foreign key constraints with their referential actions
//! - Secondary index definitions

use super::{Column, ForeignKey, IndexRow, ReferentialAction, Table};
use ahash::AHashMap;
use once_cell::sync::Lazy;
use regex::Regex;

/// Regex to extract table name from CREATE TABLE
/// Supports: `table` (MySQL), "table" (PostgreSQL), [table] (MSSQL), table (SQLite/unquoted), schema.table
static CREATE_TABLE_NAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)CREATE\s+(?:TEMPORARY\s+)?TABLE\s+(?:IF\s+NOT\s+EXISTS\s+)?(?:[\[\]`"\w]+\s*\.\s*)*[\[`"]?([^\[\]`"\s(]+)[\]`"]?"#)
        .unwrap()
});

/// Regex to extract table name from ALTER TABLE
static ALTER_TABLE_NAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)ALTER\s+TABLE\s+(?:ONLY\s+)?(?:IF\s+EXISTS\s+)?(?:[\[\]`"\w]+\s*\.\s*)*[\[`"]?([^\[\]`"\s]+)[\]`"]?"#).unwrap()
});

/// Regex for column definition: name followed by the full type spelling
/// (`int(10) unsigned`, `character varying(255)`, `double precision`)
static COLUMN_DEF_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?i)^\s*[\[`"]?([^\[\]`"\s,]+)[\]`"]?\s+(\w+(?:\s+(?:varying|precision))?(?:\s*\([^)]*\))?(?:\s+(?:unsigned|zerofill))*)"#,
    )
    .unwrap()
});

/// Regex for PRIMARY KEY constraint
static PRIMARY_KEY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)PRIMARY\s+KEY\s*(?:CLUSTERED\s+|NONCLUSTERED\s+)?\(([^)]+)\)").unwrap()
});

/// Regex for inline PRIMARY KEY on column
static INLINE_PRIMARY_KEY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bPRIMARY\s+KEY\b").unwrap());

/// Regex for FOREIGN KEY constraint with optional constraint name and trailing actions
static FOREIGN_KEY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?i)(?:CONSTRAINT\s+[\[`"]?[^\[\]`"\s]+[\]`"]?\s+)?FOREIGN\s+KEY\s*(?:[\[`"]?\w+[\]`"]?\s*)?\(([^)]+)\)\s*REFERENCES\s+(?:[\[\]`"\w]+\s*\.\s*)*[\[`"]?([^\[\]`"\s(]+)[\]`"]?\s*\(([^)]+)\)((?:\s+ON\s+(?:DELETE|UPDATE)\s+(?:CASCADE|SET\s+NULL|SET\s+DEFAULT|RESTRICT|NO\s+ACTION))*)"#,
    )
    .unwrap()
});

/// Regex for a column-level `REFERENCES table (col)` clause
static INLINE_REFERENCES_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?i)\bREFERENCES\s+(?:[\[\]`"\w]+\s*\.\s*)*[\[`"]?([^\[\]`"\s(]+)[\]`"]?\s*\(([^)]+)\)((?:\s+ON\s+(?:DELETE|UPDATE)\s+(?:CASCADE|SET\s+NULL|SET\s+DEFAULT|RESTRICT|NO\s+ACTION))*)"#,
    )
    .unwrap()
});

static ON_DELETE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)ON\s+DELETE\s+(CASCADE|SET\s+NULL|SET\s+DEFAULT|RESTRICT|NO\s+ACTION)")
        .unwrap()
});

static ON_UPDATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)ON\s+UPDATE\s+(CASCADE|SET\s+NULL|SET\s+DEFAULT|RESTRICT|NO\s+ACTION)")
        .unwrap()
});

/// Regex to detect NOT NULL constraint
static NOT_NULL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bNOT\s+NULL\b").unwrap());

/// Regex for a DEFAULT clause: quoted literal, parenthesised expression or bare word
static DEFAULT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)\bDEFAULT\s+('(?:[^'\\]|\\.|'')*'|\((?:[^()]|\([^()]*\))*\)|[^\s,]+)"#)
        .unwrap()
});

/// Regex for engine-generated values
static AUTO_INCREMENT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\bAUTO_?INCREMENT\b|\bGENERATED\s+(?:ALWAYS|BY\s+DEFAULT)\s+AS\s+IDENTITY\b|\bIDENTITY\s*\(",
    )
    .unwrap()
});

/// Regex for inline INDEX/KEY in CREATE TABLE
/// Matches: INDEX idx_name (col1, col2), KEY idx_name (col1(10)), UNIQUE KEY idx_name (col1)
static INLINE_INDEX_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)^(?:(UNIQUE)\s+|FULLTEXT\s+|SPATIAL\s+)?(?:INDEX|KEY)\s+[\[`"]?(\w+)[\]`"]?\s*(?:USING\s+\w+\s*)?\(((?:[^()]|\([^()]*\))+)\)"#).unwrap()
});

/// Regex for a UNIQUE constraint, optionally named: CONSTRAINT uq UNIQUE (a, b)
static UNIQUE_CONSTRAINT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)(?:CONSTRAINT\s+[\[`"]?(\w+)[\]`"]?\s+)?UNIQUE\s*(?:KEY\s+|INDEX\s+)?\(([^)]+)\)"#)
        .unwrap()
});

/// Regex for CREATE INDEX statement
/// Matches: CREATE [UNIQUE] INDEX [IF NOT EXISTS] idx_name ON table [USING method] (columns)
static CREATE_INDEX_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?i)CREATE\s+(UNIQUE\s+)?(?:CLUSTERED\s+|NONCLUSTERED\s+)?INDEX\s+(?:CONCURRENTLY\s+)?(?:IF\s+NOT\s+EXISTS\s+)?(?:[\[\]`"\w]+\s*\.\s*)*[\[`"]?(\w+)[\]`"]?\s+ON\s+(?:ONLY\s+)?(?:[\[\]`"\w]+\s*\.\s*)*[\[`"]?(\w+)[\]`"]?\s*(?:USING\s+\w+\s*)?\(((?:[^()]|\([^()]*\))+)\)"#,
    )
    .unwrap()
});

/// Parsed CREATE TABLE plus everything later statements add to it
#[derive(Debug, Clone)]
pub struct TableDefinition {
    /// Columns and primary key; foreign keys are attached from `ddl`
    pub table: Table,
    /// Secondary index rows, one per indexed column
    pub index_rows: Vec<IndexRow>,
    /// CREATE TABLE text followed by any ALTER TABLE text for this table
    pub ddl: Vec<String>,
}

impl TableDefinition {
    /// All DDL for this table joined into one text block
    pub fn ddl_text(&self) -> String {
        self.ddl.join("\n")
    }
}

/// Builder for constructing table definitions from DDL statements
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    tables: Vec<TableDefinition>,
    positions: AHashMap<String, usize>,
}

impl SchemaBuilder {
    /// Create a new schema builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a CREATE TABLE statement and add it, returning the table name
    pub fn parse_create_table(&mut self, stmt: &str) -> Option<String> {
        let table_name = extract_create_table_name(stmt)?;

        // First definition wins
        if self.position(&table_name).is_some() {
            return Some(table_name);
        }

        let body = extract_table_body(stmt)?;
        let mut def = TableDefinition {
            table: Table::new(table_name.clone()),
            index_rows: Vec::new(),
            ddl: vec![stmt.trim().to_string()],
        };
        parse_table_body(&body, &mut def);

        self.positions
            .insert(table_name.to_lowercase(), self.tables.len());
        self.tables.push(def);
        Some(table_name)
    }

    /// Parse an ALTER TABLE statement and update the existing table.
    ///
    /// Handles the clause lists phpMyAdmin-style exports use:
    /// `ADD PRIMARY KEY (...)`, `ADD [UNIQUE] KEY name (...)`,
    /// `ADD CONSTRAINT ... UNIQUE (...)` and `MODIFY col <definition>`.
    pub fn parse_alter_table(&mut self, stmt: &str) -> Option<String> {
        let (table_name, clauses) = split_alter_table(stmt)?;
        let pos = self.position(&table_name)?;
        let def = &mut self.tables[pos];

        def.ddl.push(stmt.trim().to_string());

        for clause in clauses {
            if let Some(added) = strip_keyword(&clause, "ADD") {
                let added = strip_keyword(added, "COLUMN").unwrap_or(added);
                if let Some(pk_cols) = parse_primary_key_constraint(added) {
                    mark_primary_key(&mut def.table, &pk_cols);
                } else if FOREIGN_KEY_RE.is_match(added) {
                    continue;
                } else if let Some(rows) =
                    parse_inline_index(added).or_else(|| parse_unique_constraint(added))
                {
                    def.index_rows.extend(rows);
                } else if !is_constraint_part(added) {
                    if let Some(col) = parse_column_def(added) {
                        def.table.columns.push(col);
                    }
                }
            } else if let Some(modified) = strip_keyword(&clause, "MODIFY") {
                let modified = strip_keyword(modified, "COLUMN").unwrap_or(modified);
                if let Some(col) = parse_column_def(modified) {
                    if let Some(existing) = def
                        .table
                        .columns
                        .iter_mut()
                        .find(|c| c.name.eq_ignore_ascii_case(&col.name))
                    {
                        let was_pk = existing.is_primary_key;
                        *existing = col;
                        existing.is_primary_key |= was_pk;
                        existing.is_nullable &= !was_pk;
                    }
                }
            }
        }

        Some(def.table.name.clone())
    }

    /// Parse a CREATE INDEX statement and add it to the appropriate table
    pub fn parse_create_index(&mut self, stmt: &str) -> Option<String> {
        let (table_name, rows) = parse_create_index(stmt)?;
        let pos = self.position(&table_name)?;
        let def = &mut self.tables[pos];
        def.index_rows.extend(rows);
        Some(def.table.name.clone())
    }

    /// Get a table definition by name (case-insensitive)
    pub fn get(&self, name: &str) -> Option<&TableDefinition> {
        self.position(name).map(|pos| &self.tables[pos])
    }

    /// Table definitions in the order they were created
    pub fn build(self) -> Vec<TableDefinition> {
        self.tables
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.positions.get(&name.to_lowercase()).copied()
    }
}

/// Extract table name from CREATE TABLE statement
pub fn extract_create_table_name(stmt: &str) -> Option<String> {
    CREATE_TABLE_NAME_RE
        .captures(stmt)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Split an ALTER TABLE statement into its table name and top-level clauses
fn split_alter_table(stmt: &str) -> Option<(String, Vec<String>)> {
    let caps = ALTER_TABLE_NAME_RE.captures(stmt)?;
    let table_name = caps.get(1)?.as_str().to_string();
    let rest = stmt[caps.get(0)?.end()..].trim().trim_end_matches(';');
    Some((table_name, split_table_body(rest)))
}

/// Strip a leading keyword (case-insensitive) followed by whitespace
fn strip_keyword<'a>(s: &'a str, keyword: &str) -> Option<&'a str> {
    let s = s.trim_start();
    let head = s.get(..keyword.len())?;
    let rest = &s[keyword.len()..];
    if head.eq_ignore_ascii_case(keyword) && rest.starts_with(char::is_whitespace) {
        Some(rest.trim_start())
    } else {
        None
    }
}

/// Extract the body of a CREATE TABLE statement (between first ( and matching ))
fn extract_table_body(stmt: &str) -> Option<String> {
    let bytes = stmt.as_bytes();
    let mut depth = 0;
    let mut start = None;
    let mut in_string = false;
    let mut escape_next = false;

    for (i, &b) in bytes.iter().enumerate() {
        if escape_next {
            escape_next = false;
            continue;
        }

        if b == b'\\' && in_string {
            escape_next = true;
            continue;
        }

        if b == b'\'' {
            in_string = !in_string;
            continue;
        }

        if in_string {
            continue;
        }

        if b == b'(' {
            if depth == 0 {
                start = Some(i + 1);
            }
            depth += 1;
        } else if b == b')' {
            depth -= 1;
            if depth == 0 {
                if let Some(s) = start {
                    return Some(stmt[s..i].to_string());
                }
            }
        }
    }

    None
}

/// Whether a table body part is a table-level constraint rather than a column
fn is_constraint_part(part: &str) -> bool {
    let upper = part.to_uppercase();
    [
        "PRIMARY KEY",
        "CONSTRAINT",
        "FOREIGN KEY",
        "KEY ",
        "INDEX ",
        "UNIQUE ",
        "UNIQUE(",
        "FULLTEXT ",
        "SPATIAL ",
        "CHECK ",
        "CHECK(",
    ]
    .iter()
    .any(|prefix| upper.starts_with(prefix))
}

/// Parse the body of a CREATE TABLE to extract columns, keys and indexes
fn parse_table_body(body: &str, def: &mut TableDefinition) {
    let parts = split_table_body(body);

    for part in parts {
        let trimmed = part.trim();
        if trimmed.is_empty() {
            continue;
        }

        if is_constraint_part(trimmed) {
            if let Some(pk_cols) = parse_primary_key_constraint(trimmed) {
                mark_primary_key(&mut def.table, &pk_cols);
                continue;
            }

            if FOREIGN_KEY_RE.is_match(trimmed) {
                continue;
            }

            if let Some(rows) = parse_inline_index(trimmed) {
                def.index_rows.extend(rows);
            } else if let Some(rows) = parse_unique_constraint(trimmed) {
                def.index_rows.extend(rows);
            }
        } else if let Some(col) = parse_column_def(trimmed) {
            def.table.columns.push(col);
        }
    }
}

fn mark_primary_key(table: &mut Table, pk_cols: &[String]) {
    for col_name in pk_cols {
        if let Some(col) = table
            .columns
            .iter_mut()
            .find(|c| c.name.eq_ignore_ascii_case(col_name))
        {
            col.is_primary_key = true;
            col.is_nullable = false;
        }
    }
}

/// Split table body by commas, respecting nested parentheses
pub fn split_table_body(body: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut depth = 0;
    let mut in_string = false;
    let mut escape_next = false;

    for ch in body.chars() {
        if escape_next {
            current.push(ch);
            escape_next = false;
            continue;
        }

        if ch == '\\' && in_string {
            current.push(ch);
            escape_next = true;
            continue;
        }

        if ch == '\'' {
            in_string = !in_string;
            current.push(ch);
            continue;
        }

        if in_string {
            current.push(ch);
            continue;
        }

        match ch {
            '(' => {
                depth += 1;
                current.push(ch);
            }
            ')' => {
                depth -= 1;
                current.push(ch);
            }
            ',' if depth == 0 => {
                parts.push(current.trim().to_string());
                current = String::new();
            }
            _ => {
                current.push(ch);
            }
        }
    }

    if !current.trim().is_empty() {
        parts.push(current.trim().to_string());
    }

    parts
}

/// Parse a column definition
pub fn parse_column_def(def: &str) -> Option<Column> {
    let caps = COLUMN_DEF_RE.captures(def)?;
    let name = caps.get(1)?.as_str().to_string();
    let db_type = caps.get(2)?.as_str().trim().to_string();

    let default = parse_default(def);
    let type_lower = db_type.to_lowercase();
    let auto_increment = AUTO_INCREMENT_RE.is_match(def)
        || type_lower.ends_with("serial")
        || default
            .as_deref()
            .is_some_and(|d| d.to_lowercase().starts_with("nextval("));

    let is_primary_key = INLINE_PRIMARY_KEY_RE.is_match(def);
    let is_nullable = !NOT_NULL_RE.is_match(def) && !is_primary_key;

    Some(Column {
        name,
        db_type,
        is_nullable,
        // Sequence defaults are implied by AUTO_INCREMENT
        default: default.filter(|d| !d.to_lowercase().starts_with("nextval(")),
        is_primary_key,
        auto_increment,
    })
}

/// Parse the DEFAULT clause of a column definition; `DEFAULT NULL` yields None
fn parse_default(def: &str) -> Option<String> {
    let raw = DEFAULT_RE.captures(def)?.get(1)?.as_str();

    if raw.eq_ignore_ascii_case("NULL") {
        return None;
    }

    match raw.strip_prefix('\'').and_then(|r| r.strip_suffix('\'')) {
        Some(inner) => Some(unquote_sql_literal(inner)),
        None => Some(raw.to_string()),
    }
}

/// Undo `''` and backslash escapes inside a single-quoted SQL literal
fn unquote_sql_literal(inner: &str) -> String {
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '\\' => match chars.next() {
                Some('n') => out.push('\n'),
                Some('r') => out.push('\r'),
                Some('t') => out.push('\t'),
                Some('0') => out.push('\0'),
                Some(other) => out.push(other),
                None => out.push('\\'),
            },
            '\'' if chars.peek() == Some(&'\'') => {
                chars.next();
                out.push('\'');
            }
            _ => out.push(ch),
        }
    }

    out
}

/// Parse PRIMARY KEY constraint, returns column names
fn parse_primary_key_constraint(constraint: &str) -> Option<Vec<String>> {
    let caps = PRIMARY_KEY_RE.captures(constraint)?;
    let cols_str = caps.get(1)?.as_str();
    Some(parse_column_list(cols_str))
}

/// Parse inline INDEX/KEY constraint from CREATE TABLE body
fn parse_inline_index(constraint: &str) -> Option<Vec<IndexRow>> {
    let caps = INLINE_INDEX_RE.captures(constraint)?;

    let non_unique = caps.get(1).is_none();
    let index_name = caps.get(2)?.as_str();
    let columns = parse_index_column_list(caps.get(3)?.as_str());

    Some(index_rows(index_name, &columns, non_unique))
}

/// Parse a UNIQUE constraint; unnamed ones are named after their first column
fn parse_unique_constraint(constraint: &str) -> Option<Vec<IndexRow>> {
    let caps = UNIQUE_CONSTRAINT_RE.captures(constraint)?;
    let columns = parse_index_column_list(caps.get(2)?.as_str());
    let first = columns.first()?;

    let index_name = caps
        .get(1)
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| format!("unique_{}", first));

    Some(index_rows(&index_name, &columns, false))
}

/// Parse a CREATE INDEX statement into its table name and index rows
pub fn parse_create_index(stmt: &str) -> Option<(String, Vec<IndexRow>)> {
    let caps = CREATE_INDEX_RE.captures(stmt)?;

    let non_unique = caps.get(1).is_none();
    let index_name = caps.get(2)?.as_str();
    let table_name = caps.get(3)?.as_str().to_string();
    let columns = parse_index_column_list(caps.get(4)?.as_str());

    Some((table_name, index_rows(index_name, &columns, non_unique)))
}

fn index_rows(index_name: &str, columns: &[String], non_unique: bool) -> Vec<IndexRow> {
    columns
        .iter()
        .map(|col| IndexRow::new(index_name, col.as_str(), non_unique))
        .collect()
}

/// Parse foreign keys out of raw DDL text (CREATE TABLE and/or ALTER TABLE).
///
/// Composite keys are paired position by position and yield one entry per
/// constrained column. Column-level `REFERENCES` clauses are picked up from
/// the CREATE TABLE body.
pub fn parse_foreign_keys(ddl: &str) -> Vec<ForeignKey> {
    let mut fks = Vec::new();

    for caps in FOREIGN_KEY_RE.captures_iter(ddl) {
        let local_cols = caps
            .get(1)
            .map(|m| parse_column_list(m.as_str()))
            .unwrap_or_default();
        let ref_table = caps
            .get(2)
            .map(|m| strip_quotes(m.as_str()))
            .unwrap_or_default();
        let ref_cols = caps
            .get(3)
            .map(|m| parse_column_list(m.as_str()))
            .unwrap_or_default();
        let actions = caps.get(4).map(|m| m.as_str()).unwrap_or_default();
        let (on_delete, on_update) = parse_actions(actions);

        if ref_table.is_empty() {
            continue;
        }

        for (column, referenced_column) in local_cols.into_iter().zip(ref_cols) {
            fks.push(ForeignKey {
                column,
                referenced_table: ref_table.clone(),
                referenced_column,
                on_delete,
                on_update,
            });
        }
    }

    if let Some(body) = extract_create_table_body(ddl) {
        for part in split_table_body(&body) {
            if is_constraint_part(&part) {
                continue;
            }
            let Some(caps) = INLINE_REFERENCES_RE.captures(&part) else {
                continue;
            };
            let Some(col) = parse_column_def(&part) else {
                continue;
            };
            let ref_cols = parse_column_list(&caps[2]);
            let Some(referenced_column) = ref_cols.into_iter().next() else {
                continue;
            };
            let (on_delete, on_update) = parse_actions(caps.get(3).map_or("", |m| m.as_str()));

            fks.push(ForeignKey {
                column: col.name,
                referenced_table: strip_quotes(&caps[1]),
                referenced_column,
                on_delete,
                on_update,
            });
        }
    }

    fks
}

fn extract_create_table_body(ddl: &str) -> Option<String> {
    let start = CREATE_TABLE_NAME_RE.find(ddl)?.start();
    extract_table_body(&ddl[start..])
}

fn parse_actions(
    tail: &str,
) -> (Option<ReferentialAction>, Option<ReferentialAction>) {
    let on_delete = ON_DELETE_RE
        .captures(tail)
        .and_then(|c| c[1].parse().ok());
    let on_update = ON_UPDATE_RE
        .captures(tail)
        .and_then(|c| c[1].parse().ok());
    (on_delete, on_update)
}

fn strip_quotes(s: &str) -> String {
    s.trim()
        .trim_matches('`')
        .trim_matches('"')
        .trim_matches('[')
        .trim_matches(']')
        .to_string()
}

/// Parse a comma-separated column list, stripping quotes (backticks, double quotes, brackets)
pub fn parse_column_list(s: &str) -> Vec<String> {
    s.split(',')
        .map(strip_quotes)
        .filter(|c| !c.is_empty())
        .collect()
}

/// Parse an index column list, dropping prefix lengths and sort order
/// (`title`(50) DESC -> title)
pub fn parse_index_column_list(s: &str) -> Vec<String> {
    split_table_body(s)
        .iter()
        .map(|c| {
            let c = c.trim();
            let c = c.split('(').next().unwrap_or(c).trim();
            let c = c.split_whitespace().next().unwrap_or(c);
            strip_quotes(c)
        })
        .filter(|c| !c.is_empty())
        .collect()
}
