//! Schema snapshot model for a dump run.
//!
//! This module provides:
//! - Data models for tables, columns, foreign keys and indexes
//! - DDL parsing for extracting them from CREATE/ALTER TABLE text
//! - Grouping of raw index rows into index records

mod ddl;
mod index;

pub use ddl::*;
pub use index::*;

use std::fmt;
use std::str::FromStr;

/// Column definition within a table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    /// Column name
    pub name: String,
    /// Dialect-native type string, e.g. `int(11) unsigned`
    pub db_type: String,
    /// Whether this column allows NULL values
    pub is_nullable: bool,
    /// Default value as written in the DDL (None for no default or DEFAULT NULL)
    pub default: Option<String>,
    /// Whether this column is part of the primary key
    pub is_primary_key: bool,
    /// Whether values are generated by the engine
    pub auto_increment: bool,
}

impl Column {
    /// A nullable column without default, key or auto-increment.
    pub fn new(name: impl Into<String>, db_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            db_type: db_type.into(),
            is_nullable: true,
            default: None,
            is_primary_key: false,
            auto_increment: false,
        }
    }

    pub fn not_null(mut self) -> Self {
        self.is_nullable = false;
        self
    }

    pub fn primary_key(mut self) -> Self {
        self.is_primary_key = true;
        self
    }

    pub fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }

    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }
}

/// Referential action of a foreign key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferentialAction {
    Cascade,
    SetNull,
    SetDefault,
    Restrict,
    NoAction,
}

impl ReferentialAction {
    pub fn as_sql(self) -> &'static str {
        match self {
            ReferentialAction::Cascade => "CASCADE",
            ReferentialAction::SetNull => "SET NULL",
            ReferentialAction::SetDefault => "SET DEFAULT",
            ReferentialAction::Restrict => "RESTRICT",
            ReferentialAction::NoAction => "NO ACTION",
        }
    }
}

impl FromStr for ReferentialAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.split_whitespace().collect::<Vec<_>>().join(" ");
        match normalized.to_uppercase().as_str() {
            "CASCADE" => Ok(ReferentialAction::Cascade),
            "SET NULL" => Ok(ReferentialAction::SetNull),
            "SET DEFAULT" => Ok(ReferentialAction::SetDefault),
            "RESTRICT" => Ok(ReferentialAction::Restrict),
            "NO ACTION" => Ok(ReferentialAction::NoAction),
            _ => Err(format!("Unknown referential action: {}", s)),
        }
    }
}

impl fmt::Display for ReferentialAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// Single-column foreign key constraint (composite keys are split per column)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKey {
    /// Constrained column in this table
    pub column: String,
    /// Referenced table name
    pub referenced_table: String,
    /// Referenced column name
    pub referenced_column: String,
    pub on_delete: Option<ReferentialAction>,
    pub on_update: Option<ReferentialAction>,
}

/// Foreign keys keyed by constrained column, in discovery order.
///
/// Re-inserting a column replaces its entry in place, so ordinals derived
/// from iteration order stay stable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ForeignKeyMap {
    entries: Vec<ForeignKey>,
}

impl ForeignKeyMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, fk: ForeignKey) {
        match self.entries.iter_mut().find(|e| e.column == fk.column) {
            Some(existing) => *existing = fk,
            None => self.entries.push(fk),
        }
    }

    pub fn get(&self, column: &str) -> Option<&ForeignKey> {
        self.entries.iter().find(|e| e.column == column)
    }

    pub fn contains_column(&self, column: &str) -> bool {
        self.get(column).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ForeignKey> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<ForeignKey> for ForeignKeyMap {
    fn from_iter<I: IntoIterator<Item = ForeignKey>>(iter: I) -> Self {
        let mut map = ForeignKeyMap::new();
        for fk in iter {
            map.insert(fk);
        }
        map
    }
}

impl Extend<ForeignKey> for ForeignKeyMap {
    fn extend<I: IntoIterator<Item = ForeignKey>>(&mut self, iter: I) {
        for fk in iter {
            self.insert(fk);
        }
    }
}

/// Table snapshot as introspected from the source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    /// Table name
    pub name: String,
    /// Column definitions in declaration order
    pub columns: Vec<Column>,
    /// Foreign keys by constrained column
    pub foreign_keys: ForeignKeyMap,
}

impl Table {
    /// Create a new empty table
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            foreign_keys: ForeignKeyMap::new(),
        }
    }

    pub fn with_column(mut self, column: Column) -> Self {
        self.columns.push(column);
        self
    }

    pub fn with_foreign_key(mut self, fk: ForeignKey) -> Self {
        self.foreign_keys.insert(fk);
        self
    }

    /// Get a column by name
    pub fn get_column(&self, name: &str) -> Option<&Column> {
        self.columns
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// Primary key column names in declaration order
    pub fn primary_key(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|c| c.is_primary_key)
            .map(|c| c.name.as_str())
            .collect()
    }
}

/// One value of a scanned row
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// SQL NULL
    Null,
    Text(String),
    /// Bytes that are not valid UTF-8, such as binary column contents
    Binary(Vec<u8>),
}

impl Value {
    /// Text when the bytes are valid UTF-8, binary otherwise
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        match String::from_utf8(bytes) {
            Ok(text) => Value::Text(text),
            Err(err) => Value::Binary(err.into_bytes()),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// The value as text, if it is text
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(text) => Some(text.as_str()),
            _ => None,
        }
    }

    /// Raw bytes of a non-NULL value
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Null => None,
            Value::Text(text) => Some(text.as_bytes()),
            Value::Binary(bytes) => Some(bytes.as_slice()),
        }
    }
}

impl From<&str> for Value {
    fn from(text: &str) -> Self {
        Value::Text(text.to_string())
    }
}

impl From<String> for Value {
    fn from(text: String) -> Self {
        Value::Text(text)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

/// A row as returned by a source scan, in the query's column order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    values: Vec<(String, Value)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, column: impl Into<String>, value: Value) {
        self.values.push((column.into(), value));
    }

    pub fn with(mut self, column: impl Into<String>, value: Option<&str>) -> Self {
        self.push(column, Value::from(value));
        self
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.values
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(name, v)| (name.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl FromIterator<(String, Value)> for Row {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fk(column: &str, table: &str) -> ForeignKey {
        ForeignKey {
            column: column.to_string(),
            referenced_table: table.to_string(),
            referenced_column: "id".to_string(),
            on_delete: None,
            on_update: None,
        }
    }

    #[test]
    fn test_fk_map_replaces_in_place() {
        let mut map = ForeignKeyMap::new();
        map.insert(fk("user_id", "users"));
        map.insert(fk("post_id", "posts"));
        map.insert(fk("user_id", "accounts"));

        let cols: Vec<_> = map.iter().map(|f| f.column.as_str()).collect();
        assert_eq!(cols, vec!["user_id", "post_id"]);
        assert_eq!(map.get("user_id").unwrap().referenced_table, "accounts");
        assert!(!map.contains_column("missing"));
    }

    #[test]
    fn test_primary_key_declaration_order() {
        let table = Table::new("order_items")
            .with_column(Column::new("product_id", "int").primary_key())
            .with_column(Column::new("qty", "int"))
            .with_column(Column::new("order_id", "int").primary_key());

        assert_eq!(table.primary_key(), vec!["product_id", "order_id"]);
        assert!(table.get_column("QTY").is_some());
    }

    #[test]
    fn test_referential_action_parsing() {
        assert_eq!(
            "set  null".parse::<ReferentialAction>().unwrap(),
            ReferentialAction::SetNull
        );
        assert_eq!(
            "NO ACTION".parse::<ReferentialAction>().unwrap(),
            ReferentialAction::NoAction
        );
        assert!("EXPLODE".parse::<ReferentialAction>().is_err());
        assert_eq!(ReferentialAction::Cascade.to_string(), "CASCADE");
    }

    #[test]
    fn test_row_keeps_query_order() {
        let row = Row::new().with("b", Some("2")).with("a", None);
        let cols: Vec<_> = row.iter().map(|(c, _)| c).collect();
        assert_eq!(cols, vec!["b", "a"]);
        assert_eq!(row.get("a"), Some(&Value::Null));
        assert_eq!(row.get("b").and_then(Value::as_text), Some("2"));
    }

    #[test]
    fn test_value_from_bytes() {
        assert_eq!(Value::from_bytes(b"abc".to_vec()), Value::Text("abc".to_string()));
        assert_eq!(Value::from_bytes(vec![0xff, 0x00]), Value::Binary(vec![0xff, 0x00]));
        assert_eq!(Value::Binary(vec![1]).as_bytes(), Some(&[1u8][..]));
        assert!(Value::from(None::<String>).is_null());
    }
}
