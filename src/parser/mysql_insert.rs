//! INSERT statement row decoder.
//!
//! Decodes `INSERT INTO ... [(cols)] VALUES (...), (...)` statements into
//! rows of values, honouring MySQL backslash escapes, `''` quotes and
//! `0x` hex literals.

use crate::schema::{Row, Table, Value};

/// A decoded literal from a VALUES list
#[derive(Debug, Clone, PartialEq, Eq)]
enum ParsedValue {
    Null,
    /// Quoted string with escapes resolved
    String(Vec<u8>),
    /// Bytes of a hex literal (0xABCD)
    Hex(Vec<u8>),
    /// Number, keyword or expression kept verbatim
    Other(String),
}

impl ParsedValue {
    fn into_value(self) -> Value {
        match self {
            ParsedValue::Null => Value::Null,
            ParsedValue::String(bytes) | ParsedValue::Hex(bytes) => Value::from_bytes(bytes),
            ParsedValue::Other(s) => Value::Text(s),
        }
    }
}

/// Parser for INSERT statements
pub struct InsertParser<'a> {
    stmt: &'a [u8],
    pos: usize,
    table: Option<&'a Table>,
}

impl<'a> InsertParser<'a> {
    /// Create a new parser for an INSERT statement
    pub fn new(stmt: &'a [u8]) -> Self {
        Self {
            stmt,
            pos: 0,
            table: None,
        }
    }

    /// Set the table whose declared column order applies when the INSERT
    /// has no explicit column list
    pub fn with_table(mut self, table: &'a Table) -> Self {
        self.table = Some(table);
        self
    }

    /// Parse all rows from the INSERT statement
    pub fn parse_rows(&mut self) -> anyhow::Result<Vec<Row>> {
        let values_pos = self.find_values_keyword()?;
        let columns = self.column_names(values_pos);
        self.pos = values_pos;

        let mut rows = Vec::new();
        while self.pos < self.stmt.len() {
            self.skip_whitespace();

            if self.pos >= self.stmt.len() {
                break;
            }

            match self.stmt[self.pos] {
                b'(' => {
                    let values = self.parse_row()?;
                    rows.push(build_row(&columns, values));
                }
                b';' => break,
                _ => self.pos += 1,
            }
        }

        Ok(rows)
    }

    /// Find the VALUES keyword outside quotes and return position after it
    fn find_values_keyword(&self) -> anyhow::Result<usize> {
        let mut quote: Option<u8> = None;
        let mut i = 0;

        while i < self.stmt.len() {
            let b = self.stmt[i];
            match quote {
                Some(q) if b == q => quote = None,
                Some(_) => {}
                None if matches!(b, b'`' | b'"') => quote = Some(b),
                None => {
                    if self.stmt.len() - i >= 6
                        && self.stmt[i..i + 6].eq_ignore_ascii_case(b"VALUES")
                        && (i == 0 || !is_word_byte(self.stmt[i - 1]))
                        && self.stmt.get(i + 6).map_or(true, |&next| !is_word_byte(next))
                    {
                        return Ok(i + 6);
                    }
                }
            }
            i += 1;
        }

        anyhow::bail!("INSERT statement missing VALUES keyword")
    }

    /// Column names from the explicit list before VALUES, else the table's
    /// declared order
    fn column_names(&self, values_pos: usize) -> Vec<String> {
        let before_values = &self.stmt[..values_pos.saturating_sub(6)];
        let stmt_str = String::from_utf8_lossy(before_values);

        if let Some(close_paren) = stmt_str.rfind(')') {
            if let Some(open_paren) = stmt_str[..close_paren].rfind('(') {
                let col_list = &stmt_str[open_paren + 1..close_paren];
                return col_list
                    .split(',')
                    .map(|c| {
                        c.trim()
                            .trim_matches('`')
                            .trim_matches('"')
                            .to_string()
                    })
                    .collect();
            }
        }

        self.table
            .map(|t| t.columns.iter().map(|c| c.name.clone()).collect())
            .unwrap_or_default()
    }

    /// Parse a single row "(val1, val2, ...)"
    fn parse_row(&mut self) -> anyhow::Result<Vec<ParsedValue>> {
        self.pos += 1; // Skip '('

        let mut values = Vec::new();
        let mut depth = 1;

        while self.pos < self.stmt.len() && depth > 0 {
            self.skip_whitespace();

            if self.pos >= self.stmt.len() {
                break;
            }

            match self.stmt[self.pos] {
                b'(' => {
                    depth += 1;
                    self.pos += 1;
                }
                b')' => {
                    depth -= 1;
                    self.pos += 1;
                }
                b',' if depth == 1 => {
                    self.pos += 1;
                }
                _ if depth == 1 => {
                    values.push(self.parse_value()?);
                }
                _ => {
                    self.pos += 1;
                }
            }
        }

        if depth > 0 {
            anyhow::bail!("unterminated row in INSERT statement");
        }

        Ok(values)
    }

    /// Parse a single value (string, number, NULL, etc.)
    fn parse_value(&mut self) -> anyhow::Result<ParsedValue> {
        let b = self.stmt[self.pos];

        // NULL
        if self.pos + 4 <= self.stmt.len() {
            let word = &self.stmt[self.pos..self.pos + 4];
            let boundary = self
                .stmt
                .get(self.pos + 4)
                .map_or(true, |&next| !is_word_byte(next));
            if word.eq_ignore_ascii_case(b"NULL") && boundary {
                self.pos += 4;
                return Ok(ParsedValue::Null);
            }
        }

        // String literal
        if b == b'\'' {
            return self.parse_string_value();
        }

        // Hex literal (0x...)
        if b == b'0' && self.pos + 1 < self.stmt.len() {
            let next = self.stmt[self.pos + 1];
            if next == b'x' || next == b'X' {
                if let Some(value) = self.parse_hex_value() {
                    return Ok(value);
                }
            }
        }

        Ok(self.parse_bare_value())
    }

    /// Parse a string literal 'value'
    fn parse_string_value(&mut self) -> anyhow::Result<ParsedValue> {
        self.pos += 1; // Skip opening quote

        let mut value = Vec::new();
        let mut escape_next = false;
        let mut closed = false;

        while self.pos < self.stmt.len() {
            let b = self.stmt[self.pos];

            if escape_next {
                // MySQL escape sequences
                let escaped = match b {
                    b'n' => b'\n',
                    b'r' => b'\r',
                    b't' => b'\t',
                    b'0' => 0,
                    b'Z' => 0x1a,
                    _ => b, // \', \\, etc.
                };
                value.push(escaped);
                escape_next = false;
                self.pos += 1;
            } else if b == b'\\' {
                escape_next = true;
                self.pos += 1;
            } else if b == b'\'' {
                // Check for escaped quote ''
                if self.pos + 1 < self.stmt.len() && self.stmt[self.pos + 1] == b'\'' {
                    value.push(b'\'');
                    self.pos += 2;
                } else {
                    self.pos += 1;
                    closed = true;
                    break;
                }
            } else {
                value.push(b);
                self.pos += 1;
            }
        }

        if !closed {
            anyhow::bail!("unterminated string literal in INSERT statement");
        }

        Ok(ParsedValue::String(value))
    }

    /// Parse a hex literal 0xABCD... into its bytes. An odd digit count is
    /// padded with a leading zero, as MySQL does. Returns `None`, leaving
    /// the position untouched, when no hex digits follow the prefix.
    fn parse_hex_value(&mut self) -> Option<ParsedValue> {
        let start = self.pos + 2;
        let mut end = start;
        while end < self.stmt.len() && self.stmt[end].is_ascii_hexdigit() {
            end += 1;
        }
        if end == start || self.stmt.get(end).is_some_and(|&b| is_word_byte(b)) {
            return None;
        }

        let digits = &self.stmt[start..end];
        let mut bytes = Vec::with_capacity(digits.len() / 2 + 1);
        let mut rest = digits;
        if digits.len() % 2 == 1 {
            bytes.push(hex_digit(digits[0]));
            rest = &digits[1..];
        }
        for pair in rest.chunks_exact(2) {
            bytes.push((hex_digit(pair[0]) << 4) | hex_digit(pair[1]));
        }

        self.pos = end;
        Some(ParsedValue::Hex(bytes))
    }

    /// Parse a number or other unquoted token (`NOW()` included) up to the
    /// next delimiter
    fn parse_bare_value(&mut self) -> ParsedValue {
        let start = self.pos;
        let mut depth = 0usize;

        while self.pos < self.stmt.len() {
            match self.stmt[self.pos] {
                b'(' => depth += 1,
                b')' if depth > 0 => depth -= 1,
                b',' | b')' if depth == 0 => break,
                _ => {}
            }
            self.pos += 1;
        }

        let raw = String::from_utf8_lossy(&self.stmt[start..self.pos]);
        ParsedValue::Other(raw.trim().to_string())
    }

    /// Skip whitespace and newlines
    fn skip_whitespace(&mut self) {
        while self.pos < self.stmt.len() && self.stmt[self.pos].is_ascii_whitespace() {
            self.pos += 1;
        }
    }
}

#[inline]
fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Value of an ASCII hex digit
#[inline]
fn hex_digit(b: u8) -> u8 {
    match b {
        b'0'..=b'9' => b - b'0',
        b'a'..=b'f' => b - b'a' + 10,
        b'A'..=b'F' => b - b'A' + 10,
        _ => 0,
    }
}

/// Pair values with column names; surplus values get positional names
fn build_row(columns: &[String], values: Vec<ParsedValue>) -> Row {
    values
        .into_iter()
        .enumerate()
        .map(|(idx, value)| {
            let name = columns
                .get(idx)
                .cloned()
                .unwrap_or_else(|| format!("column_{}", idx + 1));
            (name, value.into_value())
        })
        .collect()
}

/// Parse all rows from an INSERT statement, using the table's declared
/// column order when the statement has no column list
pub fn parse_insert_rows(stmt: &[u8], table: &Table) -> anyhow::Result<Vec<Row>> {
    let mut parser = InsertParser::new(stmt).with_table(table);
    parser.parse_rows()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Column;

    fn users() -> Table {
        Table::new("users")
            .with_column(Column::new("id", "int"))
            .with_column(Column::new("name", "varchar(50)"))
            .with_column(Column::new("bio", "text"))
    }

    #[test]
    fn test_declared_order_without_column_list() {
        let stmt = b"INSERT INTO `users` VALUES (1,'Alice',NULL),(2,'Bob','x');";
        let rows = parse_insert_rows(stmt, &users()).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(
            rows[0].iter().collect::<Vec<_>>(),
            vec![
                ("id", &Value::from("1")),
                ("name", &Value::from("Alice")),
                ("bio", &Value::Null)
            ]
        );
        assert_eq!(rows[1].get("bio"), Some(&Value::from("x")));
    }

    #[test]
    fn test_explicit_column_list_order() {
        let stmt = b"INSERT INTO users (`name`, `id`) VALUES ('Carol', 3);";
        let rows = parse_insert_rows(stmt, &users()).unwrap();

        let cols: Vec<_> = rows[0].iter().map(|(c, _)| c).collect();
        assert_eq!(cols, vec!["name", "id"]);
    }

    #[test]
    fn test_escapes_are_decoded() {
        let stmt = br#"INSERT INTO users VALUES (1,'It\'s a \"test\"\n','a''b');"#;
        let rows = parse_insert_rows(stmt, &users()).unwrap();

        assert_eq!(
            rows[0].get("name"),
            Some(&Value::from("It's a \"test\"\n"))
        );
        assert_eq!(rows[0].get("bio"), Some(&Value::from("a'b")));
    }

    #[test]
    fn test_values_inside_strings_and_parens() {
        let stmt = b"INSERT INTO users VALUES (1,'VALUES (x)',-2.5e3),(NOW(),'b',2);";
        let rows = parse_insert_rows(stmt, &users()).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].get("id"), Some(&Value::from("NOW()")));
        assert_eq!(rows[0].get("name"), Some(&Value::from("VALUES (x)")));
        assert_eq!(rows[0].get("bio"), Some(&Value::from("-2.5e3")));
    }

    #[test]
    fn test_hex_and_nullable_words() {
        let stmt = b"INSERT INTO users VALUES (0x1F,NULLIF_NOT,null);";
        let rows = parse_insert_rows(stmt, &users()).unwrap();

        assert_eq!(rows[0].get("id"), Some(&Value::from("\u{1f}")));
        assert_eq!(rows[0].get("name"), Some(&Value::from("NULLIF_NOT")));
        assert_eq!(rows[0].get("bio"), Some(&Value::Null));
    }

    #[test]
    fn test_hex_literals_are_decoded() {
        let stmt = b"INSERT INTO users VALUES (0x616263,0xFF00,0xABC),(0x,'0x41',0x4g);";
        let rows = parse_insert_rows(stmt, &users()).unwrap();

        assert_eq!(rows[0].get("id"), Some(&Value::from("abc")));
        assert_eq!(rows[0].get("name"), Some(&Value::Binary(vec![0xff, 0x00])));
        assert_eq!(rows[0].get("bio"), Some(&Value::Binary(vec![0x0a, 0xbc])));
        assert_eq!(rows[1].get("id"), Some(&Value::from("0x")));
        assert_eq!(rows[1].get("name"), Some(&Value::from("0x41")));
        assert_eq!(rows[1].get("bio"), Some(&Value::from("0x4g")));
    }

    #[test]
    fn test_invalid_utf8_in_string_is_kept() {
        let stmt = b"INSERT INTO users VALUES (1,'a\xffb',NULL);";
        let rows = parse_insert_rows(stmt, &users()).unwrap();

        assert_eq!(rows[0].get("name"), Some(&Value::Binary(vec![b'a', 0xff, b'b'])));
    }

    #[test]
    fn test_table_name_starting_with_values() {
        let table = Table::new("values_log")
            .with_column(Column::new("a", "int"))
            .with_column(Column::new("b", "text"));
        let stmt = b"INSERT INTO values_log (b, a) VALUES ('x', 1);";
        let rows = parse_insert_rows(stmt, &table).unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(
            rows[0].iter().collect::<Vec<_>>(),
            vec![("b", &Value::from("x")), ("a", &Value::from("1"))]
        );
    }

    #[test]
    fn test_missing_values_keyword() {
        assert!(parse_insert_rows(b"INSERT INTO users SELECT * FROM x;", &users()).is_err());
    }
}
