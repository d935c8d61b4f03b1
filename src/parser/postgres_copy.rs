//! PostgreSQL COPY data block decoder.
//!
//! Decodes the tab-separated text that follows `COPY ... FROM stdin;` into
//! rows, resolving `\N` nulls and backslash escapes.

use crate::schema::{Row, Table, Value};

/// Parser for PostgreSQL COPY data blocks
pub struct CopyParser<'a> {
    data: &'a [u8],
    columns: Vec<String>,
}

impl<'a> CopyParser<'a> {
    /// Create a new parser for COPY data
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            columns: Vec::new(),
        }
    }

    /// Set column order from the COPY header, falling back to the table's
    /// declared order when the header has no column list
    pub fn with_columns(mut self, header_columns: Vec<String>, table: &Table) -> Self {
        self.columns = if header_columns.is_empty() {
            table.columns.iter().map(|c| c.name.clone()).collect()
        } else {
            header_columns
        };
        self
    }

    /// Parse all rows from the COPY data block
    pub fn parse_rows(&self) -> Vec<Row> {
        self.data
            .split(|&b| b == b'\n')
            .map(|line| line.strip_suffix(b"\r").unwrap_or(line))
            .filter(|line| !line.is_empty() && *line != b"\\.")
            .map(|line| self.parse_row(line))
            .collect()
    }

    /// Parse a single tab-separated row
    fn parse_row(&self, line: &[u8]) -> Row {
        line.split(|&b| b == b'\t')
            .enumerate()
            .map(|(idx, field)| {
                let name = self
                    .columns
                    .get(idx)
                    .cloned()
                    .unwrap_or_else(|| format!("column_{}", idx + 1));
                (name, parse_copy_value(field))
            })
            .collect()
    }
}

/// Parse a single COPY field; `\N` is NULL
fn parse_copy_value(value: &[u8]) -> Value {
    if value == b"\\N" {
        return Value::Null;
    }
    Value::from_bytes(decode_copy_escapes(value))
}

/// Decode PostgreSQL COPY escape sequences
fn decode_copy_escapes(value: &[u8]) -> Vec<u8> {
    let mut result = Vec::with_capacity(value.len());
    let mut i = 0;

    while i < value.len() {
        if value[i] == b'\\' && i + 1 < value.len() {
            let decoded = match value[i + 1] {
                b'n' => b'\n',
                b'r' => b'\r',
                b't' => b'\t',
                b'b' => 0x08,
                b'f' => 0x0c,
                b'v' => 0x0b,
                b'\\' => b'\\',
                other => {
                    // Unknown escape, keep as-is
                    result.push(b'\\');
                    result.push(other);
                    i += 2;
                    continue;
                }
            };
            result.push(decoded);
            i += 2;
        } else {
            result.push(value[i]);
            i += 1;
        }
    }

    result
}

/// Parse column list from COPY header
pub fn parse_copy_columns(header: &str) -> Vec<String> {
    // COPY table_name (col1, col2, ...) FROM stdin;
    if let Some(start) = header.find('(') {
        if let Some(end) = header[start..].find(')') {
            let cols = &header[start + 1..start + end];
            return cols
                .split(',')
                .map(|c| c.trim().trim_matches('"').to_string())
                .filter(|c| !c.is_empty())
                .collect();
        }
    }
    Vec::new()
}

/// Parse all rows from a PostgreSQL COPY data block
pub fn parse_copy_rows(header: &str, data: &[u8], table: &Table) -> Vec<Row> {
    CopyParser::new(data)
        .with_columns(parse_copy_columns(header), table)
        .parse_rows()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Column;

    fn users() -> Table {
        Table::new("users")
            .with_column(Column::new("id", "integer"))
            .with_column(Column::new("name", "text"))
            .with_column(Column::new("company_id", "integer"))
    }

    #[test]
    fn test_parse_copy_data() {
        let data = b"1\tAlice\t5\n2\tBob\t5\n3\tCarol\t\\N\n\\.";
        let rows = parse_copy_rows(
            "COPY public.users (id, name, company_id) FROM stdin;",
            data,
            &users(),
        );

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1].get("name"), Some(&Value::from("Bob")));
        assert_eq!(rows[2].get("company_id"), Some(&Value::Null));
    }

    #[test]
    fn test_header_order_wins() {
        let rows = parse_copy_rows("COPY users (name, id) FROM stdin;", b"Dora\t4\n", &users());
        assert_eq!(
            rows[0].iter().collect::<Vec<_>>(),
            vec![("name", &Value::from("Dora")), ("id", &Value::from("4"))]
        );
    }

    #[test]
    fn test_declared_order_without_header_list() {
        let rows = parse_copy_rows("COPY users FROM stdin;", b"7\tEve\t\\N\n", &users());
        let cols: Vec<_> = rows[0].iter().map(|(c, _)| c).collect();
        assert_eq!(cols, vec!["id", "name", "company_id"]);
    }

    #[test]
    fn test_parse_copy_columns() {
        let header = r#"COPY public.users (id, "name", email) FROM stdin;"#;
        assert_eq!(parse_copy_columns(header), vec!["id", "name", "email"]);
        assert!(parse_copy_columns("COPY users FROM stdin;").is_empty());
    }

    #[test]
    fn test_decode_escapes() {
        assert_eq!(decode_copy_escapes(b"hello\\tworld\\n"), b"hello\tworld\n");
        assert_eq!(decode_copy_escapes(b"back\\\\slash"), b"back\\slash");
    }
}
