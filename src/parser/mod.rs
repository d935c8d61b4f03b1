//! Streaming SQL statement reader for dump files.

pub mod mysql_insert;
pub mod postgres_copy;

use once_cell::sync::Lazy;
use regex::bytes::Regex;
use std::io::{BufRead, BufReader, Read};

pub const SMALL_BUFFER_SIZE: usize = 64 * 1024;
pub const MEDIUM_BUFFER_SIZE: usize = 256 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementType {
    Unknown,
    CreateTable,
    Insert,
    CreateIndex,
    AlterTable,
    DropTable,
    /// PostgreSQL `COPY ... FROM stdin`; the data block follows the statement
    Copy,
}

impl StatementType {
    /// Statements that shape the schema
    pub fn is_schema(self) -> bool {
        matches!(
            self,
            StatementType::CreateTable | StatementType::CreateIndex | StatementType::AlterTable
        )
    }
}

static CREATE_TABLE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)^\s*CREATE\s+(?:TEMPORARY\s+)?TABLE\s+(?:IF\s+NOT\s+EXISTS\s+)?(?:[`"\w]+\.)?[`"]?([^\s`"(]+)[`"]?"#).unwrap()
});

static INSERT_INTO_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)^\s*INSERT\s+(?:IGNORE\s+)?INTO\s+(?:[`"\w]+\.)?[`"]?([^\s`"(]+)[`"]?"#).unwrap()
});

static CREATE_INDEX_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)\bON\s+(?:ONLY\s+)?(?:[`"\w]+\.)?[`"]?([^\s`"(;]+)[`"]?"#).unwrap()
});

static ALTER_TABLE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)ALTER\s+TABLE\s+(?:ONLY\s+)?(?:[`"\w]+\.)?[`"]?([^\s`";]+)[`"]?"#).unwrap()
});

static DROP_TABLE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)DROP\s+TABLE\s+(?:IF\s+EXISTS\s+)?(?:[`"\w]+\.)?[`"]?([^\s`";]+)[`"]?"#).unwrap()
});

static COPY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)^\s*COPY\s+(?:[`"\w]+\.)?[`"]?([^\s`"(]+)[`"]?.*FROM\s+stdin"#).unwrap()
});

pub struct Parser<R: Read> {
    reader: BufReader<R>,
    stmt_buffer: Vec<u8>,
}

impl<R: Read> Parser<R> {
    pub fn new(reader: R, buffer_size: usize) -> Self {
        Self {
            reader: BufReader::with_capacity(buffer_size, reader),
            stmt_buffer: Vec::with_capacity(32 * 1024),
        }
    }

    /// Read the next `;`-terminated statement.
    ///
    /// Quotes (single, double, backtick) and `--` line comments are honoured;
    /// comment text is dropped from the returned statement.
    pub fn read_statement(&mut self) -> std::io::Result<Option<Vec<u8>>> {
        self.stmt_buffer.clear();

        let mut quote: Option<u8> = None;
        let mut escaped = false;
        let mut in_comment = false;
        let mut pending_dash = false;

        loop {
            let buf = self.reader.fill_buf()?;
            if buf.is_empty() {
                if pending_dash {
                    self.stmt_buffer.push(b'-');
                }
                if self.stmt_buffer.iter().all(|b| b.is_ascii_whitespace()) {
                    return Ok(None);
                }
                let result = std::mem::take(&mut self.stmt_buffer);
                return Ok(Some(result));
            }

            let mut consumed = buf.len();
            let mut found_terminator = false;

            for (i, &b) in buf.iter().enumerate() {
                if in_comment {
                    if b == b'\n' {
                        in_comment = false;
                        self.stmt_buffer.push(b'\n');
                    }
                    continue;
                }

                if pending_dash {
                    pending_dash = false;
                    if b == b'-' {
                        in_comment = true;
                        continue;
                    }
                    self.stmt_buffer.push(b'-');
                }

                if let Some(q) = quote {
                    self.stmt_buffer.push(b);
                    if escaped {
                        escaped = false;
                    } else if b == b'\\' && q != b'`' {
                        escaped = true;
                    } else if b == q {
                        quote = None;
                    }
                    continue;
                }

                match b {
                    b'\'' | b'"' | b'`' => {
                        quote = Some(b);
                        self.stmt_buffer.push(b);
                    }
                    b'-' => pending_dash = true,
                    b';' => {
                        self.stmt_buffer.push(b);
                        consumed = i + 1;
                        found_terminator = true;
                        break;
                    }
                    _ => self.stmt_buffer.push(b),
                }
            }

            self.reader.consume(consumed);

            if found_terminator {
                let result = std::mem::take(&mut self.stmt_buffer);
                return Ok(Some(result));
            }
        }
    }

    /// Read the data block that follows a `COPY ... FROM stdin;` statement,
    /// up to and excluding the `\.` terminator line.
    pub fn read_copy_data(&mut self) -> std::io::Result<Vec<u8>> {
        let mut data = Vec::new();
        let mut line = Vec::new();

        loop {
            line.clear();
            if self.reader.read_until(b'\n', &mut line)? == 0 {
                return Ok(data);
            }

            let trimmed = trim_line_end(&line);
            if trimmed == b"\\." {
                return Ok(data);
            }
            // Rest of the COPY statement's own line
            if data.is_empty() && trimmed.iter().all(|b| b.is_ascii_whitespace()) {
                continue;
            }
            data.extend_from_slice(trimmed);
            data.push(b'\n');
        }
    }

    pub fn parse_statement(stmt: &[u8]) -> (StatementType, String) {
        let stmt = trim_ascii_start(stmt);

        if stmt.len() < 6 {
            return (StatementType::Unknown, String::new());
        }

        let upper_prefix: Vec<u8> = stmt
            .iter()
            .take(20)
            .map(|b| b.to_ascii_uppercase())
            .collect();

        let (stmt_type, re): (StatementType, &Regex) = if upper_prefix.starts_with(b"CREATE TABLE")
            || upper_prefix.starts_with(b"CREATE TEMPORARY")
        {
            (StatementType::CreateTable, &*CREATE_TABLE_RE)
        } else if upper_prefix.starts_with(b"INSERT") {
            (StatementType::Insert, &*INSERT_INTO_RE)
        } else if upper_prefix.starts_with(b"CREATE INDEX")
            || upper_prefix.starts_with(b"CREATE UNIQUE")
        {
            (StatementType::CreateIndex, &*CREATE_INDEX_RE)
        } else if upper_prefix.starts_with(b"ALTER TABLE") {
            (StatementType::AlterTable, &*ALTER_TABLE_RE)
        } else if upper_prefix.starts_with(b"DROP TABLE") {
            (StatementType::DropTable, &*DROP_TABLE_RE)
        } else if upper_prefix.starts_with(b"COPY ") {
            (StatementType::Copy, &*COPY_RE)
        } else {
            return (StatementType::Unknown, String::new());
        };

        match re.captures(stmt).and_then(|caps| caps.get(1)) {
            Some(m) => (
                stmt_type,
                String::from_utf8_lossy(m.as_bytes()).into_owned(),
            ),
            None => (StatementType::Unknown, String::new()),
        }
    }
}

#[inline]
fn trim_ascii_start(data: &[u8]) -> &[u8] {
    let start = data
        .iter()
        .position(|&b| !matches!(b, b' ' | b'\t' | b'\n' | b'\r'))
        .unwrap_or(data.len());
    &data[start..]
}

#[inline]
fn trim_line_end(line: &[u8]) -> &[u8] {
    let mut end = line.len();
    while end > 0 && matches!(line[end - 1], b'\n' | b'\r') {
        end -= 1;
    }
    &line[..end]
}

pub fn determine_buffer_size(file_size: u64) -> usize {
    if file_size > 1024 * 1024 * 1024 {
        MEDIUM_BUFFER_SIZE
    } else {
        SMALL_BUFFER_SIZE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_create_table() {
        let stmt = b"CREATE TABLE users (id INT);";
        let (typ, name) = Parser::<&[u8]>::parse_statement(stmt);
        assert_eq!(typ, StatementType::CreateTable);
        assert_eq!(name, "users");
    }

    #[test]
    fn test_parse_create_table_backticks() {
        let stmt = b"CREATE TABLE IF NOT EXISTS `my_table` (id INT);";
        let (typ, name) = Parser::<&[u8]>::parse_statement(stmt);
        assert_eq!(typ, StatementType::CreateTable);
        assert_eq!(name, "my_table");
    }

    #[test]
    fn test_parse_insert() {
        let stmt = b"INSERT INTO `comments` (`id`) VALUES (1);";
        let (typ, name) = Parser::<&[u8]>::parse_statement(stmt);
        assert_eq!(typ, StatementType::Insert);
        assert_eq!(name, "comments");
    }

    #[test]
    fn test_parse_create_unique_index() {
        let stmt = b"CREATE UNIQUE INDEX idx_email ON users (email);";
        let (typ, name) = Parser::<&[u8]>::parse_statement(stmt);
        assert_eq!(typ, StatementType::CreateIndex);
        assert_eq!(name, "users");
    }

    #[test]
    fn test_parse_alter_table_only() {
        let stmt = b"ALTER TABLE ONLY public.orders ADD CONSTRAINT x PRIMARY KEY (id);";
        let (typ, name) = Parser::<&[u8]>::parse_statement(stmt);
        assert_eq!(typ, StatementType::AlterTable);
        assert_eq!(name, "orders");
    }

    #[test]
    fn test_parse_copy() {
        let stmt = b"COPY public.users (id, name) FROM stdin;";
        let (typ, name) = Parser::<&[u8]>::parse_statement(stmt);
        assert_eq!(typ, StatementType::Copy);
        assert_eq!(name, "users");
    }

    #[test]
    fn test_read_statement_basic() {
        let sql = b"CREATE TABLE t1 (id INT); INSERT INTO t1 VALUES (1);";
        let mut parser = Parser::new(&sql[..], 1024);

        let stmt1 = parser.read_statement().unwrap().unwrap();
        assert_eq!(stmt1, b"CREATE TABLE t1 (id INT);");

        let stmt2 = parser.read_statement().unwrap().unwrap();
        assert_eq!(stmt2, b" INSERT INTO t1 VALUES (1);");

        assert!(parser.read_statement().unwrap().is_none());
    }

    #[test]
    fn test_read_statement_with_escaped_quotes() {
        let sql = b"INSERT INTO t1 VALUES ('it\\'s; a test');";
        let mut parser = Parser::new(&sql[..], 1024);

        let stmt = parser.read_statement().unwrap().unwrap();
        assert_eq!(stmt, b"INSERT INTO t1 VALUES ('it\\'s; a test');");
    }

    #[test]
    fn test_read_statement_skips_comments() {
        let sql = b"-- it's a comment; really\nCREATE TABLE t (a INT); -- trailing\n";
        let mut parser = Parser::new(&sql[..], 4);

        let stmt = parser.read_statement().unwrap().unwrap();
        assert_eq!(stmt, b"\nCREATE TABLE t (a INT);");
        assert!(parser.read_statement().unwrap().is_none());
    }

    #[test]
    fn test_read_statement_keeps_negative_numbers() {
        let sql = b"INSERT INTO t VALUES (-5);";
        let mut parser = Parser::new(&sql[..], 1024);
        let stmt = parser.read_statement().unwrap().unwrap();
        assert_eq!(stmt, b"INSERT INTO t VALUES (-5);");
    }

    #[test]
    fn test_read_copy_data() {
        let sql = b"COPY t (a, b) FROM stdin;\n1\tx\n2\t\\N\n\\.\nSELECT 1;";
        let mut parser = Parser::new(&sql[..], 1024);

        let stmt = parser.read_statement().unwrap().unwrap();
        assert_eq!(Parser::<&[u8]>::parse_statement(&stmt).0, StatementType::Copy);

        let data = parser.read_copy_data().unwrap();
        assert_eq!(data, b"1\tx\n2\t\\N\n");

        let next = parser.read_statement().unwrap().unwrap();
        assert_eq!(next, b"SELECT 1;");
    }
}
