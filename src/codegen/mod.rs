//! Migration code generation.
//!
//! [`CodeGenerator`] walks tables one at a time and accumulates typed
//! statements into ordered sections:
//!
//! truncate → schema → foreign keys + indexes → inserts
//!
//! framed by the options preamble and the foreign key check toggles. The
//! body is rendered to PHP once, by [`CodeGenerator::finish`].

mod fragments;
mod php;
mod statement;

pub use fragments::{
    foreign_key_fragment, index_fragment, insert_statement, resolve_column_type, schema_fragment,
    truncate_statement,
};
pub use php::{double_quoted, escape_double_quoted, escape_single_quoted, single_quoted, value_literal};
pub use statement::{render_statements, MigrationBody, Statement};

use crate::dialect::Dialect;
use crate::error::Result;
use crate::provider::SchemaProvider;
use crate::schema::{group_index_rows, Table};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Indent level of statements inside `up()`
pub const BODY_INDENT: usize = 2;

/// Which fragments to generate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratorOptions {
    /// `createTable`, foreign keys and indexes
    pub create_schema: bool,
    /// One `insert` per row
    pub insert_data: bool,
    /// `truncateTable` ahead of everything else
    pub truncate_table: bool,
    /// When false, checks are switched off around the body where the
    /// dialect allows it
    pub foreign_key_checks: bool,
    /// Wrap foreign keys and indexes so SQLite connections skip them
    pub sqlite_checks: bool,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self {
            create_schema: true,
            insert_data: true,
            truncate_table: false,
            foreign_key_checks: true,
            sqlite_checks: false,
        }
    }
}

/// Result of a finished generation run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedCode {
    /// Rendered `up()` body
    pub up: String,
    /// Tables processed, in order
    pub tables: Vec<String>,
    /// Insert statements generated
    pub rows: usize,
    /// Whether any `addForeignKey` was generated
    pub foreign_keys_emitted: bool,
}

/// Builds the body of one migration, a table at a time.
pub struct CodeGenerator<'a> {
    provider: &'a dyn SchemaProvider,
    options: GeneratorOptions,
    dialect: Dialect,
    excluded_driver: Option<&'static str>,
    body: MigrationBody,
    tables: Vec<String>,
    rows: usize,
    foreign_keys_emitted: bool,
}

impl<'a> CodeGenerator<'a> {
    /// Start a body for `provider`; the source dialect is queried here, once.
    pub fn new(provider: &'a dyn SchemaProvider, options: GeneratorOptions) -> Self {
        let dialect = provider.dialect();
        let mut body = MigrationBody::default();

        body.preamble
            .push(Statement::SetOptions(dialect.table_options().to_string()));
        if !options.foreign_key_checks && dialect.supports_foreign_key_toggle() {
            body.preamble
                .push(Statement::Execute("SET FOREIGN_KEY_CHECKS = 0;".to_string()));
            body.epilogue
                .push(Statement::Execute("SET FOREIGN_KEY_CHECKS = 1;".to_string()));
        }

        Self {
            provider,
            options,
            dialect,
            excluded_driver: options
                .sqlite_checks
                .then(Dialect::without_foreign_key_enforcement)
                .flatten()
                .map(Dialect::driver_name),
            body,
            tables: Vec::new(),
            rows: 0,
            foreign_keys_emitted: false,
        }
    }

    pub fn options(&self) -> GeneratorOptions {
        self.options
    }

    /// Generate every enabled fragment for one table.
    ///
    /// Fragments are committed to the body only when all of them succeed,
    /// so a caller may stop between tables and still finish a consistent
    /// body.
    pub fn process_table(&mut self, table: &Table) -> Result<()> {
        debug!(table = %table.name, "generating fragments");

        let mut truncate = Vec::new();
        let mut schema = Vec::new();
        let mut relations = Vec::new();
        let mut inserts = Vec::new();
        let mut emitted_foreign_keys = false;

        if self.options.truncate_table {
            truncate.push(truncate_statement(&table.name));
        }

        if self.options.create_schema {
            schema = schema_fragment(table, self.dialect);

            let mut foreign_keys = table.foreign_keys.clone();
            foreign_keys.extend(self.provider.foreign_keys(&table.name)?.iter().cloned());
            let fk_block = foreign_key_fragment(&table.name, &foreign_keys, self.excluded_driver);
            emitted_foreign_keys = !fk_block.is_empty();
            relations.extend(fk_block);

            let index_rows = self.provider.secondary_indexes(&table.name)?;
            let indexes = group_index_rows(&index_rows, &foreign_keys);
            relations.extend(index_fragment(&table.name, &indexes, self.excluded_driver));

            debug!(
                table = %table.name,
                foreign_keys = foreign_keys.len(),
                indexes = indexes.len(),
                "schema fragment ready"
            );
        }

        if self.options.insert_data {
            let mut rows = Vec::new();
            self.provider.scan_rows(table, &mut |row| {
                rows.push(insert_statement(&table.name, &row));
                Ok(())
            })?;
            debug!(table = %table.name, rows = rows.len(), "data fragment ready");

            if !rows.is_empty() {
                inserts.push(Statement::Comment(format!("Data for table '{}'", table.name)));
                self.rows += rows.len();
                inserts.extend(rows);
            }
        }

        self.body.truncate.extend(truncate);
        self.body.schema.extend(schema);
        self.body.relations.extend(relations);
        self.body.inserts.extend(inserts);
        self.foreign_keys_emitted |= emitted_foreign_keys;
        self.tables.push(table.name.clone());
        Ok(())
    }

    /// Whether any foreign key statement has been generated so far
    pub fn foreign_keys_emitted(&self) -> bool {
        self.foreign_keys_emitted
    }

    /// Statements accumulated so far
    pub fn body(&self) -> &MigrationBody {
        &self.body
    }

    /// Render the body; consumes the generator
    pub fn finish(self) -> GeneratedCode {
        GeneratedCode {
            up: self.body.render(BODY_INDENT),
            tables: self.tables,
            rows: self.rows,
            foreign_keys_emitted: self.foreign_keys_emitted,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{foreign_key, MemoryProvider};
    use crate::schema::{Column, IndexRow, Row};

    fn provider(dialect: Dialect) -> MemoryProvider {
        MemoryProvider::new(dialect)
            .with_table(
                Table::new("post")
                    .with_column(Column::new("id", "int").not_null().primary_key().auto_increment())
                    .with_column(Column::new("author_id", "int"))
                    .with_column(Column::new("slug", "varchar(64)"))
                    .with_foreign_key(foreign_key("author_id", "user", "id")),
            )
            .with_indexes(vec![
                IndexRow::new("author", "author_id", true),
                IndexRow::new("slug_unique", "slug", false),
            ])
            .with_rows(vec![Row::new().with("id", Some("1")).with("author_id", None).with("slug", Some("a$b"))])
    }

    fn generate(provider: &MemoryProvider, options: GeneratorOptions) -> GeneratedCode {
        let tables = provider.list_tables(&crate::filter::TableFilter::all()).unwrap();
        let mut generator = CodeGenerator::new(provider, options);
        for table in &tables {
            generator.process_table(table).unwrap();
        }
        generator.finish()
    }

    #[test]
    fn test_sections_in_order() {
        let options = GeneratorOptions {
            truncate_table: true,
            ..Default::default()
        };
        let code = generate(&provider(Dialect::MySql), options);

        let truncate = code.up.find("truncateTable").unwrap();
        let create = code.up.find("createTable").unwrap();
        let fk = code.up.find("addForeignKey").unwrap();
        let index = code.up.find("createIndex").unwrap();
        let insert = code.up.find("insert(").unwrap();
        assert!(truncate < create && create < fk && fk < index && index < insert);
        assert!(code.foreign_keys_emitted);
        assert_eq!(code.rows, 1);
    }

    #[test]
    fn test_foreign_key_columns_are_not_indexed_again() {
        let code = generate(&provider(Dialect::MySql), GeneratorOptions::default());
        assert!(code.up.contains("$this->createIndex('post_1', 'post', 'slug', true);"));
        assert!(!code.up.contains("'author_id', false"));
    }

    #[test]
    fn test_toggle_only_for_supporting_dialect() {
        let options = GeneratorOptions {
            foreign_key_checks: false,
            ..Default::default()
        };

        let mysql = generate(&provider(Dialect::MySql), options);
        assert!(mysql.up.contains("SET FOREIGN_KEY_CHECKS = 0;"));
        assert!(mysql.up.trim_end().ends_with("$this->execute('SET FOREIGN_KEY_CHECKS = 1;');"));

        let postgres = generate(&provider(Dialect::Postgres), options);
        assert!(!postgres.up.contains("FOREIGN_KEY_CHECKS"));
        assert!(postgres.up.contains("$options = '';"));
    }

    #[test]
    fn test_relations_skipped_where_foreign_keys_are_ignored() {
        let options = GeneratorOptions {
            sqlite_checks: true,
            ..Default::default()
        };
        let p = provider(Dialect::MySql);
        let generator = CodeGenerator::new(&p, options);
        assert_eq!(generator.excluded_driver, Some("sqlite"));

        let code = generate(&p, options);
        assert_eq!(
            code.up.matches("getDriverName() !== 'sqlite'").count(),
            2
        );
        assert!(CodeGenerator::new(&p, GeneratorOptions::default()).excluded_driver.is_none());
    }

    #[test]
    fn test_schema_disabled_skips_relations() {
        let options = GeneratorOptions {
            create_schema: false,
            ..Default::default()
        };
        let p = provider(Dialect::MySql);
        let code = generate(&p, options);

        assert!(!code.up.contains("createTable"));
        assert!(!code.foreign_keys_emitted);
        assert_eq!(p.calls().foreign_keys, 0);
        assert_eq!(p.calls().secondary_indexes, 0);
    }

    #[test]
    fn test_failed_table_leaves_body_untouched() {
        let p = provider(Dialect::MySql).failing_on("post");
        let table = p.list_tables(&crate::filter::TableFilter::all()).unwrap().remove(0);

        let mut generator = CodeGenerator::new(&p, GeneratorOptions::default());
        let before = generator.body().clone();
        assert!(generator.process_table(&table).is_err());
        assert_eq!(generator.body(), &before);
        assert!(!generator.foreign_keys_emitted());
    }
}
