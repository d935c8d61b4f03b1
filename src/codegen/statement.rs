//! Typed migration statements and their PHP rendering.

use super::php::{double_quoted, indent, single_quoted, value_literal};
use crate::schema::{ReferentialAction, Value};

/// One statement of a migration `up()` body
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    /// `// text`
    Comment(String),
    /// `$options = '...';`
    SetOptions(String),
    /// `$this->execute('...');`
    Execute(String),
    TruncateTable {
        table: String,
    },
    /// Column entries are `(name, resolved type)` pairs
    CreateTable {
        table: String,
        columns: Vec<(String, String)>,
        primary_key: Vec<String>,
    },
    AddForeignKey {
        name: String,
        table: String,
        column: String,
        referenced_table: String,
        referenced_column: String,
        on_delete: Option<ReferentialAction>,
        on_update: Option<ReferentialAction>,
    },
    CreateIndex {
        name: String,
        table: String,
        columns: Vec<String>,
        unique: bool,
    },
    Insert {
        table: String,
        values: Vec<(String, Value)>,
    },
    /// Opens a block skipped when the runtime connection uses this driver
    UnlessDriver(String),
    /// Closes the innermost [`Statement::UnlessDriver`] block
    EndIf,
}

impl Statement {
    /// Append this statement's lines to `out`; `level` is the indent level
    /// of the statement itself and is updated by block statements.
    fn render_into(&self, out: &mut String, level: &mut usize) {
        let pad = indent(*level);
        let inner = indent(*level + 1);

        match self {
            Statement::Comment(text) => {
                out.push_str(&format!("{pad}// {text}\n"));
            }
            Statement::SetOptions(options) => {
                out.push_str(&format!("{pad}$options = {};\n", single_quoted(options)));
            }
            Statement::Execute(sql) => {
                out.push_str(&format!("{pad}$this->execute({});\n", single_quoted(sql)));
            }
            Statement::TruncateTable { table } => {
                out.push_str(&format!("{pad}$this->truncateTable({});\n", double_quoted(table)));
            }
            Statement::CreateTable {
                table,
                columns,
                primary_key,
            } => {
                out.push_str(&format!("{pad}$this->createTable({}, array(\n", double_quoted(table)));
                for (name, column_type) in columns {
                    out.push_str(&format!(
                        "{inner}{}=>{},\n",
                        double_quoted(name),
                        double_quoted(column_type)
                    ));
                }
                if !primary_key.is_empty() {
                    let keys: Vec<String> = primary_key.iter().map(|c| format!("`{c}`")).collect();
                    let clause = format!("PRIMARY KEY ({})", keys.join(","));
                    out.push_str(&format!("{inner}{},\n", double_quoted(&clause)));
                }
                out.push_str(&format!("{pad}), $options);\n"));
            }
            Statement::AddForeignKey {
                name,
                table,
                column,
                referenced_table,
                referenced_column,
                on_delete,
                on_update,
            } => {
                out.push_str(&format!(
                    "{pad}$this->addForeignKey({}, {}, {}, {}, {}, {}, {});\n",
                    single_quoted(name),
                    single_quoted(table),
                    single_quoted(column),
                    single_quoted(referenced_table),
                    single_quoted(referenced_column),
                    action_literal(*on_delete),
                    action_literal(*on_update),
                ));
            }
            Statement::CreateIndex {
                name,
                table,
                columns,
                unique,
            } => {
                out.push_str(&format!(
                    "{pad}$this->createIndex({}, {}, {}, {});\n",
                    single_quoted(name),
                    single_quoted(table),
                    single_quoted(&columns.join(",")),
                    unique
                ));
            }
            Statement::Insert { table, values } => {
                out.push_str(&format!("{pad}$this->insert({}, array(\n", double_quoted(table)));
                for (column, value) in values {
                    out.push_str(&format!(
                        "{inner}{}=>{},\n",
                        double_quoted(column),
                        value_literal(value)
                    ));
                }
                out.push_str(&format!("{pad}));\n"));
            }
            Statement::UnlessDriver(driver) => {
                out.push_str(&format!(
                    "{pad}if ($this->getDbConnection()->getDriverName() !== {}):\n",
                    single_quoted(driver)
                ));
                *level += 1;
            }
            Statement::EndIf => {
                *level = level.saturating_sub(1);
                out.push_str(&format!("{}endif;\n", indent(*level)));
            }
        }
    }
}

fn action_literal(action: Option<ReferentialAction>) -> String {
    action.map_or_else(|| "null".to_string(), |a| single_quoted(a.as_sql()))
}

/// Render statements starting at indent `level`
pub fn render_statements(statements: &[Statement], level: usize) -> String {
    let mut out = String::new();
    let mut level = level;
    for statement in statements {
        statement.render_into(&mut out, &mut level);
    }
    out
}

/// Sections of an `up()` body, rendered in field order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationBody {
    pub preamble: Vec<Statement>,
    pub truncate: Vec<Statement>,
    pub schema: Vec<Statement>,
    pub relations: Vec<Statement>,
    pub inserts: Vec<Statement>,
    pub epilogue: Vec<Statement>,
}

impl MigrationBody {
    pub fn sections(&self) -> [&[Statement]; 6] {
        [
            &self.preamble,
            &self.truncate,
            &self.schema,
            &self.relations,
            &self.inserts,
            &self.epilogue,
        ]
    }

    /// Render every non-empty section, separated by blank lines
    pub fn render(&self, level: usize) -> String {
        self.sections()
            .iter()
            .filter(|section| !section.is_empty())
            .map(|section| render_statements(section, level))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_create_table() {
        let stmt = Statement::CreateTable {
            table: "user".to_string(),
            columns: vec![
                ("id".to_string(), "int(11) NOT NULL AUTO_INCREMENT".to_string()),
                ("name".to_string(), "varchar(50)".to_string()),
            ],
            primary_key: vec!["id".to_string()],
        };
        assert_eq!(
            render_statements(&[stmt], 2),
            "    $this->createTable(\"user\", array(\n\
             \x20     \"id\"=>\"int(11) NOT NULL AUTO_INCREMENT\",\n\
             \x20     \"name\"=>\"varchar(50)\",\n\
             \x20     \"PRIMARY KEY (`id`)\",\n\
             \x20   ), $options);\n"
        );
    }

    #[test]
    fn test_render_foreign_key_with_missing_action() {
        let stmt = Statement::AddForeignKey {
            name: "fk_post_1".to_string(),
            table: "post".to_string(),
            column: "author_id".to_string(),
            referenced_table: "user".to_string(),
            referenced_column: "id".to_string(),
            on_delete: Some(ReferentialAction::SetNull),
            on_update: None,
        };
        assert_eq!(
            render_statements(&[stmt], 0),
            "$this->addForeignKey('fk_post_1', 'post', 'author_id', 'user', 'id', 'SET NULL', null);\n"
        );
    }

    #[test]
    fn test_render_insert_escapes_values() {
        let stmt = Statement::Insert {
            table: "note".to_string(),
            values: vec![
                ("body".to_string(), Value::from("say \"hi\" $name")),
                ("extra".to_string(), Value::Null),
                ("blob".to_string(), Value::Binary(vec![0xde, 0xad])),
            ],
        };
        assert_eq!(
            render_statements(&[stmt], 0),
            "$this->insert(\"note\", array(\n  \"body\"=>\"say \\\"hi\\\" \\$name\",\n  \"extra\"=>null,\n  \"blob\"=>\"\\xDE\\xAD\",\n));\n"
        );
    }

    #[test]
    fn test_driver_block_indents_its_body() {
        let statements = vec![
            Statement::UnlessDriver("sqlite".to_string()),
            Statement::CreateIndex {
                name: "t_1".to_string(),
                table: "t".to_string(),
                columns: vec!["a".to_string(), "b".to_string()],
                unique: true,
            },
            Statement::EndIf,
        ];
        assert_eq!(
            render_statements(&statements, 1),
            "  if ($this->getDbConnection()->getDriverName() !== 'sqlite'):\n\
             \x20   $this->createIndex('t_1', 't', 'a,b', true);\n\
             \x20 endif;\n"
        );
    }

    #[test]
    fn test_body_skips_empty_sections() {
        let body = MigrationBody {
            preamble: vec![Statement::SetOptions(String::new())],
            inserts: vec![Statement::Comment("Data".to_string())],
            ..Default::default()
        };
        assert_eq!(body.render(0), "$options = '';\n\n// Data\n");
    }
}
