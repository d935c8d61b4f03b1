//! The migration class wrapped around a generated `up()` body.

use super::name::MigrationName;
use crate::codegen::escape_double_quoted;

/// Render a complete `CDbMigration` class file
pub fn render_migration(name: &MigrationName, up_body: &str) -> String {
    let id = name.id();
    let down_message = escape_double_quoted(&format!("{id} does not support migration down."));

    let mut out = String::with_capacity(up_body.len() + 256);
    out.push_str("<?php\n\n");
    out.push_str(&format!("class {id} extends CDbMigration\n{{\n"));
    out.push_str("  public function up()\n  {\n");
    out.push_str(up_body);
    if !up_body.is_empty() && !up_body.ends_with('\n') {
        out.push('\n');
    }
    out.push_str("  }\n\n");
    out.push_str("  public function down()\n  {\n");
    out.push_str(&format!("    echo \"{down_message}\\n\";\n"));
    out.push_str("    return false;\n");
    out.push_str("  }\n");
    out.push_str("}\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_render_migration() {
        let at = NaiveDate::from_ymd_opt(2024, 2, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        let name = MigrationName::new("seed", at).unwrap();
        let php = render_migration(&name, "    $options = '';\n");

        assert_eq!(
            php,
            "<?php\n\n\
             class m240201_120000_seed extends CDbMigration\n{\n\
             \x20 public function up()\n  {\n\
             \x20   $options = '';\n\
             \x20 }\n\n\
             \x20 public function down()\n  {\n\
             \x20   echo \"m240201_120000_seed does not support migration down.\\n\";\n\
             \x20   return false;\n\
             \x20 }\n\
             }\n"
        );
    }
}
