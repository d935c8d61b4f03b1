//! Unit tests for DDL parsing across dump dialects.

use migration_dumper::schema::{
    parse_create_index, parse_foreign_keys, split_table_body, ReferentialAction, SchemaBuilder,
};

mod builder_tests {
    use super::*;

    #[test]
    fn test_mysql_create_table() {
        let mut builder = SchemaBuilder::new();
        builder.parse_create_table(
            "CREATE TABLE `orders` (
              `id` bigint unsigned NOT NULL AUTO_INCREMENT,
              `customer_id` int NOT NULL,
              `total` decimal(10,2) NOT NULL DEFAULT '0.00',
              `note` text,
              PRIMARY KEY (`id`),
              UNIQUE KEY `ref_idx` (`customer_id`,`total`),
              KEY `note_idx` (`note`(32)),
              CONSTRAINT `orders_customer` FOREIGN KEY (`customer_id`) REFERENCES `customer` (`id`)
            ) ENGINE=InnoDB",
        );

        let def = builder.get("ORDERS").unwrap();
        let names: Vec<_> = def.table.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["id", "customer_id", "total", "note"]);
        assert_eq!(def.table.primary_key(), vec!["id"]);

        let total = def.table.get_column("total").unwrap();
        assert_eq!(total.db_type, "decimal(10,2)");
        assert_eq!(total.default.as_deref(), Some("0.00"));

        let indexes: Vec<_> = def
            .index_rows
            .iter()
            .map(|r| (r.index_name.as_str(), r.column_name.as_str(), r.non_unique))
            .collect();
        assert_eq!(
            indexes,
            vec![
                ("ref_idx", "customer_id", false),
                ("ref_idx", "total", false),
                ("note_idx", "note", true),
            ]
        );
    }

    #[test]
    fn test_first_definition_wins() {
        let mut builder = SchemaBuilder::new();
        builder.parse_create_table("CREATE TABLE t (a INT)");
        builder.parse_create_table("CREATE TABLE t (b INT, c INT)");

        let tables = builder.build();
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].table.columns.len(), 1);
    }

    #[test]
    fn test_alter_table_adds_keys() {
        let mut builder = SchemaBuilder::new();
        builder.parse_create_table("CREATE TABLE `t` (`id` int(11) NOT NULL, `code` varchar(8) NOT NULL)");
        builder.parse_alter_table(
            "ALTER TABLE `t`\n  ADD PRIMARY KEY (`id`),\n  ADD UNIQUE KEY `code` (`code`)",
        );
        builder.parse_alter_table("ALTER TABLE `t`\n  MODIFY `id` int(11) NOT NULL AUTO_INCREMENT");

        let def = builder.get("t").unwrap();
        let id = def.table.get_column("id").unwrap();
        assert!(id.is_primary_key);
        assert!(id.auto_increment);
        assert_eq!(def.index_rows.len(), 1);
        assert_eq!(def.ddl.len(), 3);
    }

    #[test]
    fn test_create_index_attaches_to_table() {
        let mut builder = SchemaBuilder::new();
        builder.parse_create_table("CREATE TABLE public.users (id integer, email text)");
        assert_eq!(
            builder.parse_create_index("CREATE INDEX users_email ON public.users USING btree (email);"),
            Some("users".to_string())
        );
        assert_eq!(builder.parse_create_index("CREATE INDEX x ON missing (a);"), None);
        assert_eq!(builder.get("users").unwrap().index_rows.len(), 1);
    }

    #[test]
    fn test_sqlite_inline_primary_key() {
        let mut builder = SchemaBuilder::new();
        builder.parse_create_table(
            "CREATE TABLE notes (id INTEGER PRIMARY KEY AUTOINCREMENT, body TEXT NOT NULL)",
        );
        let def = builder.get("notes").unwrap();
        let id = def.table.get_column("id").unwrap();
        assert!(id.is_primary_key);
        assert!(!id.is_nullable);
        assert!(id.auto_increment);
    }
}

mod foreign_key_tests {
    use super::*;

    #[test]
    fn test_composite_key_pairs_columns() {
        let fks = parse_foreign_keys(
            "CREATE TABLE l (a int, b int, CONSTRAINT fk FOREIGN KEY (a, b) REFERENCES r (x, y) ON UPDATE CASCADE)",
        );
        assert_eq!(fks.len(), 2);
        assert_eq!((fks[1].column.as_str(), fks[1].referenced_column.as_str()), ("b", "y"));
        assert_eq!(fks[0].on_update, Some(ReferentialAction::Cascade));
        assert_eq!(fks[0].on_delete, None);
    }

    #[test]
    fn test_column_level_references() {
        let fks = parse_foreign_keys(
            "CREATE TABLE c (id INTEGER, post_id INTEGER REFERENCES post(id) ON DELETE SET NULL)",
        );
        assert_eq!(fks.len(), 1);
        assert_eq!(fks[0].column, "post_id");
        assert_eq!(fks[0].referenced_table, "post");
        assert_eq!(fks[0].on_delete, Some(ReferentialAction::SetNull));
    }

    #[test]
    fn test_schema_qualified_reference_in_alter() {
        let fks = parse_foreign_keys(
            "ALTER TABLE ONLY public.c ADD CONSTRAINT c_fk FOREIGN KEY (owner) REFERENCES public.\"user\"(id);",
        );
        assert_eq!(fks[0].referenced_table, "user");
    }

    #[test]
    fn test_no_foreign_keys() {
        assert!(parse_foreign_keys("CREATE TABLE t (id INT PRIMARY KEY)").is_empty());
        assert!(parse_foreign_keys("").is_empty());
    }
}

mod helper_tests {
    use super::*;

    #[test]
    fn test_split_table_body_respects_nesting() {
        let parts = split_table_body("a decimal(10,2), b varchar(5) DEFAULT 'x,y', KEY k (a, b)");
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[1].trim(), "b varchar(5) DEFAULT 'x,y'");
    }

    #[test]
    fn test_parse_create_index_unique() {
        let (table, rows) =
            parse_create_index("CREATE UNIQUE INDEX IF NOT EXISTS uq ON \"items\" (sku, lang)").unwrap();
        assert_eq!(table, "items");
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| !r.non_unique && r.index_name == "uq"));
    }
}
