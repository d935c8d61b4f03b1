//! Secondary index records built from raw per-column index rows.

use super::ForeignKeyMap;
use ahash::AHashMap;

/// One column of one secondary index, as a `SHOW INDEX` style query reports it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexRow {
    pub index_name: String,
    pub column_name: String,
    pub non_unique: bool,
}

impl IndexRow {
    pub fn new(index_name: impl Into<String>, column_name: impl Into<String>, non_unique: bool) -> Self {
        Self {
            index_name: index_name.into(),
            column_name: column_name.into(),
            non_unique,
        }
    }
}

/// Index definition synthesized from grouped rows
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Index {
    /// `index_<first column observed>`
    pub name: String,
    /// Columns in the order the rows reported them
    pub columns: Vec<String>,
    /// Whether this is a unique index
    pub is_unique: bool,
}

/// Group raw index rows by index name, in order of first appearance.
///
/// Rows whose column is constrained by a foreign key are dropped before
/// grouping; an index made only of such columns disappears entirely.
/// Uniqueness is taken from the first surviving row of each group.
pub fn group_index_rows(rows: &[IndexRow], foreign_keys: &ForeignKeyMap) -> Vec<Index> {
    let mut positions: AHashMap<&str, usize> = AHashMap::new();
    let mut indexes: Vec<Index> = Vec::new();

    for row in rows {
        if foreign_keys.contains_column(&row.column_name) {
            continue;
        }

        let pos = *positions.entry(row.index_name.as_str()).or_insert_with(|| {
            indexes.push(Index {
                name: format!("index_{}", row.column_name),
                columns: Vec::new(),
                is_unique: !row.non_unique,
            });
            indexes.len() - 1
        });
        indexes[pos].columns.push(row.column_name.clone());
    }

    indexes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ForeignKey;

    #[test]
    fn test_groups_composite_unique_index() {
        let rows = vec![
            IndexRow::new("ix1", "a", false),
            IndexRow::new("ix1", "b", false),
        ];
        let indexes = group_index_rows(&rows, &ForeignKeyMap::new());

        assert_eq!(indexes.len(), 1);
        assert_eq!(indexes[0].name, "index_a");
        assert_eq!(indexes[0].columns, vec!["a", "b"]);
        assert!(indexes[0].is_unique);
    }

    #[test]
    fn test_preserves_first_appearance_order() {
        let rows = vec![
            IndexRow::new("by_slug", "slug", false),
            IndexRow::new("by_date", "created_at", true),
            IndexRow::new("by_slug", "lang", false),
        ];
        let indexes = group_index_rows(&rows, &ForeignKeyMap::new());

        let names: Vec<_> = indexes.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["index_slug", "index_created_at"]);
        assert_eq!(indexes[0].columns, vec!["slug", "lang"]);
        assert!(!indexes[1].is_unique);
    }

    #[test]
    fn test_skips_foreign_key_columns() {
        let fks: ForeignKeyMap = vec![ForeignKey {
            column: "user_id".to_string(),
            referenced_table: "users".to_string(),
            referenced_column: "id".to_string(),
            on_delete: None,
            on_update: None,
        }]
        .into_iter()
        .collect();

        let rows = vec![
            IndexRow::new("fk_user", "user_id", true),
            IndexRow::new("user_title", "user_id", true),
            IndexRow::new("user_title", "title", true),
        ];
        let indexes = group_index_rows(&rows, &fks);

        assert_eq!(indexes.len(), 1);
        assert_eq!(indexes[0].name, "index_title");
        assert_eq!(indexes[0].columns, vec!["title"]);
    }

    #[test]
    fn test_no_rows_no_indexes() {
        assert!(group_index_rows(&[], &ForeignKeyMap::new()).is_empty());
    }
}
