//! Table selection by name prefix.

/// Decides which tables take part in a dump run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableFilter {
    prefixes: Vec<String>,
    skip_reserved: bool,
    reserved_name: String,
}

impl TableFilter {
    /// `prefixes` empty (or only empty strings) matches every table.
    pub fn new(prefixes: Vec<String>, skip_reserved: bool, reserved_name: impl Into<String>) -> Self {
        Self {
            prefixes,
            skip_reserved,
            reserved_name: reserved_name.into(),
        }
    }

    /// Build from a comma-separated prefix list such as `"tbl_,app_"`
    pub fn from_prefix_list(list: &str, skip_reserved: bool, reserved_name: impl Into<String>) -> Self {
        let prefixes = list.split(',').map(|p| p.trim().to_string()).collect();
        Self::new(prefixes, skip_reserved, reserved_name)
    }

    /// A filter that lets every table through
    pub fn all() -> Self {
        Self::new(Vec::new(), false, "")
    }

    pub fn prefixes(&self) -> &[String] {
        &self.prefixes
    }

    pub fn should_include(&self, table: &str) -> bool {
        if self.skip_reserved && table == self.reserved_name {
            return false;
        }

        self.prefixes.is_empty() || self.prefixes.iter().any(|p| table.starts_with(p.as_str()))
    }
}

impl Default for TableFilter {
    fn default() -> Self {
        Self::all()
    }
}
