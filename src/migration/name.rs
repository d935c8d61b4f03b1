//! Migration identifiers: `m<yymmdd_HHMMSS>_<label>`.

use crate::error::{DumpError, Result};
use chrono::NaiveDateTime;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

/// Label used when none is given
pub const DEFAULT_LABEL: &str = "dump";

static LABEL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]+$").unwrap());

/// Check a label against the class-name grammar.
pub fn validate_label(label: &str) -> Result<()> {
    if LABEL_RE.is_match(label) {
        Ok(())
    } else {
        Err(DumpError::InvalidMigrationLabel(label.to_string()))
    }
}

/// A validated migration identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationName {
    label: String,
    id: String,
}

impl MigrationName {
    pub fn new(label: &str, timestamp: NaiveDateTime) -> Result<Self> {
        validate_label(label)?;
        Ok(Self {
            label: label.to_string(),
            id: format!("m{}_{}", timestamp.format("%y%m%d_%H%M%S"), label),
        })
    }

    /// Identifier stamped with the current local time
    pub fn now(label: &str) -> Result<Self> {
        Self::new(label, chrono::Local::now().naive_local())
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Class name, e.g. `m240131_094500_dump`
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn file_name(&self) -> String {
        format!("{}.php", self.id)
    }
}

impl fmt::Display for MigrationName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 31)
            .unwrap()
            .and_hms_opt(9, 45, 7)
            .unwrap()
    }

    #[test]
    fn test_identifier_format() {
        let name = MigrationName::new("dump", at()).unwrap();
        assert_eq!(name.id(), "m240131_094507_dump");
        assert_eq!(name.file_name(), "m240131_094507_dump.php");
        assert_eq!(name.to_string(), name.id());
    }

    #[test]
    fn test_label_grammar() {
        for ok in ["dump", "_x", "Initial_Schema2", "ab"] {
            assert!(validate_label(ok).is_ok(), "{ok}");
        }
        for bad in ["1abc", "a", "", "with-dash", "sp ace", "x;"] {
            assert!(
                matches!(validate_label(bad), Err(DumpError::InvalidMigrationLabel(_))),
                "{bad}"
            );
        }
    }
}
