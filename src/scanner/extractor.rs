//! The seam between the scanner and source-language grammars.

use super::{PythonExtractor, RustExtractor};
use crate::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// One `(group, slot)` pair found in a source file.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceUnit {
    /// Class-like construct name.
    pub group: String,
    /// Function-like construct name.
    pub slot: String,
}

impl SourceUnit {
    /// Creates a unit.
    #[must_use]
    pub fn new(group: impl Into<String>, slot: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            slot: slot.into(),
        }
    }
}

/// Extracts the ordered `(group, slot)` skeleton of a source file.
pub trait SourceUnitExtractor: Send + Sync {
    /// Language name for logs.
    fn language(&self) -> SourceLanguage;

    /// True if the file is a source file this extractor reads.
    fn accepts(&self, path: &Path) -> bool;

    /// True for package entry-point files, which never contribute a file stem.
    fn is_entry_point(&self, path: &Path) -> bool;

    /// Extracts units in source order with duplicates removed.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::SourceParse`] if the source is not well formed.
    fn extract(&self, path: &Path, source: &str) -> Result<Vec<SourceUnit>>;
}

/// Supported source languages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceLanguage {
    /// Python: classes and their methods.
    #[default]
    Python,
    /// Rust: impl/trait blocks and their fns.
    Rust,
}

impl SourceLanguage {
    /// Returns the language as a string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Python => "python",
            Self::Rust => "rust",
        }
    }

    /// Parses a language from a string.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "python" | "py" => Some(Self::Python),
            "rust" | "rs" => Some(Self::Rust),
            _ => None,
        }
    }

    /// The extractor for this language.
    #[must_use]
    pub fn extractor(self) -> Box<dyn SourceUnitExtractor> {
        match self {
            Self::Python => Box::new(PythonExtractor),
            Self::Rust => Box::new(RustExtractor),
        }
    }
}

impl fmt::Display for SourceLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Drops repeated units, keeping first occurrences in order.
pub(crate) fn dedup_units(units: Vec<SourceUnit>) -> Vec<SourceUnit> {
    let mut seen = std::collections::HashSet::new();
    units
        .into_iter()
        .filter(|unit| seen.insert(unit.clone()))
        .collect()
}
