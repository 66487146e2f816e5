//! Structural scanning.
//!
//! A scan walks a source directory, derives the key skeleton
//! `directory.file_stem.Group.slot` from every eligible file, and reconciles
//! it into a [`Document`] under one of two [`ScanPolicy`] values.
//!
//! Every file is parsed before the document is touched, so a parse failure
//! anywhere aborts the scan with the document unchanged.

mod extractor;
mod python;
mod rust;
mod walker;

pub use extractor::{SourceLanguage, SourceUnit, SourceUnitExtractor};
pub use python::PythonExtractor;
pub use rust::RustExtractor;
pub use walker::{DEFAULT_SKIP_DIRS, DirListing, SkipRules, list_dir};

use crate::models::{Document, InsertOutcome, KeyPath, Node, SENTINEL};
use crate::{Error, Result};
use std::fmt;
use std::fs;
use std::path::Path;

/// How a scanned skeleton is reconciled into the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScanPolicy {
    /// Additive: create missing slots with the sentinel, keep everything else.
    #[default]
    Merge,
    /// Rebuild the directory's subtree, keeping values only for slots still in source.
    HardReplace,
}

impl ScanPolicy {
    /// Returns the policy as a string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Merge => "merge",
            Self::HardReplace => "hard-replace",
        }
    }
}

impl fmt::Display for ScanPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Leaf paths discovered under one source directory.
#[derive(Debug, Clone)]
pub struct Skeleton {
    /// Single-segment path named after the scanned directory.
    pub root: KeyPath,
    /// Full leaf paths in discovery order.
    pub leaves: Vec<KeyPath>,
    /// Number of source files parsed.
    pub files_scanned: usize,
}

/// Outcome of a scan.
#[derive(Debug, Clone)]
pub struct ScanReport {
    /// Policy that was applied.
    pub policy: ScanPolicy,
    /// Whether subdirectories were included.
    pub recursive: bool,
    /// Path of the reconciled subtree.
    pub root: KeyPath,
    /// Merge: newly created paths. Hard replace: every path present afterwards.
    pub keys: Vec<KeyPath>,
    /// Skeleton paths blocked by an existing node of the other kind.
    pub conflicts: Vec<KeyPath>,
    /// Number of source files parsed.
    pub files_scanned: usize,
}

/// Derives key skeletons from source trees and reconciles them into documents.
pub struct StructuralScanner {
    extractor: Box<dyn SourceUnitExtractor>,
    rules: SkipRules,
}

impl StructuralScanner {
    /// Creates a scanner around an extractor.
    #[must_use]
    pub fn new(extractor: Box<dyn SourceUnitExtractor>) -> Self {
        Self {
            extractor,
            rules: SkipRules::default(),
        }
    }

    /// Creates a scanner for one of the built-in languages.
    #[must_use]
    pub fn for_language(language: SourceLanguage) -> Self {
        Self::new(language.extractor())
    }

    /// Replaces the directory skip rules.
    #[must_use]
    pub fn with_skip_rules(mut self, rules: SkipRules) -> Self {
        self.rules = rules;
        self
    }

    /// Language of the underlying extractor.
    #[must_use]
    pub fn language(&self) -> SourceLanguage {
        self.extractor.language()
    }

    /// Parses the source tree at `dir` into leaf paths without touching any document.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidInput`] if `dir` is not a directory
    /// - [`Error::SourceParse`] if any eligible file fails to parse
    /// - [`Error::StorageIo`] if the tree cannot be read
    pub fn skeleton(&self, dir: &Path, recursive: bool) -> Result<Skeleton> {
        let root = KeyPath::from_segments([directory_segment(dir)?])?;
        let mut leaves = Vec::new();
        let mut files_scanned = 0;
        self.collect(dir, &root, recursive, &mut leaves, &mut files_scanned)?;
        Ok(Skeleton {
            root,
            leaves,
            files_scanned,
        })
    }

    /// Scans `dir` and reconciles the result into `document`.
    ///
    /// # Errors
    ///
    /// Any error from [`StructuralScanner::skeleton`]; the document is left
    /// unchanged in that case.
    #[tracing::instrument(skip(self, document, dir), fields(dir = %dir.display(), language = %self.language()))]
    pub fn scan(
        &self,
        document: &mut Document,
        dir: &Path,
        policy: ScanPolicy,
        recursive: bool,
    ) -> Result<ScanReport> {
        let skeleton = self.skeleton(dir, recursive)?;
        let mut keys = Vec::new();
        let mut conflicts = Vec::new();

        match policy {
            ScanPolicy::Merge => {
                for leaf in skeleton.leaves {
                    match document.insert_leaf_if_absent(&leaf, SENTINEL) {
                        InsertOutcome::Created => keys.push(leaf),
                        InsertOutcome::Existing => {},
                        InsertOutcome::Conflict => {
                            tracing::warn!(key = %leaf, "Existing node blocks scanned slot, skipped");
                            conflicts.push(leaf);
                        },
                    }
                }
            },
            ScanPolicy::HardReplace => {
                let mut rebuilt = Document::new();
                for leaf in skeleton.leaves {
                    let value = document.leaf(&leaf).unwrap_or(SENTINEL);
                    match rebuilt.insert_leaf_if_absent(&leaf, value) {
                        InsertOutcome::Created => keys.push(leaf),
                        InsertOutcome::Existing => {},
                        InsertOutcome::Conflict => {
                            tracing::warn!(key = %leaf, "Scanned slot collides with another, skipped");
                            conflicts.push(leaf);
                        },
                    }
                }
                let subtree = rebuilt
                    .root()
                    .get(skeleton.root.last())
                    .cloned()
                    .unwrap_or_else(Node::interior);
                document.replace_subtree(&skeleton.root, subtree)?;
            },
        }

        tracing::info!(
            root = %skeleton.root,
            %policy,
            recursive,
            files = skeleton.files_scanned,
            keys = keys.len(),
            conflicts = conflicts.len(),
            "Scan reconciled"
        );

        Ok(ScanReport {
            policy,
            recursive,
            root: skeleton.root,
            keys,
            conflicts,
            files_scanned: skeleton.files_scanned,
        })
    }

    fn collect(
        &self,
        dir: &Path,
        prefix: &KeyPath,
        recursive: bool,
        leaves: &mut Vec<KeyPath>,
        files_scanned: &mut usize,
    ) -> Result<()> {
        let listing = list_dir(dir, &self.rules)?;

        for file in &listing.files {
            if !self.extractor.accepts(file) || self.extractor.is_entry_point(file) {
                continue;
            }
            let Some(stem) = file.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let Ok(file_key) = prefix.child(stem) else {
                tracing::warn!(path = %file.display(), "File stem is not a valid key segment, skipped");
                continue;
            };

            let bytes = fs::read(file).map_err(|e| Error::storage("read_source", e))?;
            let source = String::from_utf8(bytes).map_err(|e| Error::SourceParse {
                path: file.display().to_string(),
                cause: e.to_string(),
            })?;
            let units = self.extractor.extract(file, &source)?;
            *files_scanned += 1;
            tracing::debug!(path = %file.display(), units = units.len(), "Extracted source units");

            for unit in units {
                match file_key
                    .child(&unit.group)
                    .and_then(|group| group.child(&unit.slot))
                {
                    Ok(leaf) => leaves.push(leaf),
                    Err(e) => tracing::warn!(path = %file.display(), error = %e, "Skipped unit"),
                }
            }
        }

        if recursive {
            for sub in &listing.dirs {
                let Some(name) = sub.file_name().and_then(|n| n.to_str()) else {
                    continue;
                };
                let Ok(sub_key) = prefix.child(name) else {
                    tracing::warn!(path = %sub.display(), "Directory name is not a valid key segment, skipped");
                    continue;
                };
                self.collect(sub, &sub_key, true, leaves, files_scanned)?;
            }
        }
        Ok(())
    }
}

/// Name of the scanned directory, resolving `.` and relative paths.
fn directory_segment(dir: &Path) -> Result<String> {
    let canonical = dir.canonicalize().map_err(|e| {
        Error::InvalidInput(format!("cannot resolve source directory '{}': {e}", dir.display()))
    })?;
    if !canonical.is_dir() {
        return Err(Error::InvalidInput(format!(
            "'{}' is not a directory",
            dir.display()
        )));
    }
    canonical
        .file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .ok_or_else(|| {
            Error::InvalidInput(format!(
                "cannot derive a key segment from '{}'",
                canonical.display()
            ))
        })
}
