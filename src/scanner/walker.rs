//! Directory listing for scans.

use crate::{Error, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Directory names never descended into, besides hidden ones.
pub const DEFAULT_SKIP_DIRS: &[&str] = &[
    "__pycache__",
    "target",
    "build",
    "dist",
    "node_modules",
    "venv",
    "out",
    "site-packages",
];

/// Decides which subdirectories a recursive scan skips.
#[derive(Debug, Clone, Default)]
pub struct SkipRules {
    extra: Vec<String>,
}

impl SkipRules {
    /// Adds directory names to skip on top of the defaults.
    #[must_use]
    pub fn with_extra<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extra.extend(names.into_iter().map(Into::into));
        self
    }

    /// True for hidden, build and cache directories.
    #[must_use]
    pub fn should_skip(&self, name: &str) -> bool {
        name.starts_with('.')
            || name.ends_with(".egg-info")
            || DEFAULT_SKIP_DIRS.contains(&name)
            || self.extra.iter().any(|extra| extra == name)
    }
}

/// Files and subdirectories directly inside a directory, each sorted by path.
#[derive(Debug, Default)]
pub struct DirListing {
    /// Regular files.
    pub files: Vec<PathBuf>,
    /// Subdirectories not filtered by the skip rules.
    pub dirs: Vec<PathBuf>,
}

/// Lists `dir` one level deep.
///
/// # Errors
///
/// Returns a storage error if the directory cannot be read.
pub fn list_dir(dir: &Path, rules: &SkipRules) -> Result<DirListing> {
    let mut listing = DirListing::default();
    let entries = fs::read_dir(dir).map_err(|e| Error::storage("read_source_dir", e))?;

    for entry in entries {
        let entry = entry.map_err(|e| Error::storage("read_source_dir_entry", e))?;
        let file_type = entry
            .file_type()
            .map_err(|e| Error::storage("read_source_file_type", e))?;
        let path = entry.path();

        if file_type.is_dir() {
            let skip = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_none_or(|name| rules.should_skip(name));
            if skip {
                tracing::trace!(path = %path.display(), "Skipping directory");
            } else {
                listing.dirs.push(path);
            }
        } else if file_type.is_file() {
            listing.files.push(path);
        }
    }

    listing.files.sort();
    listing.dirs.sort();
    Ok(listing)
}
