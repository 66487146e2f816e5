//! Version control operations.
//!
//! The store depends on a narrow [`VersionControl`] seam (`init`, `add`,
//! `commit`, `log`, `show`); [`GitBackend`] implements it with `git2`.

mod backend;

pub use backend::GitBackend;

use crate::Result;
use chrono::{DateTime, Local, TimeZone, Utc};
use serde::Serialize;
use std::path::Path;

/// A commit that touched the persisted document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitInfo {
    /// Full commit identifier.
    pub id: String,
    /// Commit time, Unix epoch seconds.
    pub timestamp: i64,
    /// Commit message without trailing whitespace.
    pub message: String,
}

impl CommitInfo {
    /// Abbreviated identifier for display.
    #[must_use]
    pub fn short_id(&self) -> &str {
        self.id.get(..8).unwrap_or(&self.id)
    }

    /// Commit time as UTC, if representable.
    #[must_use]
    pub fn time(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.timestamp, 0).single()
    }

    /// Commit time formatted in the local timezone.
    #[must_use]
    pub fn local_time_string(&self) -> String {
        self.time().map_or_else(
            || self.timestamp.to_string(),
            |t| t.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string(),
        )
    }
}

/// Version-control operations the store relies on.
///
/// `dir` is the working-copy root and `file_name` is relative to it.
pub trait VersionControl: Send + Sync {
    /// Creates a repository at `dir` if none exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or repository cannot be created.
    fn init(&self, dir: &Path) -> Result<()>;

    /// Stages `file_name`.
    ///
    /// # Errors
    ///
    /// Returns an error if the repository cannot be opened or the file staged.
    fn add(&self, dir: &Path, file_name: &str) -> Result<()>;

    /// Commits whatever is staged.
    ///
    /// Returns `Ok(None)` when there is nothing to commit.
    ///
    /// # Errors
    ///
    /// Returns an error for any failure other than an empty commit.
    fn commit(&self, dir: &Path, message: &str) -> Result<Option<String>>;

    /// Lists commits touching `file_name`, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if history cannot be read.
    fn log(&self, dir: &Path, file_name: &str) -> Result<Vec<CommitInfo>>;

    /// Raw content of `file_name` as of `commit`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::NotFound`] for an unknown commit or a file absent
    /// at that commit, and a storage error for anything else.
    fn show(&self, dir: &Path, commit: &str, file_name: &str) -> Result<Vec<u8>>;
}
