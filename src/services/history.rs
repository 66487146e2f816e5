//! Revision history of the template document.
//!
//! History is linear and only ever extended: reverting commits the restored
//! content as a new revision, leaving the reverted-from revision reachable by
//! its own id.

use crate::git::CommitInfo;
use crate::models::{Document, KeyPath, LeafChange};
use crate::storage::{CommitMessage, TemplateStore};
use crate::{Error, Result};

/// Filters for [`HistoryManager::list_versions`].
#[derive(Debug, Clone)]
pub struct HistoryQuery {
    /// Only revisions where this key is a leaf, carrying its value.
    pub key: Option<KeyPath>,
    /// Maximum number of entries; `None` lists all.
    pub max_results: Option<usize>,
    /// Newest first (the default) or oldest first.
    pub newest_first: bool,
}

impl Default for HistoryQuery {
    fn default() -> Self {
        Self {
            key: None,
            max_results: None,
            newest_first: true,
        }
    }
}

/// One listed revision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionEntry {
    /// The commit.
    pub commit: CommitInfo,
    /// The key's value at this revision, when the query named a key.
    pub value: Option<String>,
}

/// A historical snapshot, whole or projected to one leaf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevisionView {
    /// The full document.
    Document(Document),
    /// A single template.
    Leaf {
        /// Leaf path.
        key: KeyPath,
        /// Template text.
        value: String,
    },
}

/// Result of a revert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevertOutcome {
    /// The new commit, or `None` if the live document already matched.
    pub commit: Option<String>,
    /// The single key restored, or `None` for a whole-document revert.
    pub key: Option<KeyPath>,
}

/// Result of comparing two revisions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffReport {
    /// Comparison of one key. Absent (or not a leaf) is `None`.
    Key {
        /// Compared key.
        key: KeyPath,
        /// True if both sides are in the same state.
        equal: bool,
        /// Value at the first commit.
        before: Option<String>,
        /// Value at the second commit.
        after: Option<String>,
    },
    /// Comparison of whole documents.
    Document {
        /// True if the documents are structurally identical.
        equal: bool,
        /// Leaf-level changes from the first commit to the second.
        changes: Vec<LeafChange>,
    },
}

impl DiffReport {
    /// True if the compared states are identical.
    #[must_use]
    pub const fn is_equal(&self) -> bool {
        match self {
            Self::Key { equal, .. } | Self::Document { equal, .. } => *equal,
        }
    }
}

/// Lists, shows, compares and reverts committed revisions of a store.
pub struct HistoryManager<'a> {
    store: &'a TemplateStore,
}

impl<'a> HistoryManager<'a> {
    /// Creates a manager for `store`.
    #[must_use]
    pub const fn new(store: &'a TemplateStore) -> Self {
        Self { store }
    }

    /// Loads and parses the document as of `commit`.
    ///
    /// # Errors
    ///
    /// - [`Error::NotFound`] for an unknown commit, or a commit without the document
    /// - [`Error::Validation`] if the snapshot does not parse
    pub fn snapshot(&self, commit: &str) -> Result<Document> {
        let bytes = self.store.backend().show(
            self.store.repo_dir(),
            commit,
            self.store.file_name(),
        )?;
        self.store.decode(&bytes).map_err(|e| {
            Error::Validation(format!("snapshot at commit '{commit}' is malformed: {e}"))
        })
    }

    /// Lists revisions of the document.
    ///
    /// Revisions whose snapshot is missing or malformed are skipped, as are
    /// revisions where the queried key is absent or not a leaf.
    ///
    /// # Errors
    ///
    /// Returns an error if history cannot be read from the backend.
    pub fn list_versions(&self, query: &HistoryQuery) -> Result<Vec<VersionEntry>> {
        let commits = self
            .store
            .backend()
            .log(self.store.repo_dir(), self.store.file_name())?;

        let mut entries: Vec<(usize, VersionEntry)> = Vec::with_capacity(commits.len());
        for (ordinal, commit) in commits.into_iter().enumerate() {
            let document = match self.snapshot(&commit.id) {
                Ok(document) => document,
                Err(Error::NotFound(_) | Error::Validation(_)) => {
                    tracing::debug!(commit = %commit.short_id(), "Skipping unreadable revision");
                    continue;
                },
                Err(e) => return Err(e),
            };

            let value = match &query.key {
                Some(key) => match document.leaf(key) {
                    Some(value) => Some(value.to_string()),
                    None => continue,
                },
                None => None,
            };
            entries.push((ordinal, VersionEntry { commit, value }));
        }

        entries.sort_by(|(a_ord, a), (b_ord, b)| {
            b.commit
                .timestamp
                .cmp(&a.commit.timestamp)
                .then(a_ord.cmp(b_ord))
        });
        if !query.newest_first {
            entries.reverse();
        }

        let mut versions: Vec<VersionEntry> = entries.into_iter().map(|(_, entry)| entry).collect();
        if let Some(limit) = query.max_results {
            versions.truncate(limit);
        }
        Ok(versions)
    }

    /// Shows the document, or one leaf of it, as of `commit`.
    ///
    /// # Errors
    ///
    /// As [`HistoryManager::snapshot`], plus [`Error::NotFound`] or
    /// [`Error::StructuralMismatch`] if `key` is not a leaf at that revision.
    pub fn show_revision(&self, commit: &str, key: Option<&KeyPath>) -> Result<RevisionView> {
        let document = self.snapshot(commit)?;
        match key {
            Some(key) => {
                let value = document
                    .get_leaf(key)
                    .map_err(|e| at_commit(e, commit))?
                    .to_string();
                Ok(RevisionView::Leaf {
                    key: key.clone(),
                    value,
                })
            },
            None => Ok(RevisionView::Document(document)),
        }
    }

    /// Restores the document, or one leaf, from `commit` as a new revision.
    ///
    /// A single-key revert only overwrites a leaf that already exists in the
    /// live document.
    ///
    /// # Errors
    ///
    /// - As [`HistoryManager::show_revision`]
    /// - [`Error::PolicyViolation`] if the key is not a live leaf
    /// - Any error saving the document
    #[tracing::instrument(skip(self, message))]
    pub fn revert(
        &self,
        commit: &str,
        key: Option<&KeyPath>,
        message: &CommitMessage,
    ) -> Result<RevertOutcome> {
        let snapshot = self.snapshot(commit)?;

        let restored = match key {
            Some(key) => {
                let value = snapshot.get_leaf(key).map_err(|e| at_commit(e, commit))?;
                let mut live = self.store.load()?;
                if !live.set_nested(key, value) {
                    return Err(Error::PolicyViolation(format!(
                        "'{key}' is not an existing template in the live document"
                    )));
                }
                live
            },
            None => snapshot,
        };

        let new_commit = self.store.save(&restored, message)?;
        tracing::info!(from = %commit, commit = ?new_commit, "Reverted");

        Ok(RevertOutcome {
            commit: new_commit,
            key: key.cloned(),
        })
    }

    /// Compares two revisions, whole or at one key.
    ///
    /// # Errors
    ///
    /// Returns the snapshot error if one side cannot be loaded, or a single
    /// [`Error::Validation`] naming both failures if neither can.
    pub fn diff(&self, commit_a: &str, commit_b: &str, key: Option<&KeyPath>) -> Result<DiffReport> {
        let (before, after) = match (self.snapshot(commit_a), self.snapshot(commit_b)) {
            (Ok(a), Ok(b)) => (a, b),
            (Err(err_a), Err(err_b)) => {
                return Err(Error::Validation(format!(
                    "cannot compare revisions: '{commit_a}': {err_a}; '{commit_b}': {err_b}"
                )));
            },
            (Err(e), Ok(_)) | (Ok(_), Err(e)) => return Err(e),
        };

        Ok(match key {
            Some(key) => {
                let before = before.leaf(key).map(str::to_string);
                let after = after.leaf(key).map(str::to_string);
                DiffReport::Key {
                    key: key.clone(),
                    equal: before == after,
                    before,
                    after,
                }
            },
            None => DiffReport::Document {
                equal: before == after,
                changes: before.leaf_changes(&after),
            },
        })
    }
}

fn at_commit(error: Error, commit: &str) -> Error {
    match error {
        Error::NotFound(what) => Error::NotFound(format!("{what} at commit '{commit}'")),
        other => other,
    }
}
