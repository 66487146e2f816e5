//! The consumer-facing facade over store, scanner, resolver and history.

use super::history::{
    DiffReport, HistoryManager, HistoryQuery, RevertOutcome, RevisionView, VersionEntry,
};
use super::resolver::{KeyResolver, PromptKey, Resolved};
use crate::config::PromptreeConfig;
use crate::git::GitBackend;
use crate::models::{Document, KeyPath, SENTINEL};
use crate::rendering;
use crate::scanner::{ScanPolicy, ScanReport, SkipRules, StructuralScanner};
use crate::storage::{CommitMessage, TemplateStore};
use crate::{Error, Result};
use std::collections::HashMap;
use std::hash::BuildHasher;
use std::path::Path;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// A version-controlled prompt store.
///
/// Mutations (init, scan, set, delete, revert) hold the write side of an
/// in-process gate for their whole load-modify-save cycle; reads hold the
/// read side, so they never observe a half-finished save. Cross-process
/// coordination is left to git's own locking.
///
/// # Example
///
/// ```rust,ignore
/// use promptree::{PromptKey, PromptVault, PromptreeConfig};
/// use std::collections::HashMap;
///
/// let vault = PromptVault::open(&PromptreeConfig::default())?;
/// let vars = HashMap::from([("name".to_string(), "World".to_string())]);
/// let text = vault.get_rendered(&PromptKey::parse("pkg.mod.Cls.fn")?, &vars)?;
/// ```
pub struct PromptVault {
    store: TemplateStore,
    scanner: StructuralScanner,
    gate: RwLock<()>,
    history_limit: Option<usize>,
}

impl PromptVault {
    /// Creates a vault from its parts.
    #[must_use]
    pub fn new(store: TemplateStore, scanner: StructuralScanner) -> Self {
        Self {
            store,
            scanner,
            gate: RwLock::new(()),
            history_limit: None,
        }
    }

    /// Opens the vault described by `config`, backed by git.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if the configured store file is not a
    /// relative path inside the repository.
    pub fn open(config: &PromptreeConfig) -> Result<Self> {
        let store = TemplateStore::new(
            config.repo_path.clone(),
            &config.store_file,
            Arc::new(GitBackend::new()),
        )?;
        let scanner = StructuralScanner::for_language(config.scan.language)
            .with_skip_rules(SkipRules::default().with_extra(config.scan.skip_dirs.clone()));

        Ok(Self::new(store, scanner).with_history_limit(config.history.max_results))
    }

    /// Sets the listing limit used when a history query names none.
    #[must_use]
    pub const fn with_history_limit(mut self, limit: Option<usize>) -> Self {
        self.history_limit = limit;
        self
    }

    /// The underlying store.
    #[must_use]
    pub const fn store(&self) -> &TemplateStore {
        &self.store
    }

    /// Makes sure the repository exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the repository cannot be created.
    pub fn init(&self) -> Result<()> {
        let _guard = self.write()?;
        self.store.init()
    }

    /// Loads the live document.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the document is unreadable.
    pub fn load(&self) -> Result<Document> {
        let _guard = self.read()?;
        self.store.load()
    }

    /// Resolves a key to its template.
    ///
    /// # Errors
    ///
    /// Load errors, plus the resolution errors of [`KeyResolver::resolve`].
    pub fn get_prompt(&self, key: &PromptKey) -> Result<Resolved> {
        let document = self.load()?;
        KeyResolver::new(&document).resolve(key)
    }

    /// Renders a template with exactly its placeholder variables.
    ///
    /// # Errors
    ///
    /// Returns [`Error::VariableMismatch`] if the names differ from the placeholders.
    pub fn render<S: BuildHasher>(
        &self,
        template: &str,
        variables: &HashMap<String, String, S>,
    ) -> Result<String> {
        rendering::render(template, variables)
    }

    /// Resolves a key and renders its template.
    ///
    /// # Errors
    ///
    /// Any error of [`PromptVault::get_prompt`] or [`PromptVault::render`].
    pub fn get_rendered<S: BuildHasher>(
        &self,
        key: &PromptKey,
        variables: &HashMap<String, String, S>,
    ) -> Result<String> {
        let resolved = self.get_prompt(key)?;
        self.render(&resolved.template, variables)
    }

    /// Lists leaves, optionally under a prefix and only unauthored ones.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the document is unreadable.
    pub fn list_keys(
        &self,
        prefix: Option<&KeyPath>,
        unauthored_only: bool,
    ) -> Result<Vec<(KeyPath, String)>> {
        let document = self.load()?;
        let leaves = match prefix {
            Some(prefix) => document.leaves_under(prefix),
            None => document.leaves(),
        };
        Ok(leaves
            .into_iter()
            .filter(|(_, value)| !unauthored_only || *value == SENTINEL)
            .map(|(key, value)| (key, value.to_string()))
            .collect())
    }

    /// Scans a source directory into the document and commits the result.
    ///
    /// # Errors
    ///
    /// Scan errors leave the document and history untouched; save errors are
    /// propagated.
    #[tracing::instrument(skip(self, dir, message), fields(dir = %dir.display()))]
    pub fn scan(
        &self,
        dir: &Path,
        policy: ScanPolicy,
        recursive: bool,
        message: &CommitMessage,
    ) -> Result<ScanReport> {
        let _guard = self.write()?;
        let mut document = self.store.load()?;
        let before = document.clone();
        let report = self.scanner.scan(&mut document, dir, policy, recursive)?;

        if document != before || !self.store.path().exists() {
            self.store.save(&document, message)?;
        } else {
            tracing::debug!("Scan changed nothing, skipping save");
        }
        Ok(report)
    }

    /// Assigns a template to an existing key and commits.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PolicyViolation`] if the key is not an existing leaf.
    #[tracing::instrument(skip(self, key, value, message), fields(key = %key))]
    pub fn set(&self, key: &KeyPath, value: &str, message: &CommitMessage) -> Result<Option<String>> {
        let _guard = self.write()?;
        self.store.set_value(key, value, message)
    }

    /// Deletes keys (leaves or subtrees) and commits. Returns what was deleted.
    ///
    /// # Errors
    ///
    /// Returns load or save errors.
    pub fn delete(&self, keys: &[KeyPath], message: &CommitMessage) -> Result<Vec<KeyPath>> {
        let _guard = self.write()?;
        self.store.delete_keys(keys, message)
    }

    /// Lists revisions. A query without a limit uses the configured one.
    ///
    /// # Errors
    ///
    /// Returns an error if history cannot be read.
    pub fn history(&self, query: &HistoryQuery) -> Result<Vec<VersionEntry>> {
        let _guard = self.read()?;
        let mut query = query.clone();
        if query.max_results.is_none() {
            query.max_results = self.history_limit;
        }
        HistoryManager::new(&self.store).list_versions(&query)
    }

    /// Shows a historical snapshot or one of its leaves.
    ///
    /// # Errors
    ///
    /// See [`HistoryManager::show_revision`].
    pub fn show_revision(&self, commit: &str, key: Option<&KeyPath>) -> Result<RevisionView> {
        let _guard = self.read()?;
        HistoryManager::new(&self.store).show_revision(commit, key)
    }

    /// Restores a revision (or one key of it) as a new commit.
    ///
    /// # Errors
    ///
    /// See [`HistoryManager::revert`].
    pub fn revert(
        &self,
        commit: &str,
        key: Option<&KeyPath>,
        message: &CommitMessage,
    ) -> Result<RevertOutcome> {
        let _guard = self.write()?;
        HistoryManager::new(&self.store).revert(commit, key, message)
    }

    /// Compares two revisions.
    ///
    /// # Errors
    ///
    /// See [`HistoryManager::diff`].
    pub fn diff(&self, commit_a: &str, commit_b: &str, key: Option<&KeyPath>) -> Result<DiffReport> {
        let _guard = self.read()?;
        HistoryManager::new(&self.store).diff(commit_a, commit_b, key)
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, ()>> {
        self.gate
            .read()
            .map_err(|_| Error::storage("acquire_read_lock", "lock poisoned"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, ()>> {
        self.gate
            .write()
            .map_err(|_| Error::storage("acquire_write_lock", "lock poisoned"))
    }
}
