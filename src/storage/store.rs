//! The persisted template document and its commit protocol.

use super::DocumentFormat;
use crate::git::VersionControl;
use crate::models::{Document, KeyPath};
use crate::{Error, Result};
use chrono::Local;
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

/// How the commit message for a save is obtained.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CommitMessage {
    /// A generated message carrying the current local time.
    #[default]
    Default,
    /// Ask the configured [`MessagePrompt`]; a blank answer falls back to `Default`.
    Prompt,
    /// Use this text as-is.
    Custom(String),
}

impl CommitMessage {
    /// Maps an optional CLI argument: absent is `Default`, empty is `Prompt`.
    #[must_use]
    pub fn from_arg(arg: Option<String>) -> Self {
        match arg {
            None => Self::Default,
            Some(text) if text.trim().is_empty() => Self::Prompt,
            Some(text) => Self::Custom(text),
        }
    }

    /// The generated default message.
    #[must_use]
    pub fn default_text() -> String {
        format!(
            "Update prompts at {}",
            Local::now().format("%Y-%m-%d %H:%M:%S")
        )
    }
}

/// Source of interactively entered commit messages.
pub trait MessagePrompt: Send + Sync {
    /// Returns the entered message, or `None` if nothing was entered.
    ///
    /// # Errors
    ///
    /// Returns an error if the input cannot be read.
    fn ask(&self) -> Result<Option<String>>;
}

/// Reads one line from stdin after printing a prompt to stderr.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdinPrompt;

impl MessagePrompt for StdinPrompt {
    fn ask(&self) -> Result<Option<String>> {
        let mut stderr = io::stderr().lock();
        stderr
            .write_all(b"Commit message: ")
            .and_then(|()| stderr.flush())
            .map_err(|e| Error::storage("prompt_commit_message", e))?;

        let mut line = String::new();
        io::stdin()
            .lock()
            .read_line(&mut line)
            .map_err(|e| Error::storage("read_commit_message", e))?;

        let line = line.trim();
        Ok((!line.is_empty()).then(|| line.to_string()))
    }
}

/// A template document persisted as one file inside a version-controlled directory.
pub struct TemplateStore {
    /// Working-copy root handed to the backend.
    repo_dir: PathBuf,
    /// Document path relative to `repo_dir`, with `/` separators.
    file_name: String,
    /// Encoding derived from `file_name`.
    format: DocumentFormat,
    /// Version control collaborator.
    backend: Arc<dyn VersionControl>,
    /// Source of interactive commit messages.
    prompter: Arc<dyn MessagePrompt>,
}

impl TemplateStore {
    /// Creates a store for `repo_dir/file_name`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if `file_name` is empty, names no file (such as `.`), is absolute, or
    /// escapes `repo_dir`.
    pub fn new(
        repo_dir: impl Into<PathBuf>,
        file_name: &str,
        backend: Arc<dyn VersionControl>,
    ) -> Result<Self> {
        let relative = Path::new(file_name);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if file_name.trim().is_empty() || escapes {
            return Err(Error::InvalidInput(format!(
                "store file '{file_name}' must be a relative path inside the repository"
            )));
        }

        let file_name = relative
            .components()
            .filter_map(|c| match c {
                Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("/");
        if file_name.is_empty() {
            return Err(Error::InvalidInput(format!(
                "store file '{}' does not name a file",
                relative.display()
            )));
        }

        Ok(Self {
            repo_dir: repo_dir.into(),
            format: DocumentFormat::for_path(relative),
            file_name,
            backend,
            prompter: Arc::new(StdinPrompt),
        })
    }

    /// Replaces the interactive commit-message source.
    #[must_use]
    pub fn with_prompter(mut self, prompter: Arc<dyn MessagePrompt>) -> Self {
        self.prompter = prompter;
        self
    }

    /// Working-copy root.
    #[must_use]
    pub fn repo_dir(&self) -> &Path {
        &self.repo_dir
    }

    /// Document path relative to the working copy.
    #[must_use]
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Absolute (or cwd-relative) path of the document file.
    #[must_use]
    pub fn path(&self) -> PathBuf {
        self.repo_dir.join(&self.file_name)
    }

    /// Encoding used for the document.
    #[must_use]
    pub const fn format(&self) -> DocumentFormat {
        self.format
    }

    /// The version control backend.
    #[must_use]
    pub fn backend(&self) -> &Arc<dyn VersionControl> {
        &self.backend
    }

    /// Makes sure the working copy is a repository.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot initialize it.
    pub fn init(&self) -> Result<()> {
        self.backend.init(&self.repo_dir)
    }

    /// Loads the live document. A missing file is an empty document.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StorageIo`] if the file exists but cannot be read or parsed.
    pub fn load(&self) -> Result<Document> {
        let path = self.path();
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "Store file absent, starting empty");
                return Ok(Document::new());
            },
            Err(e) => return Err(Error::storage("read_document", e)),
        };
        self.format.decode(&bytes)
    }

    /// Decodes a historical snapshot with this store's format.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StorageIo`] if the snapshot does not parse.
    pub fn decode(&self, bytes: &[u8]) -> Result<Document> {
        self.format.decode(bytes)
    }

    /// Writes the whole document and commits it.
    ///
    /// The file is written to a sibling temp file and renamed into place.
    /// Returns the new commit id, or `None` when nothing changed.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be written or staged, or the
    /// commit fails for a reason other than there being nothing to commit.
    #[tracing::instrument(skip(self, document, message), fields(file = %self.file_name))]
    pub fn save(&self, document: &Document, message: &CommitMessage) -> Result<Option<String>> {
        let text = self.format.encode(document)?;
        self.write_atomic(&text)?;

        let message = match message {
            CommitMessage::Default => CommitMessage::default_text(),
            CommitMessage::Custom(text) => text.clone(),
            CommitMessage::Prompt => self
                .prompter
                .ask()?
                .unwrap_or_else(CommitMessage::default_text),
        };

        self.backend.add(&self.repo_dir, &self.file_name)?;
        let commit = self.backend.commit(&self.repo_dir, &message)?;
        match &commit {
            Some(id) => tracing::info!(commit = %id, message = %message, "Saved prompts"),
            None => tracing::debug!("Saved prompts, nothing new to commit"),
        }
        Ok(commit)
    }

    /// Overwrites an existing leaf and saves.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PolicyViolation`] (and writes nothing) if `path` is
    /// not already a leaf, plus any load/save error.
    pub fn set_value(
        &self,
        path: &KeyPath,
        value: &str,
        message: &CommitMessage,
    ) -> Result<Option<String>> {
        let mut document = self.load()?;
        if !document.set_nested(path, value) {
            return Err(Error::PolicyViolation(format!(
                "'{path}' is not an existing template; run a scan to create it first"
            )));
        }
        self.save(&document, message)
    }

    /// Deletes leaves or subtrees and saves if anything was removed.
    ///
    /// # Errors
    ///
    /// Returns any load/save error.
    #[tracing::instrument(skip(self, message), fields(count = paths.len()))]
    pub fn delete_keys(&self, paths: &[KeyPath], message: &CommitMessage) -> Result<Vec<KeyPath>> {
        let mut document = self.load()?;
        let deleted = document.delete_keys(paths);
        for path in paths.iter().filter(|p| !deleted.contains(p)) {
            tracing::warn!(key = %path, "Key not found, skipped delete");
        }
        if !deleted.is_empty() {
            self.save(&document, message)?;
        }
        Ok(deleted)
    }

    fn write_atomic(&self, text: &str) -> Result<()> {
        let path = self.path();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| Error::storage("create_store_dir", e))?;
        }
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let temp = path.with_file_name(format!(".{file_name}.tmp"));

        fs::write(&temp, text).map_err(|e| Error::storage("write_document", e))?;
        fs::rename(&temp, &path).map_err(|e| {
            let _ = fs::remove_file(&temp);
            Error::storage("replace_document", e)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::GitBackend;
    use crate::models::SENTINEL;
    use tempfile::TempDir;

    struct FixedPrompt(Option<&'static str>);

    impl MessagePrompt for FixedPrompt {
        fn ask(&self) -> Result<Option<String>> {
            Ok(self.0.map(str::to_string))
        }
    }

    fn key(text: &str) -> KeyPath {
        KeyPath::parse(text).unwrap()
    }

    fn open_store(dir: &TempDir, file_name: &str) -> TemplateStore {
        let store = TemplateStore::new(dir.path(), file_name, Arc::new(GitBackend::new())).unwrap();
        store.init().unwrap();
        store
    }

    fn sample() -> Document {
        serde_json::from_str(r#"{"pkg": {"mod": {"Cls": {"fn": "Hello {name}"}}}}"#).unwrap()
    }

    fn head_message(store: &TemplateStore) -> String {
        store
            .backend()
            .log(store.repo_dir(), store.file_name())
            .unwrap()
            .first()
            .map(|c| c.message.clone())
            .unwrap_or_default()
    }

    #[test]
    fn test_new_rejects_escaping_paths() {
        let backend: Arc<dyn VersionControl> = Arc::new(GitBackend::new());
        assert!(TemplateStore::new("/tmp", "../x.json", backend.clone()).is_err());
        assert!(TemplateStore::new("/tmp", "/abs.json", backend.clone()).is_err());
        assert!(TemplateStore::new("/tmp", "", backend.clone()).is_err());
        for name in [".", "./", "./."] {
            assert!(matches!(
                TemplateStore::new("/tmp", name, backend.clone()),
                Err(Error::InvalidInput(_))
            ));
        }
        let nested = TemplateStore::new("/tmp", "./conf/prompts.yaml", backend).unwrap();
        assert_eq!(nested.file_name(), "conf/prompts.yaml");
        assert_eq!(nested.format(), DocumentFormat::Yaml);
    }

    #[test]
    fn test_load_missing_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir, "prompts.json");
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn test_load_unparseable_is_storage_error() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir, "prompts.json");
        fs::write(store.path(), "not json").unwrap();
        assert!(matches!(store.load(), Err(Error::StorageIo { .. })));
    }

    #[test]
    fn test_save_writes_and_commits() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir, "prompts.json");
        let commit = store.save(&sample(), &CommitMessage::Default).unwrap();
        assert!(commit.is_some());
        assert_eq!(store.load().unwrap(), sample());
        assert!(head_message(&store).starts_with("Update prompts at "));
        assert!(!dir.path().join(".prompts.json.tmp").exists());

        let again = store.save(&sample(), &CommitMessage::Default).unwrap();
        assert!(again.is_none());
    }

    #[test]
    fn test_save_with_custom_and_prompted_messages() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir, "prompts.json")
            .with_prompter(Arc::new(FixedPrompt(Some("typed message"))));
        store
            .save(&sample(), &CommitMessage::Custom("custom".to_string()))
            .unwrap();
        assert_eq!(head_message(&store), "custom");

        let mut doc = sample();
        doc.set_nested(&key("pkg.mod.Cls.fn"), "changed");
        store.save(&doc, &CommitMessage::Prompt).unwrap();
        assert_eq!(head_message(&store), "typed message");
    }

    #[test]
    fn test_blank_prompt_falls_back_to_default() {
        let dir = TempDir::new().unwrap();
        let store =
            open_store(&dir, "prompts.json").with_prompter(Arc::new(FixedPrompt(None)));
        store.save(&sample(), &CommitMessage::Prompt).unwrap();
        assert!(head_message(&store).starts_with("Update prompts at "));
    }

    #[test]
    fn test_set_value_requires_existing_leaf() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir, "prompts.json");
        store.save(&sample(), &CommitMessage::Default).unwrap();

        store
            .set_value(&key("pkg.mod.Cls.fn"), "Hi {name}", &CommitMessage::Default)
            .unwrap();
        assert_eq!(
            store.load().unwrap().leaf(&key("pkg.mod.Cls.fn")),
            Some("Hi {name}")
        );

        let err = store
            .set_value(&key("pkg.mod.Cls.new"), "x", &CommitMessage::Default)
            .unwrap_err();
        assert!(matches!(err, Error::PolicyViolation(_)));
        assert!(store.load().unwrap().leaf(&key("pkg.mod.Cls.new")).is_none());
    }

    #[test]
    fn test_delete_keys_persists() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir, "prompts.yaml");
        let mut doc = sample();
        doc.insert_leaf_if_absent(&key("pkg.mod.Cls.other"), SENTINEL);
        store.save(&doc, &CommitMessage::Default).unwrap();

        let deleted = store
            .delete_keys(&[key("pkg.mod.Cls.fn"), key("nope.x")], &CommitMessage::Default)
            .unwrap();
        assert_eq!(deleted, vec![key("pkg.mod.Cls.fn")]);

        let reloaded = store.load().unwrap();
        assert!(reloaded.leaf(&key("pkg.mod.Cls.fn")).is_none());
        assert_eq!(reloaded.leaf(&key("pkg.mod.Cls.other")), Some(SENTINEL));
    }
}
