//! `git2`-backed implementation of [`VersionControl`].

use super::{CommitInfo, VersionControl};
use crate::{Error, Result};
use git2::{Commit, ErrorCode, Oid, Repository, Signature, Sort};
use std::fs;
use std::path::Path;

/// Version control through an in-process libgit2 repository.
///
/// The repository is reopened on every call, so the backend holds no handles
/// between operations and concurrent processes only share git's own locks.
#[derive(Debug, Clone)]
pub struct GitBackend {
    /// Fallback author name when the repository config has none.
    author_name: String,
    /// Fallback author email when the repository config has none.
    author_email: String,
}

impl GitBackend {
    /// Default fallback author name.
    pub const DEFAULT_AUTHOR_NAME: &'static str = "promptree";
    /// Default fallback author email.
    pub const DEFAULT_AUTHOR_EMAIL: &'static str = "promptree@local";

    /// Creates a backend with the default fallback signature.
    #[must_use]
    pub fn new() -> Self {
        Self {
            author_name: Self::DEFAULT_AUTHOR_NAME.to_string(),
            author_email: Self::DEFAULT_AUTHOR_EMAIL.to_string(),
        }
    }

    /// Sets the fallback signature used when git has no `user.name`/`user.email`.
    #[must_use]
    pub fn with_author(mut self, name: impl Into<String>, email: impl Into<String>) -> Self {
        self.author_name = name.into();
        self.author_email = email.into();
        self
    }

    /// Opens the git repository.
    fn open_repo(dir: &Path) -> Result<Repository> {
        Repository::open(dir).map_err(|e| Error::storage("open_repository", e))
    }

    /// Gets the signature for commits, falling back to the configured author.
    fn signature(&self, repo: &Repository) -> Result<Signature<'static>> {
        repo.signature().or_else(|_| {
            Signature::now(&self.author_name, &self.author_email)
                .map_err(|e| Error::storage("create_signature", e))
        })
    }

    /// Returns the HEAD commit, or `None` on an unborn branch.
    fn head_commit(repo: &Repository) -> Result<Option<Commit<'_>>> {
        match repo.head() {
            Ok(head) => head
                .peel_to_commit()
                .map(Some)
                .map_err(|e| Error::storage("peel_head", e)),
            Err(e) if matches!(e.code(), ErrorCode::UnbornBranch | ErrorCode::NotFound) => Ok(None),
            Err(e) => Err(Error::storage("get_head", e)),
        }
    }
}

impl Default for GitBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Blob id of `path` in `commit`'s tree, if the file exists there.
fn entry_id(commit: &Commit<'_>, path: &Path) -> Result<Option<Oid>> {
    let tree = commit.tree().map_err(|e| Error::storage("read_tree", e))?;
    match tree.get_path(path) {
        Ok(entry) => Ok(Some(entry.id())),
        Err(e) if e.code() == ErrorCode::NotFound => Ok(None),
        Err(e) => Err(Error::storage("read_tree_entry", e)),
    }
}

impl VersionControl for GitBackend {
    fn init(&self, dir: &Path) -> Result<()> {
        if Repository::open(dir).is_ok() {
            return Ok(());
        }
        fs::create_dir_all(dir).map_err(|e| Error::storage("create_repo_dir", e))?;
        Repository::init(dir).map_err(|e| Error::storage("init_repository", e))?;
        tracing::info!(path = %dir.display(), "Initialized git repository");
        Ok(())
    }

    fn add(&self, dir: &Path, file_name: &str) -> Result<()> {
        let repo = Self::open_repo(dir)?;
        let mut index = repo.index().map_err(|e| Error::storage("open_index", e))?;
        index
            .add_path(Path::new(file_name))
            .map_err(|e| Error::storage("stage_file", e))?;
        index.write().map_err(|e| Error::storage("write_index", e))
    }

    fn commit(&self, dir: &Path, message: &str) -> Result<Option<String>> {
        let repo = Self::open_repo(dir)?;
        let mut index = repo.index().map_err(|e| Error::storage("open_index", e))?;
        let tree_id = index
            .write_tree()
            .map_err(|e| Error::storage("write_tree", e))?;

        let parent = Self::head_commit(&repo)?;
        if parent.as_ref().is_some_and(|p| p.tree_id() == tree_id) {
            tracing::debug!("Nothing to commit, working tree matches HEAD");
            return Ok(None);
        }

        let tree = repo
            .find_tree(tree_id)
            .map_err(|e| Error::storage("find_tree", e))?;
        let sig = self.signature(&repo)?;
        let parents: Vec<&Commit<'_>> = parent.iter().collect();

        let oid = repo
            .commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
            .map_err(|e| Error::storage("create_commit", e))?;

        tracing::debug!(commit = %oid, "Created commit");
        Ok(Some(oid.to_string()))
    }

    fn log(&self, dir: &Path, file_name: &str) -> Result<Vec<CommitInfo>> {
        let repo = Self::open_repo(dir)?;
        let mut walk = repo.revwalk().map_err(|e| Error::storage("revwalk", e))?;
        match walk.push_head() {
            Ok(()) => {},
            Err(e) if matches!(e.code(), ErrorCode::UnbornBranch | ErrorCode::NotFound) => {
                return Ok(Vec::new());
            },
            Err(e) => return Err(Error::storage("revwalk_push_head", e)),
        }
        walk.set_sorting(Sort::TOPOLOGICAL | Sort::TIME)
            .map_err(|e| Error::storage("revwalk_sort", e))?;

        let path = Path::new(file_name);
        let mut commits = Vec::new();
        for oid in walk {
            let oid = oid.map_err(|e| Error::storage("revwalk_next", e))?;
            let commit = repo
                .find_commit(oid)
                .map_err(|e| Error::storage("find_commit", e))?;

            let current = entry_id(&commit, path)?;
            let previous = match commit.parent(0) {
                Ok(parent) => entry_id(&parent, path)?,
                Err(_) => None,
            };
            if current == previous {
                continue;
            }

            commits.push(CommitInfo {
                id: oid.to_string(),
                timestamp: commit.time().seconds(),
                message: commit.message().unwrap_or_default().trim_end().to_string(),
            });
        }
        Ok(commits)
    }

    fn show(&self, dir: &Path, commit: &str, file_name: &str) -> Result<Vec<u8>> {
        let repo = Self::open_repo(dir)?;
        let object = repo.revparse_single(commit).map_err(|e| match e.code() {
            ErrorCode::NotFound | ErrorCode::InvalidSpec | ErrorCode::Ambiguous => {
                Error::NotFound(format!("commit '{commit}': {}", e.message()))
            },
            _ => Error::storage("resolve_commit", e),
        })?;
        let found = object
            .peel_to_commit()
            .map_err(|e| Error::NotFound(format!("commit '{commit}': {}", e.message())))?;

        let Some(blob_id) = entry_id(&found, Path::new(file_name))? else {
            return Err(Error::NotFound(format!(
                "'{file_name}' does not exist at commit '{commit}'"
            )));
        };
        let blob = repo
            .find_blob(blob_id)
            .map_err(|e| Error::storage("read_blob", e))?;
        Ok(blob.content().to_vec())
    }
}
