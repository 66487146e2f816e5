//! # Promptree
//!
//! A hierarchical, version-controlled store for prompt templates.
//!
//! Templates live in a single structured document keyed by dotted paths that
//! mirror a source tree (`package.module.Class.method`). The store can be
//! reconciled against that source tree, edited, rendered with strict
//! placeholder checking, and rolled back to any committed revision.
//!
//! ## Features
//!
//! - Nested leaf/interior document model persisted as JSON or YAML
//! - Structural scanning of Python or Rust sources (additive or hard replace)
//! - Exact key resolution with a `Group.slot` fallback search
//! - `{placeholder}` rendering that rejects missing and extra variables
//! - Git-backed history with list, show, revert and diff
//!
//! ## Example
//!
//! ```rust,ignore
//! use promptree::{PromptKey, PromptVault, PromptreeConfig};
//! use std::collections::HashMap;
//!
//! let vault = PromptVault::open(&PromptreeConfig::default())?;
//! let mut vars = HashMap::new();
//! vars.insert("name".to_string(), "World".to_string());
//! let text = vault.get_rendered(&PromptKey::parse("pkg.mod.Cls.fn")?, &vars)?;
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![forbid(unsafe_code)]
#![allow(clippy::multiple_crate_versions)]

use thiserror::Error as ThisError;

// Module declarations
pub mod cli;
pub mod config;
pub mod git;
pub mod models;
pub mod observability;
pub mod rendering;
pub mod scanner;
pub mod services;
pub mod storage;

// Re-exports for convenience
pub use config::PromptreeConfig;
pub use git::{CommitInfo, GitBackend, VersionControl};
pub use models::{Document, KeyPath, Node, SENTINEL};
pub use rendering::{placeholders, render};
pub use scanner::{ScanPolicy, StructuralScanner};
pub use services::{CallSite, HistoryManager, KeyResolver, PromptKey, PromptVault};
pub use storage::{CommitMessage, TemplateStore};

/// Error type for promptree operations.
///
/// # Error Variant Triggers
///
/// | Variant | Raised When |
/// |---------|-------------|
/// | `StorageIo` | Document unreadable/unwritable, git backend failures |
/// | `NotFound` | Key absent after exact and fallback lookup, missing commit or key in a snapshot |
/// | `StructuralMismatch` | Traversing through a leaf, resolving to an interior node |
/// | `Validation` | Malformed historical snapshot, malformed key text |
/// | `VariableMismatch` | Render variables do not match the template placeholders |
/// | `PolicyViolation` | Assigning to a path that is not an existing leaf |
/// | `SourceParse` | A scanned source file is not parseable |
/// | `InvalidInput` | Bad arguments from callers or the CLI |
#[derive(Debug, ThisError)]
pub enum Error {
    /// Storage or backend I/O failed.
    ///
    /// Raised when:
    /// - The document exists but cannot be read or parsed
    /// - The document cannot be written
    /// - The git repository cannot be opened, read or committed to
    #[error("operation '{operation}' failed: {cause}")]
    StorageIo {
        /// The operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },

    /// A key, commit or snapshot entry does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A path crosses a node of the wrong kind.
    #[error("structural mismatch at '{path}': {reason}")]
    StructuralMismatch {
        /// The offending dotted path.
        path: String,
        /// What was expected there.
        reason: String,
    },

    /// Content failed validation.
    ///
    /// Raised when:
    /// - A historical snapshot cannot be parsed during diff or revert
    /// - A key path is empty or has an empty segment
    #[error("validation failed: {0}")]
    Validation(String),

    /// Render variables do not match the template placeholders.
    #[error("variable mismatch: missing {missing:?}, extra {extra:?}")]
    VariableMismatch {
        /// Placeholders with no supplied value, sorted.
        missing: Vec<String>,
        /// Supplied variables the template never uses, sorted.
        extra: Vec<String>,
    },

    /// A value was assigned to a path that scanning never created.
    #[error("policy violation: {0}")]
    PolicyViolation(String),

    /// A source file could not be parsed during a scan.
    #[error("failed to parse source '{path}': {cause}")]
    SourceParse {
        /// File that failed.
        path: String,
        /// Parser message.
        cause: String,
    },

    /// Invalid input was provided.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl Error {
    /// Builds a [`Error::StorageIo`] from an operation name and any displayable cause.
    pub fn storage(operation: &str, cause: impl std::fmt::Display) -> Self {
        Self::StorageIo {
            operation: operation.to_string(),
            cause: cause.to_string(),
        }
    }
}

/// Result type alias for promptree operations.
pub type Result<T> = std::result::Result<T, Error>;
