//! Storage layer.
//!
//! A single structured document per store, written atomically and committed
//! through the [`VersionControl`](crate::git::VersionControl) backend after
//! every mutation.

mod format;
mod store;

pub use format::DocumentFormat;
pub use store::{CommitMessage, MessagePrompt, StdinPrompt, TemplateStore};
