//! Data models for promptree.
//!
//! The document tree, its key paths, and the sentinel used for unauthored slots.

mod document;
mod key_path;

pub use document::{Document, InsertOutcome, LeafChange, Mapping, Node, SENTINEL};
pub use key_path::{KeyPath, SEPARATOR};
