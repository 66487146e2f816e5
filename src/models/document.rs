//! The hierarchical template document.
//!
//! A document is a tree of named interior mappings whose leaves are template
//! strings. Traversal helpers never coerce: walking through a leaf, or asking
//! for a leaf where a mapping sits, is a [`Error::StructuralMismatch`].

use super::KeyPath;
use super::key_path::validate_segment;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Value written for slots discovered by scanning but not yet authored.
pub const SENTINEL: &str = "no prompts";

/// Child mapping of an interior node.
pub type Mapping = BTreeMap<String, Node>;

/// A node in the document tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Node {
    /// A template string.
    Leaf(String),
    /// A named grouping of child nodes.
    Interior(Mapping),
}

impl Node {
    /// Creates an empty interior node.
    #[must_use]
    pub const fn interior() -> Self {
        Self::Interior(BTreeMap::new())
    }

    /// Returns the leaf text, if this is a leaf.
    #[must_use]
    pub fn as_leaf(&self) -> Option<&str> {
        match self {
            Self::Leaf(text) => Some(text),
            Self::Interior(_) => None,
        }
    }

    /// Returns the child mapping, if this is an interior node.
    #[must_use]
    pub const fn as_interior(&self) -> Option<&Mapping> {
        match self {
            Self::Interior(children) => Some(children),
            Self::Leaf(_) => None,
        }
    }

    /// Short name of the node kind, for messages.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Leaf(_) => "leaf",
            Self::Interior(_) => "mapping",
        }
    }
}

/// A change to a single leaf between two documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "change", rename_all = "snake_case")]
pub enum LeafChange {
    /// Present only in the newer document.
    Added {
        /// Leaf path.
        key: KeyPath,
        /// New value.
        value: String,
    },
    /// Present only in the older document.
    Removed {
        /// Leaf path.
        key: KeyPath,
        /// Old value.
        value: String,
    },
    /// Present in both with different values.
    Modified {
        /// Leaf path.
        key: KeyPath,
        /// Old value.
        before: String,
        /// New value.
        after: String,
    },
}

impl LeafChange {
    /// The affected path.
    #[must_use]
    pub const fn key(&self) -> &KeyPath {
        match self {
            Self::Added { key, .. } | Self::Removed { key, .. } | Self::Modified { key, .. } => key,
        }
    }
}

/// Result of inserting a scanned slot into a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// A new leaf was created with the given value.
    Created,
    /// A leaf already existed and was left alone.
    Existing,
    /// A node of the wrong kind blocks the path; nothing changed.
    Conflict,
}

/// The full template document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document {
    root: Mapping,
}

impl Document {
    /// Creates an empty document.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps an existing root mapping.
    #[must_use]
    pub const fn from_root(root: Mapping) -> Self {
        Self { root }
    }

    /// The top-level mapping.
    #[must_use]
    pub const fn root(&self) -> &Mapping {
        &self.root
    }

    /// True when the document has no top-level entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    /// Checks that every mapping key is a usable key segment.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] naming the first offending key, such as
    /// one containing `.`, which no dotted path could address.
    pub fn validate(&self) -> Result<()> {
        validate_mapping(&self.root, &mut Vec::new())
    }

    /// Exact traversal to any node.
    ///
    /// # Errors
    ///
    /// - [`Error::NotFound`] if a segment is missing
    /// - [`Error::StructuralMismatch`] if the walk passes through a leaf
    pub fn get(&self, path: &KeyPath) -> Result<&Node> {
        let mut children = &self.root;
        let segments = path.segments();
        for (depth, segment) in segments.iter().enumerate() {
            let node = children
                .get(segment)
                .ok_or_else(|| Error::NotFound(format!("{path} (no entry '{segment}')")))?;
            if depth + 1 == segments.len() {
                return Ok(node);
            }
            children = match node {
                Node::Interior(next) => next,
                Node::Leaf(_) => {
                    return Err(Error::StructuralMismatch {
                        path: prefix(path, depth + 1),
                        reason: "is a leaf, cannot descend into it".to_string(),
                    });
                },
            };
        }
        Err(Error::NotFound(path.to_string()))
    }

    /// Exact traversal that must end on a leaf.
    ///
    /// # Errors
    ///
    /// As [`Document::get`], plus [`Error::StructuralMismatch`] if the path
    /// names a mapping rather than a template.
    pub fn get_leaf(&self, path: &KeyPath) -> Result<&str> {
        match self.get(path)? {
            Node::Leaf(text) => Ok(text),
            Node::Interior(_) => Err(Error::StructuralMismatch {
                path: path.to_string(),
                reason: "is a mapping, not a template string".to_string(),
            }),
        }
    }

    /// Leaf value at `path`, or `None` for any failure.
    #[must_use]
    pub fn leaf(&self, path: &KeyPath) -> Option<&str> {
        self.get_leaf(path).ok()
    }

    /// Overwrites an existing leaf.
    ///
    /// Never creates paths: returns `false` and leaves the document unchanged
    /// unless `path` already resolves to a leaf.
    pub fn set_nested(&mut self, path: &KeyPath, value: impl Into<String>) -> bool {
        match self.node_mut(path) {
            Some(Node::Leaf(text)) => {
                *text = value.into();
                true
            },
            _ => false,
        }
    }

    /// Removes the node (leaf or whole subtree) at `path`.
    ///
    /// Returns `false` if the parent mapping or the entry itself is absent.
    pub fn remove(&mut self, path: &KeyPath) -> bool {
        let Some(parent) = self.mapping_mut(path.parent_segments()) else {
            return false;
        };
        parent.remove(path.last()).is_some()
    }

    /// Best-effort batch delete. Returns the paths actually removed, in input order.
    pub fn delete_keys(&mut self, paths: &[KeyPath]) -> Vec<KeyPath> {
        paths
            .iter()
            .filter(|path| self.remove(path))
            .cloned()
            .collect()
    }

    /// All leaves with their paths, in key order.
    #[must_use]
    pub fn leaves(&self) -> Vec<(KeyPath, &str)> {
        let mut out = Vec::new();
        collect_leaves(&self.root, &mut Vec::new(), &mut out);
        out
    }

    /// Leaves under `prefix` (inclusive). A missing prefix yields nothing.
    #[must_use]
    pub fn leaves_under(&self, prefix: &KeyPath) -> Vec<(KeyPath, &str)> {
        match self.get(prefix) {
            Ok(Node::Leaf(text)) => vec![(prefix.clone(), text.as_str())],
            Ok(Node::Interior(children)) => {
                let mut out = Vec::new();
                collect_leaves(children, &mut prefix.segments().to_vec(), &mut out);
                out
            },
            Err(_) => Vec::new(),
        }
    }

    /// Depth-first search for an interior node named `group` that directly
    /// holds a leaf named `slot`. Returns the first match in key order.
    #[must_use]
    pub fn find_group_slot(&self, group: &str, slot: &str) -> Option<(KeyPath, &str)> {
        search_group_slot(&self.root, group, slot, &mut Vec::new())
    }

    /// Inserts a leaf with `value` unless something already occupies the path.
    ///
    /// Intermediate mappings are created as needed. A leaf sitting where a
    /// mapping is required, or a mapping where the leaf would go, is reported
    /// as [`InsertOutcome::Conflict`] and nothing changes.
    pub fn insert_leaf_if_absent(&mut self, path: &KeyPath, value: &str) -> InsertOutcome {
        let mut children = &mut self.root;
        for segment in path.parent_segments() {
            let node = children
                .entry(segment.clone())
                .or_insert_with(Node::interior);
            children = match node {
                Node::Interior(next) => next,
                Node::Leaf(_) => return InsertOutcome::Conflict,
            };
        }
        match children.get(path.last()) {
            Some(Node::Leaf(_)) => InsertOutcome::Existing,
            Some(Node::Interior(_)) => InsertOutcome::Conflict,
            None => {
                children.insert(path.last().to_string(), Node::Leaf(value.to_string()));
                InsertOutcome::Created
            },
        }
    }

    /// Replaces whatever sits at `path` with `node`, creating parent mappings.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StructuralMismatch`] if a parent segment is a leaf.
    pub fn replace_subtree(&mut self, path: &KeyPath, node: Node) -> Result<()> {
        let mut children = &mut self.root;
        for (depth, segment) in path.parent_segments().iter().enumerate() {
            let entry = children
                .entry(segment.clone())
                .or_insert_with(Node::interior);
            children = match entry {
                Node::Interior(next) => next,
                Node::Leaf(_) => {
                    return Err(Error::StructuralMismatch {
                        path: prefix(path, depth + 1),
                        reason: "is a leaf, cannot hold a subtree".to_string(),
                    });
                },
            };
        }
        children.insert(path.last().to_string(), node);
        Ok(())
    }

    /// Leaf-level differences going from `self` to `newer`, in key order.
    #[must_use]
    pub fn leaf_changes(&self, newer: &Self) -> Vec<LeafChange> {
        let old: BTreeMap<KeyPath, &str> = self.leaves().into_iter().collect();
        let new: BTreeMap<KeyPath, &str> = newer.leaves().into_iter().collect();
        let mut changes = Vec::new();

        for (key, before) in &old {
            match new.get(key) {
                None => changes.push(LeafChange::Removed {
                    key: key.clone(),
                    value: (*before).to_string(),
                }),
                Some(after) if after != before => changes.push(LeafChange::Modified {
                    key: key.clone(),
                    before: (*before).to_string(),
                    after: (*after).to_string(),
                }),
                Some(_) => {},
            }
        }
        for (key, value) in &new {
            if !old.contains_key(key) {
                changes.push(LeafChange::Added {
                    key: key.clone(),
                    value: (*value).to_string(),
                });
            }
        }
        changes.sort_by(|a, b| a.key().cmp(b.key()));
        changes
    }

    fn node_mut(&mut self, path: &KeyPath) -> Option<&mut Node> {
        self.mapping_mut(path.parent_segments())?
            .get_mut(path.last())
    }

    fn mapping_mut(&mut self, segments: &[String]) -> Option<&mut Mapping> {
        let mut children = &mut self.root;
        for segment in segments {
            children = match children.get_mut(segment)? {
                Node::Interior(next) => next,
                Node::Leaf(_) => return None,
            };
        }
        Some(children)
    }
}

fn prefix(path: &KeyPath, depth: usize) -> String {
    path.segments()[..depth].join(".")
}

fn validate_mapping(children: &Mapping, trail: &mut Vec<String>) -> Result<()> {
    for (name, node) in children {
        validate_segment(name).map_err(|e| {
            let at = if trail.is_empty() {
                String::new()
            } else {
                format!(" under '{}'", trail.join("."))
            };
            Error::Validation(format!("invalid key '{name}'{at}: {e}"))
        })?;
        if let Node::Interior(next) = node {
            trail.push(name.clone());
            validate_mapping(next, trail)?;
            trail.pop();
        }
    }
    Ok(())
}

fn collect_leaves<'a>(
    children: &'a Mapping,
    trail: &mut Vec<String>,
    out: &mut Vec<(KeyPath, &'a str)>,
) {
    for (name, node) in children {
        trail.push(name.clone());
        match node {
            Node::Leaf(text) => out.push((KeyPath::from_vec_unchecked(trail.clone()), text)),
            Node::Interior(next) => collect_leaves(next, trail, out),
        }
        trail.pop();
    }
}

fn search_group_slot<'a>(
    children: &'a Mapping,
    group: &str,
    slot: &str,
    trail: &mut Vec<String>,
) -> Option<(KeyPath, &'a str)> {
    for (name, node) in children {
        let Node::Interior(grandchildren) = node else {
            continue;
        };
        if name == group {
            if let Some(Node::Leaf(text)) = grandchildren.get(slot) {
                let mut path = KeyPath::from_vec_unchecked(trail.clone());
                path.push_unchecked(name);
                path.push_unchecked(slot);
                return Some((path, text));
            }
        }
        trail.push(name.clone());
        let found = search_group_slot(grandchildren, group, slot, trail);
        trail.pop();
        if found.is_some() {
            return found;
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(text: &str) -> KeyPath {
        KeyPath::parse(text).unwrap()
    }

    fn sample() -> Document {
        serde_json::from_str(r#"{"pkg": {"mod": {"Cls": {"fn": "Hello {name}"}}}}"#).unwrap()
    }

    #[test]
    fn test_validate_rejects_unaddressable_keys() {
        let dotted: Document = serde_json::from_str(r#"{"a.b": {"C": {"f": "x"}}}"#).unwrap();
        assert!(matches!(dotted.validate(), Err(Error::Validation(_))));

        let nested: Document = serde_json::from_str(r#"{"pkg": {"": {"f": "x"}}}"#).unwrap();
        let err = nested.validate().unwrap_err();
        assert!(err.to_string().contains("under 'pkg'"));

        let fine: Document = serde_json::from_str(r#"{"pkg": {"mod": {"C": {"f": "x"}}}}"#).unwrap();
        assert!(fine.validate().is_ok());
    }

    #[test]
    fn test_get_leaf_exact() {
        let doc = sample();
        assert_eq!(doc.get_leaf(&key("pkg.mod.Cls.fn")).unwrap(), "Hello {name}");
    }

    #[test]
    fn test_get_missing_is_not_found() {
        let doc = sample();
        assert!(matches!(
            doc.get(&key("pkg.other")),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_get_through_leaf_is_mismatch() {
        let doc = sample();
        let err = doc.get(&key("pkg.mod.Cls.fn.deeper")).unwrap_err();
        match err {
            Error::StructuralMismatch { path, .. } => assert_eq!(path, "pkg.mod.Cls.fn"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_get_leaf_on_mapping_is_mismatch() {
        let doc = sample();
        assert!(matches!(
            doc.get_leaf(&key("pkg.mod")),
            Err(Error::StructuralMismatch { .. })
        ));
    }

    #[test]
    fn test_set_nested_only_overwrites_leaves() {
        let mut doc = sample();
        assert!(doc.set_nested(&key("pkg.mod.Cls.fn"), "Hi"));
        assert_eq!(doc.leaf(&key("pkg.mod.Cls.fn")), Some("Hi"));

        let before = doc.clone();
        assert!(!doc.set_nested(&key("pkg.mod.Cls.other"), "x"));
        assert!(!doc.set_nested(&key("pkg.mod"), "x"));
        assert!(!doc.set_nested(&key("pkg.mod.Cls.fn.deeper"), "x"));
        assert_eq!(doc, before);
    }

    #[test]
    fn test_delete_keys_example() {
        let mut doc = sample();
        let deleted = doc.delete_keys(&[key("pkg.mod.Cls.fn")]);
        assert_eq!(deleted, vec![key("pkg.mod.Cls.fn")]);
        let expected: Document = serde_json::from_str(r#"{"pkg": {"mod": {"Cls": {}}}}"#).unwrap();
        assert_eq!(doc, expected);

        let deleted = doc.delete_keys(&[key("pkg.mod.Cls.fn")]);
        assert!(deleted.is_empty());
    }

    #[test]
    fn test_delete_keys_best_effort() {
        let mut doc = sample();
        let deleted = doc.delete_keys(&[key("missing.path"), key("pkg.mod")]);
        assert_eq!(deleted, vec![key("pkg.mod")]);
        assert_eq!(doc.root().get("pkg"), Some(&Node::interior()));
    }

    #[test]
    fn test_find_group_slot_first_in_key_order() {
        let doc: Document = serde_json::from_str(
            r#"{
                "b": {"m": {"Cls": {"fn": "second"}}},
                "a": {"m": {"Cls": {"fn": "first"}, "Other": {"fn": "x"}}},
                "c": {"Cls": {"fn": {"nested": "not a leaf"}}}
            }"#,
        )
        .unwrap();
        let (path, text) = doc.find_group_slot("Cls", "fn").unwrap();
        assert_eq!(path, key("a.m.Cls.fn"));
        assert_eq!(text, "first");
        assert!(doc.find_group_slot("Cls", "nested").is_none());
    }

    #[test]
    fn test_insert_leaf_if_absent() {
        let mut doc = sample();
        assert_eq!(
            doc.insert_leaf_if_absent(&key("pkg.mod.Cls.fn"), SENTINEL),
            InsertOutcome::Existing
        );
        assert_eq!(
            doc.insert_leaf_if_absent(&key("pkg.mod.Cls.new"), SENTINEL),
            InsertOutcome::Created
        );
        assert_eq!(
            doc.insert_leaf_if_absent(&key("pkg.mod.Cls.fn.x"), SENTINEL),
            InsertOutcome::Conflict
        );
        assert_eq!(
            doc.insert_leaf_if_absent(&key("pkg.mod"), SENTINEL),
            InsertOutcome::Conflict
        );
        assert_eq!(doc.leaf(&key("pkg.mod.Cls.new")), Some(SENTINEL));
        assert_eq!(doc.leaf(&key("pkg.mod.Cls.fn")), Some("Hello {name}"));
    }

    #[test]
    fn test_replace_subtree_keeps_siblings() {
        let mut doc: Document =
            serde_json::from_str(r#"{"pkg": {"a": "1"}, "other": {"b": "2"}}"#).unwrap();
        doc.replace_subtree(&key("pkg"), Node::interior()).unwrap();
        assert_eq!(doc.root().get("pkg"), Some(&Node::interior()));
        assert_eq!(doc.leaf(&key("other.b")), Some("2"));
    }

    #[test]
    fn test_leaf_changes() {
        let old: Document = serde_json::from_str(r#"{"a": {"x": "1", "y": "2"}}"#).unwrap();
        let new: Document = serde_json::from_str(r#"{"a": {"x": "1", "y": "3", "z": "4"}}"#).unwrap();
        let changes = old.leaf_changes(&new);
        assert_eq!(changes.len(), 2);
        assert!(matches!(&changes[0], LeafChange::Modified { key: k, .. } if k == &key("a.y")));
        assert!(matches!(&changes[1], LeafChange::Added { key: k, .. } if k == &key("a.z")));
        assert!(new.leaf_changes(&new).is_empty());
    }

    #[test]
    fn test_non_string_scalars_are_rejected() {
        let parsed: std::result::Result<Document, _> = serde_json::from_str(r#"{"a": 1}"#);
        assert!(parsed.is_err());
    }
}
