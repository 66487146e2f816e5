//! Key resolution.
//!
//! A key is looked up exactly first. When that fails and the key has at
//! least two segments, its last two segments are treated as `(group, slot)`
//! and the whole document is searched depth-first for an interior node named
//! `group` that directly holds a leaf named `slot`.

use crate::models::{Document, KeyPath, Node};
use crate::{Error, Result};
use std::fmt;

/// An explicit stand-in for caller introspection.
///
/// Identifies the consumer by component (class-like) and operation
/// (function-like) name, optionally qualified by the directory and file stem
/// the templates were scanned from. Build one with [`call_site!`] to fill the
/// qualifiers from `module_path!()`.
///
/// [`call_site!`]: crate::call_site
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CallSite {
    /// Source directory segment.
    pub directory: Option<String>,
    /// Source file stem segment.
    pub file_stem: Option<String>,
    /// Group name.
    pub component: String,
    /// Slot name.
    pub operation: String,
}

impl CallSite {
    /// A call site identified only by component and operation.
    ///
    /// Resolution of such a key relies on the `group.slot` fallback.
    #[must_use]
    pub fn new(component: impl Into<String>, operation: impl Into<String>) -> Self {
        Self {
            directory: None,
            file_stem: None,
            component: component.into(),
            operation: operation.into(),
        }
    }

    /// Qualifies the call site with its directory and file stem.
    #[must_use]
    pub fn in_module(mut self, directory: impl Into<String>, file_stem: impl Into<String>) -> Self {
        self.directory = Some(directory.into());
        self.file_stem = Some(file_stem.into());
        self
    }

    /// Builds a call site from a `module_path!()` string.
    ///
    /// `my_crate::agents::planner` yields directory `agents` and file stem
    /// `planner`; a module directly under the crate root yields only a file
    /// stem, and the crate root yields neither.
    #[must_use]
    pub fn from_module_path(
        module_path: &str,
        component: impl Into<String>,
        operation: impl Into<String>,
    ) -> Self {
        let modules: Vec<&str> = module_path.split("::").skip(1).collect();
        let mut site = Self::new(component, operation);
        match modules.as_slice() {
            [] => {},
            [stem] => site.file_stem = Some((*stem).to_string()),
            [.., dir, stem] => {
                site.directory = Some((*dir).to_string());
                site.file_stem = Some((*stem).to_string());
            },
        }
        site
    }

    /// The dotted key this call site stands for.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if the component or operation is blank,
    /// and [`Error::Validation`] if a segment is not a valid key segment.
    pub fn key_path(&self) -> Result<KeyPath> {
        if self.component.trim().is_empty() || self.operation.trim().is_empty() {
            return Err(Error::InvalidInput(
                "call site needs both a component and an operation name".to_string(),
            ));
        }
        let segments = self
            .directory
            .iter()
            .chain(self.file_stem.iter())
            .chain([&self.component, &self.operation])
            .cloned();
        KeyPath::from_segments(segments)
    }
}

/// Builds a [`CallSite`] qualified by the invoking module's path.
///
/// ```rust
/// let site = promptree::call_site!("Planner", "plan");
/// assert_eq!(site.component, "Planner");
/// ```
#[macro_export]
macro_rules! call_site {
    ($component:expr, $operation:expr $(,)?) => {
        $crate::CallSite::from_module_path(::core::module_path!(), $component, $operation)
    };
}

/// What a consumer asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptKey {
    /// A dotted key given directly.
    Explicit(KeyPath),
    /// A key derived from an explicit call-site identity.
    CallSite(CallSite),
}

impl PromptKey {
    /// Parses an explicit dotted key.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] for an empty key or an empty segment.
    pub fn parse(text: &str) -> Result<Self> {
        KeyPath::parse(text).map(Self::Explicit)
    }

    /// The dotted key to look up.
    ///
    /// # Errors
    ///
    /// Returns an error if a call site cannot form a key.
    pub fn key_path(&self) -> Result<KeyPath> {
        match self {
            Self::Explicit(path) => Ok(path.clone()),
            Self::CallSite(site) => site.key_path(),
        }
    }
}

impl From<KeyPath> for PromptKey {
    fn from(path: KeyPath) -> Self {
        Self::Explicit(path)
    }
}

impl From<CallSite> for PromptKey {
    fn from(site: CallSite) -> Self {
        Self::CallSite(site)
    }
}

impl fmt::Display for PromptKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Explicit(path) => write!(f, "{path}"),
            Self::CallSite(site) => write!(f, "{}.{}", site.component, site.operation),
        }
    }
}

/// A resolved template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    /// Where the template actually lives.
    pub path: KeyPath,
    /// The template text.
    pub template: String,
    /// True when the `group.slot` fallback found it.
    pub via_fallback: bool,
}

/// Resolves keys against one document.
#[derive(Debug, Clone, Copy)]
pub struct KeyResolver<'a> {
    document: &'a Document,
}

impl<'a> KeyResolver<'a> {
    /// Creates a resolver over `document`.
    #[must_use]
    pub const fn new(document: &'a Document) -> Self {
        Self { document }
    }

    /// Resolves a prompt key.
    ///
    /// # Errors
    ///
    /// See [`KeyResolver::resolve_path`], plus any error forming the key.
    pub fn resolve(&self, key: &PromptKey) -> Result<Resolved> {
        self.resolve_path(&key.key_path()?)
    }

    /// Resolves a dotted key.
    ///
    /// # Errors
    ///
    /// - [`Error::StructuralMismatch`] if the key names a mapping
    /// - [`Error::NotFound`] if neither the exact path nor the fallback matches
    pub fn resolve_path(&self, path: &KeyPath) -> Result<Resolved> {
        let exact_error = match self.document.get(path) {
            Ok(Node::Leaf(template)) => {
                return Ok(Resolved {
                    path: path.clone(),
                    template: template.clone(),
                    via_fallback: false,
                });
            },
            Ok(Node::Interior(_)) => {
                return Err(Error::StructuralMismatch {
                    path: path.to_string(),
                    reason: "is a mapping, not a template string".to_string(),
                });
            },
            Err(e) => e,
        };

        let Some((group, slot)) = path.group_and_slot() else {
            return Err(exact_error);
        };

        match self.document.find_group_slot(group, slot) {
            Some((found, template)) => {
                tracing::debug!(requested = %path, resolved = %found, "Resolved through group.slot fallback");
                Ok(Resolved {
                    path: found,
                    template: template.to_string(),
                    via_fallback: true,
                })
            },
            None => Err(Error::NotFound(format!(
                "'{path}' (no exact match, and no '{group}' group holds a '{slot}' template)"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(json: &str) -> Document {
        serde_json::from_str(json).unwrap()
    }

    fn key(text: &str) -> KeyPath {
        KeyPath::parse(text).unwrap()
    }

    #[test]
    fn test_exact_resolution() {
        let d = doc(r#"{"pkg": {"mod": {"Cls": {"fn": "Hello {name}"}}}}"#);
        let resolved = KeyResolver::new(&d).resolve_path(&key("pkg.mod.Cls.fn")).unwrap();
        assert_eq!(resolved.path, key("pkg.mod.Cls.fn"));
        assert_eq!(resolved.template, "Hello {name}");
        assert!(!resolved.via_fallback);
    }

    #[test]
    fn test_fallback_returns_actual_path() {
        let d = doc(r#"{"a": {"x": {"Cls": {"fn": "first"}}}, "b": {"y": {"Cls": {"fn": "second"}}}}"#);
        let resolved = KeyResolver::new(&d).resolve_path(&key("moved.mod.Cls.fn")).unwrap();
        assert_eq!(resolved.path, key("a.x.Cls.fn"));
        assert_eq!(resolved.template, "first");
        assert!(resolved.via_fallback);
    }

    #[test]
    fn test_fallback_after_traversing_a_leaf() {
        let d = doc(r#"{"pkg": "leaf", "other": {"Cls": {"fn": "found"}}}"#);
        let resolved = KeyResolver::new(&d).resolve_path(&key("pkg.mod.Cls.fn")).unwrap();
        assert_eq!(resolved.path, key("other.Cls.fn"));
    }

    #[test]
    fn test_not_found_names_both_lookups() {
        let d = doc(r#"{"pkg": {"mod": {"Cls": {"fn": "x"}}}}"#);
        let err = KeyResolver::new(&d).resolve_path(&key("pkg.mod.Other.fn")).unwrap_err();
        match err {
            Error::NotFound(message) => {
                assert!(message.contains("pkg.mod.Other.fn"));
                assert!(message.contains("'Other'"));
                assert!(message.contains("'fn'"));
            },
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_single_segment_has_no_fallback() {
        let d = doc(r#"{"pkg": {"mod": {}}}"#);
        assert!(matches!(
            KeyResolver::new(&d).resolve_path(&key("missing")),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_interior_node_is_structural_mismatch() {
        let d = doc(r#"{"pkg": {"mod": {"Cls": {"fn": "x"}}}}"#);
        assert!(matches!(
            KeyResolver::new(&d).resolve_path(&key("pkg.mod.Cls")),
            Err(Error::StructuralMismatch { .. })
        ));
    }

    #[test]
    fn test_call_site_keys() {
        let site = CallSite::from_module_path("my_crate::agents::planner", "Planner", "plan");
        assert_eq!(site.key_path().unwrap(), key("agents.planner.Planner.plan"));

        let shallow = CallSite::from_module_path("my_crate::planner", "Planner", "plan");
        assert_eq!(shallow.key_path().unwrap(), key("planner.Planner.plan"));

        let bare = CallSite::from_module_path("my_crate", "Planner", "plan");
        assert_eq!(bare.key_path().unwrap(), key("Planner.plan"));

        assert!(matches!(
            CallSite::new("", "plan").key_path(),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_call_site_macro_uses_module_path() {
        let site = crate::call_site!("Cls", "fn");
        assert_eq!(site.directory.as_deref(), Some("resolver"));
        assert_eq!(site.file_stem.as_deref(), Some("tests"));
    }

    #[test]
    fn test_call_site_resolves_through_fallback() {
        let d = doc(r#"{"pkg": {"mod": {"Cls": {"fn": "Hello"}}}}"#);
        let key = PromptKey::from(CallSite::new("Cls", "fn"));
        let resolved = KeyResolver::new(&d).resolve(&key).unwrap();
        assert_eq!(resolved.template, "Hello");
    }
}
