//! Dotted key paths.

use crate::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Separator between key path segments.
pub const SEPARATOR: char = '.';

/// A non-empty sequence of segments addressing a node in a [`Document`].
///
/// Segments are never empty and never contain [`SEPARATOR`], so the dotted
/// text form always parses back to the same path.
///
/// [`Document`]: super::Document
///
/// # Examples
///
/// ```rust
/// use promptree::KeyPath;
///
/// let key = KeyPath::parse("pkg.mod.Cls.fn").unwrap();
/// assert_eq!(key.len(), 4);
/// assert_eq!(key.last(), "fn");
/// assert_eq!(key.to_string(), "pkg.mod.Cls.fn");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct KeyPath(Vec<String>);

impl KeyPath {
    /// Parses a dotted key.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if the key is empty or has an empty segment.
    pub fn parse(text: &str) -> Result<Self> {
        let text = text.trim();
        if text.is_empty() {
            return Err(Error::Validation("key path cannot be empty".to_string()));
        }
        Self::from_segments(text.split(SEPARATOR))
    }

    /// Builds a path from individual segments.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if there are no segments, or if a segment
    /// is empty or contains the separator.
    pub fn from_segments<I, S>(segments: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let segments: Vec<String> = segments.into_iter().map(Into::into).collect();
        if segments.is_empty() {
            return Err(Error::Validation("key path cannot be empty".to_string()));
        }
        for segment in &segments {
            validate_segment(segment)?;
        }
        Ok(Self(segments))
    }

    /// Returns the segments.
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// Number of segments (always at least one).
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always `false`; present for API symmetry with `len`.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        false
    }

    /// The final segment.
    #[must_use]
    pub fn last(&self) -> &str {
        self.0.last().map_or("", String::as_str)
    }

    /// Segments before the final one.
    #[must_use]
    pub fn parent_segments(&self) -> &[String] {
        &self.0[..self.0.len() - 1]
    }

    /// The last two segments as `(group, slot)`, if the path has at least two.
    #[must_use]
    pub fn group_and_slot(&self) -> Option<(&str, &str)> {
        match self.0.as_slice() {
            [.., group, slot] => Some((group.as_str(), slot.as_str())),
            _ => None,
        }
    }

    /// Returns a new path with `segment` appended.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if the segment is empty or contains the separator.
    pub fn child(&self, segment: &str) -> Result<Self> {
        validate_segment(segment)?;
        let mut segments = self.0.clone();
        segments.push(segment.to_string());
        Ok(Self(segments))
    }

    /// Returns true if `prefix` is a leading sub-path of (or equal to) this path.
    #[must_use]
    pub fn starts_with(&self, prefix: &Self) -> bool {
        self.0.starts_with(&prefix.0)
    }

    /// Appends a segment known to be valid (used by tree walks over existing keys).
    pub(crate) fn push_unchecked(&mut self, segment: &str) {
        self.0.push(segment.to_string());
    }

    pub(crate) fn from_vec_unchecked(segments: Vec<String>) -> Self {
        Self(segments)
    }
}

pub(crate) fn validate_segment(segment: &str) -> Result<()> {
    if segment.is_empty() {
        return Err(Error::Validation(
            "key path segments cannot be empty".to_string(),
        ));
    }
    if segment.contains(SEPARATOR) {
        return Err(Error::Validation(format!(
            "key path segment '{segment}' contains '{SEPARATOR}'"
        )));
    }
    Ok(())
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join(&SEPARATOR.to_string()))
    }
}

impl FromStr for KeyPath {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for KeyPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for KeyPath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Self::parse(&text).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_parse_and_display() {
        let key = KeyPath::parse("pkg.mod.Cls.fn").unwrap();
        assert_eq!(key.segments(), ["pkg", "mod", "Cls", "fn"]);
        assert_eq!(key.to_string(), "pkg.mod.Cls.fn");
        assert_eq!(key.group_and_slot(), Some(("Cls", "fn")));
        assert_eq!(key.parent_segments(), ["pkg", "mod", "Cls"]);
    }

    #[test_case("" ; "empty")]
    #[test_case("   " ; "blank")]
    #[test_case("a..b" ; "empty middle segment")]
    #[test_case(".a" ; "leading dot")]
    #[test_case("a." ; "trailing dot")]
    fn test_parse_rejects(text: &str) {
        assert!(matches!(KeyPath::parse(text), Err(Error::Validation(_))));
    }

    #[test]
    fn test_single_segment_has_no_group_slot() {
        let key = KeyPath::parse("solo").unwrap();
        assert_eq!(key.group_and_slot(), None);
        assert!(key.parent_segments().is_empty());
    }

    #[test]
    fn test_child_rejects_separator() {
        let key = KeyPath::parse("pkg").unwrap();
        assert!(key.child("a.b").is_err());
        assert_eq!(key.child("mod").unwrap().to_string(), "pkg.mod");
    }

    #[test]
    fn test_starts_with() {
        let key = KeyPath::parse("pkg.mod.Cls").unwrap();
        assert!(key.starts_with(&KeyPath::parse("pkg").unwrap()));
        assert!(key.starts_with(&KeyPath::parse("pkg.mod.Cls").unwrap()));
        assert!(!key.starts_with(&KeyPath::parse("pkg.other").unwrap()));
    }
}
