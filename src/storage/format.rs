//! On-disk encodings of the document.

use crate::models::Document;
use crate::{Error, Result};
use std::path::Path;

/// Serialization format, chosen from the store file's extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DocumentFormat {
    /// Pretty-printed JSON (`.json` and anything unrecognised).
    #[default]
    Json,
    /// YAML (`.yaml`, `.yml`).
    Yaml,
}

impl DocumentFormat {
    /// Picks the format for a file name.
    #[must_use]
    pub fn for_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .as_deref()
        {
            Some("yaml" | "yml") => Self::Yaml,
            _ => Self::Json,
        }
    }

    /// Format name for messages.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Yaml => "yaml",
        }
    }

    /// Encodes a whole document.
    ///
    /// # Errors
    ///
    /// Returns a storage error if serialization fails.
    pub fn encode(self, document: &Document) -> Result<String> {
        match self {
            Self::Json => serde_json::to_string_pretty(document)
                .map(|mut text| {
                    text.push('\n');
                    text
                })
                .map_err(|e| Error::storage("serialize_document", e)),
            Self::Yaml => serde_yaml_ng::to_string(document)
                .map_err(|e| Error::storage("serialize_document", e)),
        }
    }

    /// Decodes a whole document.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the bytes are not valid UTF-8, not a
    /// mapping of mappings and strings, or use a key no path can address.
    pub fn decode(self, bytes: &[u8]) -> Result<Document> {
        let text = std::str::from_utf8(bytes).map_err(|e| Error::storage("decode_document", e))?;
        let document: Document = match self {
            Self::Json => {
                serde_json::from_str(text).map_err(|e| Error::storage("parse_document_json", e))?
            },
            Self::Yaml => {
                serde_yaml_ng::from_str(text).map_err(|e| Error::storage("parse_document_yaml", e))?
            },
        };
        document
            .validate()
            .map_err(|e| Error::storage("validate_document", e))?;
        Ok(document)
    }
}
