//! Predicate lookup tables
//!
//! Maps the Begin-tag row index of a predicate class to its normalized
//! predicate label. Two annotation schema levels ship with the crate;
//! custom tables load from JSON objects such as `{"3": "act", "5": "add"}`.

use std::collections::BTreeMap;
use std::path::Path;

use crate::config::{ModelConfig, SchemaLevel};
use crate::{DtxError, Result};

/// Label of the class that marks "no predicate"
pub const NONE_LABEL: &str = "None";

/// Immutable tag-class index to predicate label mapping
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BioLookup {
    labels: BTreeMap<usize, String>,
}

impl BioLookup {
    /// Create a lookup from explicit entries
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (usize, S)>,
        S: Into<String>,
    {
        Self {
            labels: entries.into_iter().map(|(k, v)| (k, v.into())).collect(),
        }
    }

    /// Built-in table for an annotation schema level
    pub fn for_level(level: SchemaLevel) -> Result<Self> {
        match level {
            SchemaLevel::Level1 => Self::from_json_str(include_str!("lookups/level1.json")),
            SchemaLevel::Level2 => Self::from_json_str(include_str!("lookups/level2.json")),
        }
    }

    /// Table selected by a model configuration; `lookup_path` wins over `schema`
    pub fn for_model(config: &ModelConfig) -> Result<Self> {
        match &config.lookup_path {
            Some(path) => Self::from_file(path),
            None => Self::for_level(config.schema),
        }
    }

    /// Parse a JSON object of index -> label
    pub fn from_json_str(json: &str) -> Result<Self> {
        let labels: BTreeMap<usize, String> = serde_json::from_str(json)?;
        Ok(Self { labels })
    }

    /// Load a JSON lookup table from disk
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            DtxError::Config(format!("failed to read lookup {}: {e}", path.display()))
        })?;
        Self::from_json_str(&content)
    }

    /// Raw label for a tag index, including the "None" class
    pub fn label(&self, index: usize) -> Option<&str> {
        self.labels.get(&index).map(String::as_str)
    }

    /// Label for a tag index if it names an actual predicate
    pub fn predicate_label(&self, index: usize) -> Option<&str> {
        self.label(index).filter(|label| *label != NONE_LABEL)
    }

    /// Predicate vocabulary in index order, without the "None" class
    pub fn predicates(&self) -> impl Iterator<Item = (usize, &str)> {
        self.labels
            .iter()
            .filter(|(_, label)| label.as_str() != NONE_LABEL)
            .map(|(index, label)| (*index, label.as_str()))
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}
