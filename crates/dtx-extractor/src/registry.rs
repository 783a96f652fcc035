//! Model backend registry
//!
//! Maps model names to factories that load an argument extraction model and
//! a triple scoring model from an explicit path. New backends register a
//! factory instead of extending a dispatch `match`.

use std::collections::BTreeMap;
use std::path::PathBuf;

use dtx_core::{ArgumentModel, DtxError, ModelConfig, Result, ScoringModel};

/// Where and how to load a backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSpec {
    /// Directory holding the exported model files
    pub path: PathBuf,
    /// Pretrained base the models were fine-tuned from
    pub base_model: String,
}

impl ModelSpec {
    pub fn new(path: impl Into<PathBuf>, base_model: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            base_model: base_model.into(),
        }
    }
}

impl From<&ModelConfig> for ModelSpec {
    fn from(config: &ModelConfig) -> Self {
        Self::new(config.path.clone(), config.base_model.clone())
    }
}

/// Loaded model pair used by the extraction pipeline
pub struct ModelBackend {
    pub argument: Box<dyn ArgumentModel>,
    pub scoring: Box<dyn ScoringModel>,
}

impl ModelBackend {
    pub fn new(argument: Box<dyn ArgumentModel>, scoring: Box<dyn ScoringModel>) -> Self {
        Self { argument, scoring }
    }
}

/// Loads a backend from a `ModelSpec`
pub type BackendFactory = Box<dyn Fn(&ModelSpec) -> Result<ModelBackend> + Send + Sync>;

/// Backend factories keyed by model name
pub struct ModelRegistry {
    factories: BTreeMap<String, BackendFactory>,
}

impl ModelRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    /// Create a registry with the built-in backends (`albert`)
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("albert", crate::backends::load_albert);
        registry
    }

    /// Register a factory, replacing any previous one with the same name
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn(&ModelSpec) -> Result<ModelBackend> + Send + Sync + 'static,
    {
        let name = name.into().to_lowercase();
        tracing::debug!(model = %name, "Registered model backend");
        self.factories.insert(name, Box::new(factory));
    }

    /// Whether a backend with this name is registered
    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(&name.to_lowercase())
    }

    /// Registered model names in sorted order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    /// Load the backend registered under `name`
    pub fn load(&self, name: &str, spec: &ModelSpec) -> Result<ModelBackend> {
        let factory = self
            .factories
            .get(&name.to_lowercase())
            .ok_or_else(|| DtxError::UnknownModel(name.to_string()))?;

        tracing::info!(model = name, path = %spec.path.display(), "Loading model backend");
        factory(spec)
    }
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FixedArgumentModel, TableScoringModel};

    fn fixed_backend(_spec: &ModelSpec) -> Result<ModelBackend> {
        Ok(ModelBackend::new(
            Box::new(FixedArgumentModel::empty()),
            Box::new(TableScoringModel::uniform()),
        ))
    }

    #[test]
    fn test_unknown_model_is_error() {
        let registry = ModelRegistry::with_defaults();
        let spec = ModelSpec::new("models/level1", "albert-base-v2");

        match registry.load("bert-large", &spec) {
            Err(DtxError::UnknownModel(name)) => assert_eq!(name, "bert-large"),
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("unknown model loaded"),
        }
    }

    #[test]
    fn test_defaults_register_albert() {
        let registry = ModelRegistry::with_defaults();
        assert!(registry.contains("albert"));
        assert!(registry.contains("ALBERT"));
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["albert"]);
    }

    #[test]
    fn test_register_custom_backend() {
        let mut registry = ModelRegistry::new();
        registry.register("fixed", fixed_backend);

        let backend = registry
            .load("fixed", &ModelSpec::new("unused", "none"))
            .unwrap();
        assert_eq!(backend.argument.name(), "fixed");
    }

    #[cfg(not(feature = "onnx"))]
    #[test]
    fn test_albert_requires_onnx_feature() {
        let registry = ModelRegistry::with_defaults();
        let result = registry.load("albert", &ModelSpec::new("models/level1", "albert-base-v2"));
        assert!(matches!(result, Err(DtxError::FeatureNotAvailable(_))));
    }
}
