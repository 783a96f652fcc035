//! DTX Configuration Management
//!
//! Handles configuration from environment variables, config files,
//! and command-line arguments with defaults matching the reference
//! ALBERT evaluation setup.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Model backend selection
    pub model: ModelConfig,

    /// Extraction pipeline settings
    pub extraction: ExtractionConfig,

    /// Evaluation harness settings
    pub evaluation: EvaluationConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        // Model
        if let Ok(name) = std::env::var("DTX_MODEL") {
            config.model.name = name;
        }
        if let Ok(path) = std::env::var("DTX_MODEL_PATH") {
            config.model.path = PathBuf::from(path);
        }
        if let Ok(base) = std::env::var("DTX_BASE_MODEL") {
            config.model.base_model = base;
        }
        if let Ok(schema) = std::env::var("DTX_SCHEMA") {
            config.model.schema = schema.parse()?;
        }

        // Extraction
        if let Ok(size) = std::env::var("DTX_BATCH_SIZE") {
            config.extraction.batch_size = parse_value("DTX_BATCH_SIZE", &size)?;
        }

        // Evaluation
        if let Ok(k) = std::env::var("DTX_MIN_CONFIDENCE") {
            config.evaluation.min_confidence = parse_value("DTX_MIN_CONFIDENCE", &k)?;
        }
        if let Ok(dir) = std::env::var("DTX_RESULTS_DIR") {
            config.evaluation.results_dir = PathBuf::from(dir);
        }

        // Logging
        if let Ok(level) = std::env::var("LOG_LEVEL") {
            config.logging.level = level;
        }

        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::FileReadError {
            path: path.clone(),
            source: e,
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path,
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Merge with environment variables (env takes precedence)
    pub fn with_env_override(mut self) -> Result<Self, ConfigError> {
        let env_config = Self::from_env()?;
        let defaults = Self::default();

        // Only override if env values differ from defaults
        if env_config.model.name != defaults.model.name {
            self.model.name = env_config.model.name;
        }
        if env_config.model.path != defaults.model.path {
            self.model.path = env_config.model.path;
        }
        if env_config.model.base_model != defaults.model.base_model {
            self.model.base_model = env_config.model.base_model;
        }
        if env_config.model.schema != defaults.model.schema {
            self.model.schema = env_config.model.schema;
        }
        if env_config.extraction.batch_size != defaults.extraction.batch_size {
            self.extraction.batch_size = env_config.extraction.batch_size;
        }
        if env_config.evaluation.min_confidence != defaults.evaluation.min_confidence {
            self.evaluation.min_confidence = env_config.evaluation.min_confidence;
        }
        if env_config.evaluation.results_dir != defaults.evaluation.results_dir {
            self.evaluation.results_dir = env_config.evaluation.results_dir;
        }
        if env_config.logging.level != defaults.logging.level {
            self.logging.level = env_config.logging.level;
        }

        Ok(self)
    }

    /// Reject values the pipeline cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.extraction.batch_size == 0 {
            return Err(ConfigError::InvalidValue {
                key: "extraction.batch_size".to_string(),
                value: "0".to_string(),
            });
        }
        if self.extraction.separator.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "extraction.separator".to_string(),
                value: self.extraction.separator.clone(),
            });
        }
        if !(0.0..=1.0).contains(&self.extraction.decision_threshold) {
            return Err(ConfigError::InvalidValue {
                key: "extraction.decision_threshold".to_string(),
                value: self.extraction.decision_threshold.to_string(),
            });
        }
        if !(0.0..=1.0).contains(&self.evaluation.min_confidence) {
            return Err(ConfigError::InvalidValue {
                key: "evaluation.min_confidence".to_string(),
                value: self.evaluation.min_confidence.to_string(),
            });
        }
        Ok(())
    }
}

fn parse_value<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}

/// Model backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Registered backend name
    pub name: String,

    /// Directory holding the exported model files
    pub path: PathBuf,

    /// Pretrained base model the checkpoints were fine-tuned from
    pub base_model: String,

    /// Built-in predicate schema
    pub schema: SchemaLevel,

    /// Custom lookup table (overrides `schema`)
    pub lookup_path: Option<PathBuf>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: "albert".to_string(),
            path: PathBuf::from("models/level1"),
            base_model: "albert-base-v2".to_string(),
            schema: SchemaLevel::Level1,
            lookup_path: None,
        }
    }
}

/// Predicate annotation schema levels
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaLevel {
    #[default]
    Level1,
    Level2,
}

impl std::str::FromStr for SchemaLevel {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "level1" | "l1" | "1" => Ok(Self::Level1),
            "level2" | "l2" | "2" => Ok(Self::Level2),
            _ => Err(ConfigError::InvalidValue {
                key: "DTX_SCHEMA".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for SchemaLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Level1 => write!(f, "level1"),
            Self::Level2 => write!(f, "level2"),
        }
    }
}

/// Extraction pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Token delimiting dialogue turns
    pub separator: String,

    /// Display name for speaker id 0 (the final turn's speaker)
    pub speaker1: String,

    /// Display name for speaker id 1
    pub speaker2: String,

    /// Candidates per scoring call
    pub batch_size: usize,

    /// Apply contraction expansion and auxiliary stripping
    pub post_process: bool,

    /// Minimum tag activation for a subword to join a span
    pub decision_threshold: f32,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            separator: crate::END_OF_TURN.to_string(),
            speaker1: "speaker1".to_string(),
            speaker2: "speaker2".to_string(),
            batch_size: 32,
            post_process: true,
            decision_threshold: 0.5,
        }
    }
}

/// Evaluation harness configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationConfig {
    /// Confidence above which an extraction counts as found
    pub min_confidence: f32,

    /// Evaluate only the first N examples
    pub num_samples: Option<usize>,

    /// Lemmatize predicates before matching
    pub deduplication: bool,

    /// Where result JSON and transcripts are written
    pub results_dir: PathBuf,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            min_confidence: 0.9,
            num_samples: None,
            deduplication: false,
            results_dir: PathBuf::from("results"),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// JSON format for logs
    pub json_format: bool,

    /// Include file/line in logs
    pub include_location: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
            include_location: false,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}
