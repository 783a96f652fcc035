//! DTX Core - Domain models, traits, and shared types
//!
//! This crate defines the core abstractions used throughout DTX:
//! - Dialogue models (turns, candidate and scored triples, polarity)
//! - Model capability traits (argument extraction, triple scoring)
//! - Collaborator traits (post-processing, lemmatization)
//! - Predicate lookup tables
//! - Common error types
//! - Configuration management

pub mod config;
pub mod lookup;

pub use config::{
    AppConfig, ConfigError, EvaluationConfig, ExtractionConfig, LoggingConfig, ModelConfig,
    SchemaLevel,
};
pub use lookup::BioLookup;

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Marker appended after every non-empty dialogue turn
pub const END_OF_TURN: &str = "<eos>";

/// Placeholder prefix substituted for first/second-person pronouns
pub const SPEAKER_PLACEHOLDER: &str = "SPEAKER";

// ============================================================================
// Error Types
// ============================================================================

/// Core error types for DTX operations
#[derive(Error, Debug)]
pub enum DtxError {
    #[error("Model not recognized: {0}")]
    UnknownModel(String),

    #[error("Feature not available: {0}")]
    FeatureNotAvailable(String),

    #[error("Model error: {0}")]
    Model(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, DtxError>;

impl From<ConfigError> for DtxError {
    fn from(err: ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

// ============================================================================
// Dialogue Models
// ============================================================================

/// One speaker's contribution to a dialogue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    /// Binary speaker identity, resolved relative to the final turn
    pub speaker_id: u8,

    /// Word-level tokens with speaker placeholders substituted
    pub tokens: Vec<String>,
}

impl Turn {
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

/// Role an argument span plays in a triple
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArgumentRole {
    Subject,
    Predicate,
    Object,
}

impl std::fmt::Display for ArgumentRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Subject => write!(f, "subject"),
            Self::Predicate => write!(f, "predicate"),
            Self::Object => write!(f, "object"),
        }
    }
}

/// Whether a relation is asserted affirmatively or negated
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Polarity {
    #[default]
    Positive,
    Negative,
}

impl Polarity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Positive => "positive",
            Self::Negative => "negative",
        }
    }
}

impl std::fmt::Display for Polarity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Polarity {
    type Err = DtxError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "positive" => Ok(Self::Positive),
            "negative" => Ok(Self::Negative),
            other => Err(DtxError::InvalidInput(format!("unknown polarity '{other}'"))),
        }
    }
}

/// Unscored (subject, predicate, object) combination
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Candidate {
    pub subject: String,
    pub predicate: String,
    pub object: String,
}

impl Candidate {
    pub fn new(
        subject: impl Into<String>,
        predicate: impl Into<String>,
        object: impl Into<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            predicate: predicate.into(),
            object: object.into(),
        }
    }
}

/// Entailment distribution returned by a scoring model for one candidate
///
/// Class order matches the model output: neutral, entailed-positive,
/// entailed-negative.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Distribution {
    pub neutral: f32,
    pub positive: f32,
    pub negative: f32,
}

impl Distribution {
    pub fn new(neutral: f32, positive: f32, negative: f32) -> Self {
        Self {
            neutral,
            positive,
            negative,
        }
    }

    /// Probability that the candidate is entailed with either polarity
    pub fn confidence(&self) -> f32 {
        self.positive.max(self.negative)
    }

    /// Negative only when strictly more likely than positive
    pub fn polarity(&self) -> Polarity {
        if self.negative > self.positive {
            Polarity::Negative
        } else {
            Polarity::Positive
        }
    }
}

impl From<[f32; 3]> for Distribution {
    fn from(values: [f32; 3]) -> Self {
        Self::new(values[0], values[1], values[2])
    }
}

/// A subject-predicate-object-polarity triple
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Triple {
    pub subject: String,
    pub predicate: String,
    pub object: String,
    pub polarity: Polarity,
}

impl Triple {
    pub fn new(
        subject: impl Into<String>,
        predicate: impl Into<String>,
        object: impl Into<String>,
        polarity: Polarity,
    ) -> Self {
        Self {
            subject: subject.into(),
            predicate: predicate.into(),
            object: object.into(),
            polarity,
        }
    }
}

impl std::fmt::Display for Triple {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "({}, {}, {}, {})",
            self.subject, self.predicate, self.object, self.polarity
        )
    }
}

/// A triple together with the model's confidence in it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredTriple {
    pub confidence: f32,
    pub triple: Triple,
}

impl ScoredTriple {
    pub fn new(confidence: f32, triple: Triple) -> Self {
        Self { confidence, triple }
    }
}

impl std::fmt::Display for ScoredTriple {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.4} {}", self.confidence, self.triple)
    }
}

// ============================================================================
// Model Boundary
// ============================================================================

/// Per-token tag activations: one row per tag class, one column per subword
pub type TagMatrix = Array2<f32>;

/// Output of an argument extraction model for one token stream
#[derive(Debug, Clone)]
pub struct ArgumentPrediction {
    pub subjects: TagMatrix,
    pub predicates: TagMatrix,
    pub objects: TagMatrix,

    /// Subword pieces the matrices' columns refer to
    pub subwords: Vec<String>,
}

impl ArgumentPrediction {
    /// Tag matrix for a role
    pub fn matrix(&self, role: ArgumentRole) -> &TagMatrix {
        match role {
            ArgumentRole::Subject => &self.subjects,
            ArgumentRole::Predicate => &self.predicates,
            ArgumentRole::Object => &self.objects,
        }
    }
}

/// Sequence labeller producing BIO tag matrices for each argument role
pub trait ArgumentModel: Send + Sync {
    fn predict(&self, tokens: &[String]) -> Result<ArgumentPrediction>;

    /// Backend name for logging
    fn name(&self) -> &str;
}

/// Entailment classifier scoring candidate triples against a token stream
pub trait ScoringModel: Send + Sync {
    /// Returns one distribution per candidate, in candidate order
    fn score(&self, tokens: &[String], batch: &[Candidate]) -> Result<Vec<Distribution>>;

    /// Backend name for logging
    fn name(&self) -> &str;
}

/// Normalizes the surface text of an extracted triple
pub trait PostProcessor: Send + Sync {
    fn format(&self, subject: &str, predicate: &str, object: &str) -> (String, String, String);
}

/// Maps word forms to lemmas
pub trait Lemmatizer: Send + Sync {
    fn lemmatize(&self, phrase: &str) -> String;
}

/// Splits the text of one dialogue turn into word-level tokens
pub trait WordTokenizer: Send + Sync {
    fn tokenize(&self, text: &str) -> Vec<String>;
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distribution_confidence() {
        let dist = Distribution::new(0.1, 0.85, 0.05);
        assert!((dist.confidence() - 0.85).abs() < f32::EPSILON);
        assert_eq!(dist.polarity(), Polarity::Positive);

        let dist = Distribution::from([0.2, 0.1, 0.7]);
        assert!((dist.confidence() - 0.7).abs() < f32::EPSILON);
        assert_eq!(dist.polarity(), Polarity::Negative);
    }

    #[test]
    fn test_distribution_tie_is_positive() {
        let dist = Distribution::new(0.2, 0.4, 0.4);
        assert_eq!(dist.polarity(), Polarity::Positive);
        assert!((dist.confidence() - 0.4).abs() < f32::EPSILON);
    }

    #[test]
    fn test_polarity_parse() {
        assert_eq!("positive".parse::<Polarity>().unwrap(), Polarity::Positive);
        assert_eq!(" Negative ".parse::<Polarity>().unwrap(), Polarity::Negative);
        assert!("maybe".parse::<Polarity>().is_err());
    }

    #[test]
    fn test_triple_display() {
        let triple = Triple::new("speaker1", "like", "pizza", Polarity::Positive);
        assert_eq!(triple.to_string(), "(speaker1, like, pizza, positive)");
    }

    #[test]
    fn test_prediction_matrix_by_role() {
        let prediction = ArgumentPrediction {
            subjects: TagMatrix::zeros((3, 2)),
            predicates: TagMatrix::zeros((5, 2)),
            objects: TagMatrix::zeros((3, 2)),
            subwords: vec!["▁i".into(), "▁like".into()],
        };
        assert_eq!(prediction.matrix(ArgumentRole::Predicate).nrows(), 5);
        assert_eq!(prediction.matrix(ArgumentRole::Object).ncols(), 2);
    }
}
