//! Ranking and polarity resolution
//!
//! Turns entailment distributions into scored triples: confidence is the
//! larger of the two entailed classes, polarity is negative only when the
//! negative class is strictly more likely, speaker placeholders become
//! display names, and results are sorted by descending confidence.

use std::cmp::Ordering;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use dtx_core::{Candidate, Distribution, DtxError, PostProcessor, Result, ScoredTriple, Triple};

static PLACEHOLDER_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bspeaker([01])\b").expect("Failed to compile speaker placeholder pattern")
});

/// Ranks scored candidates and resolves speaker placeholders
#[derive(Debug, Clone)]
pub struct Ranker {
    speaker1: String,
    speaker2: String,
}

impl Ranker {
    /// `speaker1` replaces `SPEAKER0`, `speaker2` replaces `SPEAKER1`
    pub fn new(speaker1: impl Into<String>, speaker2: impl Into<String>) -> Self {
        Self {
            speaker1: speaker1.into(),
            speaker2: speaker2.into(),
        }
    }

    /// Replace every speaker placeholder with its display name in one pass
    pub fn resolve_speakers(&self, text: &str) -> String {
        PLACEHOLDER_PATTERN
            .replace_all(text, |caps: &Captures| match &caps[1] {
                "0" => self.speaker1.clone(),
                _ => self.speaker2.clone(),
            })
            .into_owned()
    }

    /// Pair candidates with their distributions and sort by confidence
    pub fn rank(
        &self,
        candidates: &[Candidate],
        distributions: &[Distribution],
        post_processor: Option<&dyn PostProcessor>,
    ) -> Result<Vec<ScoredTriple>> {
        if candidates.len() != distributions.len() {
            return Err(DtxError::InvalidInput(format!(
                "{} candidates but {} distributions",
                candidates.len(),
                distributions.len()
            )));
        }

        let mut triples: Vec<ScoredTriple> = candidates
            .iter()
            .zip(distributions)
            .map(|(candidate, dist)| {
                let subject = self.resolve_speakers(&candidate.subject);
                let predicate = self.resolve_speakers(&candidate.predicate);
                let object = self.resolve_speakers(&candidate.object);

                let (subject, predicate, object) = match post_processor {
                    Some(processor) => processor.format(&subject, &predicate, &object),
                    None => (subject, predicate, object),
                };

                ScoredTriple::new(
                    dist.confidence(),
                    Triple::new(subject, predicate, object, dist.polarity()),
                )
            })
            .collect();

        triples.sort_by(|a, b| by_confidence_desc(a.confidence, b.confidence));
        Ok(triples)
    }
}

impl Default for Ranker {
    fn default() -> Self {
        Self::new("speaker1", "speaker2")
    }
}

/// Descending order with NaN last
fn by_confidence_desc(a: f32, b: f32) -> Ordering {
    b.partial_cmp(&a)
        .unwrap_or_else(|| a.is_nan().cmp(&b.is_nan()))
}

// ============================================================================
// Tests
// ============================================================================
