//! Deterministic model doubles
//!
//! `FixedArgumentModel` returns a prepared prediction regardless of input and
//! `TableScoringModel` answers from a lookup table. Both are available to
//! other crates through the `testing` feature.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use ndarray::Array2;

use dtx_core::{
    ArgumentModel, ArgumentPrediction, ArgumentRole, Candidate, Distribution, Result,
    ScoringModel, TagMatrix,
};

/// Subword inserted between phrases; always tagged Outside
const GAP_PIECE: &str = "\u{2581},";

/// Argument model returning the same prediction for every input
#[derive(Debug, Clone)]
pub struct FixedArgumentModel {
    prediction: ArgumentPrediction,
}

impl FixedArgumentModel {
    pub fn new(prediction: ArgumentPrediction) -> Self {
        Self { prediction }
    }

    /// Prediction without any subwords, so every role decodes to nothing
    pub fn empty() -> Self {
        Self::new(ArgumentPrediction {
            subjects: TagMatrix::zeros((3, 0)),
            predicates: TagMatrix::zeros((3, 0)),
            objects: TagMatrix::zeros((3, 0)),
            subwords: Vec::new(),
        })
    }

    /// Build one-hot matrices that decode to the given spans
    ///
    /// Subject and object phrases are laid out word by word as SentencePiece
    /// pieces. Each predicate is given by the lookup key of its class (the
    /// odd Begin row, e.g. `253`) and occupies a single subword.
    pub fn from_spans(subjects: &[&str], predicate_rows: &[usize], objects: &[&str]) -> Self {
        // (piece, tagged role, tag row)
        let mut columns: Vec<(String, Option<ArgumentRole>, usize)> = Vec::new();

        let mut push_phrase = |phrase: &str, role: ArgumentRole| {
            for (i, word) in phrase.split_whitespace().enumerate() {
                let row = if i == 0 { 1 } else { 2 };
                columns.push((format!("\u{2581}{word}"), Some(role), row));
            }
            columns.push((GAP_PIECE.to_string(), None, 0));
        };

        for phrase in subjects {
            push_phrase(phrase, ArgumentRole::Subject);
        }
        for phrase in objects {
            push_phrase(phrase, ArgumentRole::Object);
        }
        for &row in predicate_rows {
            columns.push((format!("\u{2581}pred{row}"), Some(ArgumentRole::Predicate), row));
            columns.push((GAP_PIECE.to_string(), None, 0));
        }

        let n = columns.len();
        let predicate_height = predicate_rows.iter().max().map_or(3, |&row| row + 2);
        let mut subjects_matrix = Array2::zeros((3, n));
        let mut predicates_matrix = Array2::zeros((predicate_height, n));
        let mut objects_matrix = Array2::zeros((3, n));

        for (col, (_, role, row)) in columns.iter().enumerate() {
            let (subject_row, predicate_row, object_row) = match role {
                Some(ArgumentRole::Subject) => (*row, 0, 0),
                Some(ArgumentRole::Predicate) => (0, *row, 0),
                Some(ArgumentRole::Object) => (0, 0, *row),
                None => (0, 0, 0),
            };
            subjects_matrix[[subject_row, col]] = 1.0;
            predicates_matrix[[predicate_row, col]] = 1.0;
            objects_matrix[[object_row, col]] = 1.0;
        }

        Self::new(ArgumentPrediction {
            subjects: subjects_matrix,
            predicates: predicates_matrix,
            objects: objects_matrix,
            subwords: columns.into_iter().map(|(piece, _, _)| piece).collect(),
        })
    }
}

impl ArgumentModel for FixedArgumentModel {
    fn predict(&self, _tokens: &[String]) -> Result<ArgumentPrediction> {
        Ok(self.prediction.clone())
    }

    fn name(&self) -> &str {
        "fixed"
    }
}

/// Scoring model answering from a (subject, predicate, object) table
pub struct TableScoringModel {
    table: HashMap<Candidate, Distribution>,
    fallback: Distribution,
    calls: AtomicUsize,
}

impl TableScoringModel {
    /// Unlisted candidates score as `fallback`
    pub fn new(fallback: Distribution) -> Self {
        Self {
            table: HashMap::new(),
            fallback,
            calls: AtomicUsize::new(0),
        }
    }

    /// Every candidate scores one third per class
    pub fn uniform() -> Self {
        Self::new(Distribution::new(1.0 / 3.0, 1.0 / 3.0, 1.0 / 3.0))
    }

    pub fn with(
        mut self,
        subject: &str,
        predicate: &str,
        object: &str,
        distribution: impl Into<Distribution>,
    ) -> Self {
        self.table
            .insert(Candidate::new(subject, predicate, object), distribution.into());
        self
    }

    /// Number of `score` calls received so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ScoringModel for TableScoringModel {
    fn score(&self, _tokens: &[String], batch: &[Candidate]) -> Result<Vec<Distribution>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(batch
            .iter()
            .map(|candidate| self.table.get(candidate).copied().unwrap_or(self.fallback))
            .collect())
    }

    fn name(&self) -> &str {
        "table"
    }
}
