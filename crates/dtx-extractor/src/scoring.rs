//! Batched triple scoring
//!
//! Bounds the size of each inference call. Batching never reorders or
//! drops candidates: the flattened output lines up index-for-index with
//! the input.

use dtx_core::{Candidate, Distribution, DtxError, Result, ScoringModel};

/// Default number of candidates per scoring call
pub const DEFAULT_BATCH_SIZE: usize = 32;

/// Splits candidates into fixed-size batches for a scoring model
pub struct BatchScorer<'m> {
    model: &'m dyn ScoringModel,
    batch_size: usize,
}

impl<'m> BatchScorer<'m> {
    /// Create a scorer; a batch size of zero is rejected
    pub fn new(model: &'m dyn ScoringModel, batch_size: usize) -> Result<Self> {
        if batch_size == 0 {
            return Err(DtxError::InvalidInput(
                "batch size must be at least 1".to_string(),
            ));
        }
        Ok(Self { model, batch_size })
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Number of scoring calls needed for `count` candidates
    pub fn num_batches(&self, count: usize) -> usize {
        count.div_ceil(self.batch_size)
    }

    /// Score every candidate, preserving input order
    pub fn score(&self, tokens: &[String], candidates: &[Candidate]) -> Result<Vec<Distribution>> {
        let mut distributions = Vec::with_capacity(candidates.len());

        for (index, batch) in candidates.chunks(self.batch_size).enumerate() {
            let scored = self.model.score(tokens, batch)?;
            if scored.len() != batch.len() {
                return Err(DtxError::Model(format!(
                    "{} returned {} distributions for a batch of {}",
                    self.model.name(),
                    scored.len(),
                    batch.len()
                )));
            }

            tracing::debug!(
                batch = index,
                size = batch.len(),
                model = self.model.name(),
                "Scored candidate batch"
            );
            distributions.extend(scored);
        }

        Ok(distributions)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Scores a candidate by the length of its object, counting calls
    struct LengthScorer {
        calls: AtomicUsize,
    }

    impl LengthScorer {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl ScoringModel for LengthScorer {
        fn score(&self, _tokens: &[String], batch: &[Candidate]) -> Result<Vec<Distribution>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(batch
                .iter()
                .map(|c| {
                    let p = (c.object.len() % 10) as f32 / 10.0;
                    Distribution::new(1.0 - p, p, 0.0)
                })
                .collect())
        }

        fn name(&self) -> &str {
            "length"
        }
    }

    struct ShortScorer;

    impl ScoringModel for ShortScorer {
        fn score(&self, _tokens: &[String], batch: &[Candidate]) -> Result<Vec<Distribution>> {
            Ok(batch.iter().skip(1).map(|_| Distribution::new(1.0, 0.0, 0.0)).collect())
        }

        fn name(&self) -> &str {
            "short"
        }
    }

    fn make_candidates(n: usize) -> Vec<Candidate> {
        (0..n)
            .map(|i| Candidate::new("SPEAKER0", "like", "x".repeat(i + 1)))
            .collect()
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        let model = LengthScorer::new();
        assert!(BatchScorer::new(&model, 0).is_err());
    }

    #[test]
    fn test_batches_are_issued() {
        let model = LengthScorer::new();
        let scorer = BatchScorer::new(&model, 4).unwrap();
        assert_eq!(scorer.num_batches(10), 3);

        let result = scorer.score(&[], &make_candidates(10)).unwrap();
        assert_eq!(result.len(), 10);
        assert_eq!(model.calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_no_candidates_no_calls() {
        let model = LengthScorer::new();
        let scorer = BatchScorer::new(&model, DEFAULT_BATCH_SIZE).unwrap();

        assert!(scorer.score(&[], &[]).unwrap().is_empty());
        assert_eq!(model.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_short_batch_is_model_error() {
        let scorer = BatchScorer::new(&ShortScorer, 2).unwrap();
        let err = scorer.score(&[], &make_candidates(3)).unwrap_err();
        assert!(matches!(err, DtxError::Model(_)));
    }

    proptest! {
        #[test]
        fn prop_batch_size_does_not_change_output(n in 0usize..80, batch in 1usize..40) {
            let model = LengthScorer::new();
            let candidates = make_candidates(n);

            let single = BatchScorer::new(&model, 1).unwrap().score(&[], &candidates).unwrap();
            let large = BatchScorer::new(&model, 1000).unwrap().score(&[], &candidates).unwrap();
            let other = BatchScorer::new(&model, batch).unwrap().score(&[], &candidates).unwrap();

            prop_assert_eq!(&single, &large);
            prop_assert_eq!(&single, &other);
        }
    }
}
