//! Quality Metrics module
//!
//! Precision, recall and F1 of extracted triples at a confidence threshold,
//! the precision-recall curve over thresholds and its area.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use dtx_core::{Lemmatizer, ScoredTriple, Triple};

use crate::loader::GoldTriple;

/// Thresholds of the PR curve: 0.00 to 1.00 in steps of 0.01
pub fn default_thresholds() -> Vec<f32> {
    (0..=100).map(|i| i as f32 / 100.0).collect()
}

// ============================================================================
// Triple Metrics
// ============================================================================

/// Counts for triple extraction evaluation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TripleMetrics {
    /// True positives (predicted triples found in the gold set)
    pub true_positives: usize,
    /// False positives (predicted triples absent from the gold set)
    pub false_positives: usize,
    /// False negatives (gold triples not predicted)
    pub false_negatives: usize,
    /// Total distinct gold triples
    pub gold_total: usize,
    /// Total distinct predicted triples
    pub predicted_total: usize,
}

impl TripleMetrics {
    /// Calculate precision (TP / (TP + FP))
    pub fn precision(&self) -> f32 {
        if self.true_positives + self.false_positives == 0 {
            0.0
        } else {
            self.true_positives as f32 / (self.true_positives + self.false_positives) as f32
        }
    }

    /// Calculate recall (TP / (TP + FN))
    pub fn recall(&self) -> f32 {
        if self.true_positives + self.false_negatives == 0 {
            0.0
        } else {
            self.true_positives as f32 / (self.true_positives + self.false_negatives) as f32
        }
    }

    /// Calculate F1 score (2 * P * R / (P + R))
    pub fn f1_score(&self) -> f32 {
        let p = self.precision();
        let r = self.recall();
        if p + r == 0.0 {
            0.0
        } else {
            2.0 * p * r / (p + r)
        }
    }

    /// Add another set of counts
    pub fn add(&mut self, other: &TripleMetrics) {
        self.true_positives += other.true_positives;
        self.false_positives += other.false_positives;
        self.false_negatives += other.false_negatives;
        self.gold_total += other.gold_total;
        self.predicted_total += other.predicted_total;
    }
}

/// One point of the precision-recall curve
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PrPoint {
    pub threshold: f32,
    pub precision: f32,
    pub recall: f32,
}

/// Area under a precision-recall curve by the trapezoid rule over recall
pub fn pr_auc(curve: &[PrPoint]) -> f32 {
    let mut points: Vec<(f32, f32)> = curve.iter().map(|p| (p.recall, p.precision)).collect();
    points.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.total_cmp(&b.1)));

    points
        .windows(2)
        .map(|w| (w[1].0 - w[0].0) * (w[0].1 + w[1].1) / 2.0)
        .sum()
}

// ============================================================================
// Matching
// ============================================================================

/// Normalized form used to compare gold and predicted triples
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TripleKey {
    pub subject: String,
    pub predicate: String,
    pub object: String,
    /// Lowercase polarity; gold values other than positive/negative never match
    pub polarity: String,
}

fn normalize(text: &str) -> String {
    text.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Gold triples and predictions of one scored example
#[derive(Debug, Clone, Default)]
pub struct ExampleOutcome {
    pub gold: Vec<GoldTriple>,
    pub predicted: Vec<ScoredTriple>,
}

/// Summary written to the result JSON
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub precision: f32,
    pub recall: f32,
    pub f1: f32,
    pub auc: f32,
    #[serde(rename = "pr-curve")]
    pub pr_curve: Vec<PrPoint>,
    /// Confidence threshold of precision, recall and F1
    pub k: f32,
    /// Examples scored
    pub examples: usize,
    /// Examples excluded for malformed gold triples
    pub excluded: usize,
    pub metrics: TripleMetrics,
}

impl EvaluationReport {
    /// Human-readable summary
    pub fn summary(&self) -> String {
        format!(
            "=== Triple Extraction Report ===\n\n\
             Examples evaluated: {} ({} excluded)\n\n\
             At confidence > {:.2}:\n\
               Precision: {:.1}%\n\
               Recall:    {:.1}%\n\
               F1 Score:  {:.1}%\n\
               Gold: {} | Predicted: {} | TP: {} | FP: {} | FN: {}\n\n\
             PR-AUC: {:.4}\n",
            self.examples,
            self.excluded,
            self.k,
            self.precision * 100.0,
            self.recall * 100.0,
            self.f1 * 100.0,
            self.metrics.gold_total,
            self.metrics.predicted_total,
            self.metrics.true_positives,
            self.metrics.false_positives,
            self.metrics.false_negatives,
            self.auc,
        )
    }
}

// ============================================================================
// Evaluator
// ============================================================================

/// Evaluator for triple extraction quality
///
/// Triples match when subject, predicate, object and polarity agree after
/// lowercasing and whitespace normalization. With a lemmatizer, predicates
/// are additionally reduced to their lemmas so that "is" and "are" match.
///
/// Gold triples and above-threshold predictions of an example are always
/// compared as sets, whether or not a lemmatizer is set: a prediction
/// repeated by several candidates counts once.
#[derive(Default)]
pub struct Evaluator<'a> {
    lemmatizer: Option<&'a dyn Lemmatizer>,
}

impl<'a> Evaluator<'a> {
    /// Create an evaluator without predicate lemmatization
    pub fn new() -> Self {
        Self { lemmatizer: None }
    }

    /// Lemmatize predicates before matching
    pub fn with_lemmatizer(mut self, lemmatizer: &'a dyn Lemmatizer) -> Self {
        self.lemmatizer = Some(lemmatizer);
        self
    }

    fn make_key(&self, subject: &str, predicate: &str, object: &str, polarity: &str) -> TripleKey {
        let predicate = normalize(predicate);
        let predicate = match self.lemmatizer {
            Some(lemmatizer) => lemmatizer.lemmatize(&predicate),
            None => predicate,
        };

        TripleKey {
            subject: normalize(subject),
            predicate,
            object: normalize(object),
            polarity: normalize(polarity),
        }
    }

    /// Comparison key of a predicted triple
    pub fn key(&self, triple: &Triple) -> TripleKey {
        self.make_key(
            &triple.subject,
            &triple.predicate,
            &triple.object,
            triple.polarity.as_str(),
        )
    }

    /// Comparison key of a gold triple
    pub fn gold_key(&self, triple: &GoldTriple) -> TripleKey {
        self.make_key(&triple.subject, &triple.predicate, &triple.object, &triple.polarity)
    }

    /// Compare one example's predictions above `k` with its gold triples
    pub fn evaluate_example(&self, outcome: &ExampleOutcome, k: f32) -> TripleMetrics {
        let gold_set: HashSet<TripleKey> = outcome.gold.iter().map(|t| self.gold_key(t)).collect();
        let predicted_set: HashSet<TripleKey> = outcome
            .predicted
            .iter()
            .filter(|scored| scored.confidence > k)
            .map(|scored| self.key(&scored.triple))
            .collect();

        let true_positives = predicted_set.intersection(&gold_set).count();

        TripleMetrics {
            true_positives,
            false_positives: predicted_set.len() - true_positives,
            false_negatives: gold_set.len() - true_positives,
            gold_total: gold_set.len(),
            predicted_total: predicted_set.len(),
        }
    }

    /// Micro-averaged counts over all examples at threshold `k`
    pub fn evaluate(&self, outcomes: &[ExampleOutcome], k: f32) -> TripleMetrics {
        let mut total = TripleMetrics::default();
        for outcome in outcomes {
            total.add(&self.evaluate_example(outcome, k));
        }
        total
    }

    /// Precision and recall at each threshold
    pub fn pr_curve(&self, outcomes: &[ExampleOutcome], thresholds: &[f32]) -> Vec<PrPoint> {
        thresholds
            .iter()
            .map(|&threshold| {
                let metrics = self.evaluate(outcomes, threshold);
                PrPoint {
                    threshold,
                    precision: metrics.precision(),
                    recall: metrics.recall(),
                }
            })
            .collect()
    }

    /// Full report at threshold `k`
    pub fn report(&self, outcomes: &[ExampleOutcome], k: f32, excluded: usize) -> EvaluationReport {
        let metrics = self.evaluate(outcomes, k);
        let pr_curve = self.pr_curve(outcomes, &default_thresholds());

        EvaluationReport {
            precision: metrics.precision(),
            recall: metrics.recall(),
            f1: metrics.f1_score(),
            auc: pr_auc(&pr_curve),
            pr_curve,
            k,
            examples: outcomes.len(),
            excluded,
            metrics,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
