//! End-to-end tests of the extraction pipeline with deterministic models

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use dtx_core::{
    BioLookup, Candidate, Distribution, DtxError, ExtractionConfig, Polarity, Result,
    SchemaLevel, ScoredTriple, ScoringModel, Triple,
};
use dtx_extractor::testing::{FixedArgumentModel, TableScoringModel};
use dtx_extractor::{ExtractOptions, ModelBackend, NoopPostProcessor, TripleExtractor};

const LIKE: usize = 253;
const DISLIKE: usize = 139;
const NONE_CLASS: usize = 301;
const DO_BADLY: usize = 145;
const DO_WELL: usize = 147;

fn level1() -> Arc<BioLookup> {
    Arc::new(BioLookup::for_level(SchemaLevel::Level1).unwrap())
}

fn extractor(arguments: FixedArgumentModel, scoring: TableScoringModel) -> TripleExtractor {
    TripleExtractor::new(Box::new(arguments), Box::new(scoring), level1())
}

/// Scorer that counts calls through a shared counter
struct CountingScorer {
    calls: Arc<AtomicUsize>,
}

impl ScoringModel for CountingScorer {
    fn score(&self, _tokens: &[String], batch: &[Candidate]) -> Result<Vec<Distribution>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(batch.iter().map(|_| Distribution::new(0.0, 1.0, 0.0)).collect())
    }

    fn name(&self) -> &str {
        "counting"
    }
}

#[test]
fn test_example_scenario() {
    let extractor = extractor(
        FixedArgumentModel::from_spans(&["SPEAKER0"], &[LIKE], &["pizza"]),
        TableScoringModel::uniform().with("SPEAKER0", "like", "pizza", [0.1, 0.85, 0.05]),
    );

    let triples = extractor
        .extract_triples("I like pizza", &ExtractOptions::default())
        .unwrap();

    assert_eq!(
        triples,
        vec![ScoredTriple::new(
            0.85,
            Triple::new("speaker1", "like", "pizza", Polarity::Positive)
        )]
    );
}

#[test]
fn test_empty_role_returns_nothing_without_scoring() {
    let cases = [
        FixedArgumentModel::from_spans(&[], &[LIKE], &["pizza"]),
        FixedArgumentModel::from_spans(&["SPEAKER0"], &[], &["pizza"]),
        FixedArgumentModel::from_spans(&["SPEAKER0"], &[LIKE], &[]),
        FixedArgumentModel::from_spans(&["SPEAKER0"], &[NONE_CLASS], &["pizza"]),
        FixedArgumentModel::empty(),
    ];

    for arguments in cases {
        let calls = Arc::new(AtomicUsize::new(0));
        let scorer = CountingScorer {
            calls: Arc::clone(&calls),
        };
        let extractor = TripleExtractor::new(Box::new(arguments), Box::new(scorer), level1());

        let triples = extractor
            .extract_triples("I like pizza", &ExtractOptions::default())
            .unwrap();
        assert!(triples.is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}

#[test]
fn test_candidate_count_and_batching() {
    let calls = Arc::new(AtomicUsize::new(0));
    let scorer = CountingScorer {
        calls: Arc::clone(&calls),
    };
    let extractor = TripleExtractor::new(
        Box::new(FixedArgumentModel::from_spans(
            &["SPEAKER0", "SPEAKER1", "the dog"],
            &[LIKE, DISLIKE],
            &["pizza", "pasta"],
        )),
        Box::new(scorer),
        level1(),
    );

    let options = ExtractOptions {
        batch_size: 5,
        ..ExtractOptions::default()
    };
    let triples = extractor.extract_triples("I like pizza", &options).unwrap();

    assert_eq!(triples.len(), 3 * 2 * 2);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[test]
fn test_batch_size_does_not_change_output() {
    let arguments = FixedArgumentModel::from_spans(
        &["SPEAKER0", "SPEAKER1"],
        &[LIKE, DISLIKE],
        &["pizza", "pasta", "rain"],
    );
    let scoring = || {
        TableScoringModel::new(Distribution::new(0.6, 0.3, 0.1))
            .with("SPEAKER0", "like", "pizza", [0.1, 0.8, 0.1])
            .with("SPEAKER1", "dislike", "rain", [0.1, 0.2, 0.7])
            .with("SPEAKER0", "dislike", "pasta", [0.0, 0.5, 0.5])
    };

    let small = extractor(arguments.clone(), scoring())
        .extract_triples("x", &ExtractOptions { batch_size: 1, ..ExtractOptions::default() })
        .unwrap();
    let large = extractor(arguments, scoring())
        .extract_triples("x", &ExtractOptions { batch_size: 1000, ..ExtractOptions::default() })
        .unwrap();

    assert_eq!(small, large);
}

#[test]
fn test_output_sorted_and_polarity_resolved() {
    let extractor = extractor(
        FixedArgumentModel::from_spans(&["SPEAKER0", "SPEAKER1"], &[LIKE], &["rain"]),
        TableScoringModel::uniform()
            .with("SPEAKER0", "like", "rain", [0.1, 0.2, 0.7])
            .with("SPEAKER1", "like", "rain", [0.05, 0.9, 0.05]),
    );

    let triples = extractor
        .extract_triples("do you like rain? <eos> no", &ExtractOptions::default())
        .unwrap();

    assert_eq!(triples.len(), 2);
    assert_eq!(
        triples[0].triple,
        Triple::new("speaker2", "like", "rain", Polarity::Positive)
    );
    assert_eq!(
        triples[1].triple,
        Triple::new("speaker1", "like", "rain", Polarity::Negative)
    );
    assert!(triples[0].confidence >= triples[1].confidence);
}

#[test]
fn test_placeholders_resolved_to_configured_names() {
    let config = ExtractionConfig {
        speaker1: "alice".to_string(),
        speaker2: "bob".to_string(),
        ..ExtractionConfig::default()
    };
    let backend = ModelBackend::new(
        Box::new(FixedArgumentModel::from_spans(
            &["SPEAKER0", "SPEAKER1 's sister"],
            &[LIKE],
            &["SPEAKER1"],
        )),
        Box::new(TableScoringModel::uniform()),
    );
    let extractor = TripleExtractor::from_config(backend, level1(), &config);

    let triples = extractor
        .extract_triples("hi", &ExtractOptions::default())
        .unwrap();

    assert_eq!(triples.len(), 2);
    for scored in &triples {
        let text = scored.triple.to_string().to_lowercase();
        assert!(!text.contains("speaker"), "placeholder left in {text}");
    }
    let subjects: Vec<&str> = triples.iter().map(|t| t.triple.subject.as_str()).collect();
    assert!(subjects.contains(&"alice"));
    assert!(subjects.contains(&"bob's sister"));
}

#[test]
fn test_post_processing_can_be_disabled() {
    let arguments = FixedArgumentModel::from_spans(&["SPEAKER1 's dog"], &[LIKE], &["SPEAKER0"]);

    let with = extractor(arguments.clone(), TableScoringModel::uniform())
        .extract_triples("hi", &ExtractOptions::default())
        .unwrap();
    assert_eq!(with[0].triple.subject, "speaker2's dog");

    let options = ExtractOptions {
        post_process: false,
        verbose: false,
        ..ExtractOptions::default()
    };
    let without = extractor(arguments.clone(), TableScoringModel::uniform())
        .extract_triples("hi", &options)
        .unwrap();
    assert_eq!(without[0].triple.subject, "speaker2 's dog");

    let noop = extractor(arguments, TableScoringModel::uniform())
        .with_post_processor(Box::new(NoopPostProcessor))
        .extract_triples("hi", &ExtractOptions::default())
        .unwrap();
    assert_eq!(noop[0].triple.subject, "speaker2 's dog");
}

#[test]
fn test_main_verb_do_labels_survive_post_processing() {
    let extractor = extractor(
        FixedArgumentModel::from_spans(&["SPEAKER0"], &[DO_BADLY, DO_WELL], &["math"]),
        TableScoringModel::uniform(),
    );

    let triples = extractor
        .extract_triples("I do well in math", &ExtractOptions::default())
        .unwrap();

    let mut predicates: Vec<&str> = triples.iter().map(|t| t.triple.predicate.as_str()).collect();
    predicates.sort_unstable();
    assert_eq!(predicates, vec!["do badly", "do well"]);
}

#[test]
fn test_zero_batch_size_rejected() {
    let extractor = extractor(
        FixedArgumentModel::from_spans(&["SPEAKER0"], &[LIKE], &["pizza"]),
        TableScoringModel::uniform(),
    );
    let options = ExtractOptions {
        batch_size: 0,
        ..ExtractOptions::default()
    };

    let err = extractor.extract_triples("I like pizza", &options).unwrap_err();
    assert!(matches!(err, DtxError::InvalidInput(_)));
}

#[test]
fn test_tokenize_resolves_speakers() {
    let extractor = extractor(FixedArgumentModel::empty(), TableScoringModel::uniform());
    assert_eq!(
        extractor.tokenize("I like pizza <eos> me too"),
        vec!["SPEAKER1", "like", "pizza", "<eos>", "SPEAKER0", "too", "<eos>"]
    );
    assert_eq!(extractor.name(), "fixed");
    assert_eq!(extractor.lookup().label(LIKE), Some("like"));
}
