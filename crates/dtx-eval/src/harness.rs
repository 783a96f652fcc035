//! Benchmark harness
//!
//! Runs the extractor over every example of a gold test file, reports and
//! excludes examples with malformed gold triples, and scores the rest.

use std::path::Path;

use dtx_core::{EvaluationConfig, Lemmatizer, Result};
use dtx_extractor::{ExtractOptions, RuleLemmatizer, TripleExtractor};

use crate::loader::load_examples;
use crate::metrics::{EvaluationReport, Evaluator, ExampleOutcome};
use crate::report::{ResultWriter, TranscriptEntry};

/// Options of one evaluation run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvaluationOptions {
    /// Confidence above which a prediction counts as found (`k`)
    pub min_confidence: f32,
    /// Evaluate only the first N examples
    pub num_samples: Option<usize>,
    /// Lemmatize predicates before matching
    pub deduplication: bool,
}

impl Default for EvaluationOptions {
    fn default() -> Self {
        Self {
            min_confidence: 0.9,
            num_samples: None,
            deduplication: false,
        }
    }
}

impl From<&EvaluationConfig> for EvaluationOptions {
    fn from(config: &EvaluationConfig) -> Self {
        Self {
            min_confidence: config.min_confidence,
            num_samples: config.num_samples,
            deduplication: config.deduplication,
        }
    }
}

/// Evaluates an extractor against gold test files
pub struct Harness<'a> {
    extractor: &'a TripleExtractor,
    extract_options: ExtractOptions,
    lemmatizer: Box<dyn Lemmatizer>,
    writer: Option<ResultWriter>,
}

impl<'a> Harness<'a> {
    /// Create a harness using the rule-based lemmatizer for deduplication
    pub fn new(extractor: &'a TripleExtractor) -> Self {
        Self {
            extractor,
            extract_options: ExtractOptions::default(),
            lemmatizer: Box::new(RuleLemmatizer::new()),
            writer: None,
        }
    }

    pub fn with_extract_options(mut self, options: ExtractOptions) -> Self {
        self.extract_options = options;
        self
    }

    pub fn with_lemmatizer(mut self, lemmatizer: Box<dyn Lemmatizer>) -> Self {
        self.lemmatizer = lemmatizer;
        self
    }

    /// Write JSON summaries and transcripts through `writer`
    pub fn with_writer(mut self, writer: ResultWriter) -> Self {
        self.writer = Some(writer);
        self
    }

    /// Evaluate one test file
    pub fn evaluate(&self, test_file: &Path, options: &EvaluationOptions) -> Result<EvaluationReport> {
        let mut examples = load_examples(test_file)?;
        if let Some(limit) = options.num_samples {
            examples.truncate(limit);
        }
        let total = examples.len();

        tracing::info!(
            test_file = %test_file.display(),
            examples = total,
            model = self.extractor.name(),
            k = options.min_confidence,
            "Starting evaluation"
        );

        let mut transcript = match &self.writer {
            Some(writer) => Some(writer.open_transcript(test_file, self.extractor.name())?),
            None => None,
        };

        let mut outcomes = Vec::with_capacity(total);
        let mut excluded = 0;

        for (i, example) in examples.into_iter().enumerate() {
            tracing::info!("({}/{}) input: {}", i + 1, total, example.dialogue);

            let extractions = self
                .extractor
                .extract_triples(&example.dialogue, &self.extract_options)?;

            for malformed in &example.malformed {
                tracing::warn!(
                    example = %example.id,
                    line = malformed.line,
                    triple = %malformed.text,
                    reason = %malformed.reason,
                    "Malformed gold triple; example excluded from scoring"
                );
            }

            if let Some(transcript) = transcript.as_mut() {
                transcript.append(&TranscriptEntry {
                    index: i + 1,
                    total,
                    dialogue: &example.dialogue,
                    extractions: &extractions,
                    expected: &example.triples,
                    malformed: &example.malformed,
                    min_confidence: options.min_confidence,
                })?;
            }

            if example.is_well_formed() {
                outcomes.push(ExampleOutcome {
                    gold: example.triples,
                    predicted: extractions,
                });
            } else {
                excluded += 1;
            }
        }

        let evaluator = if options.deduplication {
            tracing::info!("Lemmatizing predicates for deduplication");
            Evaluator::new().with_lemmatizer(self.lemmatizer.as_ref())
        } else {
            Evaluator::new()
        };
        let report = evaluator.report(&outcomes, options.min_confidence, excluded);

        tracing::info!(
            precision = report.precision,
            recall = report.recall,
            f1 = report.f1,
            auc = report.auc,
            excluded,
            "Evaluation finished"
        );

        if let Some(writer) = &self.writer {
            writer.write_summary(test_file, &report)?;
        }

        Ok(report)
    }
}
