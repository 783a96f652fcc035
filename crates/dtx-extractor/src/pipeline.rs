//! Triple extraction pipeline
//!
//! Wires the stages together: tokenize the dialogue, predict argument tag
//! matrices, decode them into spans, enumerate candidates, score them in
//! batches and rank the result.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use dtx_core::{
    ArgumentModel, ArgumentRole, BioLookup, ExtractionConfig, PostProcessor, Result, ScoredTriple,
    ScoringModel,
};

use crate::bio::BioDecoder;
use crate::candidates::candidates;
use crate::postprocess::RulePostProcessor;
use crate::ranking::Ranker;
use crate::registry::ModelBackend;
use crate::scoring::{BatchScorer, DEFAULT_BATCH_SIZE};
use crate::tokenizer::DialogueTokenizer;

/// Per-call extraction options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractOptions {
    /// Expand contractions and strip auxiliaries from the output
    pub post_process: bool,
    /// Maximum candidates per scoring call
    pub batch_size: usize,
    /// Log decoded arguments at info level instead of debug
    pub verbose: bool,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            post_process: true,
            batch_size: DEFAULT_BATCH_SIZE,
            verbose: true,
        }
    }
}

impl From<&ExtractionConfig> for ExtractOptions {
    fn from(config: &ExtractionConfig) -> Self {
        Self {
            post_process: config.post_process,
            batch_size: config.batch_size,
            verbose: true,
        }
    }
}

/// Decoded argument spans of one dialogue
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodedArguments {
    pub subjects: Vec<String>,
    pub predicates: Vec<String>,
    pub objects: Vec<String>,
}

impl DecodedArguments {
    /// Number of candidate triples these arguments produce
    pub fn num_candidates(&self) -> usize {
        self.subjects.len() * self.predicates.len() * self.objects.len()
    }
}

/// Extracts ranked (subject, predicate, object, polarity) triples from dialogue
pub struct TripleExtractor {
    argument_model: Box<dyn ArgumentModel>,
    scoring_model: Box<dyn ScoringModel>,
    tokenizer: DialogueTokenizer,
    decoder: BioDecoder,
    ranker: Ranker,
    post_processor: Box<dyn PostProcessor>,
}

impl TripleExtractor {
    /// Create an extractor with default tokenization, decoding and post-processing
    pub fn new(
        argument_model: Box<dyn ArgumentModel>,
        scoring_model: Box<dyn ScoringModel>,
        lookup: Arc<BioLookup>,
    ) -> Self {
        Self {
            argument_model,
            scoring_model,
            tokenizer: DialogueTokenizer::default(),
            decoder: BioDecoder::new(lookup),
            ranker: Ranker::default(),
            post_processor: Box::new(RulePostProcessor::new()),
        }
    }

    /// Create an extractor from a loaded backend and extraction settings
    pub fn from_config(
        backend: ModelBackend,
        lookup: Arc<BioLookup>,
        config: &ExtractionConfig,
    ) -> Self {
        let decoder = BioDecoder::new(Arc::clone(&lookup)).with_threshold(config.decision_threshold);

        Self::new(backend.argument, backend.scoring, lookup)
            .with_tokenizer(DialogueTokenizer::new(config.separator.as_str()))
            .with_decoder(decoder)
            .with_ranker(Ranker::new(config.speaker1.as_str(), config.speaker2.as_str()))
    }

    pub fn with_tokenizer(mut self, tokenizer: DialogueTokenizer) -> Self {
        self.tokenizer = tokenizer;
        self
    }

    pub fn with_decoder(mut self, decoder: BioDecoder) -> Self {
        self.decoder = decoder;
        self
    }

    pub fn with_ranker(mut self, ranker: Ranker) -> Self {
        self.ranker = ranker;
        self
    }

    pub fn with_post_processor(mut self, post_processor: Box<dyn PostProcessor>) -> Self {
        self.post_processor = post_processor;
        self
    }

    /// Name of the argument extraction backend
    pub fn name(&self) -> &str {
        self.argument_model.name()
    }

    pub fn lookup(&self) -> &BioLookup {
        self.decoder.lookup()
    }

    /// Speaker-resolved token stream of a dialogue
    pub fn tokenize(&self, dialogue: &str) -> Vec<String> {
        self.tokenizer.tokenize(dialogue)
    }

    /// Predict and decode the argument spans of a token stream
    pub fn extract_arguments(&self, tokens: &[String]) -> Result<DecodedArguments> {
        let prediction = self.argument_model.predict(tokens)?;
        let subwords = prediction.subwords.as_slice();

        let decode = |role: ArgumentRole| self.decoder.decode(subwords, prediction.matrix(role), role);

        Ok(DecodedArguments {
            subjects: decode(ArgumentRole::Subject)?,
            predicates: decode(ArgumentRole::Predicate)?,
            objects: decode(ArgumentRole::Object)?,
        })
    }

    /// Extract triples from a separator-delimited dialogue
    ///
    /// Returns triples sorted by descending confidence. A dialogue with no
    /// subject, predicate or object spans yields an empty list.
    pub fn extract_triples(
        &self,
        dialogue: &str,
        options: &ExtractOptions,
    ) -> Result<Vec<ScoredTriple>> {
        let scorer = BatchScorer::new(self.scoring_model.as_ref(), options.batch_size)?;

        let tokens = self.tokenize(dialogue);
        let arguments = self.extract_arguments(&tokens)?;

        if options.verbose {
            tracing::info!(
                subjects = ?arguments.subjects,
                predicates = ?arguments.predicates,
                objects = ?arguments.objects,
                "Decoded arguments"
            );
        } else {
            tracing::debug!(
                subjects = ?arguments.subjects,
                predicates = ?arguments.predicates,
                objects = ?arguments.objects,
                "Decoded arguments"
            );
        }

        let candidates = candidates(&arguments.subjects, &arguments.predicates, &arguments.objects);
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        tracing::debug!(
            candidates = candidates.len(),
            batches = scorer.num_batches(candidates.len()),
            "Scoring candidate triples"
        );
        let distributions = scorer.score(&tokens, &candidates)?;

        let post_processor = options.post_process.then_some(self.post_processor.as_ref());
        self.ranker.rank(&candidates, &distributions, post_processor)
    }
}
