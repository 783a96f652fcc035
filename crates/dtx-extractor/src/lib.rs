//! DTX Extractor - Dialogue triple extraction pipeline
//!
//! Extracts (subject, predicate, object, polarity) triples from dialogue:
//! speaker-resolved tokenization, BIO argument decoding, candidate
//! enumeration, batched entailment scoring and confidence ranking.

pub mod backends;
pub mod bio;
pub mod candidates;
pub mod lemma;
pub mod pipeline;
pub mod postprocess;
pub mod ranking;
pub mod registry;
pub mod scoring;
pub mod tokenizer;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use bio::{BioDecoder, SubwordScheme};
pub use lemma::RuleLemmatizer;
pub use pipeline::{DecodedArguments, ExtractOptions, TripleExtractor};
pub use postprocess::{NoopPostProcessor, RulePostProcessor};
pub use ranking::Ranker;
pub use registry::{ModelBackend, ModelRegistry, ModelSpec};
pub use scoring::BatchScorer;
pub use tokenizer::{DialogueTokenizer, RuleWordTokenizer};
