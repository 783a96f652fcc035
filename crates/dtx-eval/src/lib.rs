//! DTX Eval - Benchmark evaluation of triple extraction
//!
//! Loads gold-annotated dialogue test files, runs an extractor over them
//! and reports precision/recall/F1 at a confidence threshold together with
//! the precision-recall curve and its area.

pub mod harness;
pub mod loader;
pub mod metrics;
pub mod report;

pub use harness::{EvaluationOptions, Harness};
pub use loader::{load_examples, parse_examples, GoldExample, GoldTriple, LoadError, MalformedTriple};
pub use metrics::{EvaluationReport, Evaluator, ExampleOutcome, PrPoint, TripleMetrics};
pub use report::{ResultWriter, Transcript, TranscriptEntry};
