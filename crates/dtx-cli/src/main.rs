//! DTX CLI - Command-line interface
//!
//! Usage:
//!   dtx extract "<dialogue>"
//!   dtx evaluate <test_file>...
//!   dtx lookup --schema level2

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};

use dtx_core::{AppConfig, BioLookup, LoggingConfig, SchemaLevel};
use dtx_eval::{EvaluationOptions, Harness, ResultWriter};
use dtx_extractor::{ExtractOptions, ModelRegistry, ModelSpec, TripleExtractor};

#[derive(Parser)]
#[command(name = "dtx")]
#[command(about = "Dialogue triple extraction and evaluation")]
#[command(version)]
struct Cli {
    /// Configuration file (TOML); environment variables override it
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Registered model name
    #[arg(long, global = true)]
    model: Option<String>,

    /// Directory holding the model files
    #[arg(long, global = true)]
    model_path: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract triples from a dialogue (utterances joined by the separator)
    Extract {
        /// Dialogue text
        dialogue: String,
        /// Keep predicates exactly as decoded
        #[arg(long)]
        no_post_process: bool,
        /// Candidates per scoring call
        #[arg(long)]
        batch_size: Option<usize>,
        /// Only print triples with confidence above this value
        #[arg(long)]
        min_confidence: Option<f32>,
        /// Print JSON instead of one triple per line
        #[arg(long)]
        json: bool,
    },
    /// Evaluate the model against gold test files
    Evaluate {
        /// Gold test files
        #[arg(required = true)]
        test_files: Vec<PathBuf>,
        /// Evaluate only the first N examples of each file
        #[arg(long)]
        num_samples: Option<usize>,
        /// Confidence above which a prediction counts as found
        #[arg(long)]
        min_confidence: Option<f32>,
        /// Lemmatize predicates before matching
        #[arg(long)]
        deduplicate: bool,
        /// Directory for summaries and transcripts
        #[arg(long)]
        results_dir: Option<PathBuf>,
    },
    /// Print the predicate classes of a schema
    Lookup {
        /// Schema level (level1, level2)
        #[arg(long)]
        schema: Option<SchemaLevel>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => AppConfig::from_file(path)?.with_env_override()?,
        None => AppConfig::from_env()?,
    };
    if let Some(name) = &cli.model {
        config.model.name = name.clone();
    }
    if let Some(path) = &cli.model_path {
        config.model.path = path.clone();
    }

    init_tracing(&config.logging);

    match cli.command {
        Commands::Extract {
            dialogue,
            no_post_process,
            batch_size,
            min_confidence,
            json,
        } => {
            if no_post_process {
                config.extraction.post_process = false;
            }
            if let Some(size) = batch_size {
                config.extraction.batch_size = size;
            }
            config.validate()?;

            let extractor = build_extractor(&config)?;
            let options = ExtractOptions::from(&config.extraction);
            let triples: Vec<_> = extractor
                .extract_triples(&dialogue, &options)?
                .into_iter()
                .filter(|t| min_confidence.map_or(true, |k| t.confidence > k))
                .collect();

            if json {
                println!("{}", serde_json::to_string_pretty(&triples)?);
            } else if triples.is_empty() {
                println!("No triples extracted.");
            } else {
                for triple in &triples {
                    println!("{triple}");
                }
            }
        }
        Commands::Evaluate {
            test_files,
            num_samples,
            min_confidence,
            deduplicate,
            results_dir,
        } => {
            if num_samples.is_some() {
                config.evaluation.num_samples = num_samples;
            }
            if let Some(k) = min_confidence {
                config.evaluation.min_confidence = k;
            }
            if deduplicate {
                config.evaluation.deduplication = true;
            }
            if let Some(dir) = results_dir {
                config.evaluation.results_dir = dir;
            }
            config.validate()?;

            let extractor = build_extractor(&config)?;
            let options = EvaluationOptions::from(&config.evaluation);
            let harness = Harness::new(&extractor)
                .with_extract_options(ExtractOptions::from(&config.extraction))
                .with_writer(ResultWriter::new(&config.evaluation.results_dir));

            for test_file in &test_files {
                let report = harness
                    .evaluate(test_file, &options)
                    .with_context(|| format!("evaluating {}", test_file.display()))?;
                println!("{}: {}", test_file.display(), report.summary());
            }
        }
        Commands::Lookup { schema } => {
            let lookup = match schema {
                Some(level) => BioLookup::for_level(level)?,
                None => BioLookup::for_model(&config.model)?,
            };
            for (index, label) in lookup.predicates() {
                println!("{index}\t{label}");
            }
        }
    }

    Ok(())
}

fn init_tracing(config: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_file(config.include_location)
        .with_line_number(config.include_location);

    if config.json_format {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn build_extractor(config: &AppConfig) -> anyhow::Result<TripleExtractor> {
    let lookup = BioLookup::for_model(&config.model)?;
    let backend = ModelRegistry::with_defaults()
        .load(&config.model.name, &ModelSpec::from(&config.model))
        .with_context(|| format!("loading model '{}'", config.model.name))?;

    tracing::info!(
        model = %config.model.name,
        path = %config.model.path.display(),
        schema = %config.model.schema,
        "Model loaded"
    );
    Ok(TripleExtractor::from_config(
        backend,
        Arc::new(lookup),
        &config.extraction,
    ))
}
