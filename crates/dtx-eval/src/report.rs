//! Result files
//!
//! Each test file `<stem>.txt` produces two outputs in the results
//! directory: a JSON summary `<stem>.json` that is overwritten per run, and a
//! transcript `<stem>.txt` that every run appends to.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Utc;

use dtx_core::{Result, ScoredTriple};

use crate::loader::{GoldTriple, MalformedTriple};
use crate::metrics::EvaluationReport;

/// Transcript record of one evaluated example
#[derive(Debug, Clone)]
pub struct TranscriptEntry<'a> {
    /// 1-based position in the evaluated examples
    pub index: usize,
    pub total: usize,
    pub dialogue: &'a str,
    pub extractions: &'a [ScoredTriple],
    pub expected: &'a [GoldTriple],
    pub malformed: &'a [MalformedTriple],
    /// Predictions with confidence above this count as found
    pub min_confidence: f32,
}

fn list<T: std::fmt::Display>(items: impl IntoIterator<Item = T>) -> String {
    let items: Vec<String> = items.into_iter().map(|item| item.to_string()).collect();
    format!("[{}]", items.join(", "))
}

impl TranscriptEntry<'_> {
    /// Render the entry as transcript lines
    pub fn render(&self) -> String {
        let predicates = list(self.extractions.iter().map(|t| &t.triple.predicate));
        let found = list(
            self.extractions
                .iter()
                .filter(|t| t.confidence > self.min_confidence)
                .map(|t| &t.triple),
        );

        let mut text = format!(
            "\n({}/{}) input: {}\nextracted predicates: {}\nexpected: {}\nfound:   {}\n",
            self.index,
            self.total,
            self.dialogue,
            predicates,
            list(self.expected),
            found,
        );
        if !self.malformed.is_empty() {
            text.push_str(&format!("malformed: {}\n", list(self.malformed)));
        }
        text
    }
}

/// Writes evaluation outputs under a results directory
#[derive(Debug, Clone)]
pub struct ResultWriter {
    results_dir: PathBuf,
}

impl ResultWriter {
    pub fn new(results_dir: impl Into<PathBuf>) -> Self {
        Self {
            results_dir: results_dir.into(),
        }
    }

    pub fn results_dir(&self) -> &Path {
        &self.results_dir
    }

    fn output_path(&self, test_file: &Path, extension: &str) -> PathBuf {
        let stem = test_file
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "results".to_string());
        self.results_dir.join(format!("{stem}.{extension}"))
    }

    /// `<results_dir>/<stem>.json`
    pub fn summary_path(&self, test_file: &Path) -> PathBuf {
        self.output_path(test_file, "json")
    }

    /// `<results_dir>/<stem>.txt`
    pub fn transcript_path(&self, test_file: &Path) -> PathBuf {
        self.output_path(test_file, "txt")
    }

    /// Write the JSON summary, replacing any previous one
    pub fn write_summary(&self, test_file: &Path, report: &EvaluationReport) -> Result<PathBuf> {
        fs::create_dir_all(&self.results_dir)?;
        let path = self.summary_path(test_file);
        fs::write(&path, serde_json::to_string_pretty(report)?)?;

        tracing::info!(path = %path.display(), "Wrote evaluation summary");
        Ok(path)
    }

    /// Open the transcript for appending and write a run header
    pub fn open_transcript(&self, test_file: &Path, model: &str) -> Result<Transcript> {
        fs::create_dir_all(&self.results_dir)?;
        let path = self.transcript_path(test_file);
        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;

        writeln!(
            file,
            "\n# run {} model={} test_file={}",
            Utc::now().to_rfc3339(),
            model,
            test_file.display()
        )?;
        Ok(Transcript { file, path })
    }
}

/// Appendable transcript of one evaluation run
#[derive(Debug)]
pub struct Transcript {
    file: fs::File,
    path: PathBuf,
}

impl Transcript {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&mut self, entry: &TranscriptEntry<'_>) -> Result<()> {
        self.file.write_all(entry.render().as_bytes())?;
        Ok(())
    }
}
