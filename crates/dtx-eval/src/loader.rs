//! Gold test-file loader
//!
//! A test file is plain text made of blocks separated by blank lines:
//!
//! ```text
//! # comment lines end a block, like blank lines
//! 12
//! I like pizza <eos> me too
//! speaker1, like, pizza, positive
//! speaker2, like, pizza, positive
//! ```
//!
//! The first line of a block identifies the example, the second holds the
//! dialogue and every further line one `subject, predicate, object, polarity`
//! triple. Lines without exactly four fields are kept aside as malformed so
//! the harness can report them and exclude the example from scoring. The
//! polarity field is kept verbatim; a value other than `positive` or
//! `negative` is still gold, it just never matches a prediction.

use std::path::{Path, PathBuf};

use thiserror::Error;

use dtx_core::{DtxError, Polarity, Triple};

/// Fields of a well-formed gold triple
pub const TRIPLE_ARITY: usize = 4;

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Failed to read test file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Block starting at line {line} has no dialogue line")]
    MissingDialogue { line: usize },
}

impl From<LoadError> for DtxError {
    fn from(err: LoadError) -> Self {
        match err {
            LoadError::Io { source, .. } => DtxError::Io(source),
            other => DtxError::InvalidInput(other.to_string()),
        }
    }
}

/// Gold triple line that could not be parsed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedTriple {
    /// 1-based line number in the test file
    pub line: usize,
    pub text: String,
    pub reason: String,
}

impl std::fmt::Display for MalformedTriple {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {}: '{}' ({})", self.line, self.text, self.reason)
    }
}

/// Annotated triple of a gold example
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GoldTriple {
    pub subject: String,
    pub predicate: String,
    pub object: String,
    /// Polarity as written in the test file
    pub polarity: String,
}

impl GoldTriple {
    pub fn new(
        subject: impl Into<String>,
        predicate: impl Into<String>,
        object: impl Into<String>,
        polarity: impl Into<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            predicate: predicate.into(),
            object: object.into(),
            polarity: polarity.into(),
        }
    }

    /// Recognised polarity, if any
    pub fn polarity(&self) -> Option<Polarity> {
        self.polarity.parse().ok()
    }
}

impl From<Triple> for GoldTriple {
    fn from(triple: Triple) -> Self {
        Self::new(
            triple.subject,
            triple.predicate,
            triple.object,
            triple.polarity.as_str(),
        )
    }
}

impl std::fmt::Display for GoldTriple {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "({}, {}, {}, {})",
            self.subject, self.predicate, self.object, self.polarity
        )
    }
}

/// One annotated dialogue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoldExample {
    /// 1-based line number of the identifier line
    pub line: usize,
    pub id: String,
    pub dialogue: String,
    pub triples: Vec<GoldTriple>,
    pub malformed: Vec<MalformedTriple>,
}

impl GoldExample {
    /// Whether every triple line has four fields
    pub fn is_well_formed(&self) -> bool {
        self.malformed.is_empty()
    }
}

/// Split a triple line on commas and parse its fields
pub fn parse_triple(text: &str) -> Result<GoldTriple, String> {
    let fields: Vec<&str> = text.split(',').map(str::trim).collect();
    if fields.len() != TRIPLE_ARITY {
        return Err(format!(
            "expected {TRIPLE_ARITY} fields, found {}",
            fields.len()
        ));
    }

    Ok(GoldTriple::new(fields[0], fields[1], fields[2], fields[3]))
}

/// Parse the contents of a test file
pub fn parse_examples(content: &str) -> Result<Vec<GoldExample>, LoadError> {
    let mut blocks: Vec<Vec<(usize, &str)>> = Vec::new();
    let mut block: Vec<(usize, &str)> = Vec::new();

    for (index, line) in content.lines().enumerate() {
        let line_is_comment = line.starts_with('#');
        let line = line.trim();
        if line.is_empty() || line_is_comment {
            if !block.is_empty() {
                blocks.push(std::mem::take(&mut block));
            }
            continue;
        }
        block.push((index + 1, line));
    }
    if !block.is_empty() {
        blocks.push(block);
    }

    blocks.into_iter().map(parse_block).collect()
}

fn parse_block(block: Vec<(usize, &str)>) -> Result<GoldExample, LoadError> {
    let (line, id) = block[0];
    let dialogue = block
        .get(1)
        .map(|(_, text)| text.to_string())
        .ok_or(LoadError::MissingDialogue { line })?;

    let mut triples = Vec::new();
    let mut malformed = Vec::new();
    for &(number, text) in &block[2..] {
        match parse_triple(text) {
            Ok(triple) => triples.push(triple),
            Err(reason) => malformed.push(MalformedTriple {
                line: number,
                text: text.to_string(),
                reason,
            }),
        }
    }

    Ok(GoldExample {
        line,
        id: id.to_string(),
        dialogue,
        triples,
        malformed,
    })
}

/// Load and parse a test file
pub fn load_examples(path: impl AsRef<Path>) -> Result<Vec<GoldExample>, LoadError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let examples = parse_examples(&content)?;
    tracing::debug!(path = %path.display(), examples = examples.len(), "Loaded gold examples");
    Ok(examples)
}

// ============================================================================
// Tests
// ============================================================================
