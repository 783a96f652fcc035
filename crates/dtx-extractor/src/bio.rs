//! BIO tag decoding
//!
//! Converts per-subword tag activation matrices into argument strings.
//!
//! Row layout of every tag matrix:
//!
//! | Row      | Tag                 |
//! |----------|---------------------|
//! | `0`      | Outside             |
//! | `2c + 1` | Begin of class `c`  |
//! | `2c + 2` | Inside of class `c` |
//!
//! Subject and object matrices carry a single class (rows `O, B, I`).
//! Predicate matrices carry one class per predicate label, and the lookup
//! table is keyed by the Begin row (`253 -> "like"`). Predicate spans
//! decode to their label instead of the surface text, which normalizes
//! predicates to a closed vocabulary.

use std::sync::Arc;

use dtx_core::{ArgumentRole, BioLookup, DtxError, Result, TagMatrix};

/// SentencePiece word-start marker
const SENTENCEPIECE_MARKER: char = '\u{2581}';

/// WordPiece continuation marker
const WORDPIECE_MARKER: &str = "##";

/// Model-specific tokens that never belong to a span
const SPECIAL_TOKENS: &[&str] = &[
    "[CLS]", "[SEP]", "[PAD]", "[MASK]", "[UNK]", "<pad>", "<unk>", "<s>", "</s>", "<eos>",
];

/// How subword pieces mark word boundaries
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SubwordScheme {
    /// `▁` starts a new word (ALBERT, T5)
    #[default]
    SentencePiece,
    /// `##` continues the previous word (BERT)
    WordPiece,
}

/// Tag assigned to a single subword
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BioTag {
    Outside,
    Begin(usize),
    Inside(usize),
}

impl BioTag {
    /// Tag for a matrix row index
    pub fn from_row(row: usize) -> Self {
        match row {
            0 => Self::Outside,
            r if r % 2 == 1 => Self::Begin((r - 1) / 2),
            r => Self::Inside((r - 2) / 2),
        }
    }

    /// Row index of the Begin tag of a class; this is the lookup key
    pub fn begin_row(class: usize) -> usize {
        2 * class + 1
    }
}

/// Contiguous run of subwords `[start, end)` sharing one tag class
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagSpan {
    pub class: usize,
    pub start: usize,
    pub end: usize,
}

/// Merge subword pieces back into surface text
pub fn merge_subwords<S: AsRef<str>>(pieces: &[S], scheme: SubwordScheme) -> String {
    let merged = match scheme {
        SubwordScheme::SentencePiece => pieces
            .iter()
            .map(|p| p.as_ref().replace(SENTENCEPIECE_MARKER, " "))
            .collect::<String>(),
        SubwordScheme::WordPiece => {
            let mut text = String::new();
            for piece in pieces {
                let piece = piece.as_ref();
                match piece.strip_prefix(WORDPIECE_MARKER) {
                    Some(rest) => text.push_str(rest),
                    None => {
                        if !text.is_empty() {
                            text.push(' ');
                        }
                        text.push_str(piece);
                    }
                }
            }
            text
        }
    };
    merged.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Whether a subword is a model-specific special token
pub fn is_special_token(piece: &str) -> bool {
    let bare = piece.trim_start_matches(SENTENCEPIECE_MARKER);
    SPECIAL_TOKENS.contains(&bare)
}

/// Decodes tag matrices into argument strings
#[derive(Debug, Clone)]
pub struct BioDecoder {
    lookup: Arc<BioLookup>,
    threshold: f32,
    scheme: SubwordScheme,
}

impl BioDecoder {
    /// Create a decoder with a 0.5 decision threshold and SentencePiece merging
    pub fn new(lookup: Arc<BioLookup>) -> Self {
        Self {
            lookup,
            threshold: 0.5,
            scheme: SubwordScheme::SentencePiece,
        }
    }

    /// Set the minimum activation for a subword to be tagged
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    /// Set the subword scheme used to rebuild surface text
    pub fn with_scheme(mut self, scheme: SubwordScheme) -> Self {
        self.scheme = scheme;
        self
    }

    pub fn lookup(&self) -> &BioLookup {
        &self.lookup
    }

    /// Arg-max tag per column; columns below threshold are Outside
    pub fn tags(&self, matrix: &TagMatrix) -> Vec<BioTag> {
        matrix
            .columns()
            .into_iter()
            .map(|column| {
                let best = column
                    .iter()
                    .enumerate()
                    .filter(|(_, value)| !value.is_nan())
                    .fold(None, |best: Option<(usize, f32)>, (row, &value)| match best {
                        Some((_, top)) if top >= value => best,
                        _ => Some((row, value)),
                    });

                match best {
                    Some((row, value)) if value >= self.threshold => BioTag::from_row(row),
                    _ => BioTag::Outside,
                }
            })
            .collect()
    }

    /// Group tagged subwords into spans
    ///
    /// A span opens on a Begin tag, or on an Inside tag that does not
    /// continue an open span of the same class. Special tokens close the
    /// open span.
    pub fn spans<S: AsRef<str>>(&self, subwords: &[S], matrix: &TagMatrix) -> Result<Vec<TagSpan>> {
        if matrix.ncols() != subwords.len() {
            return Err(DtxError::Decode(format!(
                "tag matrix has {} columns for {} subwords",
                matrix.ncols(),
                subwords.len()
            )));
        }
        if matrix.nrows() == 0 && !subwords.is_empty() {
            return Err(DtxError::Decode("tag matrix has no rows".to_string()));
        }

        let mut spans = Vec::new();
        let mut open: Option<TagSpan> = None;

        for (col, tag) in self.tags(matrix).into_iter().enumerate() {
            if is_special_token(subwords[col].as_ref()) {
                spans.extend(open.take());
                continue;
            }

            match tag {
                BioTag::Outside => spans.extend(open.take()),
                BioTag::Inside(class) if matches!(open, Some(span) if span.class == class) => {
                    if let Some(span) = open.as_mut() {
                        span.end = col + 1;
                    }
                }
                BioTag::Begin(class) | BioTag::Inside(class) => {
                    spans.extend(open.take());
                    open = Some(TagSpan {
                        class,
                        start: col,
                        end: col + 1,
                    });
                }
            }
        }
        spans.extend(open);

        Ok(spans)
    }

    /// Decode the spans of one role into strings
    pub fn decode<S: AsRef<str>>(
        &self,
        subwords: &[S],
        matrix: &TagMatrix,
        role: ArgumentRole,
    ) -> Result<Vec<String>> {
        let spans = self.spans(subwords, matrix)?;

        let args = spans
            .iter()
            .filter_map(|span| match role {
                ArgumentRole::Predicate => self
                    .lookup
                    .predicate_label(BioTag::begin_row(span.class))
                    .map(str::to_string),
                ArgumentRole::Subject | ArgumentRole::Object => {
                    let text = merge_subwords(&subwords[span.start..span.end], self.scheme);
                    (!text.is_empty()).then_some(text)
                }
            })
            .collect();

        Ok(args)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    /// Build a one-hot matrix from per-column row indices
    fn one_hot(rows: usize, tags: &[usize]) -> TagMatrix {
        let mut matrix = Array2::zeros((rows, tags.len()));
        for (col, &row) in tags.iter().enumerate() {
            matrix[[row, col]] = 1.0;
        }
        matrix
    }

    fn pieces(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    fn decoder() -> BioDecoder {
        let lookup = BioLookup::new([(1, "do"), (3, "like"), (5, "None"), (7, "be in")]);
        BioDecoder::new(Arc::new(lookup))
    }

    #[test]
    fn test_bio_tag_rows() {
        assert_eq!(BioTag::from_row(0), BioTag::Outside);
        assert_eq!(BioTag::from_row(1), BioTag::Begin(0));
        assert_eq!(BioTag::from_row(2), BioTag::Inside(0));
        assert_eq!(BioTag::from_row(253), BioTag::Begin(126));
        assert_eq!(BioTag::begin_row(126), 253);
    }

    #[test]
    fn test_merge_sentencepiece() {
        let text = merge_subwords(&["\u{2581}new", "\u{2581}univ", "ersity"], SubwordScheme::SentencePiece);
        assert_eq!(text, "new university");
    }

    #[test]
    fn test_merge_wordpiece() {
        let text = merge_subwords(&["new", "univ", "##ersity"], SubwordScheme::WordPiece);
        assert_eq!(text, "new university");
    }

    #[test]
    fn test_decode_subject_spans() {
        let subwords = pieces(&["[CLS]", "\u{2581}SPEAKER0", "\u{2581}like", "\u{2581}pi", "zza", "[SEP]"]);
        // O, B, O, B, I, O
        let matrix = one_hot(3, &[0, 1, 0, 1, 2, 0]);

        let args = decoder().decode(&subwords, &matrix, ArgumentRole::Subject).unwrap();
        assert_eq!(args, vec!["SPEAKER0", "pizza"]);
    }

    #[test]
    fn test_decode_keeps_duplicates() {
        let subwords = pieces(&["\u{2581}pizza", "\u{2581}and", "\u{2581}pizza"]);
        let matrix = one_hot(3, &[1, 0, 1]);

        let args = decoder().decode(&subwords, &matrix, ArgumentRole::Object).unwrap();
        assert_eq!(args, vec!["pizza", "pizza"]);
    }

    #[test]
    fn test_decode_orphan_inside_opens_span() {
        let subwords = pieces(&["\u{2581}the", "\u{2581}new", "\u{2581}car"]);
        let matrix = one_hot(3, &[0, 2, 2]);

        let args = decoder().decode(&subwords, &matrix, ArgumentRole::Object).unwrap();
        assert_eq!(args, vec!["new car"]);
    }

    #[test]
    fn test_decode_predicate_uses_lookup_label() {
        let subwords = pieces(&["\u{2581}SPEAKER0", "\u{2581}really", "\u{2581}enjoy", "\u{2581}pizza"]);
        // Begin/Inside of class 1 ("like") over "really enjoy"
        let matrix = one_hot(9, &[0, 3, 4, 0]);

        let args = decoder().decode(&subwords, &matrix, ArgumentRole::Predicate).unwrap();
        assert_eq!(args, vec!["like"]);
    }

    #[test]
    fn test_decode_predicate_skips_none_class() {
        let subwords = pieces(&["\u{2581}i", "\u{2581}am", "\u{2581}at", "\u{2581}home"]);
        // class 2 is "None", class 3 is "be in"
        let matrix = one_hot(9, &[5, 0, 7, 8]);

        let args = decoder().decode(&subwords, &matrix, ArgumentRole::Predicate).unwrap();
        assert_eq!(args, vec!["be in"]);
    }

    #[test]
    fn test_threshold_suppresses_weak_tags() {
        let subwords = pieces(&["\u{2581}pizza"]);
        let mut matrix = Array2::zeros((3, 1));
        matrix[[1, 0]] = 0.4;
        matrix[[0, 0]] = 0.3;

        let decoder = decoder();
        assert!(decoder.decode(&subwords, &matrix, ArgumentRole::Object).unwrap().is_empty());

        let relaxed = decoder.with_threshold(0.35);
        assert_eq!(
            relaxed.decode(&subwords, &matrix, ArgumentRole::Object).unwrap(),
            vec!["pizza"]
        );
    }

    #[test]
    fn test_special_token_closes_span() {
        let subwords = pieces(&["\u{2581}pizza", "<eos>", "\u{2581}pasta"]);
        let matrix = one_hot(3, &[1, 2, 2]);

        let spans = decoder().spans(&subwords, &matrix).unwrap();
        assert_eq!(
            spans,
            vec![
                TagSpan { class: 0, start: 0, end: 1 },
                TagSpan { class: 0, start: 2, end: 3 },
            ]
        );
    }

    #[test]
    fn test_shape_mismatch_is_error() {
        let subwords = pieces(&["\u{2581}a", "\u{2581}b"]);
        let matrix = one_hot(3, &[0, 1, 2]);

        let err = decoder().spans(&subwords, &matrix).unwrap_err();
        assert!(matches!(err, DtxError::Decode(_)));
    }

    #[test]
    fn test_no_spans_is_empty() {
        let subwords = pieces(&["\u{2581}hello", "\u{2581}there"]);
        let matrix = one_hot(3, &[0, 0]);

        assert!(decoder().decode(&subwords, &matrix, ArgumentRole::Subject).unwrap().is_empty());
    }
}
