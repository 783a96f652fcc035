//! Dialogue tokenization and speaker resolution
//!
//! Splits a separator-delimited dialogue into turns, assigns each turn a
//! binary speaker id counted backwards from the final turn, and replaces
//! first/second-person pronouns with speaker placeholders so that "I" and
//! "you" stay unambiguous across turns.

use once_cell::sync::Lazy;
use regex::Regex;

use dtx_core::{Turn, WordTokenizer, END_OF_TURN, SPEAKER_PLACEHOLDER};

// ============================================================================
// Word Tokenization
// ============================================================================

/// Word runs with inner apostrophes, or any single non-space character
static WORD_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[\p{L}\p{N}_]+(?:'[\p{L}\p{N}]+)*|\S")
        .expect("Failed to compile word token pattern")
});

/// Clitics split off their host word
const CLITICS: &[&str] = &["'s", "'m", "'re", "'ve", "'ll", "'d"];

/// Regex-based English word tokenizer
///
/// Splits on whitespace, emits punctuation as separate tokens and splits
/// clitic contractions off their host (`don't` -> `do`, `n't`).
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleWordTokenizer;

impl RuleWordTokenizer {
    pub fn new() -> Self {
        Self
    }

    /// Peel clitics off the end of a word until none remain
    fn split_clitics(word: &str, out: &mut Vec<String>) {
        let mut host = word;
        let mut clitics = Vec::new();

        loop {
            if host.len() > 3 && host.ends_with("n't") {
                let (rest, clitic) = host.split_at(host.len() - 3);
                clitics.push(clitic);
                host = rest;
                continue;
            }
            if let Some(pos) = host.rfind('\'') {
                let (rest, clitic) = host.split_at(pos);
                if !rest.is_empty() && CLITICS.contains(&clitic) {
                    clitics.push(clitic);
                    host = rest;
                    continue;
                }
            }
            break;
        }

        out.push(host.to_string());
        out.extend(clitics.into_iter().rev().map(str::to_string));
    }
}

impl WordTokenizer for RuleWordTokenizer {
    fn tokenize(&self, text: &str) -> Vec<String> {
        let normalized = text.replace('\u{2019}', "'");
        let mut tokens = Vec::new();
        for mat in WORD_PATTERN.find_iter(&normalized) {
            Self::split_clitics(mat.as_str(), &mut tokens);
        }
        tokens
    }
}

// ============================================================================
// Speaker Resolution
// ============================================================================

/// Speaker id of turn `turn_index` out of `num_turns`
///
/// The final turn always belongs to speaker 0 and earlier turns alternate,
/// so pronoun resolution is anchored to the most recent utterance.
pub fn speaker_id(turn_index: usize, num_turns: usize) -> u8 {
    ((num_turns - turn_index + 1) % 2) as u8
}

/// Canonical placeholder for a speaker id (`SPEAKER0`, `SPEAKER1`)
pub fn placeholder(speaker_id: u8) -> String {
    format!("{SPEAKER_PLACEHOLDER}{speaker_id}")
}

/// Replace a first/second-person pronoun with the matching placeholder
///
/// Possessive determiners expand to the placeholder followed by `'s`.
/// Any other token is returned unchanged.
pub fn substitute_pronoun(token: &str, speaker_id: u8) -> Vec<String> {
    let other = 1 - speaker_id;
    match token {
        "i" | "me" | "myself" | "mine" => vec![placeholder(speaker_id)],
        "my" => vec![placeholder(speaker_id), "'s".to_string()],
        "you" | "yourself" | "yourselves" | "yours" => vec![placeholder(other)],
        "your" => vec![placeholder(other), "'s".to_string()],
        _ => vec![token.to_string()],
    }
}

// ============================================================================
// Dialogue Tokenizer
// ============================================================================

/// Turns a separator-delimited dialogue into a speaker-resolved token stream
pub struct DialogueTokenizer {
    separator: String,
    words: Box<dyn WordTokenizer>,
}

impl DialogueTokenizer {
    /// Create a tokenizer with the rule-based word splitter
    pub fn new(separator: impl Into<String>) -> Self {
        Self {
            separator: separator.into(),
            words: Box::new(RuleWordTokenizer::new()),
        }
    }

    /// Use a different word-level tokenizer
    pub fn with_word_tokenizer(mut self, words: Box<dyn WordTokenizer>) -> Self {
        self.words = words;
        self
    }

    /// Turn separator
    pub fn separator(&self) -> &str {
        &self.separator
    }

    /// Split a dialogue into turns with resolved speakers
    ///
    /// Every separator-delimited segment yields a turn, including empty
    /// ones, so speaker ids reflect the raw turn positions.
    pub fn turns(&self, dialogue: &str) -> Vec<Turn> {
        let segments: Vec<String> = dialogue
            .split(self.separator.as_str())
            .map(|turn| turn.to_lowercase().trim().to_string())
            .collect();
        let num_turns = segments.len();

        segments
            .iter()
            .enumerate()
            .map(|(index, text)| {
                let speaker_id = speaker_id(index, num_turns);
                let tokens = self
                    .words
                    .tokenize(text)
                    .iter()
                    .flat_map(|token| substitute_pronoun(token, speaker_id))
                    .collect();
                Turn { speaker_id, tokens }
            })
            .collect()
    }

    /// Flat token stream with an end-of-turn marker after each non-empty turn
    pub fn tokenize(&self, dialogue: &str) -> Vec<String> {
        let mut tokens = Vec::new();
        for turn in self.turns(dialogue) {
            if turn.is_empty() {
                continue;
            }
            tokens.extend(turn.tokens);
            tokens.push(END_OF_TURN.to_string());
        }
        tokens
    }
}

impl Default for DialogueTokenizer {
    fn default() -> Self {
        Self::new(END_OF_TURN)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn words(text: &str) -> Vec<String> {
        RuleWordTokenizer::new().tokenize(text)
    }

    #[test]
    fn test_word_tokenizer_punctuation() {
        assert_eq!(words("it was great!"), vec!["it", "was", "great", "!"]);
        assert_eq!(words("you?"), vec!["you", "?"]);
    }

    #[test]
    fn test_word_tokenizer_contractions() {
        assert_eq!(words("don't"), vec!["do", "n't"]);
        assert_eq!(words("i'm here"), vec!["i", "'m", "here"]);
        assert_eq!(words("it's"), vec!["it", "'s"]);
        assert_eq!(words("can't"), vec!["ca", "n't"]);
        assert_eq!(words("we\u{2019}ll"), vec!["we", "'ll"]);
        assert_eq!(words("o'clock"), vec!["o'clock"]);
    }

    #[test]
    fn test_word_tokenizer_stacked_contractions() {
        assert_eq!(words("shouldn't've"), vec!["should", "n't", "'ve"]);
        assert_eq!(words("y'all'd've"), vec!["y'all", "'d", "'ve"]);
        assert_eq!(words("i'd've"), vec!["i", "'d", "'ve"]);
    }

    #[test]
    fn test_speaker_id_counts_from_end() {
        // tn = 0, tn-1 = 1, tn-2 = 0
        assert_eq!(speaker_id(2, 3), 0);
        assert_eq!(speaker_id(1, 3), 1);
        assert_eq!(speaker_id(0, 3), 0);
        assert_eq!(speaker_id(0, 1), 0);
    }

    #[test]
    fn test_substitute_pronoun() {
        assert_eq!(substitute_pronoun("i", 0), vec!["SPEAKER0"]);
        assert_eq!(substitute_pronoun("you", 0), vec!["SPEAKER1"]);
        assert_eq!(substitute_pronoun("me", 1), vec!["SPEAKER1"]);
        assert_eq!(substitute_pronoun("my", 1), vec!["SPEAKER1", "'s"]);
        assert_eq!(substitute_pronoun("your", 1), vec!["SPEAKER0", "'s"]);
        assert_eq!(substitute_pronoun("pizza", 0), vec!["pizza"]);
    }

    #[test]
    fn test_single_turn() {
        let tokenizer = DialogueTokenizer::default();
        let turns = tokenizer.turns("I like pizza");
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].speaker_id, 0);
        assert_eq!(
            tokenizer.tokenize("I like pizza"),
            vec!["SPEAKER0", "like", "pizza", "<eos>"]
        );
    }

    #[test]
    fn test_trailing_separator_counts_as_turn() {
        let tokenizer = DialogueTokenizer::default();
        let turns = tokenizer.turns("I like pizza <eos>");
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].speaker_id, 1);
        assert!(turns[1].is_empty());

        assert_eq!(
            tokenizer.tokenize("I like pizza <eos>"),
            vec!["SPEAKER1", "like", "pizza", "<eos>"]
        );
    }

    #[test]
    fn test_multi_turn_dialogue() {
        let tokenizer = DialogueTokenizer::default();
        let tokens = tokenizer.tokenize("I went home. <eos> Did you? <eos> No, I stayed!");

        assert_eq!(
            tokens,
            vec![
                "SPEAKER0", "went", "home", ".", "<eos>", "did", "SPEAKER0", "?", "<eos>", "no",
                ",", "SPEAKER0", "stayed", "!", "<eos>",
            ]
        );
    }

    #[test]
    fn test_empty_turns_contribute_nothing() {
        let tokenizer = DialogueTokenizer::default();
        assert!(tokenizer.tokenize("").is_empty());
        assert_eq!(
            tokenizer.tokenize("<eos> hello <eos>   <eos>"),
            vec!["hello", "<eos>"]
        );
    }

    #[test]
    fn test_custom_separator() {
        let tokenizer = DialogueTokenizer::new("|");
        assert_eq!(tokenizer.separator(), "|");
        assert_eq!(
            tokenizer.tokenize("hi | I don't"),
            vec!["hi", "<eos>", "SPEAKER0", "do", "n't", "<eos>"]
        );
    }
}
