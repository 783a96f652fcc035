//! Post-processing of extracted triples
//!
//! Rule-based normalization applied to (subject, predicate, object) after
//! speaker resolution:
//! - clitic contractions are expanded (`do n't` -> `do not`, `i'm` -> `i am`)
//! - possessive `'s` split off by tokenization is re-attached
//! - do-support auxiliaries are stripped from predicates, unless `do` is
//!   the main verb (`do well`, `do badly`)
//! - whitespace is normalized

use regex::Regex;

use dtx_core::PostProcessor;

/// Words after `do` that make it the main verb rather than an auxiliary
const DO_COMPLEMENTS: &[&str] = &["badly", "well", "better", "worse", "poorly", "fine"];

/// Rewrite rule applied to every argument
struct Rule {
    pattern: Regex,
    replacement: &'static str,
}

/// Contraction expansion and auxiliary stripping
pub struct RulePostProcessor {
    /// Applied in order to subject, predicate and object
    rules: Vec<Rule>,
    /// Applied to the predicate only, after `rules`
    predicate_rules: Vec<Rule>,
}

impl RulePostProcessor {
    /// Create a post-processor with the English contraction rules
    pub fn new() -> Self {
        let mut processor = Self {
            rules: Vec::new(),
            predicate_rules: Vec::new(),
        };
        processor.init_contraction_rules();
        processor.init_predicate_rules();
        processor
    }

    /// Initialize contraction rules
    fn init_contraction_rules(&mut self) {
        // Possessive marker split off by the tokenizer
        self.add_rule(r"\s+'s\b", "'s");

        // Irregular negations
        self.add_rule(r"\bca\s*n't\b", "can not");
        self.add_rule(r"\bwo\s*n't\b", "will not");
        self.add_rule(r"\bsha\s*n't\b", "shall not");

        // Regular clitics
        self.add_rule(r"\s*n't\b", " not");
        self.add_rule(r"\s*'m\b", " am");
        self.add_rule(r"\s*'re\b", " are");
        self.add_rule(r"\s*'ve\b", " have");
        self.add_rule(r"\s*'ll\b", " will");
        self.add_rule(r"\s*'d\b", " would");
    }

    /// Initialize predicate-only rules
    fn init_predicate_rules(&mut self) {
        self.add_predicate_rule(r"^(?:do|does|did)\s+(\S.*)$", "$1");
    }

    fn add_rule(&mut self, pattern: &str, replacement: &'static str) {
        if let Ok(pattern) = Regex::new(pattern) {
            self.rules.push(Rule {
                pattern,
                replacement,
            });
        }
    }

    fn add_predicate_rule(&mut self, pattern: &str, replacement: &'static str) {
        if let Ok(pattern) = Regex::new(pattern) {
            self.predicate_rules.push(Rule {
                pattern,
                replacement,
            });
        }
    }

    fn apply(rules: &[Rule], text: &str) -> String {
        let mut text = normalize_whitespace(text);
        for rule in rules {
            text = rule
                .pattern
                .replace_all(&text, rule.replacement)
                .into_owned();
        }
        normalize_whitespace(&text)
    }

    /// Normalize one argument
    pub fn format_argument(&self, text: &str) -> String {
        Self::apply(&self.rules, text)
    }

    /// Normalize a predicate, including auxiliary stripping
    pub fn format_predicate(&self, text: &str) -> String {
        let text = Self::apply(&self.rules, text);
        if is_main_verb_do(&text) {
            return text;
        }
        Self::apply(&self.predicate_rules, &text)
    }
}

impl Default for RulePostProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl PostProcessor for RulePostProcessor {
    fn format(&self, subject: &str, predicate: &str, object: &str) -> (String, String, String) {
        (
            self.format_argument(subject),
            self.format_predicate(predicate),
            self.format_argument(object),
        )
    }
}

/// Passes triples through unchanged
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopPostProcessor;

impl PostProcessor for NoopPostProcessor {
    fn format(&self, subject: &str, predicate: &str, object: &str) -> (String, String, String) {
        (subject.to_string(), predicate.to_string(), object.to_string())
    }
}

/// `do well`, `did badly`: the auxiliary rule would leave a bare adverb
fn is_main_verb_do(predicate: &str) -> bool {
    let mut words = predicate.split_whitespace();
    let is_do = words
        .next()
        .is_some_and(|w| ["do", "does", "did"].iter().any(|d| w.eq_ignore_ascii_case(d)));
    is_do
        && words
            .next()
            .is_some_and(|w| DO_COMPLEMENTS.iter().any(|c| w.eq_ignore_ascii_case(c)))
}

fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

// ============================================================================
// Tests
// ============================================================================
