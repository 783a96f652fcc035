//! Rule-based English lemmatizer
//!
//! Used to normalize predicates before matching so that word forms such as
//! "is" / "are" or "likes" / "liked" count as the same predicate.

use std::collections::HashMap;

use dtx_core::Lemmatizer;

/// Words ending in `s` that are not plural or third-person forms
const UNINFLECTED: &[&str] = &[
    "this", "its", "his", "hers", "ours", "yours", "us", "as", "yes", "bus", "plus", "less",
    "always", "perhaps", "news", "series", "glasses", "across",
];

/// Irregular form table plus suffix stripping
pub struct RuleLemmatizer {
    irregular: HashMap<&'static str, &'static str>,
}

impl RuleLemmatizer {
    pub fn new() -> Self {
        let mut lemmatizer = Self {
            irregular: HashMap::new(),
        };
        lemmatizer.init_irregular_forms();
        lemmatizer
    }

    fn init_irregular_forms(&mut self) {
        self.add_forms("be", &["am", "is", "are", "was", "were", "been", "being", "'m", "'re"]);
        self.add_forms("have", &["has", "had", "having", "'ve"]);
        self.add_forms("do", &["does", "did", "done", "doing"]);
        self.add_forms("go", &["goes", "went", "gone", "going"]);
        self.add_forms("will", &["'ll"]);
        self.add_forms("not", &["n't"]);
        self.add_forms("make", &["made", "making"]);
        self.add_forms("take", &["took", "taken", "taking"]);
        self.add_forms("get", &["got", "gotten", "getting"]);
        self.add_forms("see", &["saw", "seen"]);
        self.add_forms("eat", &["ate", "eaten"]);
        self.add_forms("buy", &["bought"]);
        self.add_forms("bring", &["brought"]);
        self.add_forms("think", &["thought"]);
        self.add_forms("feel", &["felt"]);
        self.add_forms("know", &["knew", "known"]);
        self.add_forms("give", &["gave", "given"]);
        self.add_forms("say", &["said"]);
        self.add_forms("come", &["came", "coming"]);
        self.add_forms("leave", &["left", "leaving"]);
        self.add_forms("tell", &["told"]);
        self.add_forms("find", &["found"]);
        self.add_forms("run", &["ran", "running"]);
        self.add_forms("write", &["wrote", "written", "writing"]);
        self.add_forms("speak", &["spoke", "spoken"]);
        self.add_forms("drink", &["drank", "drunk"]);
        self.add_forms("swim", &["swam", "swum"]);
        self.add_forms("meet", &["met"]);
        self.add_forms("lose", &["lost", "losing"]);
        self.add_forms("sleep", &["slept"]);
        self.add_forms("teach", &["taught"]);
        self.add_forms("keep", &["kept"]);
        self.add_forms("hold", &["held"]);
        self.add_forms("grow", &["grew", "grown"]);
        self.add_forms("become", &["became"]);
        self.add_forms("begin", &["began", "begun"]);
        self.add_forms("read", &["reads", "reading"]);
        self.add_forms("spend", &["spent"]);
        self.add_forms("sell", &["sold"]);
        self.add_forms("send", &["sent"]);
        self.add_forms("pay", &["paid"]);
        self.add_forms("fall", &["fell", "fallen"]);
        self.add_forms("win", &["won"]);
    }

    fn add_forms(&mut self, lemma: &'static str, forms: &[&'static str]) {
        for form in forms {
            self.irregular.insert(form, lemma);
        }
    }

    /// Lemma of a single lowercase word
    pub fn lemmatize_word(&self, word: &str) -> String {
        let lower = word.to_lowercase();
        if let Some(lemma) = self.irregular.get(lower.as_str()) {
            return lemma.to_string();
        }
        if UNINFLECTED.contains(&lower.as_str()) {
            return lower;
        }
        strip_suffix(&lower)
    }
}

impl Default for RuleLemmatizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Lemmatizer for RuleLemmatizer {
    fn lemmatize(&self, phrase: &str) -> String {
        phrase
            .split_whitespace()
            .map(|word| self.lemmatize_word(word))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn is_vowel(c: char) -> bool {
    matches!(c, 'a' | 'e' | 'i' | 'o' | 'u')
}

/// Undo consonant doubling or a dropped final `e` on a bare stem
fn restore_stem(stem: &str) -> String {
    let chars: Vec<char> = stem.chars().collect();
    let n = chars.len();

    if n >= 3 && chars[n - 1] == chars[n - 2] && !is_vowel(chars[n - 1]) {
        if !matches!(chars[n - 1], 'l' | 's' | 'z') {
            return chars[..n - 1].iter().collect();
        }
        return stem.to_string();
    }

    // Short consonant-vowel-consonant stems lost their final `e` (lik -> like)
    if (3..=4).contains(&n)
        && !is_vowel(chars[n - 3])
        && is_vowel(chars[n - 2])
        && !is_vowel(chars[n - 1])
        && !matches!(chars[n - 1], 'w' | 'x' | 'y')
    {
        return format!("{stem}e");
    }

    stem.to_string()
}

fn strip_suffix(word: &str) -> String {
    let len = word.chars().count();

    if len > 4 && (word.ends_with("ies") || word.ends_with("ied")) {
        return format!("{}y", &word[..word.len() - 3]);
    }
    if len > 5 && word.ends_with("ing") {
        return restore_stem(&word[..word.len() - 3]);
    }
    if len > 4 && word.ends_with("ed") {
        return restore_stem(&word[..word.len() - 2]);
    }
    if len > 4
        && ["sses", "shes", "ches", "xes", "zes"]
            .iter()
            .any(|suffix| word.ends_with(suffix))
    {
        return word[..word.len() - 2].to_string();
    }
    if len > 3 && word.ends_with('s') && !word.ends_with("ss") && !word.ends_with("us") {
        return word[..word.len() - 1].to_string();
    }

    word.to_string()
}
