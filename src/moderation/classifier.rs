//! Text Classification
//!
//! Lexical blocklist matching plus four spam heuristics, folded into a
//! [`Verdict`]. Deterministic: same text and blocklist, same verdict.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, LazyLock};

use crate::moderation::Blocklist;

/// Consecutive repeats of one word that count as spam.
pub const REPEATED_WORD_RUN: usize = 6;
/// URL count above which text counts as link spam.
pub const MAX_URLS: usize = 5;
/// Shouted-word count above which text counts as caps spam.
pub const MAX_SHOUTED_WORDS: usize = 10;

static URL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b[a-z][a-z0-9+.\-]*://\S+").expect("URL pattern is valid")
});

static SHOUTED_WORD_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[A-Z]{10,}\b").expect("caps pattern is valid"));

static PUNCTUATION_RUN_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[!?]{5,}").expect("punctuation pattern is valid"));

/// Ordered classification outcome, `None < Low < Medium < High`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    None,
    Low,
    Medium,
    High,
}

impl Severity {
    /// Severity rule over distinct flagged terms and spam score.
    pub fn assess(flagged_terms: usize, spam_score: u32) -> Self {
        if flagged_terms > 2 || spam_score > 5 {
            Severity::High
        } else if flagged_terms > 0 || spam_score > 3 {
            Severity::Medium
        } else if spam_score > 1 {
            Severity::Low
        } else {
            Severity::None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::None => "none",
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        }
    }
}

/// Result of classifying one piece of text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    pub flagged_words: Vec<String>,
    pub spam_score: u32,
    pub severity: Severity,
    pub is_clean: bool,
    pub requires_review: bool,
}

impl Verdict {
    pub fn clean() -> Self {
        Self::from_parts(Vec::new(), 0)
    }

    fn from_parts(flagged_words: Vec<String>, spam_score: u32) -> Self {
        let severity = Severity::assess(flagged_words.len(), spam_score);
        Self {
            is_clean: flagged_words.is_empty() && spam_score == 0,
            requires_review: severity == Severity::High || !flagged_words.is_empty(),
            flagged_words,
            spam_score,
            severity,
        }
    }

    pub fn flagged_count(&self) -> usize {
        self.flagged_words.len()
    }

    pub fn has_flagged_words(&self) -> bool {
        !self.flagged_words.is_empty()
    }
}

/// Individual spam signals found in a text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SpamSignals {
    pub repeated_word: bool,
    pub excessive_urls: bool,
    pub excessive_caps: bool,
    pub excessive_punctuation: bool,
}

impl SpamSignals {
    pub fn detect(text: &str) -> Self {
        Self {
            repeated_word: has_repeated_word_run(text, REPEATED_WORD_RUN),
            excessive_urls: URL_PATTERN.find_iter(text).count() > MAX_URLS,
            excessive_caps: SHOUTED_WORD_PATTERN.find_iter(text).count() > MAX_SHOUTED_WORDS,
            excessive_punctuation: PUNCTUATION_RUN_PATTERN.is_match(text),
        }
    }

    pub fn score(&self) -> u32 {
        [
            self.repeated_word,
            self.excessive_urls,
            self.excessive_caps,
            self.excessive_punctuation,
        ]
        .iter()
        .filter(|hit| **hit)
        .count() as u32
    }
}

/// True if some word appears `run` or more times in a row (ignoring case and
/// surrounding punctuation).
fn has_repeated_word_run(text: &str, run: usize) -> bool {
    let mut previous: Option<String> = None;
    let mut streak = 0usize;

    for raw in text.split_whitespace() {
        let token = raw
            .trim_matches(|c: char| !c.is_alphanumeric())
            .to_lowercase();
        if token.is_empty() {
            previous = None;
            streak = 0;
            continue;
        }

        if previous.as_deref() == Some(token.as_str()) {
            streak += 1;
        } else {
            previous = Some(token);
            streak = 1;
        }

        if streak >= run {
            return true;
        }
    }

    false
}

/// Classifies text against an injected blocklist.
#[derive(Debug, Clone)]
pub struct TextClassifier {
    blocklist: Arc<Blocklist>,
}

impl TextClassifier {
    pub fn new(blocklist: Arc<Blocklist>) -> Self {
        Self { blocklist }
    }

    pub fn blocklist(&self) -> &Blocklist {
        &self.blocklist
    }

    pub fn classify(&self, text: &str) -> Verdict {
        if text.is_empty() {
            return Verdict::clean();
        }

        let flagged_words: Vec<String> =
            self.blocklist.matches(text).map(str::to_string).collect();
        let spam_score = SpamSignals::detect(text).score();

        Verdict::from_parts(flagged_words, spam_score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier(terms: &[&str]) -> TextClassifier {
        TextClassifier::new(Arc::new(Blocklist::new(terms.iter().copied()).unwrap()))
    }

    #[test]
    fn test_clean_text() {
        let verdict = classifier(&["heck"]).classify("Looking for a flat near the river.");
        assert!(verdict.is_clean);
        assert_eq!(verdict.severity, Severity::None);
        assert!(verdict.flagged_words.is_empty());
        assert!(!verdict.requires_review);
    }

    #[test]
    fn test_empty_text_is_clean() {
        assert_eq!(classifier(&["heck"]).classify(""), Verdict::clean());
    }

    #[test]
    fn test_single_term_is_medium_and_reviewed() {
        let verdict = classifier(&["heck"]).classify("what the heck");
        assert_eq!(verdict.flagged_words, vec!["heck"]);
        assert_eq!(verdict.severity, Severity::Medium);
        assert!(verdict.requires_review);
        assert!(!verdict.is_clean);
    }

    #[test]
    fn test_two_terms_without_spam_are_medium() {
        let verdict = classifier(&["heck", "blast"]).classify("heck and blast");
        assert_eq!(verdict.flagged_count(), 2);
        assert_eq!(verdict.severity, Severity::Medium);
    }

    #[test]
    fn test_three_terms_are_high() {
        let verdict = classifier(&["heck", "blast", "drat"]).classify("heck blast drat");
        assert_eq!(verdict.severity, Severity::High);
    }

    #[test]
    fn test_terms_counted_once_per_text() {
        let verdict = classifier(&["heck"]).classify("heck heck heck, HECK");
        assert_eq!(verdict.flagged_words, vec!["heck"]);
    }

    #[test]
    fn test_url_heuristic() {
        let text = (1..=6)
            .map(|i| format!("see http://example.com/page{}", i))
            .collect::<Vec<_>>()
            .join(" ");
        let verdict = classifier(&[]).classify(&text);
        assert_eq!(verdict.spam_score, 1);
        assert!(!verdict.is_clean);
        // A lone spam signal does not reach `low`
        assert_eq!(verdict.severity, Severity::None);

        let five = (1..=5)
            .map(|i| format!("https://example.com/{}", i))
            .collect::<Vec<_>>()
            .join(" ");
        assert_eq!(classifier(&[]).classify(&five).spam_score, 0);
    }

    #[test]
    fn test_repeated_word_heuristic() {
        assert!(has_repeated_word_run("buy buy buy buy buy buy now", 6));
        assert!(has_repeated_word_run("Buy buy BUY buy, buy buy!", 6));
        assert!(!has_repeated_word_run("buy buy buy buy buy now buy", 6));
    }

    #[test]
    fn test_caps_and_punctuation_heuristics() {
        let shouting = (0..11).map(|_| "ABSOLUTELY").collect::<Vec<_>>().join(" ");
        let signals = SpamSignals::detect(&shouting);
        assert!(signals.excessive_caps);
        // Eleven identical shouted words are also a repeated run
        assert!(signals.repeated_word);

        assert!(SpamSignals::detect("really?!?!?").excessive_punctuation);
        assert!(!SpamSignals::detect("really?!?!").excessive_punctuation);
    }

    #[test]
    fn test_two_signals_are_low() {
        let verdict = classifier(&[]).classify("why why why why why why?????");
        assert_eq!(verdict.spam_score, 2);
        assert_eq!(verdict.severity, Severity::Low);
        assert!(!verdict.requires_review);
    }

    #[test]
    fn test_severity_thresholds() {
        assert_eq!(Severity::assess(0, 0), Severity::None);
        assert_eq!(Severity::assess(0, 1), Severity::None);
        assert_eq!(Severity::assess(0, 2), Severity::Low);
        assert_eq!(Severity::assess(0, 4), Severity::Medium);
        assert_eq!(Severity::assess(0, 6), Severity::High);
        assert_eq!(Severity::assess(1, 0), Severity::Medium);
        assert_eq!(Severity::assess(3, 0), Severity::High);
        assert!(Severity::None < Severity::Low && Severity::Medium < Severity::High);
    }
}
