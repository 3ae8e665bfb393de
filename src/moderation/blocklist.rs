//! Blocked term list
//!
//! Terms are supplied by configuration and compiled once into whole-word,
//! case-insensitive matchers. Order is preserved and duplicates (ignoring
//! case) are dropped, so verdicts list terms in configuration order.

use regex::Regex;
use std::fmt;

/// A single compiled blocklist entry.
#[derive(Clone)]
pub struct BlockedTerm {
    term: String,
    pattern: Regex,
}

impl BlockedTerm {
    fn compile(term: &str) -> Result<Self, regex::Error> {
        let term = term.trim().to_lowercase();
        let pattern = Regex::new(&format!(r"(?i)\b{}\b", regex::escape(&term)))?;
        Ok(Self { term, pattern })
    }

    pub fn term(&self) -> &str {
        &self.term
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.pattern.is_match(text)
    }

    /// Replaces each occurrence with the term's first character followed by
    /// asterisks for the rest of the matched text.
    pub fn redact<'t>(&self, text: &'t str) -> std::borrow::Cow<'t, str> {
        let Some(first) = self.term.chars().next() else {
            return std::borrow::Cow::Borrowed(text);
        };
        self.pattern.replace_all(text, |caps: &regex::Captures| {
            let matched = &caps[0];
            let mut out = String::with_capacity(matched.len());
            out.push(first);
            out.extend(matched.chars().skip(1).map(|_| '*'));
            out
        })
    }
}

impl fmt::Debug for BlockedTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("BlockedTerm").field(&self.term).finish()
    }
}

/// Ordered set of blocked terms.
#[derive(Debug, Clone, Default)]
pub struct Blocklist {
    terms: Vec<BlockedTerm>,
}

impl Blocklist {
    /// Compiles a blocklist. Blank entries are skipped.
    pub fn new<I, S>(terms: I) -> Result<Self, regex::Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut compiled: Vec<BlockedTerm> = Vec::new();
        for raw in terms {
            let raw = raw.as_ref();
            if raw.trim().is_empty() {
                continue;
            }
            let entry = BlockedTerm::compile(raw)?;
            if compiled.iter().any(|t| t.term == entry.term) {
                continue;
            }
            compiled.push(entry);
        }
        Ok(Self { terms: compiled })
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn terms(&self) -> impl Iterator<Item = &str> {
        self.terms.iter().map(|t| t.term())
    }

    /// Distinct terms that occur in `text`, in blocklist order.
    ///
    /// A term matching several times is reported once.
    pub fn matches<'a>(&'a self, text: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.terms
            .iter()
            .filter(move |t| t.is_match(text))
            .map(|t| t.term())
    }

    pub(crate) fn entries(&self) -> &[BlockedTerm] {
        &self.terms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whole_word_case_insensitive() {
        let list = Blocklist::new(["darn"]).unwrap();
        let hits: Vec<_> = list.matches("Well DARN it").collect();
        assert_eq!(hits, vec!["darn"]);

        // Substring of a longer word is not a match
        assert_eq!(list.matches("darnation").count(), 0);
    }

    #[test]
    fn test_duplicates_and_blanks_dropped() {
        let list = Blocklist::new(["Heck", "heck", "  ", "blast"]).unwrap();
        assert_eq!(list.terms().collect::<Vec<_>>(), vec!["heck", "blast"]);
    }

    #[test]
    fn test_repeated_occurrences_reported_once() {
        let list = Blocklist::new(["heck"]).unwrap();
        assert_eq!(list.matches("heck heck HECK").count(), 1);
    }

    #[test]
    fn test_regex_metacharacters_are_literal() {
        let list = Blocklist::new(["a.b"]).unwrap();
        assert_eq!(list.matches("axb").count(), 0);
        assert_eq!(list.matches("say a.b now").count(), 1);
    }

    #[test]
    fn test_redaction_uses_term_character() {
        let list = Blocklist::new(["Heck"]).unwrap();
        let redacted = list.entries()[0].redact("HECK no, Heck yes");
        assert_eq!(redacted, "h*** no, h*** yes");
    }
}
