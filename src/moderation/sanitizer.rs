//! Content sanitization
//!
//! Redacts blocked terms for storage. Runs regardless of verdict severity.

use std::borrow::Cow;
use std::sync::Arc;

use crate::moderation::Blocklist;

#[derive(Debug, Clone)]
pub struct ContentSanitizer {
    blocklist: Arc<Blocklist>,
}

impl ContentSanitizer {
    pub fn new(blocklist: Arc<Blocklist>) -> Self {
        Self { blocklist }
    }

    /// Masks every whole-word match as its first character plus asterisks.
    pub fn clean(&self, text: &str) -> String {
        let mut cleaned = text.to_string();
        for entry in self.blocklist.entries() {
            let replaced = match entry.redact(&cleaned) {
                Cow::Borrowed(_) => continue,
                Cow::Owned(replaced) => replaced,
            };
            cleaned = replaced;
        }
        cleaned
    }
}
