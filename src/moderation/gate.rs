//! Moderation Gate
//!
//! Combines field validation, classification, and sanitization into a single
//! decision for a title/content submission. The gate only computes; callers
//! decide what to persist and what to return over HTTP.
//!
//! ## Decision order
//!
//! ```text
//! validate present fields ──fail──► RejectValidation (all field errors)
//!          │
//!          ▼
//! classify title, content
//!          │
//!          ├─ title High and ≥1 term ───────► Block
//!          ├─ content High and >1 terms ────► Block
//!          ├─ any verdict with terms ───────► Flag   (sanitized, marked for review)
//!          └─ otherwise ────────────────────► Accept (sanitized)
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{Field, FieldError, ModerationError, Result};
use crate::moderation::{Blocklist, ContentSanitizer, Severity, TextClassifier, Verdict};

/// Length and format limits applied before classification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateLimits {
    pub title_min_chars: usize,
    pub title_max_chars: usize,
    /// All-caps titles longer than this are rejected
    pub all_caps_title_max_chars: usize,
    pub content_min_chars: usize,
    pub content_max_chars: usize,
}

impl Default for GateLimits {
    fn default() -> Self {
        Self {
            title_min_chars: 5,
            title_max_chars: 200,
            all_caps_title_max_chars: 30,
            content_min_chars: 10,
            content_max_chars: 10_000,
        }
    }
}

/// Outcome of validating a single field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationOutcome {
    pub is_valid: bool,
    pub errors: Vec<String>,
}

impl ValidationOutcome {
    fn from_errors(errors: Vec<String>) -> Self {
        Self {
            is_valid: errors.is_empty(),
            errors,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GateDecision {
    Accept,
    Flag,
    Block,
    RejectValidation,
}

/// Everything the gate computed for one submission.
#[derive(Debug, Clone, Serialize)]
pub struct GateResult {
    pub decision: GateDecision,
    pub errors: Vec<FieldError>,
    pub title_verdict: Option<Verdict>,
    pub content_verdict: Option<Verdict>,
    pub sanitized_title: Option<String>,
    pub sanitized_content: Option<String>,
}

impl GateResult {
    fn rejected(errors: Vec<FieldError>) -> Self {
        Self {
            decision: GateDecision::RejectValidation,
            errors,
            title_verdict: None,
            content_verdict: None,
            sanitized_title: None,
            sanitized_content: None,
        }
    }

    pub fn flagged_for_review(&self) -> bool {
        self.decision == GateDecision::Flag
    }

    /// Verdict stored as the moderation report on flagged content.
    ///
    /// The content verdict when it flagged terms, otherwise the title verdict.
    pub fn report_verdict(&self) -> Option<&Verdict> {
        if self.decision != GateDecision::Flag {
            return None;
        }
        self.content_verdict
            .as_ref()
            .filter(|v| v.has_flagged_words())
            .or(self.title_verdict.as_ref().filter(|v| v.has_flagged_words()))
    }

    /// Converts the result into what a caller may persist, or the error to
    /// return.
    pub fn into_admission(self) -> Result<Admission> {
        match self.decision {
            GateDecision::RejectValidation => Err(ModerationError::Validation(self.errors)),
            GateDecision::Block => Err(ModerationError::Blocked),
            GateDecision::Accept | GateDecision::Flag => {
                let moderation_report = self.report_verdict().cloned();
                Ok(Admission {
                    decision: self.decision,
                    title: self.sanitized_title,
                    content: self.sanitized_content,
                    flagged_for_review: self.decision == GateDecision::Flag,
                    moderation_report,
                })
            }
        }
    }
}

/// Sanitized fields cleared for storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Admission {
    pub decision: GateDecision,
    pub title: Option<String>,
    pub content: Option<String>,
    pub flagged_for_review: bool,
    pub moderation_report: Option<Verdict>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportAction {
    Blocked,
    Flagged,
}

/// Admin-facing record of a moderation outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModerationReport {
    pub content_id: Option<Uuid>,
    pub author_id: String,
    pub timestamp: DateTime<Utc>,
    pub verdict: Verdict,
    pub action: ReportAction,
    pub requires_manual_review: bool,
}

impl ModerationReport {
    pub fn from_verdict(
        content_id: Option<Uuid>,
        author_id: &str,
        verdict: Verdict,
        timestamp: DateTime<Utc>,
    ) -> Self {
        let action = if verdict.severity == Severity::High {
            ReportAction::Blocked
        } else {
            ReportAction::Flagged
        };
        Self {
            content_id,
            author_id: author_id.to_string(),
            timestamp,
            requires_manual_review: verdict.requires_review,
            verdict,
            action,
        }
    }
}

/// Validation + classification + sanitization for submissions.
#[derive(Debug, Clone)]
pub struct ModerationGate {
    classifier: TextClassifier,
    sanitizer: ContentSanitizer,
    limits: GateLimits,
}

impl ModerationGate {
    pub fn new(blocklist: Blocklist, limits: GateLimits) -> Self {
        let blocklist = Arc::new(blocklist);
        Self {
            classifier: TextClassifier::new(blocklist.clone()),
            sanitizer: ContentSanitizer::new(blocklist),
            limits,
        }
    }

    pub fn classifier(&self) -> &TextClassifier {
        &self.classifier
    }

    pub fn sanitizer(&self) -> &ContentSanitizer {
        &self.sanitizer
    }

    pub fn limits(&self) -> &GateLimits {
        &self.limits
    }

    pub fn classify(&self, text: &str) -> Verdict {
        self.classifier.classify(text)
    }

    pub fn sanitize(&self, text: &str) -> String {
        self.sanitizer.clean(text)
    }

    pub fn validate_title(&self, title: &str) -> ValidationOutcome {
        let limits = &self.limits;
        let len = title.chars().count();
        let mut errors = Vec::new();

        if title.trim().is_empty() {
            errors.push("Title is required".to_string());
        }
        if len > 0 && len < limits.title_min_chars {
            errors.push(format!(
                "Title must be at least {} characters",
                limits.title_min_chars
            ));
        }
        if len > limits.title_max_chars {
            errors.push(format!(
                "Title must be at most {} characters",
                limits.title_max_chars
            ));
        }
        if len > limits.all_caps_title_max_chars && title == title.to_uppercase() {
            errors.push("Please avoid using all caps in title".to_string());
        }

        ValidationOutcome::from_errors(errors)
    }

    pub fn validate_content(&self, content: &str) -> ValidationOutcome {
        let limits = &self.limits;
        let len = content.chars().count();
        let mut errors = Vec::new();

        if content.trim().is_empty() {
            errors.push("Content is required".to_string());
        }
        if len > 0 && len < limits.content_min_chars {
            errors.push(format!(
                "Content must be at least {} characters",
                limits.content_min_chars
            ));
        }
        if len > limits.content_max_chars {
            errors.push(format!(
                "Content must be at most {} characters",
                limits.content_max_chars
            ));
        }

        ValidationOutcome::from_errors(errors)
    }

    /// Runs the full decision for whichever fields are present.
    pub fn gate(&self, title: Option<&str>, content: Option<&str>) -> GateResult {
        let mut errors = Vec::new();
        if let Some(title) = title {
            errors.extend(
                self.validate_title(title)
                    .errors
                    .into_iter()
                    .map(|e| FieldError::new(Field::Title, e)),
            );
        }
        if let Some(content) = content {
            errors.extend(
                self.validate_content(content)
                    .errors
                    .into_iter()
                    .map(|e| FieldError::new(Field::Content, e)),
            );
        }
        if !errors.is_empty() {
            debug!(errors = errors.len(), "Submission failed validation");
            return GateResult::rejected(errors);
        }

        let title_verdict = title.map(|t| self.classifier.classify(t));
        let content_verdict = content.map(|c| self.classifier.classify(c));

        // Titles block on a single term; content needs more than one
        let title_blocks = title_verdict
            .as_ref()
            .is_some_and(|v| v.severity == Severity::High && v.flagged_count() > 0);
        let content_blocks = content_verdict
            .as_ref()
            .is_some_and(|v| v.severity == Severity::High && v.flagged_count() > 1);

        let decision = if title_blocks || content_blocks {
            GateDecision::Block
        } else if title_verdict
            .iter()
            .chain(content_verdict.iter())
            .any(Verdict::has_flagged_words)
        {
            GateDecision::Flag
        } else {
            GateDecision::Accept
        };

        let (sanitized_title, sanitized_content) = match decision {
            GateDecision::Accept | GateDecision::Flag => (
                title.map(|t| self.sanitizer.clean(t)),
                content.map(|c| self.sanitizer.clean(c)),
            ),
            _ => (None, None),
        };

        if decision == GateDecision::Block {
            warn!(
                title_terms = title_verdict.as_ref().map_or(0, Verdict::flagged_count),
                content_terms = content_verdict.as_ref().map_or(0, Verdict::flagged_count),
                "Submission blocked by moderation"
            );
        } else {
            debug!(decision = ?decision, "Submission passed moderation gate");
        }

        GateResult {
            decision,
            errors,
            title_verdict,
            content_verdict,
            sanitized_title,
            sanitized_content,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gate(terms: &[&str]) -> ModerationGate {
        ModerationGate::new(
            Blocklist::new(terms.iter().copied()).unwrap(),
            GateLimits::default(),
        )
    }

    #[test]
    fn test_title_rules() {
        let g = gate(&[]);
        assert!(g.validate_title("A sensible title").is_valid);

        let empty = g.validate_title("");
        assert_eq!(empty.errors, vec!["Title is required"]);

        let short = g.validate_title("Hey");
        assert_eq!(short.errors, vec!["Title must be at least 5 characters"]);

        assert!(g.validate_title(&"x".repeat(200)).is_valid);
        assert!(!g.validate_title(&"x".repeat(201)).is_valid);
    }

    #[test]
    fn test_all_caps_title() {
        let g = gate(&[]);
        let shouted = "A".repeat(32);
        let outcome = g.validate_title(&shouted);
        assert!(!outcome.is_valid);
        assert!(outcome
            .errors
            .contains(&"Please avoid using all caps in title".to_string()));

        // Short all-caps titles are fine
        assert!(g.validate_title("HELP NEEDED").is_valid);
    }

    #[test]
    fn test_validation_reports_every_violation() {
        let g = gate(&[]);
        let blank = g.validate_content("   ");
        assert_eq!(
            blank.errors,
            vec!["Content is required", "Content must be at least 10 characters"]
        );

        let caps_and_long = g.validate_title(&"B".repeat(250));
        assert_eq!(caps_and_long.errors.len(), 2);
    }

    #[test]
    fn test_gate_rejects_with_all_field_errors() {
        let g = gate(&[]);
        let result = g.gate(Some("Hi"), Some("short"));
        assert_eq!(result.decision, GateDecision::RejectValidation);
        assert_eq!(result.errors.len(), 2);
        assert_eq!(result.errors[0].field, Field::Title);
        assert_eq!(result.errors[1].field, Field::Content);
        assert!(result.title_verdict.is_none());
    }

    #[test]
    fn test_gate_accepts_clean_submission() {
        let g = gate(&["heck"]);
        let result = g.gate(Some("Moving to Frankfurt"), Some("Any tips for finding a flat?"));
        assert_eq!(result.decision, GateDecision::Accept);
        assert_eq!(result.sanitized_title.as_deref(), Some("Moving to Frankfurt"));
        assert!(!result.flagged_for_review());
    }

    #[test]
    fn test_single_title_term_blocks_only_when_high() {
        // One term alone is medium severity, so the title path flags
        let g = gate(&["heck"]);
        let result = g.gate(Some("What the heck"), Some("Just wondering about this."));
        assert_eq!(result.decision, GateDecision::Flag);
        assert_eq!(result.sanitized_title.as_deref(), Some("What the h***"));
        assert_eq!(
            result.report_verdict().map(|v| v.flagged_words.clone()),
            Some(vec!["heck".to_string()])
        );
    }

    #[test]
    fn test_content_with_one_term_is_flagged_and_sanitized() {
        let g = gate(&["heck"]);
        let result = g.gate(None, Some("This flat is a heck of a deal"));
        assert_eq!(result.decision, GateDecision::Flag);
        assert_eq!(
            result.sanitized_content.as_deref(),
            Some("This flat is a h*** of a deal")
        );
        let admission = result.into_admission().unwrap();
        assert!(admission.flagged_for_review);
        assert!(admission.moderation_report.is_some());
    }

    #[test]
    fn test_content_blocks_above_one_term_when_high() {
        let g = gate(&["heck", "blast", "drat"]);
        let result = g.gate(None, Some("heck and blast and drat all day"));
        assert_eq!(result.decision, GateDecision::Block);
        assert!(result.sanitized_content.is_none());
        assert!(matches!(
            result.into_admission(),
            Err(ModerationError::Blocked)
        ));
    }

    #[test]
    fn test_moderation_report_action() {
        let g = gate(&["heck", "blast", "drat"]);
        let high = g.classify("heck blast drat");
        let report = ModerationReport::from_verdict(None, "u1", high, Utc::now());
        assert_eq!(report.action, ReportAction::Blocked);
        assert!(report.requires_manual_review);

        let medium = g.classify("heck");
        let report = ModerationReport::from_verdict(None, "u1", medium, Utc::now());
        assert_eq!(report.action, ReportAction::Flagged);
    }
}
