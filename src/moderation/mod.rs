//! Content Moderation
//!
//! Deterministic lexical moderation for user submissions.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────┐     ┌────────────────┐
//! │ Blocklist │────►│ TextClassifier │──┐
//! │ (config)  │     └────────────────┘  │   ┌────────────────┐
//! │           │     ┌──────────────────┐├──►│ ModerationGate │──► GateResult
//! │           │────►│ ContentSanitizer │┘   │ (+ validation) │
//! └───────────┘     └──────────────────┘    └────────────────┘
//!
//! SubmissionThrottle ── recent submission times ──► allow / RateLimited
//! ```

mod blocklist;
mod classifier;
mod gate;
mod sanitizer;
mod throttle;

pub use blocklist::{BlockedTerm, Blocklist};
pub use classifier::{Severity, SpamSignals, TextClassifier, Verdict};
pub use gate::{
    Admission, GateDecision, GateLimits, GateResult, ModerationGate, ModerationReport,
    ReportAction, ValidationOutcome,
};
pub use sanitizer::ContentSanitizer;
pub use throttle::{should_throttle, SubmissionThrottle, ThrottleConfig};
