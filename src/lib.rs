//! Forum Steward
//!
//! Content moderation and contribution reputation for a community forum:
//! blocklist classification, sanitization, submission gating, throttling,
//! and a per-user ledger of points, levels, and badges driven by posts,
//! thanks, and solution marks.
//!
//! ## Module Structure
//!
//! ```text
//! src/
//! ├── lib.rs         - Crate root with re-exports
//! ├── main.rs        - Server entrypoint
//! ├── config.rs      - Environment configuration
//! ├── clock.rs       - Time source (system and manual)
//! ├── error.rs       - Error taxonomy
//! ├── moderation/    - Text moderation
//! │   ├── blocklist.rs  - Injected term list, compiled once
//! │   ├── classifier.rs - Flagged terms, spam score, severity
//! │   ├── sanitizer.rs  - Term redaction
//! │   ├── gate.rs       - Validation + classification decision
//! │   └── throttle.rs   - Submission frequency check
//! ├── reputation/    - Contribution ledger
//! │   ├── profile.rs - Counters, levels, badges, standard events
//! │   ├── social.rs  - Reaction toggles
//! │   └── ledger.rs  - Ledger operations
//! ├── forum/         - Content records and the orchestrating service
//! ├── api/           - HTTP API endpoints
//! └── database/      - Store trait, PostgreSQL and in-memory stores
//! ```

pub mod api;
pub mod clock;
pub mod config;
pub mod database;
pub mod error;
pub mod forum;
pub mod moderation;
pub mod reputation;

// Re-export main types for convenience
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::StewardConfig;
pub use database::{CommunityRepository, CommunityStore, DatabasePool, InMemoryStore};
pub use error::{Field, FieldError, ModerationError, Result, StoreError};
pub use forum::{Actor, ContentKind, ContentRecord, ForumService, Role};

// Re-export moderation types
pub use moderation::{
    should_throttle, Blocklist, ContentSanitizer, GateDecision, GateLimits, GateResult,
    ModerationGate, ModerationReport, Severity, SubmissionThrottle, TextClassifier,
    ThrottleConfig, Verdict,
};

// Re-export reputation types
pub use reputation::{
    level_for, set_state, toggle, Badge, ContributionEvent, ContributionProfile, CounterDelta,
    Level, ReactionKind, ReputationLedger,
};

// Re-export API types
pub use api::{create_forum_router, ForumApiState};
