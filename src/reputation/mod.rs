//! Contribution Reputation
//!
//! Tracks per-user contribution counters, the level derived from points, and
//! badges. Reactions and solution marks reach the ledger through the store so
//! that a content change and its reputation delta commit together.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────┐     ┌──────────────────┐     ┌─────────────────┐
//! │ ContributionEvent│────►│ ReputationLedger │────►│ CommunityStore  │
//! │ (standard deltas)│     │ (apply_delta)    │     │ (increment and  │
//! └──────────────────┘     └──────────────────┘     │  fetch)         │
//!                                                   └─────────────────┘
//!                                                            ▲
//! ┌──────────────────┐                                       │
//! │ ReactionKind     │──── thank deltas on the author ───────┘
//! │ toggle/set_state │
//! └──────────────────┘
//! ```
//!
//! ## Levels
//!
//! - 100+ points: Champion
//! - 50+: Expert
//! - 25+: Contributor
//! - 10+: Member
//! - otherwise Newcomer

mod ledger;
mod profile;
mod social;

pub use ledger::{ReputationLedger, REVOKE_SOLUTION_AWARD_ON_UNMARK};
pub use profile::{
    level_for, Badge, ContributionEvent, ContributionProfile, Counter, CounterDelta, Level,
};
pub use social::{
    set_state, toggle, ReactionIntent, ReactionKind, ReactionSet, SetStateOutcome, ToggleOutcome,
};
