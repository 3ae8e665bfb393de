//! Social action toggles
//!
//! `toggle` flips a user's membership in a reaction set; `set_state` drives it
//! to a desired state and is safe to retry. Stores use these primitives for
//! the membership half of a reaction transition and attach the ledger half
//! from [`ReactionKind::ledger_event`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::reputation::ContributionEvent;

/// Set of user ids that reacted to one content item.
pub type ReactionSet = BTreeSet<String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToggleOutcome {
    pub added: bool,
    pub new_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetStateOutcome {
    pub present: bool,
    pub changed: bool,
    pub new_count: usize,
}

/// Flips `user_id`'s membership. Calling twice restores the original set.
pub fn toggle(set: &mut ReactionSet, user_id: &str) -> ToggleOutcome {
    let added = if set.remove(user_id) {
        false
    } else {
        set.insert(user_id.to_string());
        true
    };
    ToggleOutcome {
        added,
        new_count: set.len(),
    }
}

/// Ensures `user_id` is (or is not) a member. Repeating a call is a no-op.
pub fn set_state(set: &mut ReactionSet, user_id: &str, desired: bool) -> SetStateOutcome {
    let changed = if desired {
        set.insert(user_id.to_string())
    } else {
        set.remove(user_id)
    };
    SetStateOutcome {
        present: desired,
        changed,
        new_count: set.len(),
    }
}

/// Kinds of reaction a user can leave on content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReactionKind {
    Like,
    Thank,
}

impl ReactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReactionKind::Like => "like",
            ReactionKind::Thank => "thank",
        }
    }

    /// Ledger event charged to the content author when membership changes.
    pub fn ledger_event(&self, added: bool) -> Option<ContributionEvent> {
        match (self, added) {
            (ReactionKind::Thank, true) => Some(ContributionEvent::ThankReceived),
            (ReactionKind::Thank, false) => Some(ContributionEvent::ThankRetracted),
            (ReactionKind::Like, _) => None,
        }
    }
}

impl fmt::Display for ReactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReactionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "like" => Ok(ReactionKind::Like),
            "thank" => Ok(ReactionKind::Thank),
            other => Err(format!("Unknown reaction kind: {}", other)),
        }
    }
}

/// How a reaction request should change membership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReactionIntent {
    Flip,
    Set(bool),
}

impl ReactionIntent {
    /// Applies the intent to `set`, returning `(present, changed, count)`.
    pub fn apply(&self, set: &mut ReactionSet, user_id: &str) -> (bool, bool, usize) {
        match self {
            ReactionIntent::Flip => {
                let outcome = toggle(set, user_id);
                (outcome.added, true, outcome.new_count)
            }
            ReactionIntent::Set(desired) => {
                let outcome = set_state(set, user_id, *desired);
                (outcome.present, outcome.changed, outcome.new_count)
            }
        }
    }

    /// Target membership given the current one.
    pub fn target(&self, currently_present: bool) -> bool {
        match self {
            ReactionIntent::Flip => !currently_present,
            ReactionIntent::Set(desired) => *desired,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle_is_self_inverse() {
        let mut set: ReactionSet = ["alice".to_string(), "bob".to_string()].into();
        let original = set.clone();

        let first = toggle(&mut set, "carol");
        assert_eq!(first, ToggleOutcome { added: true, new_count: 3 });

        let second = toggle(&mut set, "carol");
        assert_eq!(second, ToggleOutcome { added: false, new_count: 2 });
        assert_eq!(set, original);

        toggle(&mut set, "alice");
        toggle(&mut set, "alice");
        assert_eq!(set, original);
    }

    #[test]
    fn test_set_state_is_idempotent() {
        let mut set = ReactionSet::new();
        let first = set_state(&mut set, "alice", true);
        assert!(first.present && first.changed);

        let again = set_state(&mut set, "alice", true);
        assert!(again.present && !again.changed);
        assert_eq!(again.new_count, 1);

        let removed = set_state(&mut set, "alice", false);
        assert!(!removed.present && removed.changed);
        let removed_again = set_state(&mut set, "alice", false);
        assert!(!removed_again.changed);
        assert!(set.is_empty());
    }

    #[test]
    fn test_only_thanks_touch_the_ledger() {
        assert_eq!(
            ReactionKind::Thank.ledger_event(true),
            Some(ContributionEvent::ThankReceived)
        );
        assert_eq!(
            ReactionKind::Thank.ledger_event(false),
            Some(ContributionEvent::ThankRetracted)
        );
        assert_eq!(ReactionKind::Like.ledger_event(true), None);
    }

    #[test]
    fn test_intent_target() {
        assert!(ReactionIntent::Flip.target(false));
        assert!(!ReactionIntent::Flip.target(true));
        assert!(ReactionIntent::Set(true).target(true));
    }
}
