//! Persistence interface for the moderation and reputation core
//!
//! Every method that pairs a content action with a ledger delta must apply
//! both or neither. Counter changes are increments evaluated by the store,
//! never values computed by the caller from an earlier read.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::StoreError;
use crate::forum::{ContentRecord, ContentRevision, NewContent};
use crate::reputation::{
    Badge, ContributionEvent, ContributionProfile, CounterDelta, ReactionIntent, ReactionKind,
    REVOKE_SOLUTION_AWARD_ON_UNMARK,
};

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Counter delta plus the optional `last_contribution` stamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerCharge {
    pub delta: CounterDelta,
    pub touched_at: Option<DateTime<Utc>>,
}

impl LedgerCharge {
    pub fn new(delta: CounterDelta, touched_at: Option<DateTime<Utc>>) -> Self {
        Self { delta, touched_at }
    }

    pub fn for_event(event: ContributionEvent, now: DateTime<Utc>) -> Self {
        Self {
            delta: event.delta(),
            touched_at: event.touches_contribution().then_some(now),
        }
    }
}

/// Charge owed by a content author when a reaction of `kind` is added or
/// removed.
pub fn reaction_charge(kind: ReactionKind, added: bool, now: DateTime<Utc>) -> Option<LedgerCharge> {
    kind.ledger_event(added)
        .map(|event| LedgerCharge::for_event(event, now))
}

/// Charge owed by a content author when its solution flag becomes
/// `is_solution`.
pub fn solution_charge(is_solution: bool, now: DateTime<Utc>) -> Option<LedgerCharge> {
    if is_solution {
        Some(LedgerCharge::for_event(ContributionEvent::SolutionMarked, now))
    } else if REVOKE_SOLUTION_AWARD_ON_UNMARK {
        Some(LedgerCharge::new(
            ContributionEvent::SolutionMarked.delta().negated(),
            None,
        ))
    } else {
        None
    }
}

/// Charge owed by an author when `count` thanks on their content disappear
/// with it.
pub fn thanks_retraction(count: usize) -> Option<LedgerCharge> {
    (count > 0).then(|| {
        LedgerCharge::new(
            ContributionEvent::ThankRetracted.delta().times(count as i64),
            None,
        )
    })
}

/// A requested change to one user's reaction on one content item.
#[derive(Debug, Clone)]
pub struct ReactionChange {
    pub content_id: Uuid,
    pub kind: ReactionKind,
    pub user_id: String,
    pub intent: ReactionIntent,
    /// Fail with `VersionConflict` unless the stored version matches
    pub expected_version: Option<i64>,
    pub now: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReactionOutcome {
    pub present: bool,
    pub changed: bool,
    pub count: usize,
    pub version: i64,
    /// Author profile after the ledger side effect, if one applied
    pub author_profile: Option<ContributionProfile>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolutionOutcome {
    pub is_solution: bool,
    pub author_profile: Option<ContributionProfile>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletionOutcome {
    /// The deleted item first, then its replies
    pub removed: Vec<Uuid>,
    pub retracted_thanks: usize,
    /// Author profiles after their thanks were retracted
    pub charged_authors: Vec<ContributionProfile>,
}

#[async_trait]
pub trait CommunityStore: Send + Sync {
    /// Creates a zeroed profile, or returns the existing one.
    async fn create_profile(&self, user_id: &str, now: DateTime<Utc>)
        -> StoreResult<ContributionProfile>;

    async fn get_profile(&self, user_id: &str) -> StoreResult<Option<ContributionProfile>>;

    /// Atomic increment-and-fetch; the level is re-derived in the same step.
    async fn apply_delta(
        &self,
        user_id: &str,
        delta: &CounterDelta,
        touched_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> StoreResult<ContributionProfile>;

    /// Adds a badge unless the user already holds one with the same id.
    async fn award_badge(
        &self,
        user_id: &str,
        badge: Badge,
        now: DateTime<Utc>,
    ) -> StoreResult<ContributionProfile>;

    /// Inserts content and charges the author in one unit.
    async fn insert_content(
        &self,
        content: NewContent,
        charge: Option<LedgerCharge>,
    ) -> StoreResult<ContentRecord>;

    async fn get_content(&self, id: Uuid) -> StoreResult<Option<ContentRecord>>;

    async fn revise_content(&self, id: Uuid, revision: ContentRevision)
        -> StoreResult<ContentRecord>;

    /// Changes reaction membership and, for ledger-bearing kinds, charges the
    /// content author in the same unit.
    async fn transition_reaction(&self, change: ReactionChange) -> StoreResult<ReactionOutcome>;

    /// Flips `is_solution`, awarding the author on false→true.
    async fn toggle_solution(&self, id: Uuid, now: DateTime<Utc>) -> StoreResult<SolutionOutcome>;

    /// Sets the lock flag on a post. Replies are not lockable.
    async fn set_locked(&self, id: Uuid, locked: bool, now: DateTime<Utc>)
        -> StoreResult<ContentRecord>;

    /// Replies to `post_id`, oldest first.
    async fn replies(&self, post_id: Uuid) -> StoreResult<Vec<ContentRecord>>;

    /// Deletes an item and its replies. Thanks on every removed item are
    /// retracted from its author in the same unit.
    async fn delete_content(&self, id: Uuid, now: DateTime<Utc>) -> StoreResult<DeletionOutcome>;

    /// Creation times of the user's posts and replies strictly after `since`.
    async fn recent_submission_times(
        &self,
        user_id: &str,
        since: DateTime<Utc>,
    ) -> StoreResult<Vec<DateTime<Utc>>>;

    /// Content awaiting review, newest first.
    async fn flagged_content(&self, limit: usize) -> StoreResult<Vec<ContentRecord>>;

    /// Clears the review flag and report (admin approval).
    async fn clear_review_flag(&self, id: Uuid, now: DateTime<Utc>) -> StoreResult<ContentRecord>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thanks_retraction_scales_with_count() {
        assert!(thanks_retraction(0).is_none());

        let charge = thanks_retraction(4).unwrap();
        assert_eq!(charge.delta.points, -8);
        assert_eq!(charge.delta.thanks_received, -4);
        assert!(charge.touched_at.is_none());
    }

    #[test]
    fn test_unmark_keeps_solution_award() {
        let now = Utc::now();
        assert!(solution_charge(true, now).is_some());
        assert_eq!(solution_charge(false, now).is_some(), REVOKE_SOLUTION_AWARD_ON_UNMARK);
    }
}
