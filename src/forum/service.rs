//! Forum Service - orchestrates moderation, content storage, and reputation
//!
//! Each operation is one gate decision followed by one store call; content
//! changes that carry a ledger delta are applied by the store as a unit.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::clock::Clock;
use crate::database::{CommunityStore, LedgerCharge, ReactionChange, ReactionOutcome};
use crate::error::{Field, FieldError, ModerationError, Result};
use crate::forum::{Actor, ContentKind, ContentRecord, ContentRevision, NewContent};
use crate::moderation::{
    Admission, GateDecision, GateResult, ModerationGate, ModerationReport, SubmissionThrottle,
};
use crate::reputation::{
    ContributionEvent, ContributionProfile, ReactionIntent, ReactionKind, ReputationLedger,
};

/// Review queue size when the caller does not ask for one.
pub const DEFAULT_REVIEW_LIMIT: usize = 20;

/// A stored post or reply and the gate decision that admitted it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub record: ContentRecord,
    pub decision: GateDecision,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReactionUpdate {
    pub content_id: Uuid,
    pub kind: ReactionKind,
    pub present: bool,
    pub changed: bool,
    pub count: usize,
    pub version: i64,
}

impl ReactionUpdate {
    fn from_outcome(content_id: Uuid, kind: ReactionKind, outcome: &ReactionOutcome) -> Self {
        Self {
            content_id,
            kind,
            present: outcome.present,
            changed: outcome.changed,
            count: outcome.count,
            version: outcome.version,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SolutionUpdate {
    pub content_id: Uuid,
    pub is_solution: bool,
}

/// A post with its replies, oldest first.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostThread {
    pub post: ContentRecord,
    pub replies: Vec<ContentRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentRemoval {
    pub content_id: Uuid,
    pub removed: usize,
    pub retracted_thanks: usize,
}

#[derive(Clone)]
pub struct ForumService {
    store: Arc<dyn CommunityStore>,
    clock: Arc<dyn Clock>,
    gate: Arc<ModerationGate>,
    throttle: SubmissionThrottle,
    ledger: ReputationLedger,
}

impl ForumService {
    pub fn new(
        store: Arc<dyn CommunityStore>,
        clock: Arc<dyn Clock>,
        gate: ModerationGate,
        throttle: SubmissionThrottle,
    ) -> Self {
        let ledger = ReputationLedger::new(store.clone(), clock.clone());
        Self {
            store,
            clock,
            gate: Arc::new(gate),
            throttle,
            ledger,
        }
    }

    pub fn gate(&self) -> &ModerationGate {
        &self.gate
    }

    pub fn ledger(&self) -> &ReputationLedger {
        &self.ledger
    }

    pub async fn register_member(&self, user_id: &str) -> Result<ContributionProfile> {
        self.ledger.register(user_id).await
    }

    pub async fn profile(&self, user_id: &str) -> Result<ContributionProfile> {
        self.ledger.profile(user_id).await
    }

    /// Gate dry run. Nothing is stored.
    pub fn preview(&self, title: Option<&str>, content: Option<&str>) -> GateResult {
        self.gate.gate(title, content)
    }

    fn admit(
        &self,
        actor: &Actor,
        content_id: Option<Uuid>,
        result: GateResult,
        now: DateTime<Utc>,
    ) -> Result<Admission> {
        if result.decision == GateDecision::Block {
            let verdict = result
                .title_verdict
                .iter()
                .chain(result.content_verdict.iter())
                .max_by_key(|v| v.severity)
                .cloned();
            if let Some(verdict) = verdict {
                let report = ModerationReport::from_verdict(content_id, &actor.user_id, verdict, now);
                warn!(
                    user_id = %report.author_id,
                    action = ?report.action,
                    severity = report.verdict.severity.as_str(),
                    terms = report.verdict.flagged_count(),
                    "Moderation report filed"
                );
            }
        }
        result.into_admission()
    }

    fn log_flagged(&self, record: &ContentRecord, now: DateTime<Utc>) {
        if let Some(verdict) = record.moderation_report.clone() {
            let report = ModerationReport::from_verdict(Some(record.id), &record.author_id, verdict, now);
            info!(
                content_id = %record.id,
                user_id = %report.author_id,
                action = ?report.action,
                severity = report.verdict.severity.as_str(),
                requires_manual_review = report.requires_manual_review,
                "Content flagged for review"
            );
        }
    }

    /// Throttle, gate, then store the post and award `PostCreated` together.
    pub async fn create_post(&self, actor: &Actor, title: &str, body: &str) -> Result<Submission> {
        let now = self.clock.now();
        self.throttle.check(self.store.as_ref(), &actor.user_id, now).await?;

        let result = self.gate.gate(Some(title), Some(body));
        let admission = self.admit(actor, None, result, now)?;
        let decision = admission.decision;

        let content = NewContent::from_admission(ContentKind::Post, None, &actor.user_id, admission, now)
            .ok_or_else(content_required)?;

        self.ledger.register(&actor.user_id).await?;
        let charge = LedgerCharge::for_event(ContributionEvent::PostCreated, now);
        let record = self
            .store
            .insert_content(content, Some(charge))
            .await
            .map_err(ModerationError::from_ledger)?;

        if record.flagged_for_review {
            self.log_flagged(&record, now);
        }
        debug!(content_id = %record.id, user_id = %actor.user_id, "Post created");

        Ok(Submission { record, decision })
    }

    /// Replies carry no ledger effect and may only target posts.
    pub async fn add_reply(&self, actor: &Actor, post_id: Uuid, body: &str) -> Result<Submission> {
        let now = self.clock.now();
        self.throttle.check(self.store.as_ref(), &actor.user_id, now).await?;

        let parent = self.require_post(post_id).await?;
        if parent.is_locked {
            return Err(ModerationError::forbidden("This post is locked"));
        }

        let result = self.gate.gate(None, Some(body));
        let admission = self.admit(actor, None, result, now)?;
        let decision = admission.decision;

        let content = NewContent::from_admission(
            ContentKind::Reply,
            Some(post_id),
            &actor.user_id,
            admission,
            now,
        )
        .ok_or_else(content_required)?;

        let record = self.store.insert_content(content, None).await?;
        if record.flagged_for_review {
            self.log_flagged(&record, now);
        }
        debug!(content_id = %record.id, post_id = %post_id, "Reply added");

        Ok(Submission { record, decision })
    }

    /// Re-gates the supplied fields. An edit never clears an existing review
    /// flag; only [`approve`](Self::approve) does.
    pub async fn revise(
        &self,
        actor: &Actor,
        id: Uuid,
        title: Option<&str>,
        body: Option<&str>,
    ) -> Result<Submission> {
        let record = self
            .store
            .get_content(id)
            .await?
            .ok_or_else(|| ModerationError::not_found(format!("content {}", id)))?;

        if !actor.can_edit(&record.author_id) {
            warn!(user_id = %actor.user_id, content_id = %id, "Edit refused");
            return Err(ModerationError::forbidden("Not authorized to edit this content"));
        }

        // Replies have no title
        let title = title.filter(|_| record.kind == ContentKind::Post);
        if title.is_none() && body.is_none() {
            return Err(ModerationError::Validation(vec![FieldError::new(
                Field::Content,
                "Nothing to update",
            )]));
        }

        let now = self.clock.now();
        let result = self.gate.gate(title, body);
        let admission = self.admit(actor, Some(id), result, now)?;
        let decision = admission.decision;

        let mut revision = ContentRevision::from_admission(admission, now);
        if record.flagged_for_review && !revision.flagged_for_review {
            revision.flagged_for_review = true;
            revision.moderation_report = record.moderation_report;
        }

        let updated = self.store.revise_content(id, revision).await?;
        if decision == GateDecision::Flag {
            self.log_flagged(&updated, now);
        }
        info!(content_id = %id, edited_by = %actor.user_id, "Content revised");

        Ok(Submission {
            record: updated,
            decision,
        })
    }

    async fn react(
        &self,
        actor: &Actor,
        id: Uuid,
        kind: ReactionKind,
        intent: ReactionIntent,
        expected_version: Option<i64>,
    ) -> Result<ReactionUpdate> {
        let change = ReactionChange {
            content_id: id,
            kind,
            user_id: actor.user_id.clone(),
            intent,
            expected_version,
            now: self.clock.now(),
        };

        let outcome = self.store.transition_reaction(change).await.map_err(|e| {
            let err = ModerationError::from_ledger(e);
            if matches!(err, ModerationError::Conflict(_)) {
                warn!(user_id = %actor.user_id, content_id = %id, kind = %kind, "Stale reaction");
            }
            err
        })?;

        if let Some(author) = &outcome.author_profile {
            debug!(
                content_id = %id,
                author_id = %author.user_id(),
                points = author.points(),
                level = %author.level(),
                "Reaction charged to author"
            );
        }

        Ok(ReactionUpdate::from_outcome(id, kind, &outcome))
    }

    pub async fn toggle_thank(&self, actor: &Actor, id: Uuid) -> Result<ReactionUpdate> {
        self.react(actor, id, ReactionKind::Thank, ReactionIntent::Flip, None)
            .await
    }

    pub async fn set_thanked(
        &self,
        actor: &Actor,
        id: Uuid,
        thanked: bool,
        expected_version: Option<i64>,
    ) -> Result<ReactionUpdate> {
        self.react(
            actor,
            id,
            ReactionKind::Thank,
            ReactionIntent::Set(thanked),
            expected_version,
        )
        .await
    }

    pub async fn toggle_like(&self, actor: &Actor, id: Uuid) -> Result<ReactionUpdate> {
        self.react(actor, id, ReactionKind::Like, ReactionIntent::Flip, None)
            .await
    }

    pub async fn set_liked(
        &self,
        actor: &Actor,
        id: Uuid,
        liked: bool,
        expected_version: Option<i64>,
    ) -> Result<ReactionUpdate> {
        self.react(
            actor,
            id,
            ReactionKind::Like,
            ReactionIntent::Set(liked),
            expected_version,
        )
        .await
    }

    pub async fn toggle_solution(&self, actor: &Actor, id: Uuid) -> Result<SolutionUpdate> {
        if !actor.can_moderate() {
            return Err(ModerationError::forbidden("Not authorized to mark as solution"));
        }

        let outcome = self
            .store
            .toggle_solution(id, self.clock.now())
            .await
            .map_err(ModerationError::from_ledger)?;

        info!(
            content_id = %id,
            is_solution = outcome.is_solution,
            marked_by = %actor.user_id,
            "Solution flag changed"
        );
        Ok(SolutionUpdate {
            content_id: id,
            is_solution: outcome.is_solution,
        })
    }

    async fn require_post(&self, id: Uuid) -> Result<ContentRecord> {
        self.store
            .get_content(id)
            .await?
            .filter(|record| record.kind == ContentKind::Post)
            .ok_or_else(|| ModerationError::not_found(format!("post {}", id)))
    }

    pub async fn read_post(&self, id: Uuid) -> Result<PostThread> {
        let post = self.require_post(id).await?;
        let replies = self.store.replies(id).await?;
        Ok(PostThread { post, replies })
    }

    pub async fn set_locked(&self, actor: &Actor, id: Uuid, locked: bool) -> Result<ContentRecord> {
        if !actor.can_moderate() {
            return Err(ModerationError::forbidden("Not authorized to lock posts"));
        }

        let record = self
            .store
            .set_locked(id, locked, self.clock.now())
            .await
            .map_err(ModerationError::from_ledger)?;
        info!(content_id = %id, is_locked = locked, changed_by = %actor.user_id, "Post lock changed");
        Ok(record)
    }

    /// Removes a post and its replies. Thanks on everything removed are
    /// retracted from the authors in the same store call.
    pub async fn delete_post(&self, actor: &Actor, id: Uuid) -> Result<ContentRemoval> {
        if !actor.can_moderate() {
            return Err(ModerationError::forbidden("Not authorized to delete content"));
        }
        self.require_post(id).await?;
        self.remove(actor, id).await
    }

    pub async fn delete_reply(
        &self,
        actor: &Actor,
        post_id: Uuid,
        reply_id: Uuid,
    ) -> Result<ContentRemoval> {
        if !actor.can_moderate() {
            return Err(ModerationError::forbidden("Not authorized to delete content"));
        }
        self.store
            .get_content(reply_id)
            .await?
            .filter(|record| record.parent_id == Some(post_id))
            .ok_or_else(|| ModerationError::not_found(format!("reply {}", reply_id)))?;
        self.remove(actor, reply_id).await
    }

    async fn remove(&self, actor: &Actor, id: Uuid) -> Result<ContentRemoval> {
        let outcome = self
            .store
            .delete_content(id, self.clock.now())
            .await
            .map_err(ModerationError::from_ledger)?;

        for author in &outcome.charged_authors {
            debug!(
                author_id = %author.user_id(),
                points = author.points(),
                level = %author.level(),
                "Thanks retracted from author"
            );
        }
        info!(
            content_id = %id,
            removed = outcome.removed.len(),
            retracted_thanks = outcome.retracted_thanks,
            deleted_by = %actor.user_id,
            "Content deleted"
        );

        Ok(ContentRemoval {
            content_id: id,
            removed: outcome.removed.len(),
            retracted_thanks: outcome.retracted_thanks,
        })
    }

    pub async fn approve(&self, actor: &Actor, id: Uuid) -> Result<ContentRecord> {
        if !actor.can_moderate() {
            return Err(ModerationError::forbidden("Not authorized to approve content"));
        }

        let record = self.store.clear_review_flag(id, self.clock.now()).await?;
        info!(content_id = %id, approved_by = %actor.user_id, "Content approved");
        Ok(record)
    }

    /// Flagged content, newest first.
    pub async fn review_queue(&self, actor: &Actor, limit: Option<usize>) -> Result<Vec<ContentRecord>> {
        if !actor.can_moderate() {
            return Err(ModerationError::forbidden("Not authorized to view flagged content"));
        }
        let limit = limit.unwrap_or(DEFAULT_REVIEW_LIMIT);
        Ok(self.store.flagged_content(limit).await?)
    }
}

fn content_required() -> ModerationError {
    ModerationError::Validation(vec![FieldError::new(Field::Content, "Content is required")])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::database::InMemoryStore;
    use crate::forum::Role;
    use crate::moderation::{Blocklist, GateLimits, ThrottleConfig};
    use crate::reputation::Level;
    use chrono::{Duration, TimeZone};

    const TITLE: &str = "Where to find good bread";
    const BODY: &str = "Looking for a bakery near the old town square.";

    fn service() -> (ForumService, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 5, 10, 9, 0, 0).unwrap(),
        ));
        let gate = ModerationGate::new(
            Blocklist::new(["heck", "blast", "drat"]).unwrap(),
            GateLimits::default(),
        );
        let service = ForumService::new(
            Arc::new(InMemoryStore::new()),
            clock.clone(),
            gate,
            SubmissionThrottle::new(ThrottleConfig::default()),
        );
        (service, clock)
    }

    fn moderator() -> Actor {
        Actor::new("mod_1", Role::Moderator)
    }

    #[tokio::test]
    async fn test_create_post_awards_author() {
        let (service, _) = service();
        let author = Actor::member("alice");

        let submission = service.create_post(&author, TITLE, BODY).await.unwrap();
        assert_eq!(submission.decision, GateDecision::Accept);
        assert!(!submission.record.flagged_for_review);

        let profile = service.profile("alice").await.unwrap();
        assert_eq!(profile.points(), 5);
        assert_eq!(profile.posts_created(), 1);
    }

    #[tokio::test]
    async fn test_flagged_post_is_sanitized_and_queued() {
        let (service, _) = service();
        let author = Actor::member("alice");

        let submission = service
            .create_post(&author, TITLE, "What the heck is this bakery doing?")
            .await
            .unwrap();
        assert_eq!(submission.decision, GateDecision::Flag);
        assert_eq!(submission.record.body, "What the h*** is this bakery doing?");
        assert!(submission.record.flagged_for_review);
        assert!(submission.record.moderation_report.is_some());

        let queue = service.review_queue(&moderator(), None).await.unwrap();
        assert_eq!(queue.len(), 1);
        assert_eq!(queue[0].id, submission.record.id);
    }

    #[tokio::test]
    async fn test_blocked_post_is_not_stored() {
        let (service, _) = service();
        let author = Actor::member("alice");

        let err = service
            .create_post(&author, TITLE, "heck blast drat, this whole place is a mess")
            .await
            .unwrap_err();
        assert!(matches!(err, ModerationError::Blocked));
        assert!(service.profile("alice").await.is_err());
    }

    #[tokio::test]
    async fn test_validation_errors_cover_both_fields() {
        let (service, _) = service();
        let err = service
            .create_post(&Actor::member("alice"), "Hi", "short")
            .await
            .unwrap_err();
        match err {
            ModerationError::Validation(errors) => {
                assert_eq!(errors.len(), 2);
                assert_eq!(errors[0].field, Field::Title);
                assert_eq!(errors[1].field, Field::Content);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_eleventh_post_is_throttled() {
        let (service, clock) = service();
        let author = Actor::member("alice");

        for _ in 0..10 {
            service.create_post(&author, TITLE, BODY).await.unwrap();
            clock.advance(Duration::seconds(30));
        }
        let err = service.create_post(&author, TITLE, BODY).await.unwrap_err();
        assert!(matches!(err, ModerationError::RateLimited { .. }));

        clock.advance(Duration::minutes(10));
        service.create_post(&author, TITLE, BODY).await.unwrap();
    }

    #[tokio::test]
    async fn test_reply_requires_post_parent() {
        let (service, _) = service();
        let author = Actor::member("alice");
        let post = service.create_post(&author, TITLE, BODY).await.unwrap();

        let reply = service
            .add_reply(&Actor::member("bob"), post.record.id, "Try the corner shop.")
            .await
            .unwrap();
        assert_eq!(reply.record.parent_id, Some(post.record.id));

        let err = service
            .add_reply(&author, reply.record.id, "Replying to a reply here.")
            .await
            .unwrap_err();
        assert!(matches!(err, ModerationError::NotFound(_)));

        // Replies do not touch the ledger
        assert_eq!(service.profile("alice").await.unwrap().points(), 5);
        assert!(service.profile("bob").await.is_err());
    }

    #[tokio::test]
    async fn test_thank_round_trip_restores_points() {
        let (service, _) = service();
        let post = service
            .create_post(&Actor::member("alice"), TITLE, BODY)
            .await
            .unwrap();
        let fan = Actor::member("bob");

        let added = service.toggle_thank(&fan, post.record.id).await.unwrap();
        assert!(added.present);
        assert_eq!(service.profile("alice").await.unwrap().points(), 7);

        let removed = service.toggle_thank(&fan, post.record.id).await.unwrap();
        assert!(!removed.present);
        assert_eq!(removed.count, 0);
        let profile = service.profile("alice").await.unwrap();
        assert_eq!(profile.points(), 5);
        assert_eq!(profile.thanks_received(), 0);
    }

    #[tokio::test]
    async fn test_set_thanked_is_idempotent() {
        let (service, _) = service();
        let post = service
            .create_post(&Actor::member("alice"), TITLE, BODY)
            .await
            .unwrap();
        let fan = Actor::member("bob");

        let first = service.set_thanked(&fan, post.record.id, true, None).await.unwrap();
        let second = service.set_thanked(&fan, post.record.id, true, None).await.unwrap();
        assert!(first.changed);
        assert!(!second.changed);
        assert_eq!(second.count, 1);
        assert_eq!(service.profile("alice").await.unwrap().thanks_received(), 1);
    }

    #[tokio::test]
    async fn test_stale_version_conflicts() {
        let (service, _) = service();
        let post = service
            .create_post(&Actor::member("alice"), TITLE, BODY)
            .await
            .unwrap();
        let fan = Actor::member("bob");

        let update = service.set_thanked(&fan, post.record.id, true, Some(0)).await.unwrap();
        assert_eq!(update.version, 1);

        let err = service
            .set_thanked(&fan, post.record.id, false, Some(0))
            .await
            .unwrap_err();
        assert!(matches!(err, ModerationError::Conflict(_)));
        assert_eq!(service.profile("alice").await.unwrap().thanks_received(), 1);
    }

    #[tokio::test]
    async fn test_like_has_no_ledger_effect() {
        let (service, _) = service();
        let post = service
            .create_post(&Actor::member("alice"), TITLE, BODY)
            .await
            .unwrap();

        let update = service
            .toggle_like(&Actor::member("bob"), post.record.id)
            .await
            .unwrap();
        assert_eq!(update.count, 1);
        assert_eq!(service.profile("alice").await.unwrap().points(), 5);
    }

    #[tokio::test]
    async fn test_solution_requires_moderator_and_keeps_award() {
        let (service, _) = service();
        let author = Actor::member("alice");
        let post = service.create_post(&author, TITLE, BODY).await.unwrap();

        let err = service.toggle_solution(&author, post.record.id).await.unwrap_err();
        assert!(matches!(err, ModerationError::Forbidden(_)));

        let marked = service.toggle_solution(&moderator(), post.record.id).await.unwrap();
        assert!(marked.is_solution);
        let unmarked = service.toggle_solution(&moderator(), post.record.id).await.unwrap();
        assert!(!unmarked.is_solution);

        let profile = service.profile("alice").await.unwrap();
        assert_eq!(profile.points(), 15);
        assert_eq!(profile.solutions_provided(), 1);
        assert_eq!(profile.level(), Level::Member);
    }

    #[tokio::test]
    async fn test_revise_permissions_and_flag_retention() {
        let (service, _) = service();
        let author = Actor::member("alice");
        let post = service
            .create_post(&author, TITLE, "Is the heck bakery still open?")
            .await
            .unwrap();

        let err = service
            .revise(&Actor::member("bob"), post.record.id, None, Some(BODY))
            .await
            .unwrap_err();
        assert!(matches!(err, ModerationError::Forbidden(_)));

        let revised = service
            .revise(&author, post.record.id, None, Some(BODY))
            .await
            .unwrap();
        assert_eq!(revised.decision, GateDecision::Accept);
        assert_eq!(revised.record.body, BODY);
        assert!(revised.record.flagged_for_review);

        let approved = service.approve(&moderator(), post.record.id).await.unwrap();
        assert!(!approved.flagged_for_review);
        assert!(approved.moderation_report.is_none());
    }

    #[tokio::test]
    async fn test_locked_post_refuses_replies() {
        let (service, _) = service();
        let post = service
            .create_post(&Actor::member("alice"), TITLE, BODY)
            .await
            .unwrap();
        let helper = Actor::member("bob");

        let err = service
            .set_locked(&helper, post.record.id, true)
            .await
            .unwrap_err();
        assert!(matches!(err, ModerationError::Forbidden(_)));

        let locked = service.set_locked(&moderator(), post.record.id, true).await.unwrap();
        assert!(locked.is_locked);

        let err = service
            .add_reply(&helper, post.record.id, "Try the corner shop.")
            .await
            .unwrap_err();
        match err {
            ModerationError::Forbidden(message) => assert_eq!(message, "This post is locked"),
            other => panic!("unexpected error: {other:?}"),
        }

        service.set_locked(&moderator(), post.record.id, false).await.unwrap();
        service
            .add_reply(&helper, post.record.id, "Try the corner shop.")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_delete_post_retracts_thanks_from_all_authors() {
        let (service, _) = service();
        let post = service
            .create_post(&Actor::member("alice"), TITLE, BODY)
            .await
            .unwrap();
        service.register_member("bob").await.unwrap();
        let reply = service
            .add_reply(&Actor::member("bob"), post.record.id, "Try the corner shop.")
            .await
            .unwrap();

        let fan = Actor::member("carol");
        service.toggle_thank(&fan, post.record.id).await.unwrap();
        service.toggle_thank(&fan, reply.record.id).await.unwrap();
        assert_eq!(service.profile("alice").await.unwrap().points(), 7);
        assert_eq!(service.profile("bob").await.unwrap().points(), 2);

        let err = service.delete_post(&fan, post.record.id).await.unwrap_err();
        assert!(matches!(err, ModerationError::Forbidden(_)));

        let removal = service.delete_post(&moderator(), post.record.id).await.unwrap();
        assert_eq!(removal.removed, 2);
        assert_eq!(removal.retracted_thanks, 2);

        // PostCreated stays; only thanks are retracted
        let alice = service.profile("alice").await.unwrap();
        assert_eq!(alice.points(), 5);
        assert_eq!(alice.thanks_received(), 0);
        let bob = service.profile("bob").await.unwrap();
        assert_eq!(bob.points(), 0);
        assert_eq!(bob.thanks_received(), 0);

        let err = service.read_post(post.record.id).await.unwrap_err();
        assert!(matches!(err, ModerationError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_delete_reply_checks_parent() {
        let (service, _) = service();
        let author = Actor::member("alice");
        let first = service.create_post(&author, TITLE, BODY).await.unwrap();
        let second = service.create_post(&author, TITLE, BODY).await.unwrap();
        let reply = service
            .add_reply(&Actor::member("bob"), first.record.id, "Try the corner shop.")
            .await
            .unwrap();

        let err = service
            .delete_reply(&moderator(), second.record.id, reply.record.id)
            .await
            .unwrap_err();
        assert!(matches!(err, ModerationError::NotFound(_)));

        // A post id is not a reply
        let err = service
            .delete_reply(&moderator(), first.record.id, second.record.id)
            .await
            .unwrap_err();
        assert!(matches!(err, ModerationError::NotFound(_)));

        let removal = service
            .delete_reply(&moderator(), first.record.id, reply.record.id)
            .await
            .unwrap();
        assert_eq!(removal.removed, 1);
        assert_eq!(removal.retracted_thanks, 0);
        assert!(service.read_post(first.record.id).await.unwrap().replies.is_empty());
    }

    #[tokio::test]
    async fn test_read_post_lists_replies_oldest_first() {
        let (service, clock) = service();
        let post = service
            .create_post(&Actor::member("alice"), TITLE, BODY)
            .await
            .unwrap();

        let mut ids = Vec::new();
        for user in ["bob", "carol", "dave"] {
            clock.advance(Duration::seconds(5));
            let reply = service
                .add_reply(&Actor::member(user), post.record.id, "Try the corner shop.")
                .await
                .unwrap();
            ids.push(reply.record.id);
        }

        let thread = service.read_post(post.record.id).await.unwrap();
        assert_eq!(thread.post.id, post.record.id);
        let reply_ids: Vec<Uuid> = thread.replies.iter().map(|r| r.id).collect();
        assert_eq!(reply_ids, ids);

        let err = service.read_post(ids[0]).await.unwrap_err();
        assert!(matches!(err, ModerationError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_review_queue_is_moderator_only() {
        let (service, _) = service();
        let err = service
            .review_queue(&Actor::member("alice"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, ModerationError::Forbidden(_)));
    }
}
