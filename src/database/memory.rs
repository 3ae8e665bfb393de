//! In-memory community store
//!
//! Single-node store for tests and development. Every mutation runs under one
//! write lock, so multi-part changes (content + ledger) are atomic and a
//! failed check leaves nothing behind.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::database::store::{
    reaction_charge, solution_charge, thanks_retraction, CommunityStore, DeletionOutcome,
    LedgerCharge, ReactionChange, ReactionOutcome, SolutionOutcome, StoreResult,
};
use crate::error::StoreError;
use crate::forum::{ContentKind, ContentRecord, ContentRevision, NewContent};
use crate::reputation::{Badge, ContributionProfile, CounterDelta};

#[derive(Debug, Default)]
struct MemoryState {
    profiles: HashMap<String, ContributionProfile>,
    content: HashMap<Uuid, ContentRecord>,
}

fn charge_profile<'a>(
    profiles: &'a mut HashMap<String, ContributionProfile>,
    user_id: &str,
    charge: &LedgerCharge,
    now: DateTime<Utc>,
) -> StoreResult<&'a ContributionProfile> {
    let profile = profiles
        .get_mut(user_id)
        .ok_or_else(|| StoreError::ProfileNotFound(user_id.to_string()))?;
    profile.apply(&charge.delta, charge.touched_at, now);
    Ok(profile)
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    state: Arc<RwLock<MemoryState>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CommunityStore for InMemoryStore {
    async fn create_profile(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<ContributionProfile> {
        let mut state = self.state.write().await;
        let profile = state
            .profiles
            .entry(user_id.to_string())
            .or_insert_with(|| ContributionProfile::new(user_id, now));
        Ok(profile.clone())
    }

    async fn get_profile(&self, user_id: &str) -> StoreResult<Option<ContributionProfile>> {
        let state = self.state.read().await;
        Ok(state.profiles.get(user_id).cloned())
    }

    async fn apply_delta(
        &self,
        user_id: &str,
        delta: &CounterDelta,
        touched_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> StoreResult<ContributionProfile> {
        let mut state = self.state.write().await;
        let charge = LedgerCharge::new(*delta, touched_at);
        charge_profile(&mut state.profiles, user_id, &charge, now).cloned()
    }

    async fn award_badge(
        &self,
        user_id: &str,
        badge: Badge,
        now: DateTime<Utc>,
    ) -> StoreResult<ContributionProfile> {
        let mut state = self.state.write().await;
        let profile = state
            .profiles
            .get_mut(user_id)
            .ok_or_else(|| StoreError::ProfileNotFound(user_id.to_string()))?;
        if profile.add_badge(badge) {
            profile.apply(&CounterDelta::new(), None, now);
        }
        Ok(profile.clone())
    }

    async fn insert_content(
        &self,
        content: NewContent,
        charge: Option<LedgerCharge>,
    ) -> StoreResult<ContentRecord> {
        let mut state = self.state.write().await;
        let MemoryState { profiles, content: items } = &mut *state;

        if let Some(parent_id) = content.parent_id {
            if !items.contains_key(&parent_id) {
                return Err(StoreError::ContentNotFound(parent_id));
            }
        }

        if let Some(charge) = charge {
            charge_profile(profiles, &content.author_id, &charge, content.created_at)?;
        }

        let record = content.into_record();
        items.insert(record.id, record.clone());
        debug!(content_id = %record.id, kind = %record.kind, "Stored content");
        Ok(record)
    }

    async fn get_content(&self, id: Uuid) -> StoreResult<Option<ContentRecord>> {
        let state = self.state.read().await;
        Ok(state.content.get(&id).cloned())
    }

    async fn revise_content(
        &self,
        id: Uuid,
        revision: ContentRevision,
    ) -> StoreResult<ContentRecord> {
        let mut state = self.state.write().await;
        let record = state
            .content
            .get_mut(&id)
            .ok_or(StoreError::ContentNotFound(id))?;
        revision.apply_to(record);
        Ok(record.clone())
    }

    async fn transition_reaction(&self, change: ReactionChange) -> StoreResult<ReactionOutcome> {
        let mut state = self.state.write().await;
        let MemoryState { profiles, content } = &mut *state;

        let record = content
            .get_mut(&change.content_id)
            .ok_or(StoreError::ContentNotFound(change.content_id))?;

        if let Some(expected) = change.expected_version {
            if expected != record.reaction_version {
                return Err(StoreError::VersionConflict {
                    expected,
                    actual: record.reaction_version,
                });
            }
        }

        let currently_present = record.reactions(change.kind).contains(&change.user_id);
        let target = change.intent.target(currently_present);
        let charge = if target != currently_present {
            reaction_charge(change.kind, target, change.now)
        } else {
            None
        };

        // Charge first: a missing author profile must leave membership as is
        let author_profile = match charge {
            Some(charge) => Some(
                charge_profile(profiles, &record.author_id, &charge, change.now)?.clone(),
            ),
            None => None,
        };

        let (present, changed, count) = change
            .intent
            .apply(record.reactions_mut(change.kind), &change.user_id);
        if changed {
            record.reaction_version += 1;
        }

        Ok(ReactionOutcome {
            present,
            changed,
            count,
            version: record.reaction_version,
            author_profile,
        })
    }

    async fn toggle_solution(&self, id: Uuid, now: DateTime<Utc>) -> StoreResult<SolutionOutcome> {
        let mut state = self.state.write().await;
        let MemoryState { profiles, content } = &mut *state;

        let record = content.get_mut(&id).ok_or(StoreError::ContentNotFound(id))?;
        let is_solution = !record.is_solution;

        let author_profile = match solution_charge(is_solution, now) {
            Some(charge) => {
                Some(charge_profile(profiles, &record.author_id, &charge, now)?.clone())
            }
            None => None,
        };

        record.is_solution = is_solution;
        record.updated_at = now;

        Ok(SolutionOutcome {
            is_solution,
            author_profile,
        })
    }

    async fn set_locked(
        &self,
        id: Uuid,
        locked: bool,
        now: DateTime<Utc>,
    ) -> StoreResult<ContentRecord> {
        let mut state = self.state.write().await;
        let record = state
            .content
            .get_mut(&id)
            .filter(|c| c.kind == ContentKind::Post)
            .ok_or(StoreError::ContentNotFound(id))?;
        record.is_locked = locked;
        record.updated_at = now;
        Ok(record.clone())
    }

    async fn replies(&self, post_id: Uuid) -> StoreResult<Vec<ContentRecord>> {
        let state = self.state.read().await;
        let mut replies: Vec<ContentRecord> = state
            .content
            .values()
            .filter(|c| c.parent_id == Some(post_id))
            .cloned()
            .collect();
        replies.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(replies)
    }

    async fn delete_content(&self, id: Uuid, now: DateTime<Utc>) -> StoreResult<DeletionOutcome> {
        let mut state = self.state.write().await;
        let MemoryState { profiles, content: items } = &mut *state;

        if !items.contains_key(&id) {
            return Err(StoreError::ContentNotFound(id));
        }
        let mut removed = vec![id];
        removed.extend(
            items
                .values()
                .filter(|c| c.parent_id == Some(id))
                .map(|c| c.id),
        );

        let mut owed: BTreeMap<&str, usize> = BTreeMap::new();
        for record in removed.iter().filter_map(|rid| items.get(rid)) {
            if !record.thanked_by.is_empty() {
                *owed.entry(record.author_id.as_str()).or_default() += record.thanked_by.len();
            }
        }

        // Every author must exist before anything changes
        if let Some(missing) = owed.keys().find(|author| !profiles.contains_key(**author)) {
            return Err(StoreError::ProfileNotFound(missing.to_string()));
        }

        let retracted_thanks: usize = owed.values().sum();
        let mut charged_authors = Vec::with_capacity(owed.len());
        for (author, count) in &owed {
            if let Some(charge) = thanks_retraction(*count) {
                charged_authors.push(charge_profile(profiles, author, &charge, now)?.clone());
            }
        }

        for rid in &removed {
            items.remove(rid);
        }
        debug!(content_id = %id, removed = removed.len(), retracted_thanks, "Deleted content");

        Ok(DeletionOutcome {
            removed,
            retracted_thanks,
            charged_authors,
        })
    }

    async fn recent_submission_times(
        &self,
        user_id: &str,
        since: DateTime<Utc>,
    ) -> StoreResult<Vec<DateTime<Utc>>> {
        let state = self.state.read().await;
        Ok(state
            .content
            .values()
            .filter(|c| c.author_id == user_id && c.created_at > since)
            .map(|c| c.created_at)
            .collect())
    }

    async fn flagged_content(&self, limit: usize) -> StoreResult<Vec<ContentRecord>> {
        let state = self.state.read().await;
        let mut flagged: Vec<ContentRecord> = state
            .content
            .values()
            .filter(|c| c.flagged_for_review)
            .cloned()
            .collect();
        flagged.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        flagged.truncate(limit);
        Ok(flagged)
    }

    async fn clear_review_flag(&self, id: Uuid, now: DateTime<Utc>) -> StoreResult<ContentRecord> {
        let mut state = self.state.write().await;
        let record = state
            .content
            .get_mut(&id)
            .ok_or(StoreError::ContentNotFound(id))?;
        record.flagged_for_review = false;
        record.moderation_report = None;
        record.updated_at = now;
        Ok(record.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forum::ContentKind;
    use crate::reputation::{Counter, Level, ReactionIntent, ReactionKind};

    fn new_post(author: &str, now: DateTime<Utc>) -> NewContent {
        NewContent {
            id: Uuid::new_v4(),
            kind: ContentKind::Post,
            parent_id: None,
            author_id: author.to_string(),
            title: Some("Where to buy spices".to_string()),
            body: "Looking for a good grocery store.".to_string(),
            flagged_for_review: false,
            moderation_report: None,
            created_at: now,
        }
    }

    fn thank(content_id: Uuid, user: &str, now: DateTime<Utc>) -> ReactionChange {
        ReactionChange {
            content_id,
            kind: ReactionKind::Thank,
            user_id: user.to_string(),
            intent: ReactionIntent::Flip,
            expected_version: None,
            now,
        }
    }

    #[tokio::test]
    async fn test_create_profile_is_idempotent() {
        let store = InMemoryStore::new();
        let now = Utc::now();
        store.create_profile("alice", now).await.unwrap();
        store
            .apply_delta("alice", &CounterDelta::new().with(Counter::Points, 3), None, now)
            .await
            .unwrap();

        let again = store.create_profile("alice", now).await.unwrap();
        assert_eq!(again.points(), 3);
    }

    #[tokio::test]
    async fn test_apply_delta_requires_profile() {
        let store = InMemoryStore::new();
        let err = store
            .apply_delta("ghost", &CounterDelta::new(), None, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::ProfileNotFound(_)));
    }

    #[tokio::test]
    async fn test_thank_flip_charges_author() {
        let store = InMemoryStore::new();
        let now = Utc::now();
        store.create_profile("author", now).await.unwrap();
        store
            .apply_delta("author", &CounterDelta::new().with(Counter::Points, 9), None, now)
            .await
            .unwrap();
        let post = store.insert_content(new_post("author", now), None).await.unwrap();

        let outcome = store.transition_reaction(thank(post.id, "fan", now)).await.unwrap();
        assert!(outcome.present && outcome.changed);
        assert_eq!(outcome.count, 1);
        assert_eq!(outcome.version, 1);
        let author = outcome.author_profile.unwrap();
        assert_eq!(author.points(), 11);
        assert_eq!(author.level(), Level::Member);
        assert_eq!(author.last_contribution(), Some(now));
    }

    #[tokio::test]
    async fn test_missing_author_leaves_reactions_untouched() {
        let store = InMemoryStore::new();
        let now = Utc::now();
        let post = store.insert_content(new_post("nobody", now), None).await.unwrap();

        let err = store
            .transition_reaction(thank(post.id, "fan", now))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::ProfileNotFound(_)));

        let stored = store.get_content(post.id).await.unwrap().unwrap();
        assert!(stored.thanked_by.is_empty());
        assert_eq!(stored.reaction_version, 0);
    }

    fn new_reply(post_id: Uuid, author: &str, now: DateTime<Utc>) -> NewContent {
        let mut reply = new_post(author, now);
        reply.kind = ContentKind::Reply;
        reply.parent_id = Some(post_id);
        reply.title = None;
        reply
    }

    #[tokio::test]
    async fn test_delete_retracts_thanks_from_each_author() {
        let store = InMemoryStore::new();
        let now = Utc::now();
        for user in ["author", "helper"] {
            store.create_profile(user, now).await.unwrap();
        }
        let post = store.insert_content(new_post("author", now), None).await.unwrap();
        let reply = store
            .insert_content(new_reply(post.id, "helper", now), None)
            .await
            .unwrap();
        for fan in ["f1", "f2"] {
            store.transition_reaction(thank(post.id, fan, now)).await.unwrap();
        }
        store.transition_reaction(thank(reply.id, "f1", now)).await.unwrap();

        let outcome = store.delete_content(post.id, now).await.unwrap();
        assert_eq!(outcome.removed, vec![post.id, reply.id]);
        assert_eq!(outcome.retracted_thanks, 3);
        assert_eq!(outcome.charged_authors.len(), 2);

        let author = store.get_profile("author").await.unwrap().unwrap();
        assert_eq!((author.points(), author.thanks_received()), (0, 0));
        let helper = store.get_profile("helper").await.unwrap().unwrap();
        assert_eq!((helper.points(), helper.thanks_received()), (0, 0));
        assert!(store.get_content(reply.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_missing_content() {
        let store = InMemoryStore::new();
        let err = store.delete_content(Uuid::new_v4(), Utc::now()).await.unwrap_err();
        assert!(matches!(err, StoreError::ContentNotFound(_)));
    }

    #[tokio::test]
    async fn test_only_posts_lock() {
        let store = InMemoryStore::new();
        let now = Utc::now();
        let post = store.insert_content(new_post("author", now), None).await.unwrap();
        let reply = store
            .insert_content(new_reply(post.id, "author", now), None)
            .await
            .unwrap();

        assert!(store.set_locked(post.id, true, now).await.unwrap().is_locked);
        let err = store.set_locked(reply.id, true, now).await.unwrap_err();
        assert!(matches!(err, StoreError::ContentNotFound(_)));
    }

    #[tokio::test]
    async fn test_submission_window_excludes_its_start() {
        let store = InMemoryStore::new();
        let now = Utc::now();
        let since = now - chrono::Duration::minutes(10);
        store.insert_content(new_post("author", since), None).await.unwrap();
        store.insert_content(new_post("author", now), None).await.unwrap();

        let times = store.recent_submission_times("author", since).await.unwrap();
        assert_eq!(times, vec![now]);
    }

    #[tokio::test]
    async fn test_reply_requires_parent() {
        let store = InMemoryStore::new();
        let mut reply = new_post("author", Utc::now());
        reply.kind = ContentKind::Reply;
        reply.parent_id = Some(Uuid::new_v4());
        let err = store.insert_content(reply, None).await.unwrap_err();
        assert!(matches!(err, StoreError::ContentNotFound(_)));
    }
}
