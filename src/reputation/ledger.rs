//! Reputation Ledger - per-user contribution counters
//!
//! All counter changes go through the store's increment-and-fetch, so the
//! ledger never writes a value it computed from an earlier read.

use std::sync::Arc;
use tracing::{debug, info};

use crate::clock::Clock;
use crate::database::CommunityStore;
use crate::error::{ModerationError, Result};
use crate::reputation::{Badge, ContributionEvent, ContributionProfile, CounterDelta};

/// Unmarking a solution keeps the points and counter it awarded.
pub const REVOKE_SOLUTION_AWARD_ON_UNMARK: bool = false;

#[derive(Clone)]
pub struct ReputationLedger {
    store: Arc<dyn CommunityStore>,
    clock: Arc<dyn Clock>,
}

impl ReputationLedger {
    pub fn new(store: Arc<dyn CommunityStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Create a zeroed Newcomer profile, or return the existing one
    pub async fn register(&self, user_id: &str) -> Result<ContributionProfile> {
        let profile = self.store.create_profile(user_id, self.clock.now()).await?;
        debug!(user_id = %user_id, points = profile.points(), "Profile registered");
        Ok(profile)
    }

    pub async fn profile(&self, user_id: &str) -> Result<ContributionProfile> {
        self.store
            .get_profile(user_id)
            .await?
            .ok_or_else(|| ModerationError::not_found(format!("user {}", user_id)))
    }

    /// Apply a signed delta and return the profile after the increment.
    pub async fn apply_delta(
        &self,
        user_id: &str,
        delta: &CounterDelta,
        touches_contribution: bool,
    ) -> Result<ContributionProfile> {
        let now = self.clock.now();
        let touched_at = touches_contribution.then_some(now);

        let profile = self
            .store
            .apply_delta(user_id, delta, touched_at, now)
            .await
            .map_err(ModerationError::from_ledger)?;

        debug!(
            user_id = %user_id,
            delta_points = delta.points,
            points = profile.points(),
            level = %profile.level(),
            "Ledger delta applied"
        );
        Ok(profile)
    }

    pub async fn record(&self, user_id: &str, event: ContributionEvent) -> Result<ContributionProfile> {
        self.apply_delta(user_id, &event.delta(), event.touches_contribution())
            .await
    }

    /// Idempotent by badge id. Points and level are left alone.
    pub async fn award_badge(&self, user_id: &str, badge: Badge) -> Result<ContributionProfile> {
        let badge_id = badge.id.clone();
        let profile = self
            .store
            .award_badge(user_id, badge, self.clock.now())
            .await
            .map_err(ModerationError::from_ledger)?;
        info!(user_id = %user_id, badge = %badge_id, "Badge granted");
        Ok(profile)
    }
}
