//! Submission throttling
//!
//! Advisory, single-node frequency check over a user's recent submissions.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::database::CommunityStore;
use crate::error::{ModerationError, Result};

pub const DEFAULT_WINDOW_SECS: u64 = 10 * 60;
pub const DEFAULT_MAX_SUBMISSIONS: usize = 10;

/// True if at least `DEFAULT_MAX_SUBMISSIONS` timestamps fall strictly after
/// `now - 10 min` (and not after `now`).
pub fn should_throttle(recent: &[DateTime<Utc>], now: DateTime<Utc>) -> bool {
    ThrottleConfig::default().should_throttle(recent, now)
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ThrottleConfig {
    pub window_secs: u64,
    pub max_submissions: usize,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            window_secs: DEFAULT_WINDOW_SECS,
            max_submissions: DEFAULT_MAX_SUBMISSIONS,
        }
    }
}

impl ThrottleConfig {
    pub fn window(&self) -> Duration {
        Duration::seconds(self.window_secs as i64)
    }

    fn in_window<'a>(
        &self,
        recent: &'a [DateTime<Utc>],
        now: DateTime<Utc>,
    ) -> impl Iterator<Item = &'a DateTime<Utc>> + 'a {
        let start = now - self.window();
        recent.iter().filter(move |t| **t > start && **t <= now)
    }

    pub fn should_throttle(&self, recent: &[DateTime<Utc>], now: DateTime<Utc>) -> bool {
        self.in_window(recent, now).count() >= self.max_submissions
    }

    /// Seconds until the oldest in-window submission leaves the window.
    pub fn retry_after(&self, recent: &[DateTime<Utc>], now: DateTime<Utc>) -> u64 {
        self.in_window(recent, now)
            .min()
            .map(|oldest| (*oldest + self.window() - now).num_seconds().max(0) as u64)
            .unwrap_or(0)
    }
}

/// Applies [`ThrottleConfig`] to submissions recorded in a store.
#[derive(Debug, Clone, Copy, Default)]
pub struct SubmissionThrottle {
    config: ThrottleConfig,
}

impl SubmissionThrottle {
    pub fn new(config: ThrottleConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ThrottleConfig {
        &self.config
    }

    pub async fn check(
        &self,
        store: &dyn CommunityStore,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let since = now - self.config.window();
        let recent = store.recent_submission_times(user_id, since).await?;

        if self.config.should_throttle(&recent, now) {
            let retry_after_secs = self.config.retry_after(&recent, now);
            warn!(
                user_id = %user_id,
                submissions = recent.len(),
                retry_after_secs,
                "Submission throttled"
            );
            return Err(ModerationError::RateLimited { retry_after_secs });
        }

        Ok(())
    }
}
