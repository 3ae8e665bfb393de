//! Contribution Profile Types and Levels
//!
//! Points start at 0 and move with community actions. The level is derived
//! from points on every change and cannot be set on its own.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Reputation tier derived from points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Level {
    Newcomer,
    Member,
    Contributor,
    Expert,
    Champion,
}

impl Level {
    /// Minimum points per level, highest first.
    pub const THRESHOLDS: [(i64, Level); 4] = [
        (100, Level::Champion),
        (50, Level::Expert),
        (25, Level::Contributor),
        (10, Level::Member),
    ];

    pub fn for_points(points: i64) -> Self {
        Self::THRESHOLDS
            .iter()
            .find(|(min, _)| points >= *min)
            .map(|(_, level)| *level)
            .unwrap_or(Level::Newcomer)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Newcomer => "Newcomer",
            Level::Member => "Member",
            Level::Contributor => "Contributor",
            Level::Expert => "Expert",
            Level::Champion => "Champion",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Level {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Newcomer" => Ok(Level::Newcomer),
            "Member" => Ok(Level::Member),
            "Contributor" => Ok(Level::Contributor),
            "Expert" => Ok(Level::Expert),
            "Champion" => Ok(Level::Champion),
            other => Err(format!("Unknown level: {}", other)),
        }
    }
}

/// Shorthand for [`Level::for_points`].
pub fn level_for(points: i64) -> Level {
    Level::for_points(points)
}

/// A badge shown on a profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Badge {
    pub id: String,
    pub name: String,
    pub icon: String,
    pub earned_at: DateTime<Utc>,
}

impl Badge {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        icon: impl Into<String>,
        earned_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            icon: icon.into(),
            earned_at,
        }
    }
}

/// Named profile counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Counter {
    Points,
    PostsCreated,
    SolutionsProvided,
    EventsCreated,
    ThanksReceived,
    HelpfulAnswers,
}

impl Counter {
    pub const ALL: [Counter; 6] = [
        Counter::Points,
        Counter::PostsCreated,
        Counter::SolutionsProvided,
        Counter::EventsCreated,
        Counter::ThanksReceived,
        Counter::HelpfulAnswers,
    ];

    /// Column name in `community.profiles`.
    pub fn column(&self) -> &'static str {
        match self {
            Counter::Points => "points",
            Counter::PostsCreated => "posts_created",
            Counter::SolutionsProvided => "solutions_provided",
            Counter::EventsCreated => "events_created",
            Counter::ThanksReceived => "thanks_received",
            Counter::HelpfulAnswers => "helpful_answers",
        }
    }
}

/// Signed per-counter amounts applied in one atomic step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterDelta {
    pub points: i64,
    pub posts_created: i64,
    pub solutions_provided: i64,
    pub events_created: i64,
    pub thanks_received: i64,
    pub helpful_answers: i64,
}

impl CounterDelta {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, counter: Counter, amount: i64) -> Self {
        *self.slot(counter) += amount;
        self
    }

    pub fn get(&self, counter: Counter) -> i64 {
        match counter {
            Counter::Points => self.points,
            Counter::PostsCreated => self.posts_created,
            Counter::SolutionsProvided => self.solutions_provided,
            Counter::EventsCreated => self.events_created,
            Counter::ThanksReceived => self.thanks_received,
            Counter::HelpfulAnswers => self.helpful_answers,
        }
    }

    fn slot(&mut self, counter: Counter) -> &mut i64 {
        match counter {
            Counter::Points => &mut self.points,
            Counter::PostsCreated => &mut self.posts_created,
            Counter::SolutionsProvided => &mut self.solutions_provided,
            Counter::EventsCreated => &mut self.events_created,
            Counter::ThanksReceived => &mut self.thanks_received,
            Counter::HelpfulAnswers => &mut self.helpful_answers,
        }
    }

    pub fn negated(&self) -> Self {
        Counter::ALL
            .iter()
            .map(|c| (*c, -self.get(*c)))
            .collect()
    }

    /// The same delta applied `n` times.
    pub fn times(&self, n: i64) -> Self {
        Counter::ALL
            .iter()
            .map(|c| (*c, self.get(*c) * n))
            .collect()
    }

    pub fn is_zero(&self) -> bool {
        Counter::ALL.iter().all(|c| self.get(*c) == 0)
    }
}

impl FromIterator<(Counter, i64)> for CounterDelta {
    fn from_iter<I: IntoIterator<Item = (Counter, i64)>>(iter: I) -> Self {
        iter.into_iter()
            .fold(CounterDelta::new(), |delta, (counter, amount)| {
                delta.with(counter, amount)
            })
    }
}

/// Community actions with a standard ledger effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContributionEvent {
    PostCreated,
    ThankReceived,
    ThankRetracted,
    SolutionMarked,
}

impl ContributionEvent {
    pub fn delta(&self) -> CounterDelta {
        match self {
            ContributionEvent::PostCreated => CounterDelta::new()
                .with(Counter::Points, 5)
                .with(Counter::PostsCreated, 1),
            ContributionEvent::ThankReceived => CounterDelta::new()
                .with(Counter::Points, 2)
                .with(Counter::ThanksReceived, 1),
            ContributionEvent::ThankRetracted => CounterDelta::new()
                .with(Counter::Points, -2)
                .with(Counter::ThanksReceived, -1),
            ContributionEvent::SolutionMarked => CounterDelta::new()
                .with(Counter::Points, 10)
                .with(Counter::SolutionsProvided, 1),
        }
    }

    /// Whether the event refreshes `last_contribution`.
    ///
    /// Only creation-type events do; a retracted thank leaves it alone.
    pub fn touches_contribution(&self) -> bool {
        !matches!(self, ContributionEvent::ThankRetracted)
    }
}

/// Per-user reputation record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContributionProfile {
    user_id: String,
    points: i64,
    posts_created: i64,
    solutions_provided: i64,
    events_created: i64,
    thanks_received: i64,
    helpful_answers: i64,
    badges: Vec<Badge>,
    level: Level,
    last_contribution: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ContributionProfile {
    /// Zeroed Newcomer profile.
    pub fn new(user_id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            user_id: user_id.into(),
            points: 0,
            posts_created: 0,
            solutions_provided: 0,
            events_created: 0,
            thanks_received: 0,
            helpful_answers: 0,
            badges: Vec::new(),
            level: Level::Newcomer,
            last_contribution: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Rebuilds a profile from stored counters. The level is recomputed.
    pub(crate) fn from_stored(
        user_id: String,
        counters: CounterDelta,
        badges: Vec<Badge>,
        last_contribution: Option<DateTime<Utc>>,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id,
            points: counters.points,
            posts_created: counters.posts_created,
            solutions_provided: counters.solutions_provided,
            events_created: counters.events_created,
            thanks_received: counters.thanks_received,
            helpful_answers: counters.helpful_answers,
            badges,
            level: Level::for_points(counters.points),
            last_contribution,
            created_at,
            updated_at,
        }
    }

    /// Adds `delta` to every counter and re-derives the level.
    pub(crate) fn apply(
        &mut self,
        delta: &CounterDelta,
        touched_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) {
        self.points += delta.points;
        self.posts_created += delta.posts_created;
        self.solutions_provided += delta.solutions_provided;
        self.events_created += delta.events_created;
        self.thanks_received += delta.thanks_received;
        self.helpful_answers += delta.helpful_answers;
        self.level = Level::for_points(self.points);
        if let Some(at) = touched_at {
            self.last_contribution = Some(at);
        }
        self.updated_at = now;
    }

    /// Adds a badge unless one with the same id is already present.
    pub(crate) fn add_badge(&mut self, badge: Badge) -> bool {
        if self.has_badge(&badge.id) {
            return false;
        }
        self.badges.push(badge);
        true
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn points(&self) -> i64 {
        self.points
    }

    pub fn counter(&self, counter: Counter) -> i64 {
        match counter {
            Counter::Points => self.points,
            Counter::PostsCreated => self.posts_created,
            Counter::SolutionsProvided => self.solutions_provided,
            Counter::EventsCreated => self.events_created,
            Counter::ThanksReceived => self.thanks_received,
            Counter::HelpfulAnswers => self.helpful_answers,
        }
    }

    pub fn posts_created(&self) -> i64 {
        self.posts_created
    }

    pub fn solutions_provided(&self) -> i64 {
        self.solutions_provided
    }

    pub fn thanks_received(&self) -> i64 {
        self.thanks_received
    }

    pub fn badges(&self) -> &[Badge] {
        &self.badges
    }

    pub fn has_badge(&self, id: &str) -> bool {
        self.badges.iter().any(|b| b.id == id)
    }

    pub fn level(&self) -> Level {
        self.level
    }

    pub fn last_contribution(&self) -> Option<DateTime<Utc>> {
        self.last_contribution
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}
