//! Forum content records as seen by the moderation and reputation core.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::moderation::{Admission, Verdict};
use crate::reputation::{ReactionKind, ReactionSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Post,
    Reply,
}

impl ContentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Post => "post",
            ContentKind::Reply => "reply",
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "post" => Ok(ContentKind::Post),
            "reply" => Ok(ContentKind::Reply),
            other => Err(format!("Unknown content kind: {}", other)),
        }
    }
}

/// A stored post or reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentRecord {
    pub id: Uuid,
    pub kind: ContentKind,
    pub parent_id: Option<Uuid>,
    pub author_id: String,
    pub title: Option<String>,
    pub body: String,
    pub is_solution: bool,
    /// Locked posts accept no new replies
    pub is_locked: bool,
    pub flagged_for_review: bool,
    pub moderation_report: Option<Verdict>,
    pub liked_by: ReactionSet,
    pub thanked_by: ReactionSet,
    /// Bumped on every membership change to either reaction set
    pub reaction_version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ContentRecord {
    pub fn reactions(&self, kind: ReactionKind) -> &ReactionSet {
        match kind {
            ReactionKind::Like => &self.liked_by,
            ReactionKind::Thank => &self.thanked_by,
        }
    }

    pub fn reactions_mut(&mut self, kind: ReactionKind) -> &mut ReactionSet {
        match kind {
            ReactionKind::Like => &mut self.liked_by,
            ReactionKind::Thank => &mut self.thanked_by,
        }
    }
}

/// A submission cleared by the gate, ready to insert.
#[derive(Debug, Clone)]
pub struct NewContent {
    pub id: Uuid,
    pub kind: ContentKind,
    pub parent_id: Option<Uuid>,
    pub author_id: String,
    pub title: Option<String>,
    pub body: String,
    pub flagged_for_review: bool,
    pub moderation_report: Option<Verdict>,
    pub created_at: DateTime<Utc>,
}

impl NewContent {
    /// Builds a post or reply from sanitized fields.
    ///
    /// Returns `None` when the admission carries no body.
    pub fn from_admission(
        kind: ContentKind,
        parent_id: Option<Uuid>,
        author_id: &str,
        admission: Admission,
        created_at: DateTime<Utc>,
    ) -> Option<Self> {
        Some(Self {
            id: Uuid::new_v4(),
            kind,
            parent_id,
            author_id: author_id.to_string(),
            title: admission.title,
            body: admission.content?,
            flagged_for_review: admission.flagged_for_review,
            moderation_report: admission.moderation_report,
            created_at,
        })
    }

    pub fn into_record(self) -> ContentRecord {
        ContentRecord {
            id: self.id,
            kind: self.kind,
            parent_id: self.parent_id,
            author_id: self.author_id,
            title: self.title,
            body: self.body,
            is_solution: false,
            is_locked: false,
            flagged_for_review: self.flagged_for_review,
            moderation_report: self.moderation_report,
            liked_by: ReactionSet::new(),
            thanked_by: ReactionSet::new(),
            reaction_version: 0,
            created_at: self.created_at,
            updated_at: self.created_at,
        }
    }
}

/// An edit that passed the gate. `None` fields keep their stored value.
#[derive(Debug, Clone)]
pub struct ContentRevision {
    pub title: Option<String>,
    pub body: Option<String>,
    pub flagged_for_review: bool,
    pub moderation_report: Option<Verdict>,
    pub updated_at: DateTime<Utc>,
}

impl ContentRevision {
    pub fn from_admission(admission: Admission, updated_at: DateTime<Utc>) -> Self {
        Self {
            title: admission.title,
            body: admission.content,
            flagged_for_review: admission.flagged_for_review,
            moderation_report: admission.moderation_report,
            updated_at,
        }
    }

    pub(crate) fn apply_to(self, record: &mut ContentRecord) {
        if let Some(title) = self.title {
            record.title = Some(title);
        }
        if let Some(body) = self.body {
            record.body = body;
        }
        record.flagged_for_review = self.flagged_for_review;
        record.moderation_report = self.moderation_report;
        record.updated_at = self.updated_at;
    }
}
