//! Community Repository - PostgreSQL persistence for profiles and content
//!
//! Counter updates are single `UPDATE ... SET x = x + $n ... RETURNING`
//! statements whose level column is computed from the incremented points in
//! the same statement. Reaction and solution transitions lock the content row
//! and run in one transaction with the author's ledger update.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgRow};
use sqlx::{PgConnection, Row};
use std::collections::HashMap;
use std::sync::LazyLock;
use tracing::{debug, info};
use uuid::Uuid;

use crate::database::store::{
    reaction_charge, solution_charge, thanks_retraction, CommunityStore, DeletionOutcome,
    LedgerCharge, ReactionChange, ReactionOutcome, SolutionOutcome, StoreResult,
};
use crate::error::StoreError;
use crate::forum::{ContentKind, ContentRecord, ContentRevision, NewContent};
use crate::moderation::Verdict;
use crate::reputation::{
    Badge, ContributionProfile, CounterDelta, Level, ReactionKind, ReactionSet,
};

const PROFILE_COLUMNS: &str = "user_id, points, posts_created, solutions_provided, \
     events_created, thanks_received, helpful_answers, last_contribution, created_at, updated_at";

const CONTENT_COLUMNS: &str = "id, kind, parent_id, author_id, title, body, is_solution, \
     is_locked, flagged_for_review, moderation_report, reaction_version, created_at, updated_at";

/// SQL `CASE` expression mapping `points_expr` to a level name, built from
/// [`Level::THRESHOLDS`] so SQL and Rust cannot disagree.
fn level_case_sql(points_expr: &str) -> String {
    let mut sql = String::from("CASE");
    for (min, level) in Level::THRESHOLDS {
        sql.push_str(&format!(
            " WHEN {} >= {} THEN '{}'",
            points_expr,
            min,
            level.as_str()
        ));
    }
    sql.push_str(&format!(" ELSE '{}' END", Level::Newcomer.as_str()));
    sql
}

static APPLY_DELTA_SQL: LazyLock<String> = LazyLock::new(|| {
    format!(
        r#"
        UPDATE community.profiles SET
            points = points + $2,
            posts_created = posts_created + $3,
            solutions_provided = solutions_provided + $4,
            events_created = events_created + $5,
            thanks_received = thanks_received + $6,
            helpful_answers = helpful_answers + $7,
            level = {},
            last_contribution = COALESCE($8, last_contribution),
            updated_at = $9
        WHERE user_id = $1
        RETURNING {}
        "#,
        level_case_sql("points + $2"),
        PROFILE_COLUMNS
    )
});

fn counters_from_row(row: &PgRow) -> StoreResult<CounterDelta> {
    Ok(CounterDelta {
        points: row.try_get("points")?,
        posts_created: row.try_get("posts_created")?,
        solutions_provided: row.try_get("solutions_provided")?,
        events_created: row.try_get("events_created")?,
        thanks_received: row.try_get("thanks_received")?,
        helpful_answers: row.try_get("helpful_answers")?,
    })
}

fn profile_from_row(row: &PgRow, badges: Vec<Badge>) -> StoreResult<ContributionProfile> {
    Ok(ContributionProfile::from_stored(
        row.try_get("user_id")?,
        counters_from_row(row)?,
        badges,
        row.try_get("last_contribution")?,
        row.try_get("created_at")?,
        row.try_get("updated_at")?,
    ))
}

fn content_from_row(
    row: &PgRow,
    liked_by: ReactionSet,
    thanked_by: ReactionSet,
) -> StoreResult<ContentRecord> {
    let kind: String = row.try_get("kind")?;
    let kind: ContentKind = kind.parse().map_err(StoreError::Corrupt)?;
    let report: Option<serde_json::Value> = row.try_get("moderation_report")?;
    let moderation_report = report
        .map(serde_json::from_value::<Verdict>)
        .transpose()?;

    Ok(ContentRecord {
        id: row.try_get("id")?,
        kind,
        parent_id: row.try_get("parent_id")?,
        author_id: row.try_get("author_id")?,
        title: row.try_get("title")?,
        body: row.try_get("body")?,
        is_solution: row.try_get("is_solution")?,
        is_locked: row.try_get("is_locked")?,
        flagged_for_review: row.try_get("flagged_for_review")?,
        moderation_report,
        liked_by,
        thanked_by,
        reaction_version: row.try_get("reaction_version")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

async fn load_badges(conn: &mut PgConnection, user_id: &str) -> StoreResult<Vec<Badge>> {
    let rows = sqlx::query(
        r#"
        SELECT badge_id, name, icon, earned_at
        FROM community.badges
        WHERE user_id = $1
        ORDER BY earned_at, badge_id
        "#,
    )
    .bind(user_id)
    .fetch_all(&mut *conn)
    .await?;

    rows.iter()
        .map(|row| {
            Ok(Badge {
                id: row.try_get("badge_id")?,
                name: row.try_get("name")?,
                icon: row.try_get("icon")?,
                earned_at: row.try_get("earned_at")?,
            })
        })
        .collect()
}

async fn load_profile(
    conn: &mut PgConnection,
    user_id: &str,
) -> StoreResult<Option<ContributionProfile>> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM community.profiles WHERE user_id = $1",
        PROFILE_COLUMNS
    ))
    .bind(user_id)
    .fetch_optional(&mut *conn)
    .await?;

    match row {
        Some(row) => {
            let badges = load_badges(conn, user_id).await?;
            Ok(Some(profile_from_row(&row, badges)?))
        }
        None => Ok(None),
    }
}

/// Increment-and-fetch on one profile.
async fn apply_delta_on(
    conn: &mut PgConnection,
    user_id: &str,
    delta: &CounterDelta,
    touched_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> StoreResult<ContributionProfile> {
    let row = sqlx::query(APPLY_DELTA_SQL.as_str())
        .bind(user_id)
        .bind(delta.points)
        .bind(delta.posts_created)
        .bind(delta.solutions_provided)
        .bind(delta.events_created)
        .bind(delta.thanks_received)
        .bind(delta.helpful_answers)
        .bind(touched_at)
        .bind(now)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| StoreError::ProfileNotFound(user_id.to_string()))?;

    let badges = load_badges(conn, user_id).await?;
    let profile = profile_from_row(&row, badges)?;

    debug!(
        user_id = %user_id,
        points = profile.points(),
        level = %profile.level(),
        "Applied ledger delta"
    );
    Ok(profile)
}

async fn load_reactions(
    conn: &mut PgConnection,
    ids: &[Uuid],
) -> StoreResult<HashMap<Uuid, (ReactionSet, ReactionSet)>> {
    let rows = sqlx::query(
        "SELECT content_id, kind, user_id FROM community.reactions WHERE content_id = ANY($1)",
    )
    .bind(ids)
    .fetch_all(&mut *conn)
    .await?;

    let mut sets: HashMap<Uuid, (ReactionSet, ReactionSet)> = HashMap::new();
    for row in rows {
        let content_id: Uuid = row.try_get("content_id")?;
        let kind: String = row.try_get("kind")?;
        let user_id: String = row.try_get("user_id")?;
        let entry = sets.entry(content_id).or_default();
        match kind.parse::<ReactionKind>().map_err(StoreError::Corrupt)? {
            ReactionKind::Like => entry.0.insert(user_id),
            ReactionKind::Thank => entry.1.insert(user_id),
        };
    }
    Ok(sets)
}

async fn load_content_rows(
    conn: &mut PgConnection,
    rows: Vec<PgRow>,
) -> StoreResult<Vec<ContentRecord>> {
    let ids = rows
        .iter()
        .map(|row| row.try_get::<Uuid, _>("id"))
        .collect::<Result<Vec<_>, _>>()?;
    let mut reactions = load_reactions(conn, &ids).await?;

    rows.iter()
        .zip(ids)
        .map(|(row, id)| {
            let (liked_by, thanked_by) = reactions.remove(&id).unwrap_or_default();
            content_from_row(row, liked_by, thanked_by)
        })
        .collect()
}

async fn load_content(conn: &mut PgConnection, id: Uuid) -> StoreResult<Option<ContentRecord>> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM community.content WHERE id = $1",
        CONTENT_COLUMNS
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    match row {
        Some(row) => Ok(load_content_rows(conn, vec![row]).await?.pop()),
        None => Ok(None),
    }
}

async fn require_content(conn: &mut PgConnection, id: Uuid) -> StoreResult<ContentRecord> {
    load_content(conn, id)
        .await?
        .ok_or(StoreError::ContentNotFound(id))
}

pub struct CommunityRepository {
    pool: PgPool,
}

impl CommunityRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Initialize community schema and tables
    pub async fn init_schema(&self) -> StoreResult<()> {
        info!("Initializing community schema...");

        sqlx::query("CREATE SCHEMA IF NOT EXISTS community")
            .execute(&self.pool)
            .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS community.profiles (
                user_id VARCHAR(255) PRIMARY KEY,
                points BIGINT NOT NULL DEFAULT 0,
                posts_created BIGINT NOT NULL DEFAULT 0,
                solutions_provided BIGINT NOT NULL DEFAULT 0,
                events_created BIGINT NOT NULL DEFAULT 0,
                thanks_received BIGINT NOT NULL DEFAULT 0,
                helpful_answers BIGINT NOT NULL DEFAULT 0,
                level VARCHAR(20) NOT NULL DEFAULT 'Newcomer',
                last_contribution TIMESTAMP WITH TIME ZONE,
                created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS community.badges (
                user_id VARCHAR(255) NOT NULL REFERENCES community.profiles(user_id),
                badge_id VARCHAR(100) NOT NULL,
                name VARCHAR(255) NOT NULL,
                icon VARCHAR(255) NOT NULL,
                earned_at TIMESTAMP WITH TIME ZONE NOT NULL,
                PRIMARY KEY (user_id, badge_id)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS community.content (
                id UUID PRIMARY KEY,
                kind VARCHAR(10) NOT NULL,
                parent_id UUID REFERENCES community.content(id) ON DELETE CASCADE,
                author_id VARCHAR(255) NOT NULL,
                title TEXT,
                body TEXT NOT NULL,
                is_solution BOOLEAN NOT NULL DEFAULT FALSE,
                is_locked BOOLEAN NOT NULL DEFAULT FALSE,
                flagged_for_review BOOLEAN NOT NULL DEFAULT FALSE,
                moderation_report JSONB,
                reaction_version BIGINT NOT NULL DEFAULT 0,
                created_at TIMESTAMP WITH TIME ZONE NOT NULL,
                updated_at TIMESTAMP WITH TIME ZONE NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS community.reactions (
                content_id UUID NOT NULL REFERENCES community.content(id) ON DELETE CASCADE,
                kind VARCHAR(10) NOT NULL,
                user_id VARCHAR(255) NOT NULL,
                created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
                PRIMARY KEY (content_id, kind, user_id)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_content_author_created ON community.content(author_id, created_at)",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_content_parent ON community.content(parent_id, created_at)",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_content_flagged ON community.content(created_at DESC) WHERE flagged_for_review",
        )
        .execute(&self.pool)
        .await?;

        info!("Community schema initialized");
        Ok(())
    }
}

#[async_trait]
impl CommunityStore for CommunityRepository {
    async fn create_profile(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<ContributionProfile> {
        let mut conn = self.pool.acquire().await?;

        sqlx::query(
            r#"
            INSERT INTO community.profiles (user_id, created_at, updated_at)
            VALUES ($1, $2, $2)
            ON CONFLICT (user_id) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(now)
        .execute(&mut *conn)
        .await?;

        load_profile(&mut conn, user_id)
            .await?
            .ok_or_else(|| StoreError::ProfileNotFound(user_id.to_string()))
    }

    async fn get_profile(&self, user_id: &str) -> StoreResult<Option<ContributionProfile>> {
        let mut conn = self.pool.acquire().await?;
        load_profile(&mut conn, user_id).await
    }

    async fn apply_delta(
        &self,
        user_id: &str,
        delta: &CounterDelta,
        touched_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> StoreResult<ContributionProfile> {
        let mut conn = self.pool.acquire().await?;
        apply_delta_on(&mut conn, user_id, delta, touched_at, now).await
    }

    async fn award_badge(
        &self,
        user_id: &str,
        badge: Badge,
        now: DateTime<Utc>,
    ) -> StoreResult<ContributionProfile> {
        let mut tx = self.pool.begin().await?;

        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM community.profiles WHERE user_id = $1)",
        )
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;
        if !exists {
            return Err(StoreError::ProfileNotFound(user_id.to_string()));
        }

        let inserted = sqlx::query(
            r#"
            INSERT INTO community.badges (user_id, badge_id, name, icon, earned_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (user_id, badge_id) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(&badge.id)
        .bind(&badge.name)
        .bind(&badge.icon)
        .bind(badge.earned_at)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if inserted > 0 {
            sqlx::query("UPDATE community.profiles SET updated_at = $2 WHERE user_id = $1")
                .bind(user_id)
                .bind(now)
                .execute(&mut *tx)
                .await?;
            info!(user_id = %user_id, badge = %badge.id, "Badge awarded");
        }

        let profile = load_profile(&mut tx, user_id)
            .await?
            .ok_or_else(|| StoreError::ProfileNotFound(user_id.to_string()))?;
        tx.commit().await?;
        Ok(profile)
    }

    async fn insert_content(
        &self,
        content: NewContent,
        charge: Option<LedgerCharge>,
    ) -> StoreResult<ContentRecord> {
        let mut tx = self.pool.begin().await?;

        if let Some(parent_id) = content.parent_id {
            let exists: bool = sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM community.content WHERE id = $1)",
            )
            .bind(parent_id)
            .fetch_one(&mut *tx)
            .await?;
            if !exists {
                return Err(StoreError::ContentNotFound(parent_id));
            }
        }

        let report = content
            .moderation_report
            .as_ref()
            .map(serde_json::to_value)
            .transpose()?;

        sqlx::query(
            r#"
            INSERT INTO community.content
                (id, kind, parent_id, author_id, title, body, flagged_for_review,
                 moderation_report, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $9)
            "#,
        )
        .bind(content.id)
        .bind(content.kind.as_str())
        .bind(content.parent_id)
        .bind(&content.author_id)
        .bind(&content.title)
        .bind(&content.body)
        .bind(content.flagged_for_review)
        .bind(report)
        .bind(content.created_at)
        .execute(&mut *tx)
        .await?;

        if let Some(charge) = charge {
            apply_delta_on(
                &mut tx,
                &content.author_id,
                &charge.delta,
                charge.touched_at,
                content.created_at,
            )
            .await?;
        }

        tx.commit().await?;
        debug!(content_id = %content.id, kind = %content.kind, "Stored content");
        Ok(content.into_record())
    }

    async fn get_content(&self, id: Uuid) -> StoreResult<Option<ContentRecord>> {
        let mut conn = self.pool.acquire().await?;
        load_content(&mut conn, id).await
    }

    async fn revise_content(
        &self,
        id: Uuid,
        revision: ContentRevision,
    ) -> StoreResult<ContentRecord> {
        let mut conn = self.pool.acquire().await?;
        let report = revision
            .moderation_report
            .as_ref()
            .map(serde_json::to_value)
            .transpose()?;

        let updated = sqlx::query(
            r#"
            UPDATE community.content SET
                title = COALESCE($2, title),
                body = COALESCE($3, body),
                flagged_for_review = $4,
                moderation_report = $5,
                updated_at = $6
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(&revision.title)
        .bind(&revision.body)
        .bind(revision.flagged_for_review)
        .bind(report)
        .bind(revision.updated_at)
        .execute(&mut *conn)
        .await?
        .rows_affected();

        if updated == 0 {
            return Err(StoreError::ContentNotFound(id));
        }
        require_content(&mut conn, id).await
    }

    async fn transition_reaction(&self, change: ReactionChange) -> StoreResult<ReactionOutcome> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(
            "SELECT author_id, reaction_version FROM community.content WHERE id = $1 FOR UPDATE",
        )
        .bind(change.content_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(StoreError::ContentNotFound(change.content_id))?;
        let author_id: String = row.try_get("author_id")?;
        let mut version: i64 = row.try_get("reaction_version")?;

        if let Some(expected) = change.expected_version {
            if expected != version {
                return Err(StoreError::VersionConflict {
                    expected,
                    actual: version,
                });
            }
        }

        let currently_present: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM community.reactions
                WHERE content_id = $1 AND kind = $2 AND user_id = $3
            )
            "#,
        )
        .bind(change.content_id)
        .bind(change.kind.as_str())
        .bind(&change.user_id)
        .fetch_one(&mut *tx)
        .await?;

        let present = change.intent.target(currently_present);
        let changed = present != currently_present;
        let mut author_profile = None;

        if changed {
            if present {
                sqlx::query(
                    r#"
                    INSERT INTO community.reactions (content_id, kind, user_id, created_at)
                    VALUES ($1, $2, $3, $4)
                    "#,
                )
                .bind(change.content_id)
                .bind(change.kind.as_str())
                .bind(&change.user_id)
                .bind(change.now)
                .execute(&mut *tx)
                .await?;
            } else {
                sqlx::query(
                    r#"
                    DELETE FROM community.reactions
                    WHERE content_id = $1 AND kind = $2 AND user_id = $3
                    "#,
                )
                .bind(change.content_id)
                .bind(change.kind.as_str())
                .bind(&change.user_id)
                .execute(&mut *tx)
                .await?;
            }

            version = sqlx::query_scalar(
                r#"
                UPDATE community.content SET reaction_version = reaction_version + 1
                WHERE id = $1
                RETURNING reaction_version
                "#,
            )
            .bind(change.content_id)
            .fetch_one(&mut *tx)
            .await?;

            if let Some(charge) = reaction_charge(change.kind, present, change.now) {
                author_profile = Some(
                    apply_delta_on(&mut tx, &author_id, &charge.delta, charge.touched_at, change.now)
                        .await?,
                );
            }
        }

        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM community.reactions WHERE content_id = $1 AND kind = $2",
        )
        .bind(change.content_id)
        .bind(change.kind.as_str())
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(ReactionOutcome {
            present,
            changed,
            count: count as usize,
            version,
            author_profile,
        })
    }

    async fn toggle_solution(&self, id: Uuid, now: DateTime<Utc>) -> StoreResult<SolutionOutcome> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(
            r#"
            UPDATE community.content SET is_solution = NOT is_solution, updated_at = $2
            WHERE id = $1
            RETURNING is_solution, author_id
            "#,
        )
        .bind(id)
        .bind(now)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(StoreError::ContentNotFound(id))?;
        let is_solution: bool = row.try_get("is_solution")?;
        let author_id: String = row.try_get("author_id")?;

        let author_profile = match solution_charge(is_solution, now) {
            Some(charge) => Some(
                apply_delta_on(&mut tx, &author_id, &charge.delta, charge.touched_at, now).await?,
            ),
            None => None,
        };

        tx.commit().await?;
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
        let mut conn = self.pool.acquire().await?;
        let updated = sqlx::query(
            r#"
            UPDATE community.content SET is_locked = $2, updated_at = $3
            WHERE id = $1 AND kind = $4
            "#,
        )
        .bind(id)
        .bind(locked)
        .bind(now)
        .bind(ContentKind::Post.as_str())
        .execute(&mut *conn)
        .await?
        .rows_affected();

        if updated == 0 {
            return Err(StoreError::ContentNotFound(id));
        }
        require_content(&mut conn, id).await
    }

    async fn replies(&self, post_id: Uuid) -> StoreResult<Vec<ContentRecord>> {
        let mut conn = self.pool.acquire().await?;
        let rows = sqlx::query(&format!(
            r#"
            SELECT {} FROM community.content
            WHERE parent_id = $1
            ORDER BY created_at, id
            "#,
            CONTENT_COLUMNS
        ))
        .bind(post_id)
        .fetch_all(&mut *conn)
        .await?;

        load_content_rows(&mut conn, rows).await
    }

    async fn delete_content(&self, id: Uuid, now: DateTime<Utc>) -> StoreResult<DeletionOutcome> {
        let mut tx = self.pool.begin().await?;

        // Target first, then its replies
        let removed: Vec<Uuid> = sqlx::query_scalar(
            r#"
            SELECT id FROM community.content
            WHERE id = $1 OR parent_id = $1
            ORDER BY (id = $1) DESC, created_at, id
            FOR UPDATE
            "#,
        )
        .bind(id)
        .fetch_all(&mut *tx)
        .await?;
        if removed.first() != Some(&id) {
            return Err(StoreError::ContentNotFound(id));
        }

        let owed = sqlx::query(
            r#"
            SELECT c.author_id, COUNT(*) AS thanks
            FROM community.reactions r
            JOIN community.content c ON c.id = r.content_id
            WHERE r.content_id = ANY($1) AND r.kind = $2
            GROUP BY c.author_id
            ORDER BY c.author_id
            "#,
        )
        .bind(&removed[..])
        .bind(ReactionKind::Thank.as_str())
        .fetch_all(&mut *tx)
        .await?;

        let mut retracted_thanks = 0usize;
        let mut charged_authors = Vec::with_capacity(owed.len());
        for row in owed {
            let author_id: String = row.try_get("author_id")?;
            let thanks: i64 = row.try_get("thanks")?;
            retracted_thanks += thanks as usize;
            if let Some(charge) = thanks_retraction(thanks as usize) {
                charged_authors.push(
                    apply_delta_on(&mut tx, &author_id, &charge.delta, charge.touched_at, now)
                        .await?,
                );
            }
        }

        // Replies and reactions go with the row
        sqlx::query("DELETE FROM community.content WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
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
        let times = sqlx::query_scalar(
            r#"
            SELECT created_at FROM community.content
            WHERE author_id = $1 AND created_at > $2
            "#,
        )
        .bind(user_id)
        .bind(since)
        .fetch_all(&self.pool)
        .await?;
        Ok(times)
    }

    async fn flagged_content(&self, limit: usize) -> StoreResult<Vec<ContentRecord>> {
        let mut conn = self.pool.acquire().await?;
        let rows = sqlx::query(&format!(
            r#"
            SELECT {} FROM community.content
            WHERE flagged_for_review
            ORDER BY created_at DESC
            LIMIT $1
            "#,
            CONTENT_COLUMNS
        ))
        .bind(limit as i64)
        .fetch_all(&mut *conn)
        .await?;

        load_content_rows(&mut conn, rows).await
    }

    async fn clear_review_flag(&self, id: Uuid, now: DateTime<Utc>) -> StoreResult<ContentRecord> {
        let mut conn = self.pool.acquire().await?;
        let updated = sqlx::query(
            r#"
            UPDATE community.content SET
                flagged_for_review = FALSE,
                moderation_report = NULL,
                updated_at = $2
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(now)
        .execute(&mut *conn)
        .await?
        .rows_affected();

        if updated == 0 {
            return Err(StoreError::ContentNotFound(id));
        }
        require_content(&mut conn, id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_case_matches_thresholds() {
        let sql = level_case_sql("points + $2");
        assert_eq!(
            sql,
            "CASE WHEN points + $2 >= 100 THEN 'Champion' \
             WHEN points + $2 >= 50 THEN 'Expert' \
             WHEN points + $2 >= 25 THEN 'Contributor' \
             WHEN points + $2 >= 10 THEN 'Member' \
             ELSE 'Newcomer' END"
        );
    }

    #[test]
    fn test_apply_delta_sql_is_single_statement() {
        let sql = APPLY_DELTA_SQL.as_str();
        assert!(sql.contains("points = points + $2"));
        assert!(sql.contains("RETURNING"));
        assert!(!sql.contains("SELECT"));
    }
}
