//! Forum API Endpoints
//!
//! Post, reply, reaction, and moderation routes. The acting user comes from
//! the `x-user-id` and `x-user-role` headers set by the upstream
//! authentication layer.

use axum::{
    extract::{FromRequestParts, Path, Query, State},
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, patch, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::api::error::ErrorBody;
use crate::error::{ModerationError, Result};
use crate::forum::{Actor, ContentRecord, ForumService, PostThread, Role};
use crate::moderation::{GateDecision, GateResult};
use crate::reputation::ContributionProfile;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";

/// API state for forum endpoints
#[derive(Clone)]
pub struct ForumApiState {
    pub service: ForumService,
}

impl ForumApiState {
    pub fn new(service: ForumService) -> Self {
        Self { service }
    }
}

impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> std::result::Result<Self, Self::Rejection> {
        let header = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
        };

        let Some(user_id) = header(USER_ID_HEADER) else {
            return Err((
                StatusCode::UNAUTHORIZED,
                Json(ErrorBody::new("Authentication required")),
            )
                .into_response());
        };

        let role = match header(USER_ROLE_HEADER) {
            Some(raw) => raw.parse::<Role>().map_err(|e| {
                warn!(user_id = %user_id, "Rejected request with unknown role");
                (StatusCode::BAD_REQUEST, Json(ErrorBody::new(e))).into_response()
            })?,
            None => Role::Member,
        };

        Ok(Actor::new(user_id, role))
    }
}

// Request types

#[derive(Debug, Default, Deserialize)]
pub struct CreatePostRequest {
    pub title: Option<String>,
    pub content: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ReplyRequest {
    pub content: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RevisePostRequest {
    pub title: Option<String>,
    pub content: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetThankRequest {
    pub thanked: bool,
    pub expected_version: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockRequest {
    pub is_locked: bool,
}

#[derive(Debug, Deserialize)]
pub struct ReviewQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PreviewRequest {
    pub title: Option<String>,
    pub content: Option<String>,
}

// Response types

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionResponse {
    pub message: &'static str,
    pub post: ContentRecord,
    pub decision: GateDecision,
    pub flagged_for_review: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThankResponse {
    pub message: &'static str,
    pub thanked: bool,
    pub thanks_count: usize,
    pub version: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeResponse {
    pub liked: bool,
    pub likes: usize,
    pub version: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SolutionResponse {
    pub message: &'static str,
    pub is_solution: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LockResponse {
    pub message: &'static str,
    pub is_locked: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteResponse {
    pub message: &'static str,
    pub removed: usize,
    pub retracted_thanks: usize,
}

#[derive(Debug, Serialize)]
pub struct ApproveResponse {
    pub message: &'static str,
    pub post: ContentRecord,
}

#[derive(Debug, Serialize)]
pub struct FlaggedContentResponse {
    pub total: usize,
    pub posts: Vec<ContentRecord>,
}

fn submission_message(decision: GateDecision, created: &'static str) -> &'static str {
    if decision == GateDecision::Flag {
        "Submitted and queued for moderator review"
    } else {
        created
    }
}

// Endpoints

/// POST /posts - Create a post
pub async fn create_post(
    State(state): State<ForumApiState>,
    actor: Actor,
    Json(payload): Json<CreatePostRequest>,
) -> Result<(StatusCode, Json<SubmissionResponse>)> {
    let submission = state
        .service
        .create_post(
            &actor,
            payload.title.as_deref().unwrap_or(""),
            payload.content.as_deref().unwrap_or(""),
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(SubmissionResponse {
            message: submission_message(submission.decision, "Post created successfully"),
            flagged_for_review: submission.record.flagged_for_review,
            decision: submission.decision,
            post: submission.record,
        }),
    ))
}

/// POST /posts/{id}/reply - Reply to a post
pub async fn add_reply(
    State(state): State<ForumApiState>,
    Path(id): Path<Uuid>,
    actor: Actor,
    Json(payload): Json<ReplyRequest>,
) -> Result<(StatusCode, Json<SubmissionResponse>)> {
    let submission = state
        .service
        .add_reply(&actor, id, payload.content.as_deref().unwrap_or(""))
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(SubmissionResponse {
            message: submission_message(submission.decision, "Reply added successfully"),
            flagged_for_review: submission.record.flagged_for_review,
            decision: submission.decision,
            post: submission.record,
        }),
    ))
}

/// GET /posts/{id} - A post and its replies
pub async fn get_post(
    State(state): State<ForumApiState>,
    Path(id): Path<Uuid>,
) -> Result<Json<PostThread>> {
    Ok(Json(state.service.read_post(id).await?))
}

/// PATCH /posts/{id} - Edit a post (author, moderator, or admin)
pub async fn revise_post(
    State(state): State<ForumApiState>,
    Path(id): Path<Uuid>,
    actor: Actor,
    Json(payload): Json<RevisePostRequest>,
) -> Result<Json<SubmissionResponse>> {
    let submission = state
        .service
        .revise(&actor, id, payload.title.as_deref(), payload.content.as_deref())
        .await?;

    Ok(Json(SubmissionResponse {
        message: submission_message(submission.decision, "Post updated successfully"),
        flagged_for_review: submission.record.flagged_for_review,
        decision: submission.decision,
        post: submission.record,
    }))
}

/// POST /posts/{id}/thank - Toggle a thank
pub async fn toggle_thank(
    State(state): State<ForumApiState>,
    Path(id): Path<Uuid>,
    actor: Actor,
) -> Result<Json<ThankResponse>> {
    let update = state.service.toggle_thank(&actor, id).await?;
    Ok(Json(ThankResponse {
        message: if update.present {
            "Thank you added!"
        } else {
            "Thank removed"
        },
        thanked: update.present,
        thanks_count: update.count,
        version: update.version,
    }))
}

/// PUT /posts/{id}/thank - Set thank state (safe to retry)
pub async fn set_thank(
    State(state): State<ForumApiState>,
    Path(id): Path<Uuid>,
    actor: Actor,
    Json(payload): Json<SetThankRequest>,
) -> Result<Json<ThankResponse>> {
    let update = state
        .service
        .set_thanked(&actor, id, payload.thanked, payload.expected_version)
        .await?;
    Ok(Json(ThankResponse {
        message: match (update.present, update.changed) {
            (true, true) => "Thank you added!",
            (false, true) => "Thank removed",
            _ => "No change",
        },
        thanked: update.present,
        thanks_count: update.count,
        version: update.version,
    }))
}

/// POST /posts/{id}/like - Toggle a like
pub async fn toggle_like(
    State(state): State<ForumApiState>,
    Path(id): Path<Uuid>,
    actor: Actor,
) -> Result<Json<LikeResponse>> {
    let update = state.service.toggle_like(&actor, id).await?;
    Ok(Json(LikeResponse {
        liked: update.present,
        likes: update.count,
        version: update.version,
    }))
}

/// PATCH /posts/{id}/solution - Mark or unmark a solution (moderator, admin)
pub async fn toggle_solution(
    State(state): State<ForumApiState>,
    Path(id): Path<Uuid>,
    actor: Actor,
) -> Result<Json<SolutionResponse>> {
    let update = state.service.toggle_solution(&actor, id).await?;
    Ok(Json(SolutionResponse {
        message: if update.is_solution {
            "Marked as solution"
        } else {
            "Unmarked as solution"
        },
        is_solution: update.is_solution,
    }))
}

/// PATCH /posts/{id}/lock - Lock or unlock replies (moderator, admin)
pub async fn set_lock(
    State(state): State<ForumApiState>,
    Path(id): Path<Uuid>,
    actor: Actor,
    Json(payload): Json<LockRequest>,
) -> Result<Json<LockResponse>> {
    let post = state.service.set_locked(&actor, id, payload.is_locked).await?;
    Ok(Json(LockResponse {
        message: "Post lock status updated",
        is_locked: post.is_locked,
    }))
}

/// DELETE /posts/{id} and /admin/posts/{id} - Remove a post with its replies
pub async fn delete_post(
    State(state): State<ForumApiState>,
    Path(id): Path<Uuid>,
    actor: Actor,
) -> Result<Json<DeleteResponse>> {
    let removal = state.service.delete_post(&actor, id).await?;
    Ok(Json(DeleteResponse {
        message: "Post deleted",
        removed: removal.removed,
        retracted_thanks: removal.retracted_thanks,
    }))
}

/// DELETE /posts/{id}/reply/{reply_id} - Remove one reply
pub async fn delete_reply(
    State(state): State<ForumApiState>,
    Path((post_id, reply_id)): Path<(Uuid, Uuid)>,
    actor: Actor,
) -> Result<Json<DeleteResponse>> {
    let removal = state.service.delete_reply(&actor, post_id, reply_id).await?;
    Ok(Json(DeleteResponse {
        message: "Reply deleted",
        removed: removal.removed,
        retracted_thanks: removal.retracted_thanks,
    }))
}

/// PATCH /admin/posts/{id}/approve - Clear the review flag
pub async fn approve_post(
    State(state): State<ForumApiState>,
    Path(id): Path<Uuid>,
    actor: Actor,
) -> Result<Json<ApproveResponse>> {
    let post = state.service.approve(&actor, id).await?;
    Ok(Json(ApproveResponse {
        message: "Post approved",
        post,
    }))
}

/// GET /admin/flagged-content - Review queue
pub async fn flagged_content(
    State(state): State<ForumApiState>,
    Query(query): Query<ReviewQuery>,
    actor: Actor,
) -> Result<Json<FlaggedContentResponse>> {
    let posts = state.service.review_queue(&actor, query.limit).await?;
    Ok(Json(FlaggedContentResponse {
        total: posts.len(),
        posts,
    }))
}

/// GET /users/{id}/contributions - Contribution profile
pub async fn get_contributions(
    State(state): State<ForumApiState>,
    Path(user_id): Path<String>,
) -> Result<Json<ContributionProfile>> {
    Ok(Json(state.service.profile(&user_id).await?))
}

/// POST /moderation/preview - Gate dry run. Shows matched terms, so
/// moderators and admins only.
pub async fn preview(
    State(state): State<ForumApiState>,
    actor: Actor,
    Json(payload): Json<PreviewRequest>,
) -> Result<Json<GateResult>> {
    if !actor.can_moderate() {
        return Err(ModerationError::forbidden("Not authorized to preview moderation"));
    }
    Ok(Json(state.service.preview(
        payload.title.as_deref(),
        payload.content.as_deref(),
    )))
}

pub fn create_router(state: ForumApiState) -> Router {
    Router::new()
        .route("/posts", post(create_post))
        .route("/posts/{id}", get(get_post).patch(revise_post).delete(delete_post))
        .route("/posts/{id}/reply", post(add_reply))
        .route("/posts/{id}/reply/{reply_id}", delete(delete_reply))
        .route("/posts/{id}/lock", patch(set_lock))
        .route("/posts/{id}/thank", post(toggle_thank).put(set_thank))
        .route("/posts/{id}/like", post(toggle_like))
        .route("/posts/{id}/solution", patch(toggle_solution))
        .route("/admin/posts/{id}", delete(delete_post))
        .route("/admin/posts/{id}/approve", patch(approve_post))
        .route("/admin/flagged-content", get(flagged_content))
        .route("/users/{id}/contributions", get(get_contributions))
        .route("/moderation/preview", post(preview))
        .route("/health", get(|| async { "OK" }))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flagged_submission_message() {
        assert_eq!(
            submission_message(GateDecision::Flag, "Post created successfully"),
            "Submitted and queued for moderator review"
        );
        assert_eq!(
            submission_message(GateDecision::Accept, "Post created successfully"),
            "Post created successfully"
        );
    }

    #[test]
    fn test_lock_request_accepts_camel_case() {
        let request: LockRequest = serde_json::from_str(r#"{"isLocked":true}"#).unwrap();
        assert!(request.is_locked);
    }

    #[test]
    fn test_set_thank_request_accepts_camel_case() {
        let request: SetThankRequest =
            serde_json::from_str(r#"{"thanked":true,"expectedVersion":3}"#).unwrap();
        assert!(request.thanked);
        assert_eq!(request.expected_version, Some(3));
    }
}
