//! Episode comment endpoints.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{delete, get, post},
};
use serde::Deserialize;

use aniparty_common::{AppError, AppResult};
use aniparty_core::store::{CommentRecord, NewComment};

use crate::{extractors::ActingIdentity, middleware::AppState, response::ApiResponse};

/// Create comment request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCommentRequest {
    pub content: String,
    /// Video second the comment refers to, if any.
    pub timestamp: Option<i32>,
    /// Parent comment for replies.
    pub parent_id: Option<i32>,
}

/// List comments for an episode, oldest first.
async fn list_comments(
    State(state): State<AppState>,
    Path((anime_id, episode_id)): Path<(i32, i32)>,
) -> AppResult<ApiResponse<Vec<CommentRecord>>> {
    let comments = state.comment_store.list_comments(anime_id, episode_id).await?;
    Ok(ApiResponse::ok(comments))
}

/// Post a comment on an episode.
async fn create_comment(
    ActingIdentity(identity): ActingIdentity,
    State(state): State<AppState>,
    Path((anime_id, episode_id)): Path<(i32, i32)>,
    Json(req): Json<CreateCommentRequest>,
) -> AppResult<ApiResponse<CommentRecord>> {
    if identity.guest {
        return Err(AppError::Unauthorized);
    }
    let content = req.content.trim().to_string();
    if content.is_empty() {
        return Err(AppError::Validation("Comment is empty".to_string()));
    }

    let comment = state
        .comment_store
        .create_comment(NewComment {
            user_id: identity.user_id,
            username: identity.username,
            anime_id,
            episode_id,
            content,
            timestamp: req.timestamp,
            parent_id: req.parent_id,
        })
        .await?;
    Ok(ApiResponse::ok(comment))
}

/// Soft-delete a comment. Author only.
async fn delete_comment(
    ActingIdentity(identity): ActingIdentity,
    State(state): State<AppState>,
    Path(comment_id): Path<i32>,
) -> AppResult<impl axum::response::IntoResponse> {
    state
        .comment_store
        .soft_delete_comment(comment_id, identity.user_id)
        .await?;
    Ok(crate::response::ok())
}

/// Like a comment.
async fn like_comment(
    State(state): State<AppState>,
    Path(comment_id): Path<i32>,
) -> AppResult<ApiResponse<CommentRecord>> {
    let comment = state.comment_store.like_comment(comment_id).await?;
    Ok(ApiResponse::ok(comment))
}

/// Routes nested under an episode path.
pub fn episode_router() -> Router<AppState> {
    Router::new().route("/", get(list_comments).post(create_comment))
}

/// Routes addressing a comment directly.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{comment_id}", delete(delete_comment))
        .route("/{comment_id}/like", post(like_comment))
}
