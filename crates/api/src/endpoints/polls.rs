//! Poll endpoints.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use serde::Deserialize;

use aniparty_common::{AppError, AppResult};
use aniparty_core::{
    EpisodeRef, PollResults, ServerEnvelope,
    store::{NewPoll, NewPollOption},
};

use crate::{extractors::ActingIdentity, middleware::AppState, response::ApiResponse};

/// Create poll request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePollRequest {
    pub question: String,
    pub options: Vec<PollOptionRequest>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollOptionRequest {
    pub text: String,
    pub image_url: Option<String>,
}

/// Vote request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteRequest {
    pub option_id: i32,
}

/// Create a poll for an episode.
async fn create_poll(
    ActingIdentity(identity): ActingIdentity,
    State(state): State<AppState>,
    Path((anime_id, episode_id)): Path<(i32, i32)>,
    Json(req): Json<CreatePollRequest>,
) -> AppResult<ApiResponse<PollResults>> {
    if identity.guest {
        return Err(AppError::Unauthorized);
    }

    let results = state
        .poll_engine
        .create(NewPoll {
            anime_id,
            episode_id,
            question: req.question,
            created_by: Some(identity.user_id),
            options: req
                .options
                .into_iter()
                .map(|o| NewPollOption {
                    text: o.text,
                    image_url: o.image_url,
                })
                .collect(),
        })
        .await?;
    Ok(ApiResponse::ok(results))
}

/// The currently active poll for an episode, with tallies.
async fn active_poll(
    ActingIdentity(identity): ActingIdentity,
    State(state): State<AppState>,
    Path((anime_id, episode_id)): Path<(i32, i32)>,
) -> AppResult<ApiResponse<Option<PollResults>>> {
    let results = state
        .poll_engine
        .active(anime_id, episode_id, Some(identity.user_id))
        .await?;
    Ok(ApiResponse::ok(results))
}

/// A poll's current tallies.
async fn poll_results(
    ActingIdentity(identity): ActingIdentity,
    State(state): State<AppState>,
    Path(poll_id): Path<i32>,
) -> AppResult<ApiResponse<PollResults>> {
    let results = state
        .poll_engine
        .results(poll_id, Some(identity.user_id))
        .await?;
    Ok(ApiResponse::ok(results))
}

/// Cast or switch a vote, then nudge every live viewer of the
/// episode to re-fetch the tally.
async fn vote(
    ActingIdentity(identity): ActingIdentity,
    State(state): State<AppState>,
    Path(poll_id): Path<i32>,
    Json(req): Json<VoteRequest>,
) -> AppResult<ApiResponse<PollResults>> {
    let poll = state
        .poll_engine
        .vote(poll_id, req.option_id, identity.user_id)
        .await?;

    state
        .registry
        .notify_viewers(
            EpisodeRef {
                anime_id: poll.anime_id,
                episode_id: poll.episode_id,
            },
            &ServerEnvelope::PollUpdate { poll_id },
        )
        .await;

    let results = state
        .poll_engine
        .results(poll_id, Some(identity.user_id))
        .await?;
    Ok(ApiResponse::ok(results))
}

/// End a poll. Creator only.
async fn end_poll(
    ActingIdentity(identity): ActingIdentity,
    State(state): State<AppState>,
    Path(poll_id): Path<i32>,
) -> AppResult<ApiResponse<PollResults>> {
    state.poll_engine.end(poll_id, identity.user_id).await?;
    let results = state.poll_engine.results(poll_id, None).await?;
    Ok(ApiResponse::ok(results))
}

/// Routes nested under an episode path.
pub fn episode_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_poll))
        .route("/active", get(active_poll))
}

/// Routes addressing a poll directly.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{poll_id}", get(poll_results))
        .route("/{poll_id}/vote", post(vote))
        .route("/{poll_id}/end", post(end_poll))
}
