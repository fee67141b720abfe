//! Episode reaction endpoints.
//!
//! The POST route mirrors the WebSocket `reaction` envelope for
//! clients without a live connection; delivery is identical.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};
use serde::Deserialize;

use aniparty_common::AppResult;
use aniparty_core::{EpisodeRef, ReactionInfo, store::ReactionRecord};

use crate::{extractors::ActingIdentity, middleware::AppState, response::ApiResponse};

/// Create reaction request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReactionRequest {
    pub reaction: String,
    /// Video second the reaction refers to.
    pub timestamp: i32,
}

/// Most recent reactions for an episode, newest first.
async fn recent_reactions(
    State(state): State<AppState>,
    Path((anime_id, episode_id)): Path<(i32, i32)>,
) -> AppResult<ApiResponse<Vec<ReactionRecord>>> {
    let reactions = state
        .reaction_service
        .recent(EpisodeRef {
            anime_id,
            episode_id,
        })
        .await?;
    Ok(ApiResponse::ok(reactions))
}

/// Emit a reaction to everyone viewing the episode.
async fn create_reaction(
    ActingIdentity(identity): ActingIdentity,
    State(state): State<AppState>,
    Path((anime_id, episode_id)): Path<(i32, i32)>,
    Json(req): Json<CreateReactionRequest>,
) -> AppResult<ApiResponse<ReactionInfo>> {
    let info = state
        .reaction_service
        .publish(
            &identity,
            EpisodeRef {
                anime_id,
                episode_id,
            },
            req.reaction,
            req.timestamp,
        )
        .await?;
    Ok(ApiResponse::ok(info))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(recent_reactions).post(create_reaction))
}
