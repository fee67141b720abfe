//! Watch party endpoints.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use serde::Deserialize;

use aniparty_common::{AppError, AppResult};
use aniparty_core::{EpisodeRef, ParticipantInfo, PartySummary};

use crate::{extractors::ActingIdentity, middleware::AppState, response::ApiResponse};

/// Create watch party request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePartyRequest {
    pub anime_id: i32,
    pub episode_id: i32,
    #[serde(default = "default_public")]
    pub is_public: bool,
}

const fn default_public() -> bool {
    true
}

/// Create a watch party.
async fn create_party(
    ActingIdentity(identity): ActingIdentity,
    State(state): State<AppState>,
    Json(req): Json<CreatePartyRequest>,
) -> AppResult<ApiResponse<PartySummary>> {
    let party = state
        .registry
        .create(
            &identity,
            EpisodeRef {
                anime_id: req.anime_id,
                episode_id: req.episode_id,
            },
            req.is_public,
        )
        .await?;
    Ok(ApiResponse::ok(party))
}

/// Look a party up by room code.
async fn get_by_code(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> AppResult<ApiResponse<PartySummary>> {
    let party = state.registry.get_by_code(&code).await?;
    Ok(ApiResponse::ok(party))
}

/// Current roster of a party.
async fn participants(
    State(state): State<AppState>,
    Path(party_id): Path<i32>,
) -> AppResult<ApiResponse<Vec<ParticipantInfo>>> {
    let roster = state.registry.list_participants(party_id).await?;
    Ok(ApiResponse::ok(roster))
}

/// End a party. Only the creator may end it.
async fn end_party(
    ActingIdentity(identity): ActingIdentity,
    State(state): State<AppState>,
    Path(party_id): Path<i32>,
) -> AppResult<ApiResponse<PartySummary>> {
    let party = state.registry.get_by_id(party_id).await?;
    if party.creator_id != identity.user_id {
        return Err(AppError::Forbidden(
            "Only the party creator can end it".to_string(),
        ));
    }

    let party = state.registry.end(party_id).await?;
    Ok(ApiResponse::ok(party))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_party))
        .route("/{party}", get(get_by_code))
        .route("/{party}/participants", get(participants))
        .route("/{party}/end", post(end_party))
}
