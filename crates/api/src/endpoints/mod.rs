//! API endpoints.

pub mod comments;
pub mod parties;
pub mod polls;
pub mod reactions;

use axum::{Router, routing::any};

use crate::{middleware::AppState, streaming::watch_party_handler};

/// Create the API router.
pub fn router() -> Router<AppState> {
    let episode_routes = Router::new()
        .nest("/comments", comments::episode_router())
        .nest("/reactions", reactions::router())
        .nest("/polls", polls::episode_router());

    Router::new()
        .nest("/watch-party", parties::router())
        .nest("/anime/{anime_id}/episodes/{episode_id}", episode_routes)
        .nest("/comments", comments::router())
        .nest("/polls", polls::router())
        .route("/ws/watch-party", any(watch_party_handler))
}
