//! HTTP API layer for aniparty.
//!
//! This crate provides the REST API and the real-time gateway:
//!
//! - **Endpoints**: watch parties, episode comments, reactions, polls
//! - **Extractors**: identity resolution from token or query
//! - **Streaming**: the WebSocket watch-party gateway
//!
//! Built on Axum 0.8 with Tower middleware stack.

pub mod endpoints;
pub mod extractors;
pub mod middleware;
pub mod response;
pub mod streaming;

pub use endpoints::router;
pub use middleware::AppState;
pub use streaming::watch_party_handler;
