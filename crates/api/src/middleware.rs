//! API middleware and shared state.

#![allow(missing_docs)]

use std::sync::Arc;

use aniparty_core::{
    ChatService, IdentityService, PollEngine, ReactionService, SessionRegistry,
    store::CommentStoreHandle,
};

/// Application state.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<SessionRegistry>,
    pub chat_service: Arc<ChatService>,
    pub reaction_service: Arc<ReactionService>,
    pub poll_engine: Arc<PollEngine>,
    pub comment_store: CommentStoreHandle,
    pub identity_service: IdentityService,
}
