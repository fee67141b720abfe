//! Live chat for watch parties.
//!
//! Chat is fan-out first: the message is stamped and delivered to the
//! whole session synchronously, and the durable copy (an episode
//! comment) is written in the background so a slow database never
//! delays the room.

use std::sync::Arc;
use tracing::warn;

use aniparty_common::{AppError, AppResult};

use crate::identity::Identity;
use crate::protocol::ServerEnvelope;
use crate::services::registry::{PartyId, SessionRegistry};
use crate::store::{CommentStoreHandle, NewComment};

/// Maximum accepted chat message length, in characters.
const MAX_MESSAGE_LEN: usize = 1000;

pub struct ChatService {
    registry: Arc<SessionRegistry>,
    comments: CommentStoreHandle,
}

impl ChatService {
    #[must_use]
    pub fn new(registry: Arc<SessionRegistry>, comments: CommentStoreHandle) -> Self {
        Self { registry, comments }
    }

    /// Broadcast a chat message to the whole party, sender included,
    /// and persist it as an episode comment in the background.
    /// Guest messages are delivered but not persisted, since guests
    /// have no durable account to attribute them to.
    pub async fn send(
        &self,
        party_id: PartyId,
        identity: &Identity,
        content: String,
    ) -> AppResult<ServerEnvelope> {
        let content = content.trim().to_string();
        if content.is_empty() {
            return Err(AppError::BadRequest("Chat message is empty".to_string()));
        }
        if content.chars().count() > MAX_MESSAGE_LEN {
            return Err(AppError::BadRequest(format!(
                "Chat message exceeds {MAX_MESSAGE_LEN} characters"
            )));
        }

        let episode = self.registry.episode_of(party_id).await?;
        let event = self
            .registry
            .broadcast_chat(party_id, identity, content.clone())
            .await?;

        if !identity.guest {
            let comments = self.comments.clone();
            let input = NewComment {
                user_id: identity.user_id,
                username: identity.username.clone(),
                anime_id: episode.anime_id,
                episode_id: episode.episode_id,
                content,
                timestamp: None,
                parent_id: None,
            };
            tokio::spawn(async move {
                if let Err(err) = comments.create_comment(input).await {
                    warn!(party_id, error = %err, "Failed to persist chat message");
                }
            });
        }

        Ok(event)
    }
}
