//! Ephemeral reactions.
//!
//! Reactions are scoped to the content and episode being watched, not
//! to a single party: everyone viewing the same episode sees them,
//! across session boundaries. Delivery is immediate; the audit copy
//! is written in the background and never read back into the live
//! stream.

use chrono::Utc;
use std::sync::Arc;
use tracing::warn;

use aniparty_common::{AppError, AppResult};

use crate::identity::Identity;
use crate::protocol::{ReactionInfo, ServerEnvelope};
use crate::services::registry::{EpisodeRef, SessionRegistry};
use crate::store::{NewReaction, ReactionRecord, ReactionStoreHandle};

/// Maximum accepted reaction payload length. Reactions are emoji or
/// short codes, never prose.
const MAX_REACTION_LEN: usize = 32;

/// Default page size for the recent-reactions listing.
pub const RECENT_REACTIONS_LIMIT: u64 = 50;

pub struct ReactionService {
    registry: Arc<SessionRegistry>,
    store: ReactionStoreHandle,
}

impl ReactionService {
    #[must_use]
    pub fn new(registry: Arc<SessionRegistry>, store: ReactionStoreHandle) -> Self {
        Self { registry, store }
    }

    /// Fan a reaction out to every viewer of the episode, the sender
    /// included, and record an audit copy in the background.
    pub async fn publish(
        &self,
        identity: &Identity,
        episode: EpisodeRef,
        reaction: String,
        timestamp: i32,
    ) -> AppResult<ReactionInfo> {
        if reaction.is_empty() || reaction.chars().count() > MAX_REACTION_LEN {
            return Err(AppError::BadRequest("Invalid reaction payload".to_string()));
        }

        let info = ReactionInfo {
            user_id: identity.user_id,
            username: identity.username.clone(),
            anime_id: episode.anime_id,
            episode_id: episode.episode_id,
            reaction: reaction.clone(),
            timestamp,
            created_at: Utc::now(),
        };

        self.registry
            .notify_viewers(episode, &ServerEnvelope::NewReaction {
                reaction: info.clone(),
            })
            .await;

        if !identity.guest {
            let store = self.store.clone();
            let input = NewReaction {
                user_id: identity.user_id,
                username: identity.username.clone(),
                anime_id: episode.anime_id,
                episode_id: episode.episode_id,
                reaction,
                timestamp,
            };
            tokio::spawn(async move {
                if let Err(err) = store.create_reaction(input).await {
                    warn!(error = %err, "Failed to persist reaction");
                }
            });
        }

        Ok(info)
    }

    /// Most recent persisted reactions for an episode, newest first.
    pub async fn recent(&self, episode: EpisodeRef) -> AppResult<Vec<ReactionRecord>> {
        self.store
            .list_recent_reactions(episode.anime_id, episode.episode_id, RECENT_REACTIONS_LIMIT)
            .await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;
    use aniparty_common::RoomCodeGenerator;
    use tokio::sync::mpsc;

    fn episode() -> EpisodeRef {
        EpisodeRef {
            anime_id: 10,
            episode_id: 3,
        }
    }

    #[tokio::test]
    async fn test_reaction_reaches_viewers_in_other_parties() {
        let registry = Arc::new(SessionRegistry::new(RoomCodeGenerator::new(8), 5));
        let store = Arc::new(MemoryStore::new());
        let service = ReactionService::new(registry.clone(), store);

        let host = Identity::user(1, "host".to_string());
        let other = Identity::user(2, "mira".to_string());
        let a = registry.create(&host, episode(), true).await.unwrap();
        let b = registry.create(&other, episode(), true).await.unwrap();

        let (tx1, mut rx1) = mpsc::unbounded_channel();
        let (tx2, mut rx2) = mpsc::unbounded_channel();
        registry.join(a.id, 1, &host, tx1).await.unwrap();
        registry.join(b.id, 2, &other, tx2).await.unwrap();

        service
            .publish(&host, episode(), "🔥".to_string(), 512)
            .await
            .unwrap();

        for rx in [&mut rx1, &mut rx2] {
            let event = rx.try_recv().unwrap();
            match event {
                ServerEnvelope::NewReaction { reaction } => {
                    assert_eq!(reaction.reaction, "🔥");
                    assert_eq!(reaction.timestamp, 512);
                }
                other => panic!("unexpected event: {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn test_audit_copy_is_written_for_users() {
        let registry = Arc::new(SessionRegistry::new(RoomCodeGenerator::new(8), 5));
        let store = Arc::new(MemoryStore::new());
        let service = ReactionService::new(registry, store);

        let user = Identity::user(7, "rin".to_string());
        service
            .publish(&user, episode(), "😭".to_string(), 90)
            .await
            .unwrap();
        tokio::task::yield_now().await;

        let recent = service.recent(episode()).await.unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].user_id, 7);
        assert_eq!(recent[0].reaction, "😭");
    }

    #[tokio::test]
    async fn test_oversized_reaction_is_rejected() {
        let registry = Arc::new(SessionRegistry::new(RoomCodeGenerator::new(8), 5));
        let store = Arc::new(MemoryStore::new());
        let service = ReactionService::new(registry, store);

        let user = Identity::user(7, "rin".to_string());
        let err = service
            .publish(&user, episode(), "x".repeat(64), 0)
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "BAD_REQUEST");
    }
}
