//! WebSocket gateway for watch parties.
//!
//! One socket per viewer. Inbound frames are JSON envelopes tagged by
//! `type`; outbound delivery goes through a per-connection queue
//! drained by a dedicated writer task, so a slow socket never blocks
//! the session that is fanning out to it.
//!
//! Malformed or failing commands produce an `error` envelope on the
//! offending connection and leave it open; only transport errors and
//! close frames end a connection.

#![allow(missing_docs)]

use std::sync::atomic::{AtomicU64, Ordering};

use axum::{
    extract::{
        Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use aniparty_common::{AppError, AppResult};
use aniparty_core::{
    ClientEnvelope, ConnId, EpisodeRef, Identity, PartyId, PlaybackState, ServerEnvelope,
    protocol::is_legacy_probe,
};

use crate::middleware::AppState;

/// Streaming query parameters.
#[derive(Debug, Deserialize)]
pub struct StreamQuery {
    /// Access token for authentication.
    #[serde(rename = "i")]
    pub token: Option<String>,
}

static NEXT_CONN_ID: AtomicU64 = AtomicU64::new(1);

/// WebSocket handler for the watch-party gateway.
pub async fn watch_party_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<StreamQuery>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, query, state))
}

/// Handle a WebSocket connection.
async fn handle_socket(socket: WebSocket, query: StreamQuery, state: AppState) {
    let conn_id = NEXT_CONN_ID.fetch_add(1, Ordering::Relaxed);
    let identity = state
        .identity_service
        .resolve(query.token.as_deref())
        .await;

    info!(conn_id, user_id = identity.user_id, guest = identity.guest, "Watch party connection established");

    let (mut ws_tx, mut ws_rx) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerEnvelope>();

    // Writer task: drains the outbound queue onto the socket.
    let writer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let json = match serde_json::to_string(&event) {
                Ok(json) => json,
                Err(err) => {
                    warn!(error = %err, "Failed to serialize outbound envelope");
                    continue;
                }
            };
            if ws_tx.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    // The party this connection is currently a member of.
    let mut joined: Option<PartyId> = None;

    while let Some(msg) = ws_rx.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                // Historical clients send a bare action word before
                // the JSON envelope; accept and ignore it.
                if is_legacy_probe(&text) {
                    debug!(conn_id, "Ignoring legacy probe frame");
                    continue;
                }
                match serde_json::from_str::<ClientEnvelope>(&text) {
                    Ok(envelope) => {
                        if let Err(err) =
                            dispatch(envelope, conn_id, &identity, &tx, &mut joined, &state).await
                        {
                            let _ = tx.send(ServerEnvelope::Error {
                                code: err.error_code().to_string(),
                                message: err.to_string(),
                            });
                        }
                    }
                    Err(err) => {
                        let _ = tx.send(ServerEnvelope::Error {
                            code: "BAD_REQUEST".to_string(),
                            message: format!("Malformed envelope: {err}"),
                        });
                    }
                }
            }
            Ok(Message::Close(_)) | Err(_) => break,
            Ok(_) => {}
        }
    }

    // Abrupt disconnects take the same path as an explicit leave.
    if let Some(party_id) = joined {
        if let Err(err) = state.registry.leave(party_id, conn_id, identity.user_id).await {
            debug!(conn_id, party_id, error = %err, "Cleanup after disconnect failed");
        }
    }
    writer.abort();
    info!(conn_id, "Watch party connection closed");
}

async fn dispatch(
    envelope: ClientEnvelope,
    conn_id: ConnId,
    identity: &Identity,
    tx: &mpsc::UnboundedSender<ServerEnvelope>,
    joined: &mut Option<PartyId>,
    state: &AppState,
) -> AppResult<()> {
    match envelope {
        ClientEnvelope::Join { party_id, .. } => {
            // A connection belongs to one party at a time. Existing
            // membership is only forgotten once the departure has
            // actually happened, so a failed re-join never strands a
            // roster entry past the disconnect cleanup.
            if let Some(previous) = *joined
                && previous != party_id
            {
                state
                    .registry
                    .leave(previous, conn_id, identity.user_id)
                    .await?;
                *joined = None;
            }

            let snapshot = state
                .registry
                .join(party_id, conn_id, identity, tx.clone())
                .await?;
            *joined = Some(party_id);

            let _ = tx.send(ServerEnvelope::Joined {
                party_id: snapshot.party_id,
                room_code: snapshot.room_code,
                participants: snapshot.participants,
                current_time: snapshot.playback.current_time,
                is_playing: snapshot.playback.is_playing,
                sync_heartbeat_secs: snapshot.sync_heartbeat_secs,
            });
            Ok(())
        }
        ClientEnvelope::Sync {
            party_id,
            current_time,
            is_playing,
        } => {
            require_membership(*joined, party_id)?;
            state
                .registry
                .set_playback(
                    party_id,
                    Some(conn_id),
                    PlaybackState {
                        current_time,
                        is_playing,
                    },
                )
                .await?;
            Ok(())
        }
        ClientEnvelope::Chat {
            party_id, content, ..
        } => {
            require_membership(*joined, party_id)?;
            state.chat_service.send(party_id, identity, content).await?;
            Ok(())
        }
        ClientEnvelope::Reaction {
            anime_id,
            episode_id,
            reaction,
            timestamp,
        } => {
            state
                .reaction_service
                .publish(
                    identity,
                    EpisodeRef {
                        anime_id,
                        episode_id,
                    },
                    reaction,
                    timestamp,
                )
                .await?;
            Ok(())
        }
        ClientEnvelope::PollVote { poll_id, option_id } => {
            let poll = state
                .poll_engine
                .vote(poll_id, option_id, identity.user_id)
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
            Ok(())
        }
        ClientEnvelope::Leave { party_id, .. } => {
            require_membership(*joined, party_id)?;
            state
                .registry
                .leave(party_id, conn_id, identity.user_id)
                .await?;
            *joined = None;
            Ok(())
        }
    }
}

fn require_membership(joined: Option<PartyId>, party_id: PartyId) -> AppResult<()> {
    if joined == Some(party_id) {
        Ok(())
    } else {
        Err(AppError::BadRequest(format!(
            "Join party {party_id} before sending commands to it"
        )))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use aniparty_common::RoomCodeGenerator;
    use aniparty_core::{
        ChatService, GuestIdentityProvider, PollEngine, ReactionService, SessionRegistry,
        store::memory::MemoryStore,
    };

    fn test_state() -> AppState {
        let registry = Arc::new(SessionRegistry::new(RoomCodeGenerator::new(8), 5));
        let store = Arc::new(MemoryStore::new());

        AppState {
            chat_service: Arc::new(ChatService::new(registry.clone(), store.clone())),
            reaction_service: Arc::new(ReactionService::new(registry.clone(), store.clone())),
            poll_engine: Arc::new(PollEngine::new(store.clone())),
            comment_store: store,
            registry,
            identity_service: Arc::new(GuestIdentityProvider::new()),
        }
    }

    fn join_envelope(party_id: i32) -> ClientEnvelope {
        ClientEnvelope::Join {
            party_id,
            user_id: None,
            username: None,
        }
    }

    #[tokio::test]
    async fn test_failed_rejoin_keeps_membership_for_disconnect_cleanup() {
        let state = test_state();
        let member = Identity::user(2, "mira".to_string());
        let party = state
            .registry
            .create(
                &member,
                EpisodeRef {
                    anime_id: 10,
                    episode_id: 3,
                },
                true,
            )
            .await
            .unwrap();

        let (tx, _rx) = mpsc::unbounded_channel();
        let mut joined = None;
        dispatch(join_envelope(party.id), 1, &member, &tx, &mut joined, &state)
            .await
            .unwrap();
        assert_eq!(joined, Some(party.id));

        // The party ends while the member is connected; their next
        // join for the same party is refused.
        state.registry.end(party.id).await.unwrap();
        let err = dispatch(join_envelope(party.id), 1, &member, &tx, &mut joined, &state)
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "PARTY_NOT_FOUND");

        // Membership is still tracked, so the disconnect path still
        // clears the roster entry.
        assert_eq!(joined, Some(party.id));
        if let Some(party_id) = joined {
            state.registry.leave(party_id, 1, member.user_id).await.unwrap();
        }
        assert!(
            state
                .registry
                .list_participants(party.id)
                .await
                .unwrap()
                .is_empty()
        );
    }
}
