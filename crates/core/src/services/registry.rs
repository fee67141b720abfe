//! Session registry and presence tracking.
//!
//! The registry is the in-memory catalog of live watch parties, keyed
//! by id and by room code, and it owns the roster. It is the only
//! shared mutable resource for sessions: every mutation of one party
//! goes through that party's own async mutex, so concurrent commands
//! from different members serialize per session while unrelated
//! sessions proceed in parallel.
//!
//! Fan-out is per-recipient: each connection registers an unbounded
//! outbound queue drained by its own writer task. Pushing an envelope
//! never blocks, so a slow client cannot stall delivery to the rest of
//! the session, and a failed push means the connection is gone and is
//! removed from the roster on the spot.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI32, Ordering};
use tokio::sync::{Mutex, RwLock, mpsc};
use tracing::{debug, info, warn};

use aniparty_common::{AppError, AppResult, RoomCodeGenerator};

use crate::identity::Identity;
use crate::protocol::{ParticipantInfo, ServerEnvelope};

/// Watch party id.
pub type PartyId = i32;
/// Gateway connection id, unique per process.
pub type ConnId = u64;
/// Outbound queue handle for one connection.
pub type OutboundSender = mpsc::UnboundedSender<ServerEnvelope>;

/// Attempts at generating an unused room code before giving up.
const MAX_CODE_ATTEMPTS: u32 = 16;

/// The content a party is watching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EpisodeRef {
    pub anime_id: i32,
    pub episode_id: i32,
}

/// Authoritative playback state of a party.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackState {
    /// Seconds into the episode.
    pub current_time: f64,
    pub is_playing: bool,
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self {
            current_time: 0.0,
            is_playing: false,
        }
    }
}

/// Snapshot of a party as exposed over HTTP.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PartySummary {
    pub id: PartyId,
    pub creator_id: i32,
    pub anime_id: i32,
    pub episode_id: i32,
    pub room_code: String,
    pub is_public: bool,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub current_time: f64,
    pub is_playing: bool,
}

/// What a joining connection receives immediately: the roster, the
/// current authoritative playback state, and the cadence at which
/// playing clients are expected to re-emit `sync`.
#[derive(Debug, Clone)]
pub struct JoinSnapshot {
    pub party_id: PartyId,
    pub room_code: String,
    pub participants: Vec<ParticipantInfo>,
    pub playback: PlaybackState,
    pub sync_heartbeat_secs: u64,
}

/// One logical participant. Multiple simultaneous connections by the
/// same user collapse into a single entry; presence events fire only
/// when the first connection arrives or the last one goes.
struct Member {
    username: String,
    joined_at: DateTime<Utc>,
    conns: HashMap<ConnId, OutboundSender>,
}

/// Mutable state of one party, guarded by the per-party mutex.
struct PartyState {
    playback: PlaybackState,
    ended_at: Option<DateTime<Utc>>,
    members: HashMap<i32, Member>,
}

struct Party {
    id: PartyId,
    creator_id: i32,
    episode: EpisodeRef,
    room_code: String,
    is_public: bool,
    started_at: DateTime<Utc>,
    state: Mutex<PartyState>,
}

impl Party {
    fn summary(&self, state: &PartyState) -> PartySummary {
        PartySummary {
            id: self.id,
            creator_id: self.creator_id,
            anime_id: self.episode.anime_id,
            episode_id: self.episode.episode_id,
            room_code: self.room_code.clone(),
            is_public: self.is_public,
            started_at: self.started_at,
            ended_at: state.ended_at,
            current_time: state.playback.current_time,
            is_playing: state.playback.is_playing,
        }
    }
}

#[derive(Default)]
struct Index {
    by_id: HashMap<PartyId, std::sync::Arc<Party>>,
    by_code: HashMap<String, PartyId>,
}

/// In-memory catalog of live watch parties.
pub struct SessionRegistry {
    index: RwLock<Index>,
    /// Connections watching an episode, for cross-party reaction
    /// fan-out. Broader than any single party's roster.
    viewers: Mutex<HashMap<EpisodeRef, HashMap<ConnId, OutboundSender>>>,
    codes: RoomCodeGenerator,
    /// Advertised to joining clients in their `joined` response.
    sync_heartbeat_secs: u64,
    next_party_id: AtomicI32,
}

impl SessionRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new(codes: RoomCodeGenerator, sync_heartbeat_secs: u64) -> Self {
        Self {
            index: RwLock::new(Index::default()),
            viewers: Mutex::new(HashMap::new()),
            codes,
            sync_heartbeat_secs,
            next_party_id: AtomicI32::new(1),
        }
    }

    /// Create a new party. The creator becomes the sole participant
    /// once their connection joins; the room code is collision-checked
    /// against live codes.
    pub async fn create(
        &self,
        creator: &Identity,
        episode: EpisodeRef,
        is_public: bool,
    ) -> AppResult<PartySummary> {
        let mut index = self.index.write().await;

        let mut room_code = None;
        for _ in 0..MAX_CODE_ATTEMPTS {
            let candidate = self.codes.generate();
            if !index.by_code.contains_key(&candidate) {
                room_code = Some(candidate);
                break;
            }
        }
        let room_code = room_code.ok_or_else(|| {
            AppError::Internal("Room code space exhausted, could not create party".to_string())
        })?;

        let id = self.next_party_id.fetch_add(1, Ordering::Relaxed);
        let party = std::sync::Arc::new(Party {
            id,
            creator_id: creator.user_id,
            episode,
            room_code: room_code.clone(),
            is_public,
            started_at: Utc::now(),
            state: Mutex::new(PartyState {
                playback: PlaybackState::default(),
                ended_at: None,
                members: HashMap::new(),
            }),
        });

        index.by_code.insert(room_code.clone(), id);
        index.by_id.insert(id, party.clone());
        drop(index);

        info!(party_id = id, room_code = %room_code, creator = creator.user_id, "Watch party created");

        let state = party.state.lock().await;
        Ok(party.summary(&state))
    }

    async fn party(&self, party_id: PartyId) -> AppResult<std::sync::Arc<Party>> {
        self.index
            .read()
            .await
            .by_id
            .get(&party_id)
            .cloned()
            .ok_or_else(|| AppError::PartyNotFound(party_id.to_string()))
    }

    /// Look up a party by id.
    pub async fn get_by_id(&self, party_id: PartyId) -> AppResult<PartySummary> {
        let party = self.party(party_id).await?;
        let state = party.state.lock().await;
        Ok(party.summary(&state))
    }

    /// Look up a party by room code.
    pub async fn get_by_code(&self, room_code: &str) -> AppResult<PartySummary> {
        let party_id = self
            .index
            .read()
            .await
            .by_code
            .get(room_code)
            .copied()
            .ok_or_else(|| AppError::PartyNotFound(room_code.to_string()))?;
        self.get_by_id(party_id).await
    }

    /// The episode a party is watching.
    pub async fn episode_of(&self, party_id: PartyId) -> AppResult<EpisodeRef> {
        Ok(self.party(party_id).await?.episode)
    }

    /// Register a connection as a participant.
    ///
    /// The roster mutation happens first, then `participant_joined`
    /// goes to every other member, and the returned snapshot reflects
    /// the post-join roster, all under the party lock, so the
    /// broadcast can never precede queryable membership.
    pub async fn join(
        &self,
        party_id: PartyId,
        conn_id: ConnId,
        identity: &Identity,
        sender: OutboundSender,
    ) -> AppResult<JoinSnapshot> {
        let party = self.party(party_id).await?;
        let mut state = party.state.lock().await;

        if state.ended_at.is_some() {
            return Err(AppError::PartyNotFound(party_id.to_string()));
        }

        let first_conn = match state.members.entry(identity.user_id) {
            std::collections::hash_map::Entry::Occupied(mut entry) => {
                entry.get_mut().conns.insert(conn_id, sender.clone());
                false
            }
            std::collections::hash_map::Entry::Vacant(entry) => {
                let mut conns = HashMap::new();
                conns.insert(conn_id, sender.clone());
                entry.insert(Member {
                    username: identity.username.clone(),
                    joined_at: Utc::now(),
                    conns,
                });
                true
            }
        };

        if first_conn {
            let event = ServerEnvelope::ParticipantJoined {
                party_id,
                user_id: identity.user_id,
                username: identity.username.clone(),
            };
            Self::broadcast(party_id, &mut state, Some(identity.user_id), None, &event);
            debug!(party_id, user_id = identity.user_id, "Participant joined");
        }

        let snapshot = JoinSnapshot {
            party_id,
            room_code: party.room_code.clone(),
            participants: Self::roster(&state),
            playback: state.playback,
            sync_heartbeat_secs: self.sync_heartbeat_secs,
        };
        drop(state);

        // Register as an episode viewer for reaction fan-out.
        self.viewers
            .lock()
            .await
            .entry(party.episode)
            .or_default()
            .insert(conn_id, sender);

        Ok(snapshot)
    }

    /// Remove a connection from a party. An abrupt disconnect calls
    /// this through the same path as an explicit `leave`.
    pub async fn leave(&self, party_id: PartyId, conn_id: ConnId, user_id: i32) -> AppResult<()> {
        let party = self.party(party_id).await?;
        let mut state = party.state.lock().await;

        let last_conn = if let Some(member) = state.members.get_mut(&user_id) {
            member.conns.remove(&conn_id);
            member.conns.is_empty()
        } else {
            false
        };

        if last_conn {
            state.members.remove(&user_id);
            let event = ServerEnvelope::ParticipantLeft { party_id, user_id };
            Self::broadcast(party_id, &mut state, None, None, &event);
            debug!(party_id, user_id, "Participant left");
        }
        drop(state);

        let mut viewers = self.viewers.lock().await;
        if let Some(scope) = viewers.get_mut(&party.episode) {
            scope.remove(&conn_id);
            if scope.is_empty() {
                viewers.remove(&party.episode);
            }
        }

        Ok(())
    }

    /// Replace the authoritative playback state (last command wins)
    /// and fan the update out to every other connection in the party.
    pub async fn set_playback(
        &self,
        party_id: PartyId,
        issuer_conn: Option<ConnId>,
        playback: PlaybackState,
    ) -> AppResult<PlaybackState> {
        let party = self.party(party_id).await?;
        let mut state = party.state.lock().await;

        if state.ended_at.is_some() {
            return Err(AppError::Conflict("Party has ended".to_string()));
        }

        state.playback = playback;
        let event = ServerEnvelope::sync_update(party_id, playback);
        Self::broadcast(party_id, &mut state, None, issuer_conn, &event);

        Ok(playback)
    }

    /// Stamp and fan out a chat message to every member, sender
    /// included, in server receipt order. Returns the stamped
    /// envelope for durable persistence by the caller.
    pub async fn broadcast_chat(
        &self,
        party_id: PartyId,
        identity: &Identity,
        content: String,
    ) -> AppResult<ServerEnvelope> {
        let party = self.party(party_id).await?;
        let mut state = party.state.lock().await;

        if state.ended_at.is_some() {
            return Err(AppError::Conflict("Party has ended".to_string()));
        }

        let event = ServerEnvelope::ChatMessage {
            party_id,
            user_id: identity.user_id,
            username: identity.username.clone(),
            content,
            timestamp: Utc::now(),
        };
        Self::broadcast(party_id, &mut state, None, None, &event);

        Ok(event)
    }

    /// Push an envelope to every connection viewing an episode,
    /// across party boundaries. Dead connections are dropped from the
    /// viewer set as they are discovered.
    pub async fn notify_viewers(&self, episode: EpisodeRef, event: &ServerEnvelope) {
        let mut viewers = self.viewers.lock().await;
        if let Some(scope) = viewers.get_mut(&episode) {
            scope.retain(|conn_id, sender| {
                let alive = sender.send(event.clone()).is_ok();
                if !alive {
                    debug!(conn_id, "Dropping dead viewer connection");
                }
                alive
            });
            if scope.is_empty() {
                viewers.remove(&episode);
            }
        }
    }

    /// Current roster of a party.
    pub async fn list_participants(&self, party_id: PartyId) -> AppResult<Vec<ParticipantInfo>> {
        let party = self.party(party_id).await?;
        let state = party.state.lock().await;
        Ok(Self::roster(&state))
    }

    /// Explicitly end a party: the room code is released, new joins
    /// are refused, and further chat and sync commands are rejected.
    /// Members still connected observe the end through those
    /// rejections; their `leave` cleanup keeps working. Empty parties
    /// are never garbage-collected on their own; this is the only way
    /// a session ends.
    pub async fn end(&self, party_id: PartyId) -> AppResult<PartySummary> {
        let party = self.party(party_id).await?;

        let mut index = self.index.write().await;
        index.by_code.remove(&party.room_code);
        drop(index);

        let mut state = party.state.lock().await;
        if state.ended_at.is_none() {
            state.ended_at = Some(Utc::now());
            info!(party_id, "Watch party ended");
        }
        Ok(party.summary(&state))
    }

    fn roster(state: &PartyState) -> Vec<ParticipantInfo> {
        let mut participants: Vec<ParticipantInfo> = state
            .members
            .iter()
            .map(|(user_id, member)| ParticipantInfo {
                user_id: *user_id,
                username: member.username.clone(),
                joined_at: member.joined_at,
            })
            .collect();
        participants.sort_by_key(|p| p.joined_at);
        participants
    }

    /// Deliver an event to every connection in the party, except the
    /// skipped user (for presence echoes) or the skipped connection
    /// (for the issuer of a sync). A failed push marks the connection
    /// disconnected: it is removed immediately, and users left with
    /// no connections are announced as departed to the survivors.
    fn broadcast(
        party_id: PartyId,
        state: &mut PartyState,
        skip_user: Option<i32>,
        skip_conn: Option<ConnId>,
        event: &ServerEnvelope,
    ) {
        let mut departed = Vec::new();

        for (user_id, member) in &mut state.members {
            if skip_user == Some(*user_id) {
                continue;
            }
            member.conns.retain(|conn_id, sender| {
                if skip_conn == Some(*conn_id) {
                    return true;
                }
                let alive = sender.send(event.clone()).is_ok();
                if !alive {
                    warn!(party_id, user_id, conn_id, "Send failed, dropping connection");
                }
                alive
            });
            if member.conns.is_empty() {
                departed.push(*user_id);
            }
        }

        for user_id in departed {
            state.members.remove(&user_id);
            let left = ServerEnvelope::ParticipantLeft { party_id, user_id };
            for member in state.members.values_mut() {
                member.conns.retain(|_, sender| sender.send(left.clone()).is_ok());
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tokio::sync::mpsc::UnboundedReceiver;

    fn registry() -> SessionRegistry {
        SessionRegistry::new(RoomCodeGenerator::new(8), 5)
    }

    fn identity(user_id: i32, name: &str) -> Identity {
        Identity::user(user_id, name.to_string())
    }

    fn channel() -> (OutboundSender, UnboundedReceiver<ServerEnvelope>) {
        mpsc::unbounded_channel()
    }

    async fn create_party(registry: &SessionRegistry) -> PartySummary {
        registry
            .create(
                &identity(1, "host"),
                EpisodeRef {
                    anime_id: 10,
                    episode_id: 3,
                },
                true,
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_create_assigns_unique_room_codes() {
        let registry = registry();
        let a = create_party(&registry).await;
        let b = create_party(&registry).await;

        assert_ne!(a.id, b.id);
        assert_ne!(a.room_code, b.room_code);
        assert_eq!(a.room_code.len(), 8);
        assert_eq!(registry.get_by_code(&a.room_code).await.unwrap().id, a.id);
    }

    #[tokio::test]
    async fn test_unknown_party_is_not_found() {
        let registry = registry();
        let err = registry.get_by_id(99).await.unwrap_err();
        assert_eq!(err.error_code(), "PARTY_NOT_FOUND");

        let err = registry.get_by_code("ZZZZZZZZ").await.unwrap_err();
        assert_eq!(err.error_code(), "PARTY_NOT_FOUND");
    }

    #[tokio::test]
    async fn test_roster_tracks_joins_and_leaves() {
        let registry = registry();
        let party = create_party(&registry).await;

        let (tx1, _rx1) = channel();
        let (tx2, _rx2) = channel();
        registry.join(party.id, 1, &identity(1, "host"), tx1).await.unwrap();
        registry.join(party.id, 2, &identity(2, "mira"), tx2).await.unwrap();

        let roster = registry.list_participants(party.id).await.unwrap();
        assert_eq!(roster.len(), 2);

        registry.leave(party.id, 2, 2).await.unwrap();
        let roster = registry.list_participants(party.id).await.unwrap();
        assert_eq!(roster.len(), 1);
        assert_eq!(roster[0].user_id, 1);
    }

    #[tokio::test]
    async fn test_duplicate_connections_collapse_to_one_participant() {
        let registry = registry();
        let party = create_party(&registry).await;

        let (host_tx, mut host_rx) = channel();
        registry.join(party.id, 1, &identity(1, "host"), host_tx).await.unwrap();

        let (tab1, _rx1) = channel();
        let (tab2, _rx2) = channel();
        registry.join(party.id, 2, &identity(2, "mira"), tab1).await.unwrap();
        registry.join(party.id, 3, &identity(2, "mira"), tab2).await.unwrap();

        assert_eq!(registry.list_participants(party.id).await.unwrap().len(), 2);

        // Only the first connection announces the participant.
        assert!(matches!(
            host_rx.try_recv().unwrap(),
            ServerEnvelope::ParticipantJoined { user_id: 2, .. }
        ));
        assert!(host_rx.try_recv().is_err());

        // Dropping one tab keeps the participant; dropping the last
        // announces the departure.
        registry.leave(party.id, 2, 2).await.unwrap();
        assert_eq!(registry.list_participants(party.id).await.unwrap().len(), 2);
        assert!(host_rx.try_recv().is_err());

        registry.leave(party.id, 3, 2).await.unwrap();
        assert_eq!(registry.list_participants(party.id).await.unwrap().len(), 1);
        assert!(matches!(
            host_rx.try_recv().unwrap(),
            ServerEnvelope::ParticipantLeft { user_id: 2, .. }
        ));
    }

    #[tokio::test]
    async fn test_join_snapshot_carries_authoritative_state() {
        let registry = registry();
        let party = create_party(&registry).await;

        let (host_tx, _host_rx) = channel();
        registry.join(party.id, 1, &identity(1, "host"), host_tx).await.unwrap();

        // Host seeks before anyone else connects.
        registry
            .set_playback(
                party.id,
                Some(1),
                PlaybackState {
                    current_time: 321.5,
                    is_playing: true,
                },
            )
            .await
            .unwrap();

        // A late joiner sees the last command's values immediately.
        let (tx, _rx) = channel();
        let snapshot = registry.join(party.id, 2, &identity(2, "mira"), tx).await.unwrap();

        assert_eq!(snapshot.playback.current_time, 321.5);
        assert!(snapshot.playback.is_playing);
        assert_eq!(snapshot.participants.len(), 2);
        assert_eq!(snapshot.sync_heartbeat_secs, 5);
    }

    #[tokio::test]
    async fn test_sync_skips_issuer_and_reaches_everyone_else() {
        let registry = registry();
        let party = create_party(&registry).await;

        let (tx1, mut rx1) = channel();
        let (tx2, mut rx2) = channel();
        let (tx3, mut rx3) = channel();
        registry.join(party.id, 1, &identity(1, "host"), tx1).await.unwrap();
        registry.join(party.id, 2, &identity(2, "mira"), tx2).await.unwrap();
        registry.join(party.id, 3, &identity(3, "rin"), tx3).await.unwrap();

        // Drain presence events.
        while rx1.try_recv().is_ok() {}
        while rx2.try_recv().is_ok() {}
        while rx3.try_recv().is_ok() {}

        registry
            .set_playback(
                party.id,
                Some(2),
                PlaybackState {
                    current_time: 10.0,
                    is_playing: true,
                },
            )
            .await
            .unwrap();

        for rx in [&mut rx1, &mut rx3] {
            let event = rx.try_recv().unwrap();
            assert_eq!(
                event,
                ServerEnvelope::SyncUpdate {
                    party_id: party.id,
                    current_time: 10.0,
                    is_playing: true,
                }
            );
            assert!(rx.try_recv().is_err(), "exactly one update per member");
        }
        assert!(rx2.try_recv().is_err(), "issuer does not hear its own sync");
    }

    #[tokio::test]
    async fn test_last_command_wins() {
        let registry = registry();
        let party = create_party(&registry).await;

        let (tx1, _rx1) = channel();
        registry.join(party.id, 1, &identity(1, "host"), tx1).await.unwrap();

        for t in [5.0, 95.0, 40.0] {
            registry
                .set_playback(
                    party.id,
                    Some(1),
                    PlaybackState {
                        current_time: t,
                        is_playing: false,
                    },
                )
                .await
                .unwrap();
        }

        let summary = registry.get_by_id(party.id).await.unwrap();
        assert_eq!(summary.current_time, 40.0);
        assert!(!summary.is_playing);
    }

    #[tokio::test]
    async fn test_chat_reaches_all_members_in_order() {
        let registry = registry();
        let party = create_party(&registry).await;

        let (tx1, mut rx1) = channel();
        let (tx2, mut rx2) = channel();
        registry.join(party.id, 1, &identity(1, "host"), tx1).await.unwrap();
        registry.join(party.id, 2, &identity(2, "mira"), tx2).await.unwrap();
        while rx1.try_recv().is_ok() {}
        while rx2.try_recv().is_ok() {}

        registry
            .broadcast_chat(party.id, &identity(1, "host"), "first".to_string())
            .await
            .unwrap();
        registry
            .broadcast_chat(party.id, &identity(2, "mira"), "second".to_string())
            .await
            .unwrap();

        for rx in [&mut rx1, &mut rx2] {
            let first = rx.try_recv().unwrap();
            let second = rx.try_recv().unwrap();
            assert!(matches!(first, ServerEnvelope::ChatMessage { ref content, .. } if content == "first"));
            assert!(matches!(second, ServerEnvelope::ChatMessage { ref content, .. } if content == "second"));
        }
    }

    #[tokio::test]
    async fn test_dead_connection_is_treated_as_disconnected() {
        let registry = registry();
        let party = create_party(&registry).await;

        let (tx1, mut rx1) = channel();
        let (tx2, rx2) = channel();
        registry.join(party.id, 1, &identity(1, "host"), tx1).await.unwrap();
        registry.join(party.id, 2, &identity(2, "mira"), tx2).await.unwrap();
        while rx1.try_recv().is_ok() {}

        // Simulate a transport failure: the receiver side goes away
        // without a leave envelope.
        drop(rx2);

        registry
            .broadcast_chat(party.id, &identity(1, "host"), "anyone there?".to_string())
            .await
            .unwrap();

        let roster = registry.list_participants(party.id).await.unwrap();
        assert_eq!(roster.len(), 1);
        assert_eq!(roster[0].user_id, 1);

        // The survivor got the chat and then the departure notice.
        assert!(matches!(rx1.try_recv().unwrap(), ServerEnvelope::ChatMessage { .. }));
        assert!(matches!(
            rx1.try_recv().unwrap(),
            ServerEnvelope::ParticipantLeft { user_id: 2, .. }
        ));
    }

    #[tokio::test]
    async fn test_reactions_reach_viewers_across_parties() {
        let registry = registry();
        let episode = EpisodeRef {
            anime_id: 10,
            episode_id: 3,
        };
        let a = create_party(&registry).await;
        let b = create_party(&registry).await;

        let (tx1, mut rx1) = channel();
        let (tx2, mut rx2) = channel();
        registry.join(a.id, 1, &identity(1, "host"), tx1).await.unwrap();
        registry.join(b.id, 2, &identity(2, "mira"), tx2).await.unwrap();

        let event = ServerEnvelope::PollUpdate { poll_id: 7 };
        registry.notify_viewers(episode, &event).await;

        assert_eq!(rx1.try_recv().unwrap(), event);
        assert_eq!(rx2.try_recv().unwrap(), event);
    }

    #[tokio::test]
    async fn test_ended_party_refuses_joins_and_releases_code() {
        let registry = registry();
        let party = create_party(&registry).await;

        registry.end(party.id).await.unwrap();

        let err = registry.get_by_code(&party.room_code).await.unwrap_err();
        assert_eq!(err.error_code(), "PARTY_NOT_FOUND");

        let (tx, _rx) = channel();
        let err = registry
            .join(party.id, 1, &identity(1, "host"), tx)
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "PARTY_NOT_FOUND");

        // Still queryable by id, with the end time recorded.
        let summary = registry.get_by_id(party.id).await.unwrap();
        assert!(summary.ended_at.is_some());
    }

    #[tokio::test]
    async fn test_ended_party_rejects_chat_and_sync_but_allows_leave() {
        let registry = registry();
        let party = create_party(&registry).await;

        let (tx, mut rx) = channel();
        registry.join(party.id, 1, &identity(1, "host"), tx).await.unwrap();

        registry.end(party.id).await.unwrap();

        let err = registry
            .set_playback(
                party.id,
                Some(1),
                PlaybackState {
                    current_time: 99.0,
                    is_playing: true,
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "CONFLICT");

        let err = registry
            .broadcast_chat(party.id, &identity(1, "host"), "still here?".to_string())
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "CONFLICT");
        assert!(rx.try_recv().is_err(), "nothing is delivered after the end");

        // Disconnect cleanup still works on an ended party.
        registry.leave(party.id, 1, 1).await.unwrap();
        assert!(registry.list_participants(party.id).await.unwrap().is_empty());
    }
}
