//! Wire protocol for the watch-party WebSocket gateway.
//!
//! Every frame is a JSON object tagged by `type`. Inbound envelopes
//! ([`ClientEnvelope`]) carry the action a connection requests;
//! outbound envelopes ([`ServerEnvelope`]) carry the events fanned
//! out to session members. Client-supplied `userId`/`username`
//! fields are accepted for backward compatibility but the gateway
//! always substitutes the identity it resolved for the connection.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::services::registry::PlaybackState;

/// Inbound message from a client connection.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ClientEnvelope {
    /// Join a watch party.
    Join {
        party_id: i32,
        /// Ignored; identity is resolved server-side.
        #[serde(default)]
        user_id: Option<i32>,
        /// Ignored; identity is resolved server-side.
        #[serde(default)]
        username: Option<String>,
    },
    /// Replace the authoritative playback state.
    Sync {
        party_id: i32,
        current_time: f64,
        is_playing: bool,
    },
    /// Post a chat message to the party.
    Chat {
        party_id: i32,
        #[serde(default)]
        user_id: Option<i32>,
        #[serde(default)]
        username: Option<String>,
        content: String,
    },
    /// Emit an ephemeral reaction at a video timestamp.
    Reaction {
        anime_id: i32,
        episode_id: i32,
        reaction: String,
        /// Video second the reaction refers to.
        timestamp: i32,
    },
    /// Cast or switch a poll vote.
    PollVote { poll_id: i32, option_id: i32 },
    /// Leave the party.
    Leave {
        party_id: i32,
        #[serde(default)]
        user_id: Option<i32>,
    },
}

/// Outbound message pushed to client connections.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ServerEnvelope {
    /// Direct response to `join`: the roster and the current
    /// authoritative playback state, so a late joiner is never out
    /// of sync.
    Joined {
        party_id: i32,
        room_code: String,
        participants: Vec<ParticipantInfo>,
        current_time: f64,
        is_playing: bool,
        /// Cadence at which playing clients should re-emit `sync`.
        sync_heartbeat_secs: u64,
    },
    /// Playback state changed; sent to every member except the one
    /// that issued the command.
    SyncUpdate {
        party_id: i32,
        current_time: f64,
        is_playing: bool,
    },
    /// A participant joined; sent to every other member.
    ParticipantJoined {
        party_id: i32,
        user_id: i32,
        username: String,
    },
    /// A participant left or disconnected; sent to every other member.
    ParticipantLeft { party_id: i32, user_id: i32 },
    /// A chat message; sent to every member in server receipt order.
    ChatMessage {
        party_id: i32,
        user_id: i32,
        username: String,
        content: String,
        timestamp: DateTime<Utc>,
    },
    /// An ephemeral reaction; sent to every viewer of the episode.
    NewReaction { reaction: ReactionInfo },
    /// A poll's tally changed; consumers re-fetch the results.
    PollUpdate { poll_id: i32 },
    /// A per-action rejection. The connection stays open.
    Error { code: String, message: String },
}

/// Roster entry as exposed over the wire.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantInfo {
    pub user_id: i32,
    pub username: String,
    pub joined_at: DateTime<Utc>,
}

/// Reaction payload as exposed over the wire.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReactionInfo {
    pub user_id: i32,
    pub username: String,
    pub anime_id: i32,
    pub episode_id: i32,
    pub reaction: String,
    pub timestamp: i32,
    pub created_at: DateTime<Utc>,
}

impl ServerEnvelope {
    /// Build a `sync_update` from an authoritative playback state.
    #[must_use]
    pub const fn sync_update(party_id: i32, playback: PlaybackState) -> Self {
        Self::SyncUpdate {
            party_id,
            current_time: playback.current_time,
            is_playing: playback.is_playing,
        }
    }
}

/// Returns true for frames in the historical simplified protocol: a
/// bare action word ("join", "sync", ...) sent ahead of the real JSON
/// envelope. These are accepted and ignored, never rejected.
#[must_use]
pub fn is_legacy_probe(text: &str) -> bool {
    !text.trim_start().starts_with('{')
}
