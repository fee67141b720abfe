//! Domain logic of the watch-party engine: the session registry,
//! playback sync, chat and reaction fan-out, the poll engine, and the
//! persistence seams. Transport (WebSocket and HTTP) lives in
//! `aniparty-api`; storage implementations live in `aniparty-db`.

pub mod identity;
pub mod protocol;
pub mod services;
pub mod store;

pub use identity::{GuestIdentityProvider, Identity, IdentityProvider, IdentityService};
pub use protocol::{ClientEnvelope, ParticipantInfo, ReactionInfo, ServerEnvelope};
pub use services::chat::ChatService;
pub use services::poll::{PollEngine, PollResults};
pub use services::reaction::ReactionService;
pub use services::registry::{
    ConnId, EpisodeRef, JoinSnapshot, PartyId, PartySummary, PlaybackState, SessionRegistry,
};
