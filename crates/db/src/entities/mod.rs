//! Database entities.

pub mod episode_comment;
pub mod episode_poll;
pub mod episode_reaction;
pub mod poll_option;
pub mod poll_vote;

pub use episode_comment::Entity as EpisodeComment;
pub use episode_poll::Entity as EpisodePoll;
pub use episode_reaction::Entity as EpisodeReaction;
pub use poll_option::Entity as PollOption;
pub use poll_vote::Entity as PollVote;
