//! Database repositories implementing the core store traits.

pub mod comment;
pub mod poll;
pub mod reaction;

pub use comment::CommentRepository;
pub use poll::PollRepository;
pub use reaction::ReactionRepository;
