//! Persistence adapter for the durable collaborators.
//!
//! The live session engine persists final or append-only records
//! (episode comments, reaction audit copies, polls and votes) through
//! these narrow traits and never assumes a storage technology. The
//! `aniparty-db` crate provides the `PostgreSQL`-backed
//! implementations; [`memory::MemoryStore`] backs tests and the
//! database-less mode.

pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

use aniparty_common::AppResult;

/// A persisted episode comment.
///
/// Comments are moderatable and threadable, unlike live chat which is
/// broadcast-only: they carry soft-delete state, a like counter and
/// an optional parent reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentRecord {
    pub id: i32,
    pub user_id: i32,
    pub username: String,
    pub anime_id: i32,
    pub episode_id: i32,
    pub content: String,
    /// Video second the comment refers to, if any.
    pub timestamp: Option<i32>,
    /// Parent comment for reply threading.
    pub parent_id: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub is_deleted: bool,
    pub likes: i32,
}

/// Input for creating a comment.
#[derive(Debug, Clone)]
pub struct NewComment {
    pub user_id: i32,
    pub username: String,
    pub anime_id: i32,
    pub episode_id: i32,
    pub content: String,
    pub timestamp: Option<i32>,
    pub parent_id: Option<i32>,
}

/// A persisted reaction audit record. Written asynchronously after
/// live delivery; never read back into the live stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReactionRecord {
    pub id: i32,
    pub user_id: i32,
    pub username: String,
    pub anime_id: i32,
    pub episode_id: i32,
    pub reaction: String,
    /// Video second the reaction refers to.
    pub timestamp: i32,
    pub created_at: DateTime<Utc>,
}

/// Input for recording a reaction.
#[derive(Debug, Clone)]
pub struct NewReaction {
    pub user_id: i32,
    pub username: String,
    pub anime_id: i32,
    pub episode_id: i32,
    pub reaction: String,
    pub timestamp: i32,
}

/// A persisted poll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PollRecord {
    pub id: i32,
    pub anime_id: i32,
    pub episode_id: i32,
    pub question: String,
    pub created_by: Option<i32>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

/// A persisted poll option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PollOptionRecord {
    pub id: i32,
    pub poll_id: i32,
    pub text: String,
    pub image_url: Option<String>,
}

/// A persisted poll vote. At most one per (poll, user).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PollVoteRecord {
    pub id: i32,
    pub poll_id: i32,
    pub option_id: i32,
    pub user_id: i32,
    pub voted_at: DateTime<Utc>,
}

/// Input for creating a poll with its options.
#[derive(Debug, Clone)]
pub struct NewPoll {
    pub anime_id: i32,
    pub episode_id: i32,
    pub question: String,
    pub created_by: Option<i32>,
    pub options: Vec<NewPollOption>,
}

/// Input for one poll option.
#[derive(Debug, Clone)]
pub struct NewPollOption {
    pub text: String,
    pub image_url: Option<String>,
}

/// Durable store for episode comments.
#[async_trait]
pub trait CommentStore: Send + Sync {
    /// Persist a new comment.
    async fn create_comment(&self, input: NewComment) -> AppResult<CommentRecord>;

    /// List comments for an episode, oldest first, excluding
    /// soft-deleted ones. Replies are included and threaded by the
    /// caller via `parent_id`.
    async fn list_comments(&self, anime_id: i32, episode_id: i32) -> AppResult<Vec<CommentRecord>>;

    /// Soft-delete a comment. Only the author may delete.
    async fn soft_delete_comment(&self, comment_id: i32, user_id: i32) -> AppResult<()>;

    /// Increment a comment's like counter.
    async fn like_comment(&self, comment_id: i32) -> AppResult<CommentRecord>;
}

/// Durable audit store for reactions.
#[async_trait]
pub trait ReactionStore: Send + Sync {
    /// Persist a reaction audit copy.
    async fn create_reaction(&self, input: NewReaction) -> AppResult<ReactionRecord>;

    /// List the most recent reactions for an episode, newest first.
    async fn list_recent_reactions(
        &self,
        anime_id: i32,
        episode_id: i32,
        limit: u64,
    ) -> AppResult<Vec<ReactionRecord>>;
}

/// Durable store for polls, options and votes.
#[async_trait]
pub trait PollStore: Send + Sync {
    /// Persist a poll and its options.
    async fn create_poll(&self, input: NewPoll) -> AppResult<(PollRecord, Vec<PollOptionRecord>)>;

    /// Find a poll by id.
    async fn find_poll(&self, poll_id: i32) -> AppResult<Option<PollRecord>>;

    /// Options of a poll, in insertion order.
    async fn poll_options(&self, poll_id: i32) -> AppResult<Vec<PollOptionRecord>>;

    /// Most recently created active poll for an episode, if any.
    async fn find_active_poll(
        &self,
        anime_id: i32,
        episode_id: i32,
    ) -> AppResult<Option<PollRecord>>;

    /// Mark a poll ended. Idempotent.
    async fn end_poll(&self, poll_id: i32) -> AppResult<PollRecord>;

    /// The live vote of a user on a poll, if any.
    async fn find_vote(&self, poll_id: i32, user_id: i32) -> AppResult<Option<PollVoteRecord>>;

    /// Remove a vote by id.
    async fn delete_vote(&self, vote_id: i32) -> AppResult<()>;

    /// Insert a vote.
    async fn insert_vote(
        &self,
        poll_id: i32,
        option_id: i32,
        user_id: i32,
    ) -> AppResult<PollVoteRecord>;

    /// All votes currently cast on a poll.
    async fn poll_votes(&self, poll_id: i32) -> AppResult<Vec<PollVoteRecord>>;
}

/// Shared comment store handle.
pub type CommentStoreHandle = Arc<dyn CommentStore>;
/// Shared reaction store handle.
pub type ReactionStoreHandle = Arc<dyn ReactionStore>;
/// Shared poll store handle.
pub type PollStoreHandle = Arc<dyn PollStore>;
