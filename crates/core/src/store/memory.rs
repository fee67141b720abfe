//! In-memory store implementation.
//!
//! Backs tests and the database-less development mode. Serial ids
//! start at 1, matching what the SQL schema would hand out.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::Mutex;

use aniparty_common::{AppError, AppResult};

use super::{
    CommentRecord, CommentStore, NewComment, NewPoll, NewReaction, PollOptionRecord, PollRecord,
    PollStore, PollVoteRecord, ReactionRecord, ReactionStore,
};

#[derive(Default)]
struct Inner {
    comments: HashMap<i32, CommentRecord>,
    reactions: Vec<ReactionRecord>,
    polls: HashMap<i32, PollRecord>,
    options: HashMap<i32, PollOptionRecord>,
    votes: HashMap<i32, PollVoteRecord>,
    next_comment_id: i32,
    next_reaction_id: i32,
    next_poll_id: i32,
    next_option_id: i32,
    next_vote_id: i32,
}

impl Inner {
    fn new() -> Self {
        Self {
            next_comment_id: 1,
            next_reaction_id: 1,
            next_poll_id: 1,
            next_option_id: 1,
            next_vote_id: 1,
            ..Self::default()
        }
    }
}

/// Map-backed implementation of all three store traits.
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::new()),
        }
    }
}

#[async_trait]
impl CommentStore for MemoryStore {
    async fn create_comment(&self, input: NewComment) -> AppResult<CommentRecord> {
        let mut inner = self.inner.lock().await;
        let id = inner.next_comment_id;
        inner.next_comment_id += 1;

        let now = Utc::now();
        let comment = CommentRecord {
            id,
            user_id: input.user_id,
            username: input.username,
            anime_id: input.anime_id,
            episode_id: input.episode_id,
            content: input.content,
            timestamp: input.timestamp,
            parent_id: input.parent_id,
            created_at: now,
            updated_at: now,
            is_deleted: false,
            likes: 0,
        };
        inner.comments.insert(id, comment.clone());
        Ok(comment)
    }

    async fn list_comments(&self, anime_id: i32, episode_id: i32) -> AppResult<Vec<CommentRecord>> {
        let inner = self.inner.lock().await;
        let mut comments: Vec<CommentRecord> = inner
            .comments
            .values()
            .filter(|c| c.anime_id == anime_id && c.episode_id == episode_id && !c.is_deleted)
            .cloned()
            .collect();
        comments.sort_by_key(|c| c.id);
        Ok(comments)
    }

    async fn soft_delete_comment(&self, comment_id: i32, user_id: i32) -> AppResult<()> {
        let mut inner = self.inner.lock().await;
        let comment = inner
            .comments
            .get_mut(&comment_id)
            .ok_or_else(|| AppError::NotFound(format!("Comment not found: {comment_id}")))?;

        if comment.user_id != user_id {
            return Err(AppError::Forbidden(
                "Cannot delete another user's comment".to_string(),
            ));
        }

        comment.is_deleted = true;
        comment.updated_at = Utc::now();
        Ok(())
    }

    async fn like_comment(&self, comment_id: i32) -> AppResult<CommentRecord> {
        let mut inner = self.inner.lock().await;
        let comment = inner
            .comments
            .get_mut(&comment_id)
            .ok_or_else(|| AppError::NotFound(format!("Comment not found: {comment_id}")))?;

        comment.likes += 1;
        Ok(comment.clone())
    }
}

#[async_trait]
impl ReactionStore for MemoryStore {
    async fn create_reaction(&self, input: NewReaction) -> AppResult<ReactionRecord> {
        let mut inner = self.inner.lock().await;
        let id = inner.next_reaction_id;
        inner.next_reaction_id += 1;

        let reaction = ReactionRecord {
            id,
            user_id: input.user_id,
            username: input.username,
            anime_id: input.anime_id,
            episode_id: input.episode_id,
            reaction: input.reaction,
            timestamp: input.timestamp,
            created_at: Utc::now(),
        };
        inner.reactions.push(reaction.clone());
        Ok(reaction)
    }

    async fn list_recent_reactions(
        &self,
        anime_id: i32,
        episode_id: i32,
        limit: u64,
    ) -> AppResult<Vec<ReactionRecord>> {
        let inner = self.inner.lock().await;
        let mut reactions: Vec<ReactionRecord> = inner
            .reactions
            .iter()
            .filter(|r| r.anime_id == anime_id && r.episode_id == episode_id)
            .cloned()
            .collect();
        reactions.sort_by(|a, b| b.id.cmp(&a.id));
        reactions.truncate(limit as usize);
        Ok(reactions)
    }
}

#[async_trait]
impl PollStore for MemoryStore {
    async fn create_poll(&self, input: NewPoll) -> AppResult<(PollRecord, Vec<PollOptionRecord>)> {
        let mut inner = self.inner.lock().await;
        let poll_id = inner.next_poll_id;
        inner.next_poll_id += 1;

        let poll = PollRecord {
            id: poll_id,
            anime_id: input.anime_id,
            episode_id: input.episode_id,
            question: input.question,
            created_by: input.created_by,
            is_active: true,
            created_at: Utc::now(),
            ended_at: None,
        };
        inner.polls.insert(poll_id, poll.clone());

        let mut options = Vec::with_capacity(input.options.len());
        for option in input.options {
            let option_id = inner.next_option_id;
            inner.next_option_id += 1;
            let record = PollOptionRecord {
                id: option_id,
                poll_id,
                text: option.text,
                image_url: option.image_url,
            };
            inner.options.insert(option_id, record.clone());
            options.push(record);
        }

        Ok((poll, options))
    }

    async fn find_poll(&self, poll_id: i32) -> AppResult<Option<PollRecord>> {
        let inner = self.inner.lock().await;
        Ok(inner.polls.get(&poll_id).cloned())
    }

    async fn poll_options(&self, poll_id: i32) -> AppResult<Vec<PollOptionRecord>> {
        let inner = self.inner.lock().await;
        let mut options: Vec<PollOptionRecord> = inner
            .options
            .values()
            .filter(|o| o.poll_id == poll_id)
            .cloned()
            .collect();
        options.sort_by_key(|o| o.id);
        Ok(options)
    }

    async fn find_active_poll(
        &self,
        anime_id: i32,
        episode_id: i32,
    ) -> AppResult<Option<PollRecord>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .polls
            .values()
            .filter(|p| p.anime_id == anime_id && p.episode_id == episode_id && p.is_active)
            .max_by_key(|p| (p.created_at, p.id))
            .cloned())
    }

    async fn end_poll(&self, poll_id: i32) -> AppResult<PollRecord> {
        let mut inner = self.inner.lock().await;
        let poll = inner
            .polls
            .get_mut(&poll_id)
            .ok_or_else(|| AppError::PollNotFound(poll_id.to_string()))?;

        if poll.is_active {
            poll.is_active = false;
            poll.ended_at = Some(Utc::now());
        }
        Ok(poll.clone())
    }

    async fn find_vote(&self, poll_id: i32, user_id: i32) -> AppResult<Option<PollVoteRecord>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .votes
            .values()
            .find(|v| v.poll_id == poll_id && v.user_id == user_id)
            .cloned())
    }

    async fn delete_vote(&self, vote_id: i32) -> AppResult<()> {
        let mut inner = self.inner.lock().await;
        inner.votes.remove(&vote_id);
        Ok(())
    }

    async fn insert_vote(
        &self,
        poll_id: i32,
        option_id: i32,
        user_id: i32,
    ) -> AppResult<PollVoteRecord> {
        let mut inner = self.inner.lock().await;
        let id = inner.next_vote_id;
        inner.next_vote_id += 1;

        let vote = PollVoteRecord {
            id,
            poll_id,
            option_id,
            user_id,
            voted_at: Utc::now(),
        };
        inner.votes.insert(id, vote.clone());
        Ok(vote)
    }

    async fn poll_votes(&self, poll_id: i32) -> AppResult<Vec<PollVoteRecord>> {
        let inner = self.inner.lock().await;
        let mut votes: Vec<PollVoteRecord> = inner
            .votes
            .values()
            .filter(|v| v.poll_id == poll_id)
            .cloned()
            .collect();
        votes.sort_by_key(|v| v.id);
        Ok(votes)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::store::NewPollOption;

    fn comment_input(user_id: i32, content: &str) -> NewComment {
        NewComment {
            user_id,
            username: format!("user{user_id}"),
            anime_id: 10,
            episode_id: 3,
            content: content.to_string(),
            timestamp: None,
            parent_id: None,
        }
    }

    #[tokio::test]
    async fn test_soft_deleted_comments_are_hidden() {
        let store = MemoryStore::new();

        let kept = store.create_comment(comment_input(1, "first")).await.unwrap();
        let gone = store.create_comment(comment_input(1, "second")).await.unwrap();

        store.soft_delete_comment(gone.id, 1).await.unwrap();

        let listed = store.list_comments(10, 3).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, kept.id);
    }

    #[tokio::test]
    async fn test_only_author_may_soft_delete() {
        let store = MemoryStore::new();
        let comment = store.create_comment(comment_input(1, "mine")).await.unwrap();

        let err = store.soft_delete_comment(comment.id, 2).await.unwrap_err();
        assert_eq!(err.error_code(), "FORBIDDEN");
    }

    #[tokio::test]
    async fn test_like_counter_increments() {
        let store = MemoryStore::new();
        let comment = store.create_comment(comment_input(1, "nice scene")).await.unwrap();

        store.like_comment(comment.id).await.unwrap();
        let liked = store.like_comment(comment.id).await.unwrap();

        assert_eq!(liked.likes, 2);
    }

    #[tokio::test]
    async fn test_active_poll_is_most_recent() {
        let store = MemoryStore::new();
        let options = vec![
            NewPollOption {
                text: "yes".to_string(),
                image_url: None,
            },
            NewPollOption {
                text: "no".to_string(),
                image_url: None,
            },
        ];

        let (older, _) = store
            .create_poll(NewPoll {
                anime_id: 10,
                episode_id: 3,
                question: "Good episode?".to_string(),
                created_by: Some(1),
                options: options.clone(),
            })
            .await
            .unwrap();
        let (newer, _) = store
            .create_poll(NewPoll {
                anime_id: 10,
                episode_id: 3,
                question: "Best fight so far?".to_string(),
                created_by: Some(1),
                options,
            })
            .await
            .unwrap();

        let active = store.find_active_poll(10, 3).await.unwrap().unwrap();
        assert_eq!(active.id, newer.id);

        store.end_poll(newer.id).await.unwrap();
        let active = store.find_active_poll(10, 3).await.unwrap().unwrap();
        assert_eq!(active.id, older.id);
    }
}
