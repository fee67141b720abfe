//! Poll engine.
//!
//! Polls belong to an episode, not a party, so every session watching
//! the same content votes in the same poll. Each user holds at most
//! one vote per poll and may switch it while the poll is active; a
//! switch is a delete-then-insert executed under a per-poll async
//! lock, so two racing votes from one user can never leave both rows
//! behind.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use aniparty_common::{AppError, AppResult};

use crate::store::{NewPoll, PollOptionRecord, PollRecord, PollStoreHandle};

/// A poll with its per-option tallies.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PollResults {
    #[serde(flatten)]
    pub poll: PollRecord,
    pub options: Vec<OptionTally>,
    pub total_votes: usize,
    /// The requesting user's current choice, if any.
    pub user_vote: Option<i32>,
}

#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionTally {
    pub id: i32,
    pub text: String,
    pub image_url: Option<String>,
    pub votes: usize,
    /// Share of the total vote, 0..=100. All zeros when nobody has
    /// voted yet.
    pub percentage: f64,
}

pub struct PollEngine {
    store: PollStoreHandle,
    /// One lock per active poll, created on first vote and removed
    /// when the poll ends or turns out not to exist. Anyone on the
    /// gateway can send a `poll_vote` for an arbitrary id, so stale
    /// entries must not accumulate.
    vote_locks: Mutex<HashMap<i32, Arc<Mutex<()>>>>,
}

impl PollEngine {
    #[must_use]
    pub fn new(store: PollStoreHandle) -> Self {
        Self {
            store,
            vote_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Create a poll with its options.
    pub async fn create(&self, input: NewPoll) -> AppResult<PollResults> {
        if input.question.trim().is_empty() {
            return Err(AppError::Validation("Poll question is empty".to_string()));
        }
        if input.options.len() < 2 {
            return Err(AppError::Validation(
                "A poll needs at least two options".to_string(),
            ));
        }
        if input.options.iter().any(|o| o.text.trim().is_empty()) {
            return Err(AppError::Validation("Poll option text is empty".to_string()));
        }

        let (poll, options) = self.store.create_poll(input).await?;
        Ok(Self::empty_results(poll, options))
    }

    /// The most recent active poll for an episode, with tallies.
    pub async fn active(
        &self,
        anime_id: i32,
        episode_id: i32,
        user_id: Option<i32>,
    ) -> AppResult<Option<PollResults>> {
        match self.store.find_active_poll(anime_id, episode_id).await? {
            Some(poll) => Ok(Some(self.tally(poll, user_id).await?)),
            None => Ok(None),
        }
    }

    /// A poll's current tallies.
    pub async fn results(&self, poll_id: i32, user_id: Option<i32>) -> AppResult<PollResults> {
        let poll = self
            .store
            .find_poll(poll_id)
            .await?
            .ok_or_else(|| AppError::PollNotFound(poll_id.to_string()))?;
        self.tally(poll, user_id).await
    }

    /// Cast or switch a vote. Voting for the option already held is a
    /// no-op; voting for another option replaces the previous vote
    /// atomically. Returns the poll so callers can notify its
    /// episode's viewers.
    pub async fn vote(&self, poll_id: i32, option_id: i32, user_id: i32) -> AppResult<PollRecord> {
        let lock = {
            let mut locks = self.vote_locks.lock().await;
            locks.entry(poll_id).or_default().clone()
        };
        let _guard = lock.lock().await;

        let Some(poll) = self.store.find_poll(poll_id).await? else {
            self.discard_lock(poll_id).await;
            return Err(AppError::PollNotFound(poll_id.to_string()));
        };
        if !poll.is_active {
            self.discard_lock(poll_id).await;
            return Err(AppError::Conflict("Poll has ended".to_string()));
        }

        let options = self.store.poll_options(poll_id).await?;
        if !options.iter().any(|o| o.id == option_id) {
            return Err(AppError::BadRequest(format!(
                "Option {option_id} does not belong to poll {poll_id}"
            )));
        }

        if let Some(existing) = self.store.find_vote(poll_id, user_id).await? {
            if existing.option_id == option_id {
                return Ok(poll);
            }
            self.store.delete_vote(existing.id).await?;
        }
        self.store.insert_vote(poll_id, option_id, user_id).await?;

        Ok(poll)
    }

    /// End a poll. Only its creator may end it; polls without a
    /// recorded creator can be ended by anyone.
    pub async fn end(&self, poll_id: i32, user_id: i32) -> AppResult<PollRecord> {
        let poll = self
            .store
            .find_poll(poll_id)
            .await?
            .ok_or_else(|| AppError::PollNotFound(poll_id.to_string()))?;

        if let Some(creator) = poll.created_by
            && creator != user_id
        {
            return Err(AppError::Forbidden(
                "Only the poll creator can end it".to_string(),
            ));
        }

        let poll = self.store.end_poll(poll_id).await?;
        self.discard_lock(poll_id).await;
        Ok(poll)
    }

    /// Drop the vote lock for a poll that is gone or no longer
    /// accepts votes. Racing voters holding a clone of the lock
    /// finish their critical section and then fail the active check.
    async fn discard_lock(&self, poll_id: i32) {
        self.vote_locks.lock().await.remove(&poll_id);
    }

    async fn tally(&self, poll: PollRecord, user_id: Option<i32>) -> AppResult<PollResults> {
        let options = self.store.poll_options(poll.id).await?;
        let votes = self.store.poll_votes(poll.id).await?;

        let mut counts: HashMap<i32, usize> = HashMap::new();
        for vote in &votes {
            *counts.entry(vote.option_id).or_default() += 1;
        }
        let user_vote = user_id
            .and_then(|uid| votes.iter().find(|v| v.user_id == uid))
            .map(|v| v.option_id);

        let total = votes.len();
        Ok(PollResults {
            total_votes: total,
            user_vote,
            options: options
                .into_iter()
                .map(|o| {
                    let count = counts.get(&o.id).copied().unwrap_or(0);
                    OptionTally {
                        id: o.id,
                        text: o.text,
                        image_url: o.image_url,
                        votes: count,
                        percentage: if total == 0 {
                            0.0
                        } else {
                            count as f64 / total as f64 * 100.0
                        },
                    }
                })
                .collect(),
            poll,
        })
    }

    fn empty_results(poll: PollRecord, options: Vec<PollOptionRecord>) -> PollResults {
        PollResults {
            total_votes: 0,
            user_vote: None,
            options: options
                .into_iter()
                .map(|o| OptionTally {
                    id: o.id,
                    text: o.text,
                    image_url: o.image_url,
                    votes: 0,
                    percentage: 0.0,
                })
                .collect(),
            poll,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::store::{NewPollOption, memory::MemoryStore};

    fn engine() -> PollEngine {
        PollEngine::new(Arc::new(MemoryStore::new()))
    }

    fn poll_input() -> NewPoll {
        NewPoll {
            anime_id: 10,
            episode_id: 3,
            question: "Best girl this episode?".to_string(),
            created_by: Some(1),
            options: vec![
                NewPollOption {
                    text: "Mira".to_string(),
                    image_url: None,
                },
                NewPollOption {
                    text: "Rin".to_string(),
                    image_url: None,
                },
            ],
        }
    }

    #[tokio::test]
    async fn test_create_rejects_degenerate_polls() {
        let engine = engine();

        let mut one_option = poll_input();
        one_option.options.truncate(1);
        let err = engine.create(one_option).await.unwrap_err();
        assert_eq!(err.error_code(), "VALIDATION_ERROR");

        let mut blank = poll_input();
        blank.question = "  ".to_string();
        let err = engine.create(blank).await.unwrap_err();
        assert_eq!(err.error_code(), "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_one_vote_per_user_with_switching() {
        let engine = engine();
        let created = engine.create(poll_input()).await.unwrap();
        let poll_id = created.poll.id;
        let (first, second) = (created.options[0].id, created.options[1].id);

        engine.vote(poll_id, first, 7).await.unwrap();
        engine.vote(poll_id, first, 8).await.unwrap();

        let results = engine.results(poll_id, Some(7)).await.unwrap();
        assert_eq!(results.total_votes, 2);
        assert_eq!(results.user_vote, Some(first));

        // Switching moves the vote, it never duplicates it.
        engine.vote(poll_id, second, 7).await.unwrap();
        let results = engine.results(poll_id, Some(7)).await.unwrap();
        assert_eq!(results.total_votes, 2);
        assert_eq!(results.user_vote, Some(second));
        assert_eq!(results.options[0].votes, 1);
        assert_eq!(results.options[1].votes, 1);
    }

    #[tokio::test]
    async fn test_percentages_sum_to_whole_and_guard_zero_votes() {
        let engine = engine();
        let created = engine.create(poll_input()).await.unwrap();
        let poll_id = created.poll.id;

        // Nobody has voted: every percentage is zero, not NaN.
        assert!(created.options.iter().all(|o| o.percentage == 0.0));
        let results = engine.results(poll_id, None).await.unwrap();
        assert!(results.options.iter().all(|o| o.percentage == 0.0));

        engine.vote(poll_id, created.options[0].id, 1).await.unwrap();
        engine.vote(poll_id, created.options[0].id, 2).await.unwrap();
        engine.vote(poll_id, created.options[1].id, 3).await.unwrap();

        let results = engine.results(poll_id, None).await.unwrap();
        let sum: f64 = results.options.iter().map(|o| o.percentage).sum();
        assert!((sum - 100.0).abs() < 1e-9);
        assert!((results.options[0].percentage - 200.0 / 3.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_revoting_same_option_is_a_noop() {
        let engine = engine();
        let created = engine.create(poll_input()).await.unwrap();
        let poll_id = created.poll.id;
        let option = created.options[0].id;

        engine.vote(poll_id, option, 7).await.unwrap();
        engine.vote(poll_id, option, 7).await.unwrap();

        let results = engine.results(poll_id, Some(7)).await.unwrap();
        assert_eq!(results.total_votes, 1);
    }

    #[tokio::test]
    async fn test_vote_validates_poll_and_option() {
        let engine = engine();
        let created = engine.create(poll_input()).await.unwrap();
        let poll_id = created.poll.id;

        let err = engine.vote(99, 1, 7).await.unwrap_err();
        assert_eq!(err.error_code(), "POLL_NOT_FOUND");

        let err = engine.vote(poll_id, 999, 7).await.unwrap_err();
        assert_eq!(err.error_code(), "BAD_REQUEST");
    }

    #[tokio::test]
    async fn test_ended_poll_refuses_votes_but_keeps_results() {
        let engine = engine();
        let created = engine.create(poll_input()).await.unwrap();
        let poll_id = created.poll.id;
        let option = created.options[0].id;

        engine.vote(poll_id, option, 7).await.unwrap();
        engine.end(poll_id, 1).await.unwrap();

        let err = engine.vote(poll_id, option, 8).await.unwrap_err();
        assert_eq!(err.error_code(), "CONFLICT");

        let results = engine.results(poll_id, None).await.unwrap();
        assert!(!results.poll.is_active);
        assert_eq!(results.total_votes, 1);
    }

    #[tokio::test]
    async fn test_only_creator_may_end() {
        let engine = engine();
        let created = engine.create(poll_input()).await.unwrap();

        let err = engine.end(created.poll.id, 99).await.unwrap_err();
        assert_eq!(err.error_code(), "FORBIDDEN");
    }

    #[tokio::test]
    async fn test_vote_lock_map_does_not_retain_dead_polls() {
        let engine = engine();

        // Votes against polls that never existed leave no lock behind.
        for poll_id in 100..110 {
            let err = engine.vote(poll_id, 1, 7).await.unwrap_err();
            assert_eq!(err.error_code(), "POLL_NOT_FOUND");
        }
        assert!(engine.vote_locks.lock().await.is_empty());

        // A live poll holds exactly one lock entry while votable.
        let created = engine.create(poll_input()).await.unwrap();
        let poll_id = created.poll.id;
        engine.vote(poll_id, created.options[0].id, 7).await.unwrap();
        assert_eq!(engine.vote_locks.lock().await.len(), 1);

        // Ending the poll releases it; late votes do not resurrect it.
        engine.end(poll_id, 1).await.unwrap();
        assert!(engine.vote_locks.lock().await.is_empty());
        let err = engine.vote(poll_id, created.options[0].id, 8).await.unwrap_err();
        assert_eq!(err.error_code(), "CONFLICT");
        assert!(engine.vote_locks.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_votes_from_one_user_leave_one_row() {
        let engine = Arc::new(engine());
        let created = engine.create(poll_input()).await.unwrap();
        let poll_id = created.poll.id;
        let (first, second) = (created.options[0].id, created.options[1].id);

        let mut tasks = Vec::new();
        for i in 0..20 {
            let engine = engine.clone();
            let option = if i % 2 == 0 { first } else { second };
            tasks.push(tokio::spawn(async move {
                engine.vote(poll_id, option, 7).await
            }));
        }
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let results = engine.results(poll_id, Some(7)).await.unwrap();
        assert_eq!(results.total_votes, 1);
    }
}
