//! Poll repository.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, TransactionTrait,
};

use aniparty_common::{AppError, AppResult};
use aniparty_core::store::{
    NewPoll, PollOptionRecord, PollRecord, PollStore, PollVoteRecord,
};

use crate::entities::{EpisodePoll, PollOption, PollVote, episode_poll, poll_option, poll_vote};

fn poll_record(model: episode_poll::Model) -> PollRecord {
    PollRecord {
        id: model.id,
        anime_id: model.anime_id,
        episode_id: model.episode_id,
        question: model.question,
        created_by: model.created_by,
        is_active: model.is_active,
        created_at: model.created_at.with_timezone(&Utc),
        ended_at: model.ended_at.map(|t| t.with_timezone(&Utc)),
    }
}

fn option_record(model: poll_option::Model) -> PollOptionRecord {
    PollOptionRecord {
        id: model.id,
        poll_id: model.poll_id,
        text: model.text,
        image_url: model.image_url,
    }
}

fn vote_record(model: poll_vote::Model) -> PollVoteRecord {
    PollVoteRecord {
        id: model.id,
        poll_id: model.poll_id,
        option_id: model.option_id,
        user_id: model.user_id,
        voted_at: model.voted_at.with_timezone(&Utc),
    }
}

/// Poll repository for database operations.
#[derive(Clone)]
pub struct PollRepository {
    db: Arc<DatabaseConnection>,
}

impl PollRepository {
    /// Create a new poll repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl PollStore for PollRepository {
    async fn create_poll(&self, input: NewPoll) -> AppResult<(PollRecord, Vec<PollOptionRecord>)> {
        // Poll and options land together or not at all.
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let poll = episode_poll::ActiveModel {
            anime_id: Set(input.anime_id),
            episode_id: Set(input.episode_id),
            question: Set(input.question),
            created_by: Set(input.created_by),
            is_active: Set(true),
            created_at: Set(Utc::now().into()),
            ended_at: Set(None),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        let mut options = Vec::with_capacity(input.options.len());
        for option in input.options {
            let model = poll_option::ActiveModel {
                poll_id: Set(poll.id),
                text: Set(option.text),
                image_url: Set(option.image_url),
                ..Default::default()
            }
            .insert(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
            options.push(option_record(model));
        }

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok((poll_record(poll), options))
    }

    async fn find_poll(&self, poll_id: i32) -> AppResult<Option<PollRecord>> {
        let model = EpisodePoll::find_by_id(poll_id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(model.map(poll_record))
    }

    async fn poll_options(&self, poll_id: i32) -> AppResult<Vec<PollOptionRecord>> {
        let models = PollOption::find()
            .filter(poll_option::Column::PollId.eq(poll_id))
            .order_by_asc(poll_option::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(models.into_iter().map(option_record).collect())
    }

    async fn find_active_poll(
        &self,
        anime_id: i32,
        episode_id: i32,
    ) -> AppResult<Option<PollRecord>> {
        let model = EpisodePoll::find()
            .filter(episode_poll::Column::AnimeId.eq(anime_id))
            .filter(episode_poll::Column::EpisodeId.eq(episode_id))
            .filter(episode_poll::Column::IsActive.eq(true))
            .order_by_desc(episode_poll::Column::CreatedAt)
            .order_by_desc(episode_poll::Column::Id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(model.map(poll_record))
    }

    async fn end_poll(&self, poll_id: i32) -> AppResult<PollRecord> {
        let model = EpisodePoll::find_by_id(poll_id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?
            .ok_or_else(|| AppError::PollNotFound(poll_id.to_string()))?;

        if !model.is_active {
            return Ok(poll_record(model));
        }

        let mut active: episode_poll::ActiveModel = model.into();
        active.is_active = Set(false);
        active.ended_at = Set(Some(Utc::now().into()));
        let model = active
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(poll_record(model))
    }

    async fn find_vote(&self, poll_id: i32, user_id: i32) -> AppResult<Option<PollVoteRecord>> {
        let model = PollVote::find()
            .filter(poll_vote::Column::PollId.eq(poll_id))
            .filter(poll_vote::Column::UserId.eq(user_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(model.map(vote_record))
    }

    async fn delete_vote(&self, vote_id: i32) -> AppResult<()> {
        PollVote::delete_by_id(vote_id)
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    async fn insert_vote(
        &self,
        poll_id: i32,
        option_id: i32,
        user_id: i32,
    ) -> AppResult<PollVoteRecord> {
        let model = poll_vote::ActiveModel {
            poll_id: Set(poll_id),
            option_id: Set(option_id),
            user_id: Set(user_id),
            voted_at: Set(Utc::now().into()),
            ..Default::default()
        }
        .insert(self.db.as_ref())
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(vote_record(model))
    }

    async fn poll_votes(&self, poll_id: i32) -> AppResult<Vec<PollVoteRecord>> {
        let models = PollVote::find()
            .filter(poll_vote::Column::PollId.eq(poll_id))
            .order_by_asc(poll_vote::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(models.into_iter().map(vote_record).collect())
    }
}
