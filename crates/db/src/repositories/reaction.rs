//! Episode reaction repository.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect,
};

use aniparty_common::{AppError, AppResult};
use aniparty_core::store::{NewReaction, ReactionRecord, ReactionStore};

use crate::entities::{EpisodeReaction, episode_reaction};

fn to_record(model: episode_reaction::Model) -> ReactionRecord {
    ReactionRecord {
        id: model.id,
        user_id: model.user_id,
        username: model.username,
        anime_id: model.anime_id,
        episode_id: model.episode_id,
        reaction: model.reaction,
        timestamp: model.timestamp,
        created_at: model.created_at.with_timezone(&Utc),
    }
}

/// Reaction repository for database operations.
#[derive(Clone)]
pub struct ReactionRepository {
    db: Arc<DatabaseConnection>,
}

impl ReactionRepository {
    /// Create a new reaction repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ReactionStore for ReactionRepository {
    async fn create_reaction(&self, input: NewReaction) -> AppResult<ReactionRecord> {
        let model = episode_reaction::ActiveModel {
            user_id: Set(input.user_id),
            username: Set(input.username),
            anime_id: Set(input.anime_id),
            episode_id: Set(input.episode_id),
            reaction: Set(input.reaction),
            timestamp: Set(input.timestamp),
            created_at: Set(Utc::now().into()),
            ..Default::default()
        };

        let model = model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(to_record(model))
    }

    async fn list_recent_reactions(
        &self,
        anime_id: i32,
        episode_id: i32,
        limit: u64,
    ) -> AppResult<Vec<ReactionRecord>> {
        let models = EpisodeReaction::find()
            .filter(episode_reaction::Column::AnimeId.eq(anime_id))
            .filter(episode_reaction::Column::EpisodeId.eq(episode_id))
            .order_by_desc(episode_reaction::Column::Id)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(models.into_iter().map(to_record).collect())
    }
}
