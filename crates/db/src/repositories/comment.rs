//! Episode comment repository.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder,
};

use aniparty_common::{AppError, AppResult};
use aniparty_core::store::{CommentRecord, CommentStore, NewComment};

use crate::entities::{EpisodeComment, episode_comment};

fn to_record(model: episode_comment::Model) -> CommentRecord {
    CommentRecord {
        id: model.id,
        user_id: model.user_id,
        username: model.username,
        anime_id: model.anime_id,
        episode_id: model.episode_id,
        content: model.content,
        timestamp: model.timestamp,
        parent_id: model.parent_id,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
        is_deleted: model.is_deleted,
        likes: model.likes,
    }
}

/// Comment repository for database operations.
#[derive(Clone)]
pub struct CommentRepository {
    db: Arc<DatabaseConnection>,
}

impl CommentRepository {
    /// Create a new comment repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    async fn find(&self, comment_id: i32) -> AppResult<episode_comment::Model> {
        EpisodeComment::find_by_id(comment_id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?
            .ok_or_else(|| AppError::NotFound(format!("Comment not found: {comment_id}")))
    }
}

#[async_trait]
impl CommentStore for CommentRepository {
    async fn create_comment(&self, input: NewComment) -> AppResult<CommentRecord> {
        let now = Utc::now();
        let model = episode_comment::ActiveModel {
            user_id: Set(input.user_id),
            username: Set(input.username),
            anime_id: Set(input.anime_id),
            episode_id: Set(input.episode_id),
            content: Set(input.content),
            timestamp: Set(input.timestamp),
            parent_id: Set(input.parent_id),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
            is_deleted: Set(false),
            likes: Set(0),
            ..Default::default()
        };

        let model = model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(to_record(model))
    }

    async fn list_comments(&self, anime_id: i32, episode_id: i32) -> AppResult<Vec<CommentRecord>> {
        let models = EpisodeComment::find()
            .filter(episode_comment::Column::AnimeId.eq(anime_id))
            .filter(episode_comment::Column::EpisodeId.eq(episode_id))
            .filter(episode_comment::Column::IsDeleted.eq(false))
            .order_by_asc(episode_comment::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(models.into_iter().map(to_record).collect())
    }

    async fn soft_delete_comment(&self, comment_id: i32, user_id: i32) -> AppResult<()> {
        let model = self.find(comment_id).await?;
        if model.user_id != user_id {
            return Err(AppError::Forbidden(
                "Cannot delete another user's comment".to_string(),
            ));
        }

        let mut active: episode_comment::ActiveModel = model.into();
        active.is_deleted = Set(true);
        active.updated_at = Set(Utc::now().into());
        active
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    async fn like_comment(&self, comment_id: i32) -> AppResult<CommentRecord> {
        let model = self.find(comment_id).await?;

        let mut active: episode_comment::ActiveModel = model.clone().into();
        active.likes = Set(model.likes + 1);
        let model = active
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(to_record(model))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn model(id: i32, content: &str) -> episode_comment::Model {
        episode_comment::Model {
            id,
            user_id: 1,
            username: "mira".to_string(),
            anime_id: 10,
            episode_id: 3,
            content: content.to_string(),
            timestamp: None,
            parent_id: None,
            created_at: Utc::now().into(),
            updated_at: Utc::now().into(),
            is_deleted: false,
            likes: 0,
        }
    }

    #[tokio::test]
    async fn test_list_maps_models_to_records() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![model(1, "first"), model(2, "second")]])
            .into_connection();
        let repo = CommentRepository::new(Arc::new(db));

        let comments = repo.list_comments(10, 3).await.unwrap();
        assert_eq!(comments.len(), 2);
        assert_eq!(comments[0].content, "first");
        assert_eq!(comments[1].id, 2);
    }

    #[tokio::test]
    async fn test_missing_comment_is_not_found() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<episode_comment::Model>::new()])
            .into_connection();
        let repo = CommentRepository::new(Arc::new(db));

        let err = repo.like_comment(42).await.unwrap_err();
        assert_eq!(err.error_code(), "NOT_FOUND");
    }
}
