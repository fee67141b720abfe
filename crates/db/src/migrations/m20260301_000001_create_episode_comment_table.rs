//! Create episode comment table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(EpisodeComment::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(EpisodeComment::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(EpisodeComment::UserId).integer().not_null())
                    .col(
                        ColumnDef::new(EpisodeComment::Username)
                            .string_len(128)
                            .not_null(),
                    )
                    .col(ColumnDef::new(EpisodeComment::AnimeId).integer().not_null())
                    .col(
                        ColumnDef::new(EpisodeComment::EpisodeId)
                            .integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(EpisodeComment::Content).text().not_null())
                    .col(ColumnDef::new(EpisodeComment::Timestamp).integer())
                    .col(ColumnDef::new(EpisodeComment::ParentId).integer())
                    .col(
                        ColumnDef::new(EpisodeComment::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(EpisodeComment::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(EpisodeComment::IsDeleted)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(EpisodeComment::Likes)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_episode_comment_parent")
                            .from(EpisodeComment::Table, EpisodeComment::ParentId)
                            .to(EpisodeComment::Table, EpisodeComment::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        // Index: (anime_id, episode_id) - the listing query
        manager
            .create_index(
                Index::create()
                    .name("idx_episode_comment_episode")
                    .table(EpisodeComment::Table)
                    .col(EpisodeComment::AnimeId)
                    .col(EpisodeComment::EpisodeId)
                    .to_owned(),
            )
            .await?;

        // Index: user_id (for moderation lookups)
        manager
            .create_index(
                Index::create()
                    .name("idx_episode_comment_user_id")
                    .table(EpisodeComment::Table)
                    .col(EpisodeComment::UserId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(EpisodeComment::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum EpisodeComment {
    Table,
    Id,
    UserId,
    Username,
    AnimeId,
    EpisodeId,
    Content,
    Timestamp,
    ParentId,
    CreatedAt,
    UpdatedAt,
    IsDeleted,
    Likes,
}
