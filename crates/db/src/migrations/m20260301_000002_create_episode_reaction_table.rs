//! Create episode reaction table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(EpisodeReaction::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(EpisodeReaction::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(EpisodeReaction::UserId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(EpisodeReaction::Username)
                            .string_len(128)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(EpisodeReaction::AnimeId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(EpisodeReaction::EpisodeId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(EpisodeReaction::Reaction)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(EpisodeReaction::Timestamp)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(EpisodeReaction::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // Index: (anime_id, episode_id) - the recent-reactions query
        manager
            .create_index(
                Index::create()
                    .name("idx_episode_reaction_episode")
                    .table(EpisodeReaction::Table)
                    .col(EpisodeReaction::AnimeId)
                    .col(EpisodeReaction::EpisodeId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(EpisodeReaction::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum EpisodeReaction {
    Table,
    Id,
    UserId,
    Username,
    AnimeId,
    EpisodeId,
    Reaction,
    Timestamp,
    CreatedAt,
}
