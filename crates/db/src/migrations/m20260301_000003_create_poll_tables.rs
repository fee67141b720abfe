//! Create poll, poll option and poll vote tables migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(EpisodePoll::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(EpisodePoll::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(EpisodePoll::AnimeId).integer().not_null())
                    .col(ColumnDef::new(EpisodePoll::EpisodeId).integer().not_null())
                    .col(
                        ColumnDef::new(EpisodePoll::Question)
                            .string_len(512)
                            .not_null(),
                    )
                    .col(ColumnDef::new(EpisodePoll::CreatedBy).integer())
                    .col(
                        ColumnDef::new(EpisodePoll::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(EpisodePoll::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(EpisodePoll::EndedAt).timestamp_with_time_zone())
                    .to_owned(),
            )
            .await?;

        // Index: (anime_id, episode_id, is_active) - the active-poll query
        manager
            .create_index(
                Index::create()
                    .name("idx_episode_poll_active")
                    .table(EpisodePoll::Table)
                    .col(EpisodePoll::AnimeId)
                    .col(EpisodePoll::EpisodeId)
                    .col(EpisodePoll::IsActive)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PollOption::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PollOption::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(PollOption::PollId).integer().not_null())
                    .col(ColumnDef::new(PollOption::Text).string_len(256).not_null())
                    .col(ColumnDef::new(PollOption::ImageUrl).string_len(1024))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_poll_option_poll")
                            .from(PollOption::Table, PollOption::PollId)
                            .to(EpisodePoll::Table, EpisodePoll::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_poll_option_poll_id")
                    .table(PollOption::Table)
                    .col(PollOption::PollId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PollVote::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PollVote::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(PollVote::PollId).integer().not_null())
                    .col(ColumnDef::new(PollVote::OptionId).integer().not_null())
                    .col(ColumnDef::new(PollVote::UserId).integer().not_null())
                    .col(
                        ColumnDef::new(PollVote::VotedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_poll_vote_poll")
                            .from(PollVote::Table, PollVote::PollId)
                            .to(EpisodePoll::Table, EpisodePoll::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_poll_vote_option")
                            .from(PollVote::Table, PollVote::OptionId)
                            .to(PollOption::Table, PollOption::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Unique index: (poll_id, user_id) - one vote per user per poll
        manager
            .create_index(
                Index::create()
                    .name("idx_poll_vote_poll_user")
                    .table(PollVote::Table)
                    .col(PollVote::PollId)
                    .col(PollVote::UserId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PollVote::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(PollOption::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(EpisodePoll::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum EpisodePoll {
    Table,
    Id,
    AnimeId,
    EpisodeId,
    Question,
    CreatedBy,
    IsActive,
    CreatedAt,
    EndedAt,
}

#[derive(Iden)]
enum PollOption {
    Table,
    Id,
    PollId,
    Text,
    ImageUrl,
}

#[derive(Iden)]
enum PollVote {
    Table,
    Id,
    PollId,
    OptionId,
    UserId,
    VotedAt,
}
