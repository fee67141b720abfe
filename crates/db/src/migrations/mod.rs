//! Database migrations.
//!
//! Schema migrations for the database.

#![allow(missing_docs)]

use sea_orm_migration::prelude::*;

mod m20260301_000001_create_episode_comment_table;
mod m20260301_000002_create_episode_reaction_table;
mod m20260301_000003_create_poll_tables;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260301_000001_create_episode_comment_table::Migration),
            Box::new(m20260301_000002_create_episode_reaction_table::Migration),
            Box::new(m20260301_000003_create_poll_tables::Migration),
        ]
    }
}
