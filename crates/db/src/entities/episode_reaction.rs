//! Episode reaction entity: the durable audit copy of live
//! reactions. Never read back into the live stream.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "episode_reaction")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(indexed)]
    pub user_id: i32,

    pub username: String,

    #[sea_orm(indexed)]
    pub anime_id: i32,

    #[sea_orm(indexed)]
    pub episode_id: i32,

    /// Emoji or short code.
    pub reaction: String,

    /// Video second the reaction refers to.
    pub timestamp: i32,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
