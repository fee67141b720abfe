//! Episode comment entity. Chat messages persisted from watch
//! parties land here too, alongside comments posted directly.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "episode_comment")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(indexed)]
    pub user_id: i32,

    /// Display name at posting time; comments survive renames.
    pub username: String,

    #[sea_orm(indexed)]
    pub anime_id: i32,

    #[sea_orm(indexed)]
    pub episode_id: i32,

    pub content: String,

    /// Video second the comment refers to, if any.
    pub timestamp: Option<i32>,

    /// Parent comment for reply threading.
    pub parent_id: Option<i32>,

    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,

    pub is_deleted: bool,
    pub likes: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "Entity",
        from = "Column::ParentId",
        to = "Column::Id",
        on_delete = "SetNull"
    )]
    Parent,
}

impl ActiveModelBehavior for ActiveModel {}
