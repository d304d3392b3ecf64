use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Directed edge: `user_id` receives `author_id`'s posts in their feed.
///
/// The composite key makes a duplicate follow impossible at the storage layer.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "follow")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: i32,
    #[sea_orm(primary_key, auto_increment = false)]
    pub author_id: i32,

    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
