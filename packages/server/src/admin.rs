//! Out-of-band operations that no HTTP route exposes: group management and
//! the deletion contracts of every entity.
//!
//! Deletes run inside one transaction so a half-applied cascade is never
//! visible.

use sea_orm::sea_query::{Condition, Expr};
use sea_orm::*;
use tracing::info;

use crate::entity::{comment, follow, group, post};

/// Create a group. Fails on a duplicate slug.
pub async fn create_group<C: ConnectionTrait>(
    db: &C,
    title: &str,
    slug: &str,
    description: &str,
) -> Result<group::Model, DbErr> {
    group::ActiveModel {
        title: Set(title.to_string()),
        slug: Set(slug.to_string()),
        description: Set(description.to_string()),
        ..Default::default()
    }
    .insert(db)
    .await
}

/// Delete a group. Its posts stay, with their group cleared.
pub async fn delete_group(db: &DatabaseConnection, group_id: i32) -> Result<bool, DbErr> {
    let txn = db.begin().await?;

    let detached = post::Entity::update_many()
        .col_expr(post::Column::GroupId, Expr::value(Option::<i32>::None))
        .filter(post::Column::GroupId.eq(group_id))
        .exec(&txn)
        .await?
        .rows_affected;

    let deleted = group::Entity::delete_by_id(group_id)
        .exec(&txn)
        .await?
        .rows_affected;

    txn.commit().await?;

    if deleted > 0 {
        info!(group_id, detached, "Deleted group");
    }
    Ok(deleted > 0)
}

/// Delete a post. Its comments stay, with their post cleared.
pub async fn delete_post(db: &DatabaseConnection, post_id: i32) -> Result<bool, DbErr> {
    let txn = db.begin().await?;
    let deleted = delete_post_in(&txn, post_id).await?;
    txn.commit().await?;

    if deleted {
        info!(post_id, "Deleted post");
    }
    Ok(deleted)
}

async fn delete_post_in<C: ConnectionTrait>(db: &C, post_id: i32) -> Result<bool, DbErr> {
    comment::Entity::update_many()
        .col_expr(comment::Column::PostId, Expr::value(Option::<i32>::None))
        .filter(comment::Column::PostId.eq(post_id))
        .exec(db)
        .await?;

    let deleted = post::Entity::delete_by_id(post_id)
        .exec(db)
        .await?
        .rows_affected;
    Ok(deleted > 0)
}

/// Delete a user with everything they own: their posts (each following the
/// post deletion contract), their comments, and follow edges in both
/// directions.
pub async fn delete_user(db: &DatabaseConnection, user_id: i32) -> Result<bool, DbErr> {
    let txn = db.begin().await?;

    let post_ids: Vec<i32> = post::Entity::find()
        .filter(post::Column::AuthorId.eq(user_id))
        .select_only()
        .column(post::Column::Id)
        .into_tuple()
        .all(&txn)
        .await?;
    for &post_id in &post_ids {
        delete_post_in(&txn, post_id).await?;
    }

    comment::Entity::delete_many()
        .filter(comment::Column::AuthorId.eq(user_id))
        .exec(&txn)
        .await?;

    follow::Entity::delete_many()
        .filter(
            Condition::any()
                .add(follow::Column::UserId.eq(user_id))
                .add(follow::Column::AuthorId.eq(user_id)),
        )
        .exec(&txn)
        .await?;

    let deleted = crate::entity::user::Entity::delete_by_id(user_id)
        .exec(&txn)
        .await?
        .rows_affected;

    txn.commit().await?;

    if deleted > 0 {
        info!(user_id, posts = post_ids.len(), "Deleted user");
    }
    Ok(deleted > 0)
}
