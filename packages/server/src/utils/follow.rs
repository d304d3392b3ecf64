use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QuerySelect, Set, SqlErr,
};

use crate::entity::follow;
use crate::error::AppError;

/// Ids of every author `user_id` follows.
pub async fn followed_author_ids<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
) -> Result<Vec<i32>, DbErr> {
    follow::Entity::find()
        .filter(follow::Column::UserId.eq(user_id))
        .select_only()
        .column(follow::Column::AuthorId)
        .into_tuple()
        .all(db)
        .await
}

pub async fn is_following<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
    author_id: i32,
) -> Result<bool, DbErr> {
    Ok(follow::Entity::find_by_id((user_id, author_id))
        .one(db)
        .await?
        .is_some())
}

/// Create the follow edge unless it already exists.
///
/// Self-follows are skipped. Returns whether a new edge was inserted.
pub async fn follow<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
    author_id: i32,
) -> Result<bool, DbErr> {
    if user_id == author_id {
        return Ok(false);
    }

    let edge = follow::ActiveModel {
        user_id: Set(user_id),
        author_id: Set(author_id),
        created_at: Set(chrono::Utc::now()),
    };

    let result = follow::Entity::insert(edge)
        .on_conflict(
            OnConflict::columns([follow::Column::UserId, follow::Column::AuthorId])
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(db)
        .await;

    match result {
        Ok(rows) => Ok(rows > 0),
        Err(DbErr::RecordNotInserted) => Ok(false),
        Err(e) => match e.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => {
                tracing::debug!("Concurrent follow absorbed by unique constraint");
                Ok(false)
            }
            _ => Err(e),
        },
    }
}

/// Delete the follow edge. A missing edge is reported as not found.
pub async fn unfollow<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
    author_id: i32,
) -> Result<(), AppError> {
    let edge = follow::Entity::find_by_id((user_id, author_id))
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Follow not found".into()))?;

    follow::Entity::delete_by_id((edge.user_id, edge.author_id))
        .exec(db)
        .await?;
    Ok(())
}
