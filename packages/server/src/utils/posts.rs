use std::collections::{HashMap, HashSet};

use sea_orm::{
    ColumnTrait, ConnectionTrait, DbErr, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    Select,
};

use crate::entity::{comment, group, post, user};
use crate::error::AppError;
use crate::models::posts::{CommentView, GroupView, PostView};

/// All posts, newest first. Ties on `pub_date` fall back to the newer id.
pub fn posts_newest_first() -> Select<post::Entity> {
    post::Entity::find()
        .order_by_desc(post::Column::PubDate)
        .order_by_desc(post::Column::Id)
}

/// Look up a post by ID, returning 404 if not found.
pub async fn find_post<C: ConnectionTrait>(db: &C, id: i32) -> Result<post::Model, AppError> {
    post::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Post not found".into()))
}

/// Look up a group by slug, returning 404 if not found.
pub async fn find_group_by_slug<C: ConnectionTrait>(
    db: &C,
    slug: &str,
) -> Result<group::Model, AppError> {
    group::Entity::find()
        .filter(group::Column::Slug.eq(slug))
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Group not found".into()))
}

/// Look up a user by username, returning 404 if not found.
pub async fn find_user_by_username<C: ConnectionTrait>(
    db: &C,
    username: &str,
) -> Result<user::Model, AppError> {
    user::Entity::find()
        .filter(user::Column::Username.eq(username))
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))
}

pub async fn find_user<C: ConnectionTrait>(db: &C, id: i32) -> Result<user::Model, AppError> {
    user::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))
}

pub async fn count_posts_by<C: ConnectionTrait>(db: &C, author_id: i32) -> Result<u64, DbErr> {
    post::Entity::find()
        .filter(post::Column::AuthorId.eq(author_id))
        .count(db)
        .await
}

/// Every group, for the group select on the post form.
pub async fn all_groups<C: ConnectionTrait>(db: &C) -> Result<Vec<GroupView>, DbErr> {
    Ok(group::Entity::find()
        .order_by_asc(group::Column::Title)
        .all(db)
        .await?
        .into_iter()
        .map(GroupView::from)
        .collect())
}

pub async fn group_exists<C: ConnectionTrait>(db: &C, id: i32) -> Result<bool, DbErr> {
    Ok(group::Entity::find_by_id(id).one(db).await?.is_some())
}

/// Map user ids to usernames in one query.
async fn usernames<C: ConnectionTrait>(
    db: &C,
    ids: HashSet<i32>,
) -> Result<HashMap<i32, String>, DbErr> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    Ok(user::Entity::find()
        .filter(user::Column::Id.is_in(ids))
        .all(db)
        .await?
        .into_iter()
        .map(|u| (u.id, u.username))
        .collect())
}

/// Resolve authors and groups for a batch of posts, preserving order.
pub async fn post_views<C: ConnectionTrait>(
    db: &C,
    posts: Vec<post::Model>,
) -> Result<Vec<PostView>, DbErr> {
    let authors = usernames(db, posts.iter().map(|p| p.author_id).collect()).await?;

    let group_ids: HashSet<i32> = posts.iter().filter_map(|p| p.group_id).collect();
    let groups: HashMap<i32, GroupView> = if group_ids.is_empty() {
        HashMap::new()
    } else {
        group::Entity::find()
            .filter(group::Column::Id.is_in(group_ids))
            .all(db)
            .await?
            .into_iter()
            .map(|g| (g.id, GroupView::from(g)))
            .collect()
    };

    Ok(posts
        .into_iter()
        .map(|p| {
            let author = authors.get(&p.author_id).cloned().unwrap_or_default();
            let group = p.group_id.and_then(|id| groups.get(&id).cloned());
            PostView::new(p, author, group)
        })
        .collect())
}

/// Comments attached to a post, newest first.
pub async fn comments_for<C: ConnectionTrait>(
    db: &C,
    post_id: i32,
) -> Result<Vec<CommentView>, DbErr> {
    let comments = comment::Entity::find()
        .filter(comment::Column::PostId.eq(post_id))
        .order_by_desc(comment::Column::Created)
        .order_by_desc(comment::Column::Id)
        .all(db)
        .await?;

    let authors = usernames(db, comments.iter().map(|c| c.author_id).collect()).await?;

    Ok(comments
        .into_iter()
        .map(|c| {
            let author = authors.get(&c.author_id).cloned().unwrap_or_default();
            CommentView::new(c, author)
        })
        .collect())
}
