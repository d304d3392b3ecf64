use axum::extract::{Path, Query, State};
use axum::response::Redirect;
use sea_orm::*;
use tracing::instrument;

use crate::entity::post;
use crate::error::AppError;
use crate::extractors::auth::AuthUser;
use crate::models::posts::FollowContext;
use crate::page::Page;
use crate::state::AppState;
use crate::utils::follow::{follow, followed_author_ids, unfollow};
use crate::utils::posts::{find_user_by_username, posts_newest_first};

use super::posts::{PageQuery, paginate_posts};

pub const FOLLOW_INDEX_URL: &str = "/follow/";

/// Feed of posts by every author the current user follows.
#[instrument(skip(state, auth_user, query), fields(user_id = auth_user.user_id))]
pub async fn follow_index(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Page, AppError> {
    let authors = followed_author_ids(&state.db, auth_user.user_id).await?;
    let select = posts_newest_first().filter(post::Column::AuthorId.is_in(authors));
    let page_obj = paginate_posts(&state, select, query.page.as_deref()).await?;

    Page::render(
        "posts/follow.html",
        &FollowContext {
            title: "Favourite posts",
            page_obj,
        },
    )
}

/// Follow an author. Repeats and self-follows are no-ops.
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn profile_follow(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Redirect, AppError> {
    let author = find_user_by_username(&state.db, &username).await?;

    if follow(&state.db, auth_user.user_id, author.id).await? {
        tracing::info!(author_id = author.id, "Followed author");
    }

    Ok(Redirect::to(FOLLOW_INDEX_URL))
}

/// Unfollow an author. Fails with 404 when there is no edge to delete.
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn profile_unfollow(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Redirect, AppError> {
    let author = find_user_by_username(&state.db, &username).await?;

    unfollow(&state.db, auth_user.user_id, author.id).await?;
    tracing::info!(author_id = author.id, "Unfollowed author");

    Ok(Redirect::to(FOLLOW_INDEX_URL))
}
