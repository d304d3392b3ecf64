use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Redirect, Response};
use sea_orm::*;
use serde::Deserialize;
use tracing::instrument;

use crate::entity::{comment, post};
use crate::error::AppError;
use crate::extractors::auth::{AuthUser, MaybeUser};
use crate::extractors::form::{LenientForm, PostSubmission};
use crate::extractors::path::IdPath;
use crate::models::forms::{
    CommentFields, FormErrors, INVALID_CHOICE, ImageChange, PostFields, UploadedFile, ValidPost,
    validate_comment, validate_post,
};
use crate::models::posts::*;
use crate::page::Page;
use crate::state::AppState;
use crate::utils::follow::is_following;
use crate::utils::paginator::{PageMeta, Paginated, fetch_page, resolve_page};
use crate::utils::posts::*;

/// `?page=` as sent; resolution happens in the paginator.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
}

pub fn detail_url(post_id: i32) -> String {
    format!("/posts/{post_id}/")
}

pub fn profile_url(username: &str) -> String {
    format!("/profile/{username}/")
}

/// Paginate an ordered post query and resolve authors and groups.
pub(crate) async fn paginate_posts(
    state: &AppState,
    select: Select<post::Entity>,
    requested: Option<&str>,
) -> Result<Paginated<PostView>, AppError> {
    let meta = resolve_page(&state.db, select.clone(), state.config.posts.per_page, requested).await?;
    posts_page(state, select, meta).await
}

async fn posts_page(
    state: &AppState,
    select: Select<post::Entity>,
    meta: PageMeta,
) -> Result<Paginated<PostView>, AppError> {
    let mut page = fetch_page(&state.db, select, state.config.posts.per_page, meta).await?;
    let posts = std::mem::take(&mut page.object_list);
    let views = post_views(&state.db, posts).await?;
    Ok(page.with_items(views))
}

/// Home page listing all posts.
///
/// The rendered page is cached per resolved page number for
/// `posts.index_cache_seconds` and is not invalidated when posts change.
#[instrument(skip(state, query))]
pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Page, AppError> {
    let meta = resolve_page(
        &state.db,
        posts_newest_first(),
        state.config.posts.per_page,
        query.page.as_deref(),
    )
    .await?;

    let key = format!("{}:{}", state.config.posts.index_cache_prefix, meta.number);
    if let Some(page) = state.page_cache.get(&key) {
        tracing::debug!(%key, "Serving cached index page");
        return Ok(page);
    }

    let page_obj = posts_page(&state, posts_newest_first(), meta).await?;
    let page = Page::render("posts/index.html", &IndexContext { page_obj })?;

    state.page_cache.insert(key, page.clone());
    Ok(page)
}

#[instrument(skip(state, query))]
pub async fn group_posts(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<Page, AppError> {
    let group = find_group_by_slug(&state.db, &slug).await?;

    let select = posts_newest_first().filter(post::Column::GroupId.eq(group.id));
    let page_obj = paginate_posts(&state, select, query.page.as_deref()).await?;

    Page::render(
        "posts/group_list.html",
        &GroupListContext {
            group: group.into(),
            page_obj,
        },
    )
}

#[instrument(skip(state, viewer, query))]
pub async fn profile(
    State(state): State<AppState>,
    viewer: MaybeUser,
    Path(username): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<Page, AppError> {
    let author = find_user_by_username(&state.db, &username).await?;

    let following = match viewer.user_id() {
        Some(viewer_id) if viewer_id != author.id => {
            is_following(&state.db, viewer_id, author.id).await?
        }
        _ => false,
    };

    let select = posts_newest_first().filter(post::Column::AuthorId.eq(author.id));
    let page_obj = paginate_posts(&state, select, query.page.as_deref()).await?;

    Page::render(
        "posts/profile.html",
        &ProfileContext {
            posts_count: page_obj.count,
            author: author.into(),
            following,
            page_obj,
        },
    )
}

/// Render the detail page of `post` with the given comment form state.
async fn render_detail(
    state: &AppState,
    post: post::Model,
    form: CommentFormView,
) -> Result<Page, AppError> {
    let author = find_user(&state.db, post.author_id).await?;
    let posts_count = count_posts_by(&state.db, author.id).await?;
    let comments = comments_for(&state.db, post.id).await?;
    let post = post_views(&state.db, vec![post])
        .await?
        .pop()
        .ok_or_else(|| AppError::Internal("post view missing".into()))?;

    Page::render(
        "posts/post_detail.html",
        &PostDetailContext {
            post,
            author: author.into(),
            posts_count,
            comments,
            form,
        },
    )
}

#[instrument(skip(state))]
pub async fn post_detail(
    State(state): State<AppState>,
    IdPath(post_id): IdPath,
) -> Result<Page, AppError> {
    let post = find_post(&state.db, post_id).await?;
    render_detail(&state, post, CommentFormView::default()).await
}

/// Comment submitted from the detail page itself.
///
/// Unlike `add_comment`, this redisplays the page: with field errors and the
/// submitted text on failure, with an empty form on success.
#[instrument(skip(state, auth_user, input), fields(user_id = auth_user.user_id))]
pub async fn post_detail_comment(
    auth_user: AuthUser,
    State(state): State<AppState>,
    IdPath(post_id): IdPath,
    LenientForm(input): LenientForm<CommentFields>,
) -> Result<Page, AppError> {
    let post = find_post(&state.db, post_id).await?;

    let form = match validate_comment(&input) {
        Ok(text) => {
            insert_comment(&state.db, post.id, auth_user.user_id, text).await?;
            CommentFormView::default()
        }
        Err(errors) => CommentFormView {
            fields: input,
            errors,
        },
    };

    render_detail(&state, post, form).await
}

async fn insert_comment<C: ConnectionTrait>(
    db: &C,
    post_id: i32,
    author_id: i32,
    text: String,
) -> Result<comment::Model, DbErr> {
    comment::ActiveModel {
        post_id: Set(Some(post_id)),
        author_id: Set(author_id),
        text: Set(text),
        created: Set(chrono::Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await
}

/// Dedicated comment endpoint. Always redirects back to the post; an invalid
/// comment is dropped without feedback.
#[instrument(skip(state, auth_user, input), fields(user_id = auth_user.user_id))]
pub async fn add_comment(
    auth_user: AuthUser,
    State(state): State<AppState>,
    IdPath(post_id): IdPath,
    LenientForm(input): LenientForm<CommentFields>,
) -> Result<Redirect, AppError> {
    let post = find_post(&state.db, post_id).await?;

    match validate_comment(&input) {
        Ok(text) => {
            insert_comment(&state.db, post.id, auth_user.user_id, text).await?;
        }
        Err(errors) => {
            tracing::debug!(?errors, "Dropping invalid comment");
        }
    }

    Ok(Redirect::to(&detail_url(post.id)))
}

/// Validate a post submission, including that the chosen group exists.
async fn check_post_form(
    state: &AppState,
    fields: &PostFields,
    image: Option<UploadedFile>,
) -> Result<Result<ValidPost, FormErrors>, AppError> {
    let result = validate_post(fields, image, state.config.media.max_image_size);

    let group_id = match &result {
        Ok(valid) => valid.group_id,
        Err(_) => fields.group.trim().parse().ok(),
    };
    if let Some(id) = group_id
        && !group_exists(&state.db, id).await?
    {
        let mut errors = result.err().unwrap_or_default();
        errors.add("group", INVALID_CHOICE);
        return Ok(Err(errors));
    }

    Ok(result)
}

async fn render_form(
    state: &AppState,
    form: PostFormView,
    edited: Option<i32>,
) -> Result<Page, AppError> {
    let groups = all_groups(&state.db).await?;
    Page::render(
        "posts/create_post.html",
        &PostFormContext {
            form,
            groups,
            is_edit: edited.is_some(),
            post_id: edited,
        },
    )
}

/// Write an uploaded image to the media store, returning its relative path.
async fn store_image(state: &AppState, file: &UploadedFile) -> Result<String, AppError> {
    Ok(state
        .media
        .save("posts", file.extension(), &file.data)
        .await?)
}

async fn discard_image(state: &AppState, path: &str) {
    if let Err(e) = state.media.delete(path).await {
        tracing::warn!("Failed to delete image {}: {}", path, e);
    }
}

#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn post_create_form(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Page, AppError> {
    render_form(&state, PostFormView::default(), None).await
}

#[instrument(skip(state, auth_user, submission), fields(user_id = auth_user.user_id))]
pub async fn post_create(
    auth_user: AuthUser,
    State(state): State<AppState>,
    submission: PostSubmission,
) -> Result<Response, AppError> {
    let PostSubmission { fields, image } = submission;

    let valid = match check_post_form(&state, &fields, image).await? {
        Ok(valid) => valid,
        Err(errors) => {
            let form = PostFormView {
                fields,
                errors,
                image: None,
            };
            return Ok(render_form(&state, form, None).await?.into_response());
        }
    };

    let image = match &valid.image {
        ImageChange::Replace(file) => Some(store_image(&state, file).await?),
        ImageChange::Keep | ImageChange::Clear => None,
    };

    let new_post = post::ActiveModel {
        text: Set(valid.text),
        pub_date: Set(chrono::Utc::now()),
        group_id: Set(valid.group_id),
        author_id: Set(auth_user.user_id),
        image: Set(image.clone()),
        ..Default::default()
    };
    let model = match new_post.insert(&state.db).await {
        Ok(model) => model,
        Err(e) => {
            if let Some(path) = image {
                discard_image(&state, &path).await;
            }
            return Err(e.into());
        }
    };
    tracing::info!(post_id = model.id, "Created post");

    Ok(Redirect::to(&profile_url(&auth_user.username)).into_response())
}

#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn post_edit_form(
    auth_user: AuthUser,
    State(state): State<AppState>,
    IdPath(post_id): IdPath,
) -> Result<Response, AppError> {
    let post = find_post(&state.db, post_id).await?;
    if post.author_id != auth_user.user_id {
        return Ok(Redirect::to(&detail_url(post.id)).into_response());
    }

    let form = PostFormView {
        fields: PostFields {
            text: post.text,
            group: post.group_id.map(|id| id.to_string()).unwrap_or_default(),
            image_clear: None,
        },
        errors: FormErrors::default(),
        image: post.image,
    };
    Ok(render_form(&state, form, Some(post.id)).await?.into_response())
}

/// Only the author may edit; anyone else is sent back to the post unchanged.
/// `pub_date` and `author_id` are never touched.
#[instrument(skip(state, auth_user, submission), fields(user_id = auth_user.user_id))]
pub async fn post_edit(
    auth_user: AuthUser,
    State(state): State<AppState>,
    IdPath(post_id): IdPath,
    submission: PostSubmission,
) -> Result<Response, AppError> {
    let post = find_post(&state.db, post_id).await?;
    if post.author_id != auth_user.user_id {
        tracing::debug!("Non-author edit attempt redirected");
        return Ok(Redirect::to(&detail_url(post.id)).into_response());
    }

    let PostSubmission { fields, image } = submission;

    let valid = match check_post_form(&state, &fields, image).await? {
        Ok(valid) => valid,
        Err(errors) => {
            let form = PostFormView {
                fields,
                errors,
                image: post.image,
            };
            return Ok(render_form(&state, form, Some(post.id))
                .await?
                .into_response());
        }
    };

    let old_image = post.image.clone();
    let mut active: post::ActiveModel = post.into();
    active.text = Set(valid.text);
    active.group_id = Set(valid.group_id);

    let mut stored = None;
    let replaced = match &valid.image {
        ImageChange::Keep => false,
        ImageChange::Clear => {
            active.image = Set(None);
            true
        }
        ImageChange::Replace(file) => {
            let path = store_image(&state, file).await?;
            active.image = Set(Some(path.clone()));
            stored = Some(path);
            true
        }
    };

    if let Err(e) = active.update(&state.db).await {
        if let Some(path) = stored {
            discard_image(&state, &path).await;
        }
        return Err(e.into());
    }

    if replaced && let Some(path) = old_image {
        discard_image(&state, &path).await;
    }

    Ok(Redirect::to(&detail_url(post_id)).into_response())
}
