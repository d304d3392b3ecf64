use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};

use crate::config::AppConfig;
use crate::handlers;
use crate::state::AppState;

/// Room left in a post upload for the text fields and multipart framing.
const FORM_OVERHEAD: usize = 64 * 1024;

pub fn routes(config: &AppConfig) -> Router<AppState> {
    Router::new()
        .merge(post_routes(config))
        .merge(follow_routes())
        .nest("/auth", auth_routes())
        .fallback(handlers::fallback::not_found)
}

fn post_routes(config: &AppConfig) -> Router<AppState> {
    let upload_limit = usize::try_from(config.media.max_image_size)
        .unwrap_or(usize::MAX)
        .saturating_add(FORM_OVERHEAD);

    let forms = Router::new()
        .route(
            "/create/",
            get(handlers::posts::post_create_form).post(handlers::posts::post_create),
        )
        .route(
            "/posts/{post_id}/edit/",
            get(handlers::posts::post_edit_form).post(handlers::posts::post_edit),
        )
        .layer(DefaultBodyLimit::max(upload_limit));

    Router::new()
        .route("/", get(handlers::posts::index))
        .route("/group/{slug}/", get(handlers::posts::group_posts))
        .route("/profile/{username}/", get(handlers::posts::profile))
        .route(
            "/posts/{post_id}/",
            get(handlers::posts::post_detail).post(handlers::posts::post_detail_comment),
        )
        .route(
            "/posts/{post_id}/comment/",
            post(handlers::posts::add_comment),
        )
        .merge(forms)
}

fn follow_routes() -> Router<AppState> {
    Router::new()
        .route("/follow/", get(handlers::follow::follow_index))
        .route(
            "/profile/{username}/follow/",
            get(handlers::follow::profile_follow),
        )
        .route(
            "/profile/{username}/unfollow/",
            get(handlers::follow::profile_unfollow),
        )
}

fn auth_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/signup/",
            get(handlers::auth::signup_form).post(handlers::auth::signup),
        )
        .route(
            "/login/",
            get(handlers::auth::login_form).post(handlers::auth::login),
        )
        .route("/logout/", get(handlers::auth::logout))
}
