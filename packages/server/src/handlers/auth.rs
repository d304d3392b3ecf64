use axum::extract::{Query, State};
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::CookieJar;
use axum_extra::extract::cookie::{Cookie, SameSite};
use sea_orm::*;
use serde::Deserialize;
use tracing::instrument;

use crate::entity::user;
use crate::error::AppError;
use crate::extractors::auth::SESSION_COOKIE;
use crate::extractors::form::AppForm;
use crate::models::auth::{LoginContext, SignupContext};
use crate::models::forms::{
    FormErrors, LoginFields, SignupFields, validate_login, validate_signup,
};
use crate::page::Page;
use crate::state::AppState;
use crate::utils::redirect::safe_next;
use crate::utils::{hash, jwt};

const USERNAME_TAKEN: &str = "A user with that username already exists.";
const BAD_CREDENTIALS: &str = "Please enter a correct username and password. \
    Note that both fields may be case-sensitive.";

fn session_cookie(token: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

fn issue_token(state: &AppState, user: &user::Model) -> Result<String, AppError> {
    jwt::sign(
        user.id,
        &user.username,
        &state.config.auth.jwt_secret,
        state.config.auth.token_ttl_days,
    )
    .map_err(|e| AppError::Internal(format!("JWT sign error: {}", e)))
}

fn signup_page(context: &SignupContext) -> Result<Page, AppError> {
    Page::render("users/signup.html", context)
}

fn login_page(context: &LoginContext) -> Result<Page, AppError> {
    Page::render("users/login.html", context)
}

#[instrument]
pub async fn signup_form() -> Result<Page, AppError> {
    signup_page(&SignupContext::default())
}

/// Register a new account and log it in straight away.
#[instrument(skip(state, jar, input), fields(username = %input.username))]
pub async fn signup(
    State(state): State<AppState>,
    jar: CookieJar,
    AppForm(input): AppForm<SignupFields>,
) -> Result<Response, AppError> {
    let valid = match validate_signup(&input) {
        Ok(valid) => valid,
        Err(errors) => {
            let context = SignupContext {
                fields: input,
                errors,
            };
            return Ok(signup_page(&context)?.into_response());
        }
    };

    let hash = hash::hash_password(&valid.password)
        .map_err(|e| AppError::Internal(format!("Password hash error: {}", e)))?;

    let new_user = user::ActiveModel {
        username: Set(valid.username),
        password: Set(hash),
        first_name: Set(valid.first_name),
        last_name: Set(valid.last_name),
        email: Set(valid.email),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    };

    let user = match new_user.insert(&state.db).await {
        Ok(user) => user,
        Err(e) => match e.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => {
                let mut errors = FormErrors::default();
                errors.add("username", USERNAME_TAKEN);
                let context = SignupContext {
                    fields: input,
                    errors,
                };
                return Ok(signup_page(&context)?.into_response());
            }
            _ => return Err(e.into()),
        },
    };
    tracing::info!(user_id = user.id, "Registered user");

    let token = issue_token(&state, &user)?;
    Ok((jar.add(session_cookie(token)), Redirect::to("/")).into_response())
}

#[derive(Debug, Default, Deserialize)]
pub struct NextQuery {
    pub next: Option<String>,
}

#[instrument(skip(query))]
pub async fn login_form(Query(query): Query<NextQuery>) -> Result<Page, AppError> {
    login_page(&LoginContext {
        fields: LoginFields {
            next: query.next,
            ..Default::default()
        },
        ..Default::default()
    })
}

/// Check credentials, set the session cookie and go back to `next`.
#[instrument(skip(state, jar, input), fields(username = %input.username))]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    AppForm(input): AppForm<LoginFields>,
) -> Result<Response, AppError> {
    if let Err(errors) = validate_login(&input) {
        let context = LoginContext {
            fields: input,
            errors,
            non_field_errors: Vec::new(),
        };
        return Ok(login_page(&context)?.into_response());
    }

    let found = user::Entity::find()
        .filter(user::Column::Username.eq(input.username.trim()))
        .one(&state.db)
        .await?;

    let user = match found {
        Some(user)
            if hash::verify_password(&input.password, &user.password)
                .map_err(|e| AppError::Internal(format!("Password verify error: {}", e)))? =>
        {
            user
        }
        _ => {
            let context = LoginContext {
                fields: input,
                errors: FormErrors::default(),
                non_field_errors: vec![BAD_CREDENTIALS.to_string()],
            };
            return Ok(login_page(&context)?.into_response());
        }
    };

    let token = issue_token(&state, &user)?;
    let target = safe_next(input.next.as_deref()).to_string();
    Ok((jar.add(session_cookie(token)), Redirect::to(&target)).into_response())
}

#[instrument(skip(jar))]
pub async fn logout(jar: CookieJar) -> Result<impl IntoResponse, AppError> {
    let jar = jar.remove(Cookie::build(SESSION_COOKIE).path("/"));
    Ok((jar, Page::render("users/logged_out.html", &serde_json::json!({}))?))
}
