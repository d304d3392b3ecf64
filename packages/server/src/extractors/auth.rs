use axum::{extract::FromRequestParts, http::request::Parts};
use axum_extra::extract::CookieJar;
use sea_orm::EntityTrait;

use crate::entity::user;
use crate::error::AppError;
use crate::state::AppState;
use crate::utils::jwt;

/// Name of the cookie carrying the session token.
pub const SESSION_COOKIE: &str = "token";

/// Authenticated user, taken from the session cookie or an
/// `Authorization: Bearer <token>` header.
///
/// Add this as a handler parameter to require login. Anonymous requests are
/// redirected to the login page with the current path as `next`.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: i32,
    pub username: String,
}

/// The current visitor, if logged in. Never rejects.
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<AuthUser>);

impl MaybeUser {
    pub fn user_id(&self) -> Option<i32> {
        self.0.as_ref().map(|u| u.user_id)
    }
}

fn session_token(parts: &Parts) -> Option<String> {
    let bearer = parts
        .headers
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_owned);

    bearer.or_else(|| {
        CookieJar::from_headers(&parts.headers)
            .get(SESSION_COOKIE)
            .map(|c| c.value().to_owned())
    })
}

/// Resolve the session token to a user that still exists.
///
/// A bad token or a token for a deleted account counts as anonymous.
async fn authenticate(parts: &Parts, state: &AppState) -> Result<Option<AuthUser>, AppError> {
    let Some(token) = session_token(parts) else {
        return Ok(None);
    };
    let claims = match jwt::verify(&token, &state.config.auth.jwt_secret) {
        Ok(claims) => claims,
        Err(e) => {
            tracing::debug!("Rejected session token: {}", e);
            return Ok(None);
        }
    };

    let user = user::Entity::find_by_id(claims.uid).one(&state.db).await?;
    if user.is_none() {
        tracing::debug!(user_id = claims.uid, "Session token for a deleted user");
    }
    Ok(user.map(|user| AuthUser {
        user_id: user.id,
        username: user.username,
    }))
}

/// Path and query of the current request, used as the login `next` target.
pub fn current_path(parts: &Parts) -> String {
    parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str().to_owned())
        .unwrap_or_else(|| parts.uri.path().to_owned())
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        authenticate(parts, state)
            .await?
            .ok_or_else(|| AppError::LoginRequired {
                next: current_path(parts),
            })
    }
}

impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        match authenticate(parts, state).await {
            Ok(user) => Ok(MaybeUser(user)),
            Err(e) => {
                tracing::warn!("Treating visitor as anonymous: {:?}", e);
                Ok(MaybeUser(None))
            }
        }
    }
}
