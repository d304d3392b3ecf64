use axum::{
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use common::storage::StorageError;
use sea_orm::DbErr;
use serde_json::json;

use crate::page::Page;
use crate::utils::redirect::login_url;

/// Application-level error type.
///
/// Failures that the handlers resolve inline (a non-author trying to edit, an
/// invalid form) never reach this type.
#[derive(Debug)]
pub enum AppError {
    /// Unknown slug, username, post id or follow edge.
    NotFound(String),
    /// Anonymous access to a protected route. Carries the path to return to.
    LoginRequired { next: String },
    /// The request body could not be read at all.
    BadRequest(String),
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, template, message) = match self {
            AppError::LoginRequired { next } => {
                return Redirect::to(&login_url(&next)).into_response();
            }
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "core/404.html", msg),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "core/400.html", msg),
            AppError::Internal(detail) => {
                tracing::error!("Internal error: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "core/500.html",
                    "An unexpected error occurred".to_string(),
                )
            }
        };

        Page {
            status,
            template,
            context: json!({ "message": message }),
        }
        .into_response()
    }
}

impl From<DbErr> for AppError {
    fn from(err: DbErr) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        AppError::Internal(err.to_string())
    }
}
