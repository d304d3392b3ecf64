use axum::http::Uri;

use crate::error::AppError;

/// Fallback for every unmatched path.
pub async fn not_found(uri: Uri) -> AppError {
    AppError::NotFound(format!("No page at {}", uri.path()))
}
