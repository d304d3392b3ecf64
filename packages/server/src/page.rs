use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::Value;

use crate::error::AppError;

/// A rendered page: the template to use and the context to render it with.
///
/// Template rendering itself happens in the presentation layer, so the
/// response body is `{"template": ..., "context": ...}`.
#[derive(Clone, Debug)]
pub struct Page {
    pub status: StatusCode,
    pub template: &'static str,
    pub context: Value,
}

#[derive(Serialize)]
struct PageBody<'a> {
    template: &'a str,
    context: &'a Value,
}

impl Page {
    /// Build a `200 OK` page from any serializable context.
    pub fn render<C: Serialize>(template: &'static str, context: &C) -> Result<Self, AppError> {
        let context = serde_json::to_value(context)
            .map_err(|e| AppError::Internal(format!("Context serialization error: {e}")))?;
        Ok(Self {
            status: StatusCode::OK,
            template,
            context,
        })
    }
}

impl IntoResponse for Page {
    fn into_response(self) -> Response {
        let body = PageBody {
            template: self.template,
            context: &self.context,
        };
        (self.status, Json(body)).into_response()
    }
}
