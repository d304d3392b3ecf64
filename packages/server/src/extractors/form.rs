use axum::{
    Form,
    body::Bytes,
    extract::{FromRequest, Multipart, Request, rejection::FormRejection},
    http::header::CONTENT_TYPE,
};
use serde::de::DeserializeOwned;

use crate::error::AppError;
use crate::models::forms::{PostFields, UploadedFile};

/// A `Form<T>` wrapper that turns unreadable bodies into `AppError::BadRequest`.
pub struct AppForm<T>(pub T);

impl<S, T> FromRequest<S> for AppForm<T>
where
    Form<T>: FromRequest<S, Rejection = FormRejection>,
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Form(value) = Form::<T>::from_request(req, state)
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;
        Ok(AppForm(value))
    }
}

/// An urlencoded form that falls back to `T::default()` when the body cannot
/// be read, so the handler's own validation decides what happens.
pub struct LenientForm<T>(pub T);

impl<S, T> FromRequest<S> for LenientForm<T>
where
    T: DeserializeOwned + Default,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let body = Bytes::from_request(req, state)
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;
        let value = serde_urlencoded::from_bytes(&body).unwrap_or_else(|e| {
            tracing::debug!("Discarding unparseable form body: {}", e);
            T::default()
        });
        Ok(LenientForm(value))
    }
}

/// The post create/edit form, sent either as `multipart/form-data` (with an
/// optional `image` file) or as a plain urlencoded body.
pub struct PostSubmission {
    pub fields: PostFields,
    pub image: Option<UploadedFile>,
}

fn is_multipart(req: &Request) -> bool {
    req.headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("multipart/form-data"))
}

impl<S> FromRequest<S> for PostSubmission
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        if !is_multipart(&req) {
            let AppForm(fields) = AppForm::<PostFields>::from_request(req, state).await?;
            return Ok(PostSubmission {
                fields,
                image: None,
            });
        }

        let mut multipart = Multipart::from_request(req, state)
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;

        let mut fields = PostFields::default();
        let mut image = None;

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::BadRequest(format!("Multipart error: {e}")))?
        {
            let name = field.name().unwrap_or_default().to_string();
            match name.as_str() {
                "image" => {
                    let file_name = field.file_name().unwrap_or_default().to_string();
                    let content_type = field.content_type().map(str::to_owned);
                    let data = field
                        .bytes()
                        .await
                        .map_err(|e| AppError::BadRequest(format!("Failed to read image: {e}")))?;
                    // Browsers submit an empty part when no file was chosen.
                    if !file_name.is_empty() || !data.is_empty() {
                        image = Some(UploadedFile {
                            file_name,
                            content_type,
                            data,
                        });
                    }
                }
                "text" | "group" | "image-clear" => {
                    let value = field
                        .text()
                        .await
                        .map_err(|e| AppError::BadRequest(format!("Failed to read {name}: {e}")))?;
                    match name.as_str() {
                        "text" => fields.text = value,
                        "group" => fields.group = value,
                        _ => fields.image_clear = Some(value),
                    }
                }
                _ => {} // Ignore unknown fields.
            }
        }

        Ok(PostSubmission { fields, image })
    }
}
