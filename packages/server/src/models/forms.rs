use std::collections::BTreeMap;

use axum::body::Bytes;
use serde::{Deserialize, Serialize};

pub const REQUIRED: &str = "This field is required.";
pub const INVALID_CHOICE: &str =
    "Select a valid choice. That choice is not one of the available choices.";
pub const INVALID_IMAGE: &str =
    "Upload a valid image. The file you uploaded was either not an image or a corrupted image.";
pub const EMPTY_FILE: &str = "The submitted file is empty.";
pub const FILE_AND_CLEAR: &str =
    "Please either submit a file or check the clear checkbox, not both.";

/// Field-level validation errors, keyed by form field name.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FormErrors(BTreeMap<&'static str, Vec<String>>);

impl FormErrors {
    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.entry(field).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn has(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    /// `Ok(value)` if no error was recorded, `Err(self)` otherwise.
    pub fn into_result<T>(self, value: T) -> Result<T, FormErrors> {
        if self.is_empty() { Ok(value) } else { Err(self) }
    }
}

// ---------------------------------------------------------------------------
// Posts
// ---------------------------------------------------------------------------

/// Raw post form input, echoed back to the form when validation fails.
#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct PostFields {
    #[serde(default)]
    pub text: String,
    /// Group id as submitted; empty means "no group".
    #[serde(default)]
    pub group: String,
    /// Present when the "clear image" checkbox was ticked.
    #[serde(default, rename = "image-clear", skip_serializing)]
    pub image_clear: Option<String>,
}

/// A file part from a multipart upload.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub data: Bytes,
}

impl UploadedFile {
    /// Extension taken from the uploaded file name, if any.
    pub fn extension(&self) -> Option<&str> {
        std::path::Path::new(&self.file_name)
            .extension()
            .and_then(|e| e.to_str())
    }
}

/// What to do with a post's image on save.
#[derive(Debug, Clone)]
pub enum ImageChange {
    Keep,
    Clear,
    Replace(UploadedFile),
}

/// A post form that passed validation.
#[derive(Debug, Clone)]
pub struct ValidPost {
    pub text: String,
    pub group_id: Option<i32>,
    pub image: ImageChange,
}

/// Validate post input that does not need the database.
///
/// Whether `group_id` names an existing group is checked by the caller.
pub fn validate_post(
    fields: &PostFields,
    image: Option<UploadedFile>,
    max_image_size: u64,
) -> Result<ValidPost, FormErrors> {
    let mut errors = FormErrors::default();

    let text = fields.text.trim();
    if text.is_empty() {
        errors.add("text", REQUIRED);
    }

    let group = fields.group.trim();
    let group_id = if group.is_empty() {
        None
    } else {
        match group.parse::<i32>() {
            Ok(id) => Some(id),
            Err(_) => {
                errors.add("group", INVALID_CHOICE);
                None
            }
        }
    };

    let clear = fields.image_clear.is_some();
    let image = match image {
        Some(_) if clear => {
            errors.add("image", FILE_AND_CLEAR);
            ImageChange::Keep
        }
        Some(file) => {
            if let Some(message) = image_error(&file, max_image_size) {
                errors.add("image", message);
            }
            ImageChange::Replace(file)
        }
        None if clear => ImageChange::Clear,
        None => ImageChange::Keep,
    };

    errors.into_result(ValidPost {
        text: text.to_string(),
        group_id,
        image,
    })
}

fn image_error(file: &UploadedFile, max_size: u64) -> Option<String> {
    if file.data.is_empty() {
        return Some(EMPTY_FILE.into());
    }
    let is_image = mime_guess::from_path(&file.file_name)
        .first()
        .is_some_and(|m| m.type_() == mime_guess::mime::IMAGE);
    if !is_image || !declared_as_image(file.content_type.as_deref()) {
        return Some(INVALID_IMAGE.into());
    }
    if file.data.len() as u64 > max_size {
        return Some(format!(
            "Image is too large ({} > {} bytes).",
            file.data.len(),
            max_size
        ));
    }
    None
}

/// A part's own `Content-Type` may only contradict the file name when it is
/// the generic octet-stream browsers send for unknown files.
fn declared_as_image(content_type: Option<&str>) -> bool {
    let Some(raw) = content_type else {
        return true;
    };
    match raw.parse::<mime_guess::Mime>() {
        Ok(mime) => {
            mime.type_() == mime_guess::mime::IMAGE
                || mime == mime_guess::mime::APPLICATION_OCTET_STREAM
        }
        Err(_) => false,
    }
}

// ---------------------------------------------------------------------------
// Comments
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct CommentFields {
    #[serde(default)]
    pub text: String,
}

pub fn validate_comment(fields: &CommentFields) -> Result<String, FormErrors> {
    let mut errors = FormErrors::default();
    let text = fields.text.trim();
    if text.is_empty() {
        errors.add("text", REQUIRED);
    }
    errors.into_result(text.to_string())
}

// ---------------------------------------------------------------------------
// Accounts
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct SignupFields {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, skip_serializing)]
    pub password1: String,
    #[serde(default, skip_serializing)]
    pub password2: String,
}

#[derive(Debug, Clone)]
pub struct ValidSignup {
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub email: String,
    pub password: String,
}

pub fn validate_username(username: &str, errors: &mut FormErrors) {
    if username.is_empty() {
        errors.add("username", REQUIRED);
    } else if username.chars().count() > 150 {
        errors.add(
            "username",
            "Ensure this value has at most 150 characters.",
        );
    } else if !username
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'))
    {
        errors.add(
            "username",
            "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.",
        );
    }
}

pub fn validate_signup(fields: &SignupFields) -> Result<ValidSignup, FormErrors> {
    let mut errors = FormErrors::default();

    let username = fields.username.trim();
    validate_username(username, &mut errors);

    let email = fields.email.trim();
    if !email.is_empty() {
        let valid = email
            .split_once('@')
            .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
        if !valid {
            errors.add("email", "Enter a valid email address.");
        }
    }

    if fields.password1.is_empty() {
        errors.add("password1", REQUIRED);
    } else if fields.password1.chars().count() < 8 {
        errors.add(
            "password1",
            "This password is too short. It must contain at least 8 characters.",
        );
    }
    if fields.password2.is_empty() {
        errors.add("password2", REQUIRED);
    } else if fields.password1 != fields.password2 {
        errors.add("password2", "The two password fields didn't match.");
    }

    errors.into_result(ValidSignup {
        first_name: fields.first_name.trim().to_string(),
        last_name: fields.last_name.trim().to_string(),
        username: username.to_string(),
        email: email.to_string(),
        password: fields.password1.clone(),
    })
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct LoginFields {
    #[serde(default)]
    pub username: String,
    #[serde(default, skip_serializing)]
    pub password: String,
    #[serde(default)]
    pub next: Option<String>,
}

pub fn validate_login(fields: &LoginFields) -> Result<(), FormErrors> {
    let mut errors = FormErrors::default();
    if fields.username.trim().is_empty() {
        errors.add("username", REQUIRED);
    }
    if fields.password.is_empty() {
        errors.add("password", REQUIRED);
    }
    errors.into_result(())
}
