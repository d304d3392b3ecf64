use serde::Serialize;

use super::forms::{FormErrors, LoginFields, SignupFields};

#[derive(Debug, Default, Serialize)]
pub struct SignupContext {
    pub fields: SignupFields,
    pub errors: FormErrors,
}

#[derive(Debug, Default, Serialize)]
pub struct LoginContext {
    pub fields: LoginFields,
    pub errors: FormErrors,
    /// Errors not tied to a single field, e.g. wrong credentials.
    pub non_field_errors: Vec<String>,
}
