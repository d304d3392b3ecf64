use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

/// Login page that protected routes send anonymous visitors to.
pub const LOGIN_PATH: &str = "/auth/login/";

/// Build the login redirect for a protected path, e.g.
/// `/create/` becomes `/auth/login/?next=/create/`.
pub fn login_url(next: &str) -> String {
    format!("{LOGIN_PATH}?next={}", encode_next(next))
}

/// Everything except unreserved characters and `/`.
const NEXT_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~')
    .remove(b'/');

/// Percent-encode a return path for use as a query value, leaving `/` intact.
pub fn encode_next(path: &str) -> String {
    utf8_percent_encode(path, NEXT_ENCODE_SET).to_string()
}

/// Accept a `next` target only if it stays on this site.
pub fn safe_next(next: Option<&str>) -> &str {
    match next {
        Some(path)
            if path.starts_with('/')
                && !path.starts_with("//")
                && !path.contains('\\')
                && !path.chars().any(char::is_control) =>
        {
            path
        }
        _ => "/",
    }
}
