//! `Authorization` header parsing
//!
//! Scheme names compare ASCII case-insensitively. The Basic payload is
//! base64-decoded exactly once and split on its first colon, so passwords may
//! contain colons but usernames may not.

use crate::{AuthFailure, Credentials, Result, UserbaseError};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

pub const BASIC_SCHEME: &str = "Basic";
pub const BEARER_SCHEME: &str = "Bearer";

/// Strip `scheme` from a header value and return the trimmed parameter
fn strip_scheme<'a>(header: Option<&'a str>, scheme: &str) -> Result<&'a str> {
    let header = header
        .map(str::trim)
        .filter(|h| !h.is_empty())
        .ok_or_else(|| UserbaseError::authentication(AuthFailure::MissingHeader))?;

    let (found, parameter) = header.split_once(' ').unwrap_or((header, ""));
    if !found.eq_ignore_ascii_case(scheme) {
        return Err(UserbaseError::authentication(AuthFailure::SchemeMismatch));
    }

    Ok(parameter.trim())
}

/// Decode `Authorization: Basic <base64(username:password)>`
pub fn extract_basic_credentials(header: Option<&str>) -> Result<Credentials> {
    let encoded = strip_scheme(header, BASIC_SCHEME)?;
    let malformed = || UserbaseError::authentication(AuthFailure::MalformedCredentials);

    if encoded.is_empty() {
        return Err(malformed());
    }

    let decoded = STANDARD.decode(encoded).map_err(|_| malformed())?;
    let decoded = String::from_utf8(decoded).map_err(|_| malformed())?;
    let (username, plain_password) = decoded.split_once(':').ok_or_else(malformed)?;

    if username.is_empty() || plain_password.is_empty() {
        return Err(UserbaseError::authentication(AuthFailure::MissingCredentials));
    }

    Ok(Credentials::new(username, plain_password))
}

/// Return the token of `Authorization: Bearer <token>`
pub fn extract_bearer_token(header: Option<&str>) -> Result<&str> {
    let token = strip_scheme(header, BEARER_SCHEME)?;
    if token.is_empty() {
        return Err(UserbaseError::authentication(AuthFailure::Malformed));
    }
    Ok(token)
}

/// Build a Basic header value; handy for clients and tests
pub fn basic_header_value(username: &str, plain_password: &str) -> String {
    format!(
        "{} {}",
        BASIC_SCHEME,
        STANDARD.encode(format!("{}:{}", username, plain_password))
    )
}
