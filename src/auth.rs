use axum::http::HeaderMap;
use rusqlite::Connection;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::Profile;

pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .filter(|t| !t.is_empty())
}

/// Resolves the caller's bearer token against the identity provider's
/// profile table. Missing or unknown tokens are rejected.
pub fn authenticate(conn: &Connection, headers: &HeaderMap) -> Result<Profile, AppError> {
    let token = bearer_token(headers).ok_or(AppError::Unauthorized)?;
    queries::get_profile_by_token(conn, token)?.ok_or(AppError::Unauthorized)
}

/// Role membership is checked at call time, never cached.
pub fn require_admin(conn: &Connection, headers: &HeaderMap) -> Result<Profile, AppError> {
    let profile = authenticate(conn, headers)?;
    if !queries::has_role(conn, &profile.id, "admin")? {
        return Err(AppError::Forbidden);
    }
    Ok(profile)
}
