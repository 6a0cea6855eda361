use axum::http::{header, HeaderMap};
use chrono::Utc;
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::db::{CalibrationStore, StoreError};

const AUTH_COOKIE_NAME: &str = "auth_token";
pub const ADMIN_TOKEN_HEADER: &str = "x-admin-token";

/// Learner every request acts as in single-user installs.
pub const LOCAL_LEARNER_ID: &str = "1";

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Authentication required")]
    MissingToken,
    #[error("Invalid session token")]
    InvalidToken,
    #[error("Session expired")]
    Expired,
    #[error("session store error: {0}")]
    Store(#[from] StoreError),
}

pub fn extract_token(headers: &HeaderMap) -> Option<String> {
    if let Some(token) = get_cookie(headers, AUTH_COOKIE_NAME) {
        return Some(token);
    }

    let auth_header = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())?;

    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(|value| value.to_string())
}

pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// Resolves the learner behind a request. Sessions are stored by token hash.
pub async fn resolve_learner<S: CalibrationStore>(
    store: &S,
    single_user: bool,
    headers: &HeaderMap,
) -> Result<String, AuthError> {
    if single_user {
        return Ok(LOCAL_LEARNER_ID.to_string());
    }

    let token = extract_token(headers).ok_or(AuthError::MissingToken)?;
    let session = store
        .find_session(&hash_token(&token))
        .await?
        .ok_or(AuthError::InvalidToken)?;

    if session.expires_at < Utc::now().naive_utc() {
        return Err(AuthError::Expired);
    }
    Ok(session.learner_id)
}

/// Checks the `X-Admin-Token` header against the configured token. No
/// configured token means the admin surface is closed.
pub fn verify_admin(headers: &HeaderMap, expected: Option<&str>) -> Result<(), AdminAuthError> {
    let Some(expected) = expected else {
        return Err(AdminAuthError::Disabled);
    };
    let provided = headers
        .get(ADMIN_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or(AdminAuthError::Missing)?;

    if hash_token(provided) == hash_token(expected) {
        Ok(())
    } else {
        Err(AdminAuthError::Mismatch)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AdminAuthError {
    #[error("Admin token required")]
    Missing,
    #[error("Admin token rejected")]
    Mismatch,
    #[error("Admin endpoints are disabled")]
    Disabled,
}

fn get_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    let raw = headers.get(header::COOKIE)?.to_str().ok()?;
    raw.split(';').find_map(|part| {
        let (key, value) = part.trim().split_once('=')?;
        (key == name && !value.is_empty()).then(|| value.to_string())
    })
}
