use subtle::ConstantTimeEq;
use tower_sessions::{session::Error as SessionError, Session};

use crate::sessions::SESSION_CSRF_KEY;

/// Characters in an issued token, drawn from the nanoid URL-safe alphabet.
pub const CSRF_TOKEN_LENGTH: usize = 64;

/// The session's anti-forgery token, issuing one on first use.
pub async fn ensure_csrf_token(session: &Session) -> Result<String, SessionError> {
    match session.get::<String>(SESSION_CSRF_KEY).await? {
        Some(token) => Ok(token),
        None => rotate_csrf_token(session).await,
    }
}

/// Issue a fresh token, so forms rendered before a login or logout stop validating.
pub async fn rotate_csrf_token(session: &Session) -> Result<String, SessionError> {
    let token = nanoid::nanoid!(CSRF_TOKEN_LENGTH);
    session.insert(SESSION_CSRF_KEY, &token).await?;
    Ok(token)
}

/// Check a submitted form token against the session. A session without a token rejects everything.
pub async fn validate_csrf_token(session: &Session, submitted: &str) -> Result<bool, SessionError> {
    let expected = session.get::<String>(SESSION_CSRF_KEY).await?;
    Ok(expected.is_some_and(|expected| tokens_match(&expected, submitted)))
}

/// Constant-time comparison; an empty submission never matches.
pub fn tokens_match(expected: &str, submitted: &str) -> bool {
    !submitted.is_empty() && bool::from(expected.as_bytes().ct_eq(submitted.as_bytes()))
}
