use axum::http::Uri;
use tower_sessions::{
    cookie::{time::Duration, SameSite},
    session::Error as SessionError,
    Expiry, Session, SessionManagerLayer, SessionStore,
};

use crate::config::SessionConfig;

pub const SESSION_USER_ID_KEY: &str = "auth.user_id";
pub const SESSION_ORIGIN_URL_KEY: &str = "auth.origin_url";
pub const SESSION_FLASH_KEY: &str = "flash";
pub const SESSION_CSRF_KEY: &str = "security.csrf";

/// Build the cookie-backed session layer around `store`.
///
/// Sessions expire after `lifetime_hours` without activity.
pub fn session_layer<Store>(store: Store, config: &SessionConfig) -> SessionManagerLayer<Store>
where
    Store: SessionStore + Clone,
{
    let lifetime = i64::try_from(config.lifetime_hours).unwrap_or(i64::MAX / 3600);

    SessionManagerLayer::new(store)
        .with_name(config.cookie_name.clone())
        .with_secure(config.cookie_secure)
        .with_http_only(true)
        .with_same_site(SameSite::Lax)
        .with_path("/")
        .with_expiry(Expiry::OnInactivity(Duration::hours(lifetime)))
}

pub async fn store_user_id(session: &Session, user_id: i64) -> Result<(), SessionError> {
    session.insert(SESSION_USER_ID_KEY, user_id).await
}

pub async fn clear_user_id(session: &Session) -> Result<(), SessionError> {
    let _ = session.remove::<i64>(SESSION_USER_ID_KEY).await?;
    Ok(())
}

/// The authenticated user id, if any. A stored `0` counts as anonymous.
pub async fn current_user_id(session: &Session) -> Result<Option<i64>, SessionError> {
    let id = session.get::<i64>(SESSION_USER_ID_KEY).await?;
    Ok(id.filter(|id| *id != 0))
}

/// Queue a one-shot message for the next rendered page.
pub async fn put_flash(session: &Session, message: &str) -> Result<(), SessionError> {
    session.insert(SESSION_FLASH_KEY, message).await
}

pub async fn pop_flash(session: &Session) -> Result<Option<String>, SessionError> {
    session.remove::<String>(SESSION_FLASH_KEY).await
}

/// Remember where an anonymous visitor was headed before being sent to log in.
pub async fn remember_origin_url(session: &Session, uri: &Uri) -> Result<(), SessionError> {
    let target = uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or_else(|| uri.path());
    session.insert(SESSION_ORIGIN_URL_KEY, target).await
}

pub async fn pop_origin_url(session: &Session) -> Result<Option<String>, SessionError> {
    session.remove::<String>(SESSION_ORIGIN_URL_KEY).await
}
