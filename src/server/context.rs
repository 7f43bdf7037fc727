use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::request::Parts,
    response::{IntoResponse, Response},
};
use tower_sessions::Session;

use crate::templates::LayoutContext;

use super::error::AppError;

/// Outcome of the per-request authentication check.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Authentication {
    #[default]
    Anonymous,
    User(i64),
}

impl Authentication {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Authentication::User(_))
    }

    pub fn user_id(&self) -> Option<i64> {
        match self {
            Authentication::User(id) => Some(*id),
            Authentication::Anonymous => None,
        }
    }
}

/// Requests that never passed through the authentication middleware are anonymous.
#[async_trait]
impl<S> FromRequestParts<S> for Authentication
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<Authentication>()
            .copied()
            .unwrap_or_default())
    }
}

/// Session and authentication state for the request being handled.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub session: Session,
    pub auth: Authentication,
}

#[async_trait]
impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(parts, state)
            .await
            .map_err(IntoResponse::into_response)?;
        let auth = parts
            .extensions
            .get::<Authentication>()
            .copied()
            .unwrap_or_default();

        Ok(Self { session, auth })
    }
}

impl RequestContext {
    /// Layout data for a page render. Consumes any pending flash message.
    pub async fn layout(&self, title: &str) -> Result<LayoutContext, AppError> {
        Ok(LayoutContext::from_session(&self.session, self.auth, title).await?)
    }
}
