use std::{any::Any, backtrace::Backtrace};

use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;
use tracing::{debug, error};

use crate::{
    app_state::AppState,
    sessions::{current_user_id, remember_origin_url},
};

use super::{
    context::Authentication,
    error::{AppError, ErrorDetail},
    utils::server_error_response,
};

const CONTENT_SECURITY_POLICY: &str =
    "default-src 'self'; style-src 'self' fonts.googleapis.com; font-src fonts.gstatic.com";

/// Attach the fixed browser security headers to every response.
pub async fn secure_headers(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();

    headers.insert(
        header::CONTENT_SECURITY_POLICY,
        HeaderValue::from_static(CONTENT_SECURITY_POLICY),
    );
    headers.insert(
        header::REFERRER_POLICY,
        HeaderValue::from_static("origin-when-cross-origin"),
    );
    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("deny"));
    headers.insert(header::X_XSS_PROTECTION, HeaderValue::from_static("0"));

    response
}

/// Resolve the session's user id to an [`Authentication`] for downstream extractors.
///
/// A session pointing at an account that no longer exists is treated as anonymous.
pub async fn authenticate(
    State(state): State<AppState>,
    session: Session,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let auth = match current_user_id(&session).await? {
        Some(user_id) if state.users().exists(user_id).await? => Authentication::User(user_id),
        Some(user_id) => {
            debug!(target: "auth", user_id, "session refers to a missing account");
            Authentication::Anonymous
        }
        None => Authentication::Anonymous,
    };

    request.extensions_mut().insert(auth);
    Ok(next.run(request).await)
}

/// Gate a route behind login. Anonymous visitors are sent to the login form and
/// brought back to the requested path afterwards.
pub async fn require_authentication(
    auth: Authentication,
    session: Session,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if !auth.is_authenticated() {
        remember_origin_url(&session, request.uri()).await?;
        return Ok(Redirect::to("/user/login").into_response());
    }

    let mut response = next.run(request).await;
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    Ok(response)
}

/// Debug mode only: replace the generic 500 body with the recorded error detail.
pub async fn expose_error_detail(request: Request, next: Next) -> Response {
    let response = next.run(request).await;
    let Some(ErrorDetail(detail)) = response.extensions().get::<ErrorDetail>().cloned() else {
        return response;
    };

    let (mut parts, _) = response.into_parts();
    parts.headers.remove(header::CONTENT_LENGTH);
    parts.headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    Response::from_parts(parts, Body::from(detail))
}

/// Response for a handler that panicked. The connection is closed afterwards.
pub fn panic_response(payload: Box<dyn Any + Send + 'static>, debug: bool) -> Response {
    let message = if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else {
        "unknown panic payload".to_string()
    };

    let trace = Backtrace::force_capture();
    error!(target: "http", panic = %message, backtrace = %trace, "request handler panicked");

    let mut response = if debug {
        let body = format!("{message}\n\n{trace}");
        (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
    } else {
        server_error_response()
    };
    response
        .headers_mut()
        .insert(header::CONNECTION, HeaderValue::from_static("close"));
    response
}
