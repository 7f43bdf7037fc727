use std::backtrace::Backtrace;
use std::fmt::Display;

use axum::{
    extract::rejection::FormRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tower_sessions::session::Error as SessionError;
use tracing::{error, warn};

use crate::models::ModelError;

use super::utils::server_error_response;

/// Failure of a request handler, mapped onto an HTTP status by [`IntoResponse`].
#[derive(Debug, Error)]
pub enum AppError {
    #[error("malformed form submission: {0}")]
    Decode(#[from] FormRejection),
    #[error("missing or invalid CSRF token")]
    Csrf,
    #[error("resource not found")]
    NotFound,
    #[error("model error: {0}")]
    Model(#[from] ModelError),
    #[error("session error: {0}")]
    Session(#[from] SessionError),
    #[error("template rendering error: {0}")]
    Template(#[from] askama::Error),
}

/// Internal detail of a 500 response. Only the debug-mode middleware puts it on the wire.
#[derive(Debug, Clone)]
pub struct ErrorDetail(pub String);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Decode(rejection) => {
                warn!(target: "http", %rejection, "rejected undecodable form body");
                client_error(StatusCode::BAD_REQUEST)
            }
            AppError::Csrf => client_error(StatusCode::BAD_REQUEST),
            AppError::NotFound | AppError::Model(ModelError::NotFound) => {
                client_error(StatusCode::NOT_FOUND)
            }
            other => server_error(&other),
        }
    }
}

/// Plain-text response carrying the status's canonical reason phrase.
pub fn client_error(status: StatusCode) -> Response {
    (status, status.canonical_reason().unwrap_or_default()).into_response()
}

/// Log `err` with a backtrace and answer with the generic 500 text.
pub fn server_error(err: &dyn Display) -> Response {
    let trace = Backtrace::force_capture();
    error!(target: "http", error = %err, backtrace = %trace, "request failed");

    let mut response = server_error_response();
    response
        .extensions_mut()
        .insert(ErrorDetail(format!("{err}\n\n{trace}")));
    response
}
