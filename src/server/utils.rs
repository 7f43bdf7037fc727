use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use time::{macros::format_description, OffsetDateTime, UtcOffset};

/// Generic response for failures whose detail must not reach the client.
pub fn server_error_response() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "Unable to process your request. Please try again later.",
    )
        .into_response()
}

/// Render a timestamp as `07 Mar 2024 at 14:05`, always in UTC.
pub fn human_date(dt: OffsetDateTime) -> String {
    let format = format_description!("[day] [month repr:short] [year] at [hour]:[minute]");
    dt.to_offset(UtcOffset::UTC)
        .format(&format)
        .unwrap_or_default()
}
