use axum::response::{IntoResponse, Response};

use crate::{
    server::{context::RequestContext, error::AppError},
    templates::{AboutTemplate, HtmlTemplate},
};

pub async fn about_handler(ctx: RequestContext) -> Result<Response, AppError> {
    let layout = ctx.layout("About").await?;
    Ok(HtmlTemplate::new(AboutTemplate { layout }).into_response())
}

/// Liveness probe. Touches neither the session store nor the database.
pub async fn ping_handler() -> &'static str {
    "OK"
}
