use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use tracing::info;

use crate::{
    app_state::AppState,
    forms::{PostForm, SnippetCreateForm},
    server::{context::RequestContext, error::AppError},
    sessions::put_flash,
    templates::{CreateTemplate, HomeTemplate, HtmlTemplate, SnippetRow, ViewTemplate},
};

pub async fn home_handler(
    State(state): State<AppState>,
    ctx: RequestContext,
) -> Result<Response, AppError> {
    let snippets = state.snippets().latest().await?;
    let layout = ctx.layout("Home").await?;

    Ok(HtmlTemplate::new(HomeTemplate {
        layout,
        snippets: snippets.into_iter().map(SnippetRow::from).collect(),
    })
    .into_response())
}

pub async fn snippet_view_handler(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(raw_id): Path<String>,
) -> Result<Response, AppError> {
    let id = raw_id
        .parse::<i64>()
        .ok()
        .filter(|id| *id >= 1)
        .ok_or(AppError::NotFound)?;

    let snippet = state.snippets().get(id).await?;
    let layout = ctx.layout(&format!("Snippet #{id}")).await?;

    Ok(HtmlTemplate::new(ViewTemplate {
        layout,
        snippet: snippet.into(),
    })
    .into_response())
}

pub async fn snippet_create_form_handler(ctx: RequestContext) -> Result<Response, AppError> {
    let layout = ctx.layout("Create a New Snippet").await?;
    Ok(HtmlTemplate::new(CreateTemplate {
        layout,
        form: SnippetCreateForm::blank(),
    })
    .into_response())
}

pub async fn snippet_create_submit_handler(
    State(state): State<AppState>,
    ctx: RequestContext,
    PostForm(mut form): PostForm<SnippetCreateForm>,
) -> Result<Response, AppError> {
    if !form.validate() {
        let layout = ctx.layout("Create a New Snippet").await?;
        return Ok(HtmlTemplate::with_status(
            CreateTemplate { layout, form },
            StatusCode::UNPROCESSABLE_ENTITY,
        )
        .into_response());
    }

    let id = state
        .snippets()
        .insert(&form.title, &form.content, form.expires)
        .await?;
    info!(target: "snippets", snippet_id = id, expires_days = form.expires, "snippet created");

    put_flash(&ctx.session, "Snippet successfully created!").await?;
    Ok(Redirect::to(&format!("/snippet/view/{id}")).into_response())
}
