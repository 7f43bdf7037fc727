use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use tracing::info;

use crate::{
    app_state::AppState,
    forms::{PasswordUpdateForm, PostForm},
    models::ModelError,
    server::{context::RequestContext, error::AppError},
    sessions::put_flash,
    templates::{AccountTemplate, HtmlTemplate, PasswordTemplate},
};

const INCORRECT_PASSWORD_MESSAGE: &str = "Incorrect password";

fn login_redirect() -> Response {
    Redirect::to("/user/login").into_response()
}

pub async fn account_view_handler(
    State(state): State<AppState>,
    ctx: RequestContext,
) -> Result<Response, AppError> {
    let Some(user_id) = ctx.auth.user_id() else {
        return Ok(login_redirect());
    };

    let user = match state.users().get(user_id).await {
        Ok(user) => user,
        Err(ModelError::NotFound) => return Ok(login_redirect()),
        Err(err) => return Err(err.into()),
    };

    let layout = ctx.layout("Your Account").await?;
    Ok(HtmlTemplate::new(AccountTemplate {
        layout,
        account: user.into(),
    })
    .into_response())
}

pub async fn password_update_form_handler(ctx: RequestContext) -> Result<Response, AppError> {
    let layout = ctx.layout("Change Password").await?;
    Ok(HtmlTemplate::new(PasswordTemplate {
        layout,
        form: PasswordUpdateForm::default(),
    })
    .into_response())
}

pub async fn password_update_submit_handler(
    State(state): State<AppState>,
    ctx: RequestContext,
    PostForm(mut form): PostForm<PasswordUpdateForm>,
) -> Result<Response, AppError> {
    let Some(user_id) = ctx.auth.user_id() else {
        return Ok(login_redirect());
    };

    if form.validate() {
        match state
            .users()
            .password_update(user_id, &form.current_password, &form.new_password)
            .await
        {
            Ok(()) => {
                info!(target: "auth", user_id, "password changed");
                put_flash(&ctx.session, "Password changed successfully").await?;
                return Ok(Redirect::to("/account/view").into_response());
            }
            Err(ModelError::InvalidCredentials) => {
                form.validator
                    .add_field_error("current_password", INCORRECT_PASSWORD_MESSAGE);
            }
            Err(ModelError::NotFound) => return Ok(login_redirect()),
            Err(err) => return Err(err.into()),
        }
    }

    let layout = ctx.layout("Change Password").await?;
    Ok(HtmlTemplate::with_status(
        PasswordTemplate { layout, form },
        StatusCode::UNPROCESSABLE_ENTITY,
    )
    .into_response())
}
