use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use tracing::{info, warn};

use crate::{
    app_state::AppState,
    csrf,
    forms::{LogoutForm, PostForm, UserLoginForm, UserSignupForm},
    models::ModelError,
    password::randomized_backoff,
    server::{context::RequestContext, error::AppError},
    sessions::{clear_user_id, pop_origin_url, put_flash, store_user_id},
    templates::{HtmlTemplate, LoginTemplate, SignupTemplate},
};

const INVALID_CREDENTIALS_MESSAGE: &str = "Email or password is incorrect";
const DUPLICATE_EMAIL_MESSAGE: &str = "Email address is already in use";
const DEFAULT_LOGIN_REDIRECT: &str = "/snippet/create";
const LOGOUT_PATH: &str = "/user/logout";

pub async fn signup_form_handler(ctx: RequestContext) -> Result<Response, AppError> {
    let layout = ctx.layout("Signup").await?;
    Ok(HtmlTemplate::new(SignupTemplate {
        layout,
        form: UserSignupForm::default(),
    })
    .into_response())
}

pub async fn signup_submit_handler(
    State(state): State<AppState>,
    ctx: RequestContext,
    PostForm(mut form): PostForm<UserSignupForm>,
) -> Result<Response, AppError> {
    if form.validate() {
        match state
            .users()
            .insert(&form.name, &form.email, &form.password)
            .await
        {
            Ok(()) => {
                info!(target: "auth", "new account registered");
                put_flash(&ctx.session, "Your signup was successful. Please log in.").await?;
                return Ok(Redirect::to("/user/login").into_response());
            }
            Err(ModelError::DuplicateEmail) => {
                form.validator
                    .add_field_error("email", DUPLICATE_EMAIL_MESSAGE);
            }
            Err(err) => return Err(err.into()),
        }
    }

    let layout = ctx.layout("Signup").await?;
    Ok(HtmlTemplate::with_status(
        SignupTemplate { layout, form },
        StatusCode::UNPROCESSABLE_ENTITY,
    )
    .into_response())
}

pub async fn login_form_handler(ctx: RequestContext) -> Result<Response, AppError> {
    let layout = ctx.layout("Login").await?;
    Ok(HtmlTemplate::new(LoginTemplate {
        layout,
        form: UserLoginForm::default(),
    })
    .into_response())
}

pub async fn login_submit_handler(
    State(state): State<AppState>,
    ctx: RequestContext,
    PostForm(mut form): PostForm<UserLoginForm>,
) -> Result<Response, AppError> {
    if form.validate() {
        match state.users().authenticate(&form.email, &form.password).await {
            Ok(user_id) => return complete_login(&ctx, user_id).await,
            Err(ModelError::InvalidCredentials) => {
                warn!(target: "auth", "failed login attempt");
                randomized_backoff().await;
                form.validator
                    .add_general_error(INVALID_CREDENTIALS_MESSAGE);
            }
            Err(err) => return Err(err.into()),
        }
    }

    let layout = ctx.layout("Login").await?;
    Ok(HtmlTemplate::with_status(
        LoginTemplate { layout, form },
        StatusCode::UNPROCESSABLE_ENTITY,
    )
    .into_response())
}

/// Start an authenticated session under a fresh id and send the user where they were headed.
async fn complete_login(ctx: &RequestContext, user_id: i64) -> Result<Response, AppError> {
    ctx.session.cycle_id().await?;
    csrf::rotate_csrf_token(&ctx.session).await?;
    store_user_id(&ctx.session, user_id).await?;

    let target = match pop_origin_url(&ctx.session).await? {
        Some(origin) if origin != LOGOUT_PATH => origin,
        _ => DEFAULT_LOGIN_REDIRECT.to_string(),
    };

    info!(target: "auth", user_id, "user logged in");
    Ok(Redirect::to(&target).into_response())
}

pub async fn logout_handler(
    ctx: RequestContext,
    PostForm(_form): PostForm<LogoutForm>,
) -> Result<Response, AppError> {
    ctx.session.cycle_id().await?;
    clear_user_id(&ctx.session).await?;
    csrf::rotate_csrf_token(&ctx.session).await?;
    put_flash(&ctx.session, "You've been logged out successfully!").await?;

    if let Some(user_id) = ctx.auth.user_id() {
        info!(target: "auth", user_id, "user logged out");
    }

    Ok(Redirect::to("/").into_response())
}
