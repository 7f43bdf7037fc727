use std::any::Any;
use std::time::Duration;

use axum::routing::{get, post};
use axum::{middleware, Router};
use tower::ServiceBuilder;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::services::ServeDir;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tower_sessions::{SessionManagerLayer, SessionStore};
use tracing::Level;

use crate::app_state::AppState;
use crate::server::handlers;
use crate::server::middleware::{
    authenticate, expose_error_detail, panic_response, require_authentication, secure_headers,
};

/// Upper bound on the time spent serving one request.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Construct the application's HTTP router with all routes and middleware configured.
///
/// `/ping` and `/static` sit outside the session and authentication layers; every other
/// route sees the session and an [`Authentication`](super::context::Authentication).
pub fn build_router<Store>(state: AppState, session_layer: SessionManagerLayer<Store>) -> Router
where
    Store: SessionStore + Clone,
{
    let debug = state.config().debug;

    let protected_routes = Router::new()
        .route(
            "/snippet/create",
            get(handlers::snippets::snippet_create_form_handler)
                .post(handlers::snippets::snippet_create_submit_handler),
        )
        .route("/user/logout", post(handlers::auth::logout_handler))
        .route(
            "/account/view",
            get(handlers::account::account_view_handler),
        )
        .route(
            "/account/password/update",
            get(handlers::account::password_update_form_handler)
                .post(handlers::account::password_update_submit_handler),
        )
        .route_layer(middleware::from_fn(require_authentication));

    let dynamic_routes = Router::new()
        .route("/", get(handlers::snippets::home_handler))
        .route("/about", get(handlers::pages::about_handler))
        .route(
            "/snippet/view/:id",
            get(handlers::snippets::snippet_view_handler),
        )
        .route(
            "/user/signup",
            get(handlers::auth::signup_form_handler).post(handlers::auth::signup_submit_handler),
        )
        .route(
            "/user/login",
            get(handlers::auth::login_form_handler).post(handlers::auth::login_submit_handler),
        )
        .merge(protected_routes)
        .layer(
            ServiceBuilder::new()
                .layer(session_layer)
                .layer(middleware::from_fn_with_state(state.clone(), authenticate)),
        );

    let mut app = Router::new()
        .route("/ping", get(handlers::pages::ping_handler))
        .nest_service("/static", ServeDir::new("static"))
        .merge(dynamic_routes);

    if debug {
        app = app.layer(middleware::from_fn(expose_error_detail));
    }

    app.layer(
        ServiceBuilder::new()
            .layer(middleware::from_fn(secure_headers))
            .layer(
                TraceLayer::new_for_http()
                    .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                    .on_response(DefaultOnResponse::new().level(Level::INFO)),
            )
            .layer(CatchPanicLayer::custom(
                move |payload: Box<dyn Any + Send + 'static>| panic_response(payload, debug),
            ))
            .layer(TimeoutLayer::new(REQUEST_TIMEOUT)),
    )
    .with_state(state)
}
