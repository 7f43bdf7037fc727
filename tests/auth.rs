mod common;

use std::sync::Arc;

use axum::http::StatusCode;
use common::{memory_client, TestApp, PASSWORD};
use snippetbox::models::{MemorySnippetStore, MemoryUserStore, UserRepository};

const SESSION_COOKIE: &str = "snippetbox_session";

#[tokio::test]
async fn signup_then_duplicate_email() {
    let mut app = TestApp::spawn().await;

    let response = app.client.signup("Bob", "bob@example.com").await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(response.location(), Some("/user/login"));

    let login_page = app.client.get("/user/login").await;
    assert!(login_page.body.contains("Your signup was successful. Please log in."));

    let response = app.client.signup("Bob", "bob@example.com").await;
    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(response.body.contains(r#"data-field="email""#));
    assert!(response.body.contains("Email address is already in use"));

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(&app.pool)
        .await
        .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn signup_validation_errors() {
    let mut app = TestApp::spawn().await;

    let response = app
        .client
        .submit(
            "/user/signup",
            "/user/signup",
            &[("name", ""), ("email", "not-an-email"), ("password", "short")],
        )
        .await;

    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(response.body.contains(r#"data-field="name""#));
    assert!(response.body.contains("This field must be a valid email address"));
    assert!(response.body.contains("This field must be at least 8 characters long"));
    assert!(response.body.contains(r#"value="not-an-email""#));
}

#[tokio::test]
async fn wrong_credentials_show_a_general_error() {
    let mut app = TestApp::spawn().await;
    app.client.signup("Bob", "bob@example.com").await;

    for (email, password) in [
        ("bob@example.com", "wrong-password"),
        ("nobody@example.com", PASSWORD),
    ] {
        let response = app.client.login(email, password).await;
        assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(response.body.contains("Email or password is incorrect"));
    }
}

#[tokio::test]
async fn login_returns_to_the_originally_requested_page() {
    let mut app = TestApp::spawn().await;
    app.client.signup("Bob", "bob@example.com").await;

    let response = app.client.get("/account/view").await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(response.location(), Some("/user/login"));

    let response = app.client.login("bob@example.com", PASSWORD).await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(response.location(), Some("/account/view"));

    let account = app.client.get("/account/view").await;
    assert_eq!(account.status, StatusCode::OK);
    assert!(account.body.contains("bob@example.com"));
}

#[tokio::test]
async fn login_without_origin_goes_to_create_and_rotates_session() {
    let mut app = TestApp::spawn().await;
    app.client.signup("Bob", "bob@example.com").await;

    let token = app.client.get("/user/login").await.csrf_token();
    let before = app.client.cookie(SESSION_COOKIE).map(str::to_string);
    assert!(before.is_some());

    let response = app
        .client
        .post_form(
            "/user/login",
            &[
                ("email", "bob@example.com"),
                ("password", PASSWORD),
                ("csrf_token", &token),
            ],
        )
        .await;
    assert_eq!(response.location(), Some("/snippet/create"));
    assert_ne!(app.client.cookie(SESSION_COOKIE).map(str::to_string), before);

    let page = app.client.get("/").await;
    assert_ne!(page.csrf_token(), token);
}

#[tokio::test]
async fn logout_clears_authentication() {
    let mut app = TestApp::spawn().await;
    app.client.signup("Bob", "bob@example.com").await;
    app.client.login("bob@example.com", PASSWORD).await;

    let response = app.client.submit("/", "/user/logout", &[]).await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(response.location(), Some("/"));

    let home = app.client.get("/").await;
    assert!(home.body.contains("logged out successfully!"));
    assert!(home.body.contains(r#"href="/user/login""#));

    let response = app.client.get("/account/view").await;
    assert_eq!(response.location(), Some("/user/login"));
}

#[tokio::test]
async fn password_update_flow() {
    let mut app = TestApp::spawn().await;
    app.client.signup("Bob", "bob@example.com").await;
    app.client.login("bob@example.com", PASSWORD).await;

    let response = app
        .client
        .submit(
            "/account/password/update",
            "/account/password/update",
            &[
                ("current_password", "not-my-password"),
                ("new_password", "brand-new-password"),
                ("confirm_new_password", "brand-new-password"),
            ],
        )
        .await;
    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(response.body.contains(r#"data-field="current_password""#));
    assert!(response.body.contains("Incorrect password"));

    let response = app
        .client
        .submit(
            "/account/password/update",
            "/account/password/update",
            &[
                ("current_password", PASSWORD),
                ("new_password", "brand-new-password"),
                ("confirm_new_password", "brand-new-password"),
            ],
        )
        .await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(response.location(), Some("/account/view"));
    assert!(app
        .client
        .get("/account/view")
        .await
        .body
        .contains("Password changed successfully"));

    app.client.submit("/", "/user/logout", &[]).await;
    let response = app.client.login("bob@example.com", PASSWORD).await;
    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    let response = app.client.login("bob@example.com", "brand-new-password").await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn deleted_account_is_treated_as_anonymous() {
    let users = Arc::new(MemoryUserStore::new());
    let mut client = memory_client(Arc::new(MemorySnippetStore::new()), users.clone());

    users
        .insert("Carol", "carol@example.com", PASSWORD)
        .await
        .unwrap();
    let user_id = users
        .authenticate("carol@example.com", PASSWORD)
        .await
        .unwrap();

    let response = client.login("carol@example.com", PASSWORD).await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(client.get("/account/view").await.status, StatusCode::OK);

    assert!(users.remove(user_id).await);

    let response = client.get("/account/view").await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(response.location(), Some("/user/login"));
}
