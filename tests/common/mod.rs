#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, HeaderMap, Request, StatusCode},
    Router,
};
use snippetbox::{
    app_state::AppState,
    config::AppConfig,
    database::open_in_memory,
    models::{
        MemorySnippetStore, MemoryUserStore, SnippetRepository, SqliteSnippetStore,
        SqliteUserStore, UserRepository,
    },
    server::build_router,
    sessions::session_layer,
};
use sqlx::SqlitePool;
use tower::ServiceExt;
use tower_sessions::MemoryStore;

pub const PASSWORD: &str = "pa55word-long";

pub struct TestApp {
    pub client: TestClient,
    pub pool: SqlitePool,
}

impl TestApp {
    /// Router over an in-memory SQLite database and in-memory session store.
    pub async fn spawn() -> Self {
        Self::spawn_with(false).await
    }

    pub async fn spawn_with(debug: bool) -> Self {
        let pool = open_in_memory().await.expect("in-memory database");
        let client = client_for(
            Arc::new(SqliteSnippetStore::new(pool.clone())),
            Arc::new(SqliteUserStore::new(pool.clone())),
            debug,
        );
        Self { client, pool }
    }
}

/// Router backed entirely by the in-memory repositories.
pub fn memory_client(snippets: Arc<MemorySnippetStore>, users: Arc<MemoryUserStore>) -> TestClient {
    client_for(snippets, users, false)
}

fn client_for(
    snippets: Arc<dyn SnippetRepository>,
    users: Arc<dyn UserRepository>,
    debug: bool,
) -> TestClient {
    let mut config = AppConfig::default();
    config.debug = debug;

    let layer = session_layer(MemoryStore::default(), &config.session);
    let router = build_router(AppState::new(snippets, users, config), layer);
    TestClient::new(router)
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl TestResponse {
    pub fn location(&self) -> Option<&str> {
        self.headers
            .get(header::LOCATION)
            .and_then(|value| value.to_str().ok())
    }

    /// The CSRF token embedded in the page's first form.
    pub fn csrf_token(&self) -> String {
        const MARKER: &str = r#"name="csrf_token" value=""#;
        let start = self
            .body
            .find(MARKER)
            .map(|index| index + MARKER.len())
            .expect("page carries a csrf token");
        let end = self.body[start..].find('"').expect("terminated attribute");
        self.body[start..start + end].to_string()
    }
}

/// Drives the router in-process, carrying cookies between requests like a browser.
pub struct TestClient {
    router: Router,
    cookies: HashMap<String, String>,
}

impl TestClient {
    pub fn new(router: Router) -> Self {
        Self {
            router,
            cookies: HashMap::new(),
        }
    }

    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    pub async fn get(&mut self, uri: &str) -> TestResponse {
        let request = self.request("GET", uri).body(Body::empty()).unwrap();
        self.send(request).await
    }

    pub async fn post_form(&mut self, uri: &str, fields: &[(&str, &str)]) -> TestResponse {
        let body = fields
            .iter()
            .map(|(key, value)| format!("{}={}", urlencode(key), urlencode(value)))
            .collect::<Vec<_>>()
            .join("&");

        let request = self
            .request("POST", uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body))
            .unwrap();
        self.send(request).await
    }

    /// Fetch `form_page` for a fresh CSRF token, then submit `fields` to `action`.
    pub async fn submit(
        &mut self,
        form_page: &str,
        action: &str,
        fields: &[(&str, &str)],
    ) -> TestResponse {
        let token = self.get(form_page).await.csrf_token();
        let mut fields = fields.to_vec();
        fields.push(("csrf_token", &token));
        self.post_form(action, &fields).await
    }

    pub async fn signup(&mut self, name: &str, email: &str) -> TestResponse {
        self.submit(
            "/user/signup",
            "/user/signup",
            &[("name", name), ("email", email), ("password", PASSWORD)],
        )
        .await
    }

    pub async fn login(&mut self, email: &str, password: &str) -> TestResponse {
        self.submit(
            "/user/login",
            "/user/login",
            &[("email", email), ("password", password)],
        )
        .await
    }

    fn request(&self, method: &str, uri: &str) -> axum::http::request::Builder {
        let mut builder = Request::builder().method(method).uri(uri);
        if !self.cookies.is_empty() {
            let cookie = self
                .cookies
                .iter()
                .map(|(name, value)| format!("{name}={value}"))
                .collect::<Vec<_>>()
                .join("; ");
            builder = builder.header(header::COOKIE, cookie);
        }
        builder
    }

    async fn send(&mut self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();

        for value in response.headers().get_all(header::SET_COOKIE) {
            let Some(pair) = value.to_str().ok().and_then(|raw| raw.split(';').next()) else {
                continue;
            };
            if let Some((name, value)) = pair.split_once('=') {
                if value.is_empty() {
                    self.cookies.remove(name.trim());
                } else {
                    self.cookies.insert(name.trim().to_string(), value.to_string());
                }
            }
        }

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();

        TestResponse {
            status,
            headers,
            body: String::from_utf8_lossy(&bytes).into_owned(),
        }
    }
}

fn urlencode(input: &str) -> String {
    let mut encoded = String::with_capacity(input.len());
    for byte in input.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                encoded.push(byte as char)
            }
            b' ' => encoded.push('+'),
            other => encoded.push_str(&format!("%{other:02X}")),
        }
    }
    encoded
}
