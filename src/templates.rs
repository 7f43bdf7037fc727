use askama::Template;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use time::OffsetDateTime;
use tower_sessions::{session::Error as SessionError, Session};

use crate::{
    csrf::ensure_csrf_token,
    forms::{PasswordUpdateForm, SnippetCreateForm, UserLoginForm, UserSignupForm},
    models::{Snippet, User},
    server::{context::Authentication, error::AppError, utils::human_date},
    sessions::pop_flash,
};

/// Shared layout context injected into all templates
#[derive(Clone, Debug)]
pub struct LayoutContext {
    pub title: String,
    pub current_year: i32,
    pub flash: Option<String>,
    pub is_authenticated: bool,
    pub csrf_token: String,
}

impl LayoutContext {
    /// Build the layout for the current request, consuming the pending flash message.
    pub async fn from_session(
        session: &Session,
        auth: Authentication,
        title: impl Into<String>,
    ) -> Result<Self, SessionError> {
        Ok(Self {
            title: title.into(),
            current_year: OffsetDateTime::now_utc().year(),
            flash: pop_flash(session).await?,
            is_authenticated: auth.is_authenticated(),
            csrf_token: ensure_csrf_token(session).await?,
        })
    }
}

/// Wrapper that renders an Askama template fully before building the response.
pub struct HtmlTemplate<T: Template> {
    template: T,
    status: StatusCode,
}

impl<T: Template> HtmlTemplate<T> {
    pub fn new(template: T) -> Self {
        Self {
            template,
            status: StatusCode::OK,
        }
    }

    pub fn with_status(template: T, status: StatusCode) -> Self {
        Self { template, status }
    }
}

impl<T: Template> From<T> for HtmlTemplate<T> {
    fn from(template: T) -> Self {
        Self::new(template)
    }
}

impl<T: Template> IntoResponse for HtmlTemplate<T> {
    fn into_response(self) -> Response {
        match self.template.render() {
            Ok(html) => (self.status, Html(html)).into_response(),
            Err(err) => AppError::Template(err).into_response(),
        }
    }
}

/// Display-ready snippet.
#[derive(Clone, Debug)]
pub struct SnippetRow {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub created: String,
    pub expires: String,
}

impl From<Snippet> for SnippetRow {
    fn from(snippet: Snippet) -> Self {
        Self {
            id: snippet.id,
            title: snippet.title,
            content: snippet.content,
            created: human_date(snippet.created),
            expires: human_date(snippet.expires),
        }
    }
}

#[derive(Clone, Debug)]
pub struct AccountRow {
    pub name: String,
    pub email: String,
    pub joined: String,
}

impl From<User> for AccountRow {
    fn from(user: User) -> Self {
        Self {
            name: user.name,
            email: user.email,
            joined: human_date(user.created),
        }
    }
}

#[derive(Template)]
#[template(path = "pages/home.html", escape = "html")]
pub struct HomeTemplate {
    pub layout: LayoutContext,
    pub snippets: Vec<SnippetRow>,
}

#[derive(Template)]
#[template(path = "pages/view.html", escape = "html")]
pub struct ViewTemplate {
    pub layout: LayoutContext,
    pub snippet: SnippetRow,
}

#[derive(Template)]
#[template(path = "pages/create.html", escape = "html")]
pub struct CreateTemplate {
    pub layout: LayoutContext,
    pub form: SnippetCreateForm,
}

#[derive(Template)]
#[template(path = "pages/signup.html", escape = "html")]
pub struct SignupTemplate {
    pub layout: LayoutContext,
    pub form: UserSignupForm,
}

#[derive(Template)]
#[template(path = "pages/login.html", escape = "html")]
pub struct LoginTemplate {
    pub layout: LayoutContext,
    pub form: UserLoginForm,
}

#[derive(Template)]
#[template(path = "pages/about.html", escape = "html")]
pub struct AboutTemplate {
    pub layout: LayoutContext,
}

#[derive(Template)]
#[template(path = "pages/account.html", escape = "html")]
pub struct AccountTemplate {
    pub layout: LayoutContext,
    pub account: AccountRow,
}

#[derive(Template)]
#[template(path = "pages/password.html", escape = "html")]
pub struct PasswordTemplate {
    pub layout: LayoutContext,
    pub form: PasswordUpdateForm,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout(title: &str) -> LayoutContext {
        LayoutContext {
            title: title.to_string(),
            current_year: 2024,
            flash: Some("Saved <b>ok</b>".to_string()),
            is_authenticated: false,
            csrf_token: "token-123".to_string(),
        }
    }

    #[test]
    fn layout_renders_flash_escaped_and_year() {
        let html = AboutTemplate {
            layout: layout("About"),
        }
        .render()
        .unwrap();

        assert!(html.contains("<title>About - Snippetbox</title>"));
        assert!(html.contains("Saved &lt;b&gt;ok&lt;/b&gt;"));
        assert!(html.contains("2024"));
        assert!(html.contains(r#"href="/user/login""#));
        assert!(!html.contains("/user/logout"));
    }

    #[test]
    fn authenticated_nav_carries_logout_form_with_token() {
        let mut layout = layout("Home");
        layout.is_authenticated = true;
        let html = HomeTemplate {
            layout,
            snippets: Vec::new(),
        }
        .render()
        .unwrap();

        assert!(html.contains(r#"action="/user/logout""#));
        assert!(html.contains(r#"name="csrf_token" value="token-123""#));
        assert!(html.contains("There's nothing to see here... yet!"));
    }

    #[test]
    fn create_form_shows_field_errors_and_keeps_values() {
        let mut form = SnippetCreateForm {
            title: "x".repeat(101),
            content: "<script>".to_string(),
            expires: 7,
            ..SnippetCreateForm::default()
        };
        form.validate();

        let html = CreateTemplate {
            layout: layout("Create a New Snippet"),
            form,
        }
        .render()
        .unwrap();

        assert!(html.contains(r#"data-field="title""#));
        assert!(!html.contains(r#"data-field="content""#));
        assert!(html.contains("&lt;script&gt;"));
        assert!(html.contains(r#"value="7" checked"#));
    }
}
