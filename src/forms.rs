//! Form payloads, their validation rules, and the CSRF-checking [`PostForm`] extractor.

use std::fmt::Display;
use std::str::FromStr;

use async_trait::async_trait;
use axum::{
    extract::{FromRequest, FromRequestParts, Request},
    response::{IntoResponse, Response},
    Form,
};
use serde::{de, de::DeserializeOwned, Deserialize, Deserializer};
use tower_sessions::Session;
use tracing::warn;

use crate::{
    csrf::validate_csrf_token,
    server::error::AppError,
    validator::{is_email_address, max_chars, min_chars, not_blank, permitted_value, Validator},
};

const BLANK_MESSAGE: &str = "This field cannot be blank";
const TITLE_TOO_LONG_MESSAGE: &str = "This field cannot exceed 100 characters";
const EXPIRES_MESSAGE: &str = "This field must be equal one of these three values: [1,7,365]";
const EMAIL_MESSAGE: &str = "This field must be a valid email address";
const PASSWORD_LENGTH_MESSAGE: &str = "This field must be at least 8 characters long";
const PASSWORD_MISMATCH_MESSAGE: &str = "Password don't match";

const TITLE_MAX_CHARS: usize = 100;
const PASSWORD_MIN_CHARS: usize = 8;
/// Lifetimes, in days, a snippet may be created with.
pub const PERMITTED_EXPIRY_DAYS: [i64; 3] = [1, 7, 365];
pub const DEFAULT_EXPIRY_DAYS: i64 = 365;

/// Forms that carry the session's CSRF token.
pub trait CsrfProtected {
    fn csrf_token(&self) -> &str;
}

/// A form body that decoded cleanly and carried a valid CSRF token.
///
/// Undecodable bodies and token mismatches are both rejected with 400.
#[derive(Debug)]
pub struct PostForm<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for PostForm<T>
where
    T: DeserializeOwned + CsrfProtected + Send,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(request: Request, state: &S) -> Result<Self, Self::Rejection> {
        let (mut parts, body) = request.into_parts();
        let session = Session::from_request_parts(&mut parts, state)
            .await
            .map_err(IntoResponse::into_response)?;

        let Form(form) = Form::<T>::from_request(Request::from_parts(parts, body), state)
            .await
            .map_err(|rejection| AppError::from(rejection).into_response())?;

        let valid = validate_csrf_token(&session, form.csrf_token())
            .await
            .map_err(|err| AppError::from(err).into_response())?;
        if !valid {
            warn!(target: "csrf", "rejected form submission with a missing or stale CSRF token");
            return Err(AppError::Csrf.into_response());
        }

        Ok(PostForm(form))
    }
}

/// Treat a blank numeric field as the type's zero value so validation reports it.
fn blank_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr + Default,
    T::Err: Display,
{
    let raw = String::deserialize(deserializer)?;
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(T::default());
    }
    trimmed.parse().map_err(de::Error::custom)
}

macro_rules! csrf_protected {
    ($($form:ty),+ $(,)?) => {
        $(impl CsrfProtected for $form {
            fn csrf_token(&self) -> &str {
                &self.csrf_token
            }
        })+
    };
}

csrf_protected!(
    SnippetCreateForm,
    UserSignupForm,
    UserLoginForm,
    PasswordUpdateForm,
    LogoutForm,
);

#[derive(Debug, Default, Deserialize)]
pub struct SnippetCreateForm {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default, deserialize_with = "blank_as_default")]
    pub expires: i64,
    #[serde(default)]
    pub csrf_token: String,
    #[serde(skip)]
    pub validator: Validator,
}

impl SnippetCreateForm {
    /// Blank form shown on the create page.
    pub fn blank() -> Self {
        Self {
            expires: DEFAULT_EXPIRY_DAYS,
            ..Self::default()
        }
    }

    pub fn validate(&mut self) -> bool {
        let v = &mut self.validator;
        v.check_field(not_blank(&self.title), "title", BLANK_MESSAGE);
        v.check_field(
            max_chars(&self.title, TITLE_MAX_CHARS),
            "title",
            TITLE_TOO_LONG_MESSAGE,
        );
        v.check_field(not_blank(&self.content), "content", BLANK_MESSAGE);
        v.check_field(
            permitted_value(self.expires, &PERMITTED_EXPIRY_DAYS),
            "expires",
            EXPIRES_MESSAGE,
        );
        v.valid()
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct UserSignupForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub csrf_token: String,
    #[serde(skip)]
    pub validator: Validator,
}

impl UserSignupForm {
    pub fn validate(&mut self) -> bool {
        let v = &mut self.validator;
        v.check_field(not_blank(&self.name), "name", BLANK_MESSAGE);
        v.check_field(not_blank(&self.email), "email", BLANK_MESSAGE);
        v.check_field(is_email_address(&self.email), "email", EMAIL_MESSAGE);
        v.check_field(not_blank(&self.password), "password", BLANK_MESSAGE);
        v.check_field(
            min_chars(&self.password, PASSWORD_MIN_CHARS),
            "password",
            PASSWORD_LENGTH_MESSAGE,
        );
        v.valid()
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct UserLoginForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub csrf_token: String,
    #[serde(skip)]
    pub validator: Validator,
}

impl UserLoginForm {
    pub fn validate(&mut self) -> bool {
        let v = &mut self.validator;
        v.check_field(not_blank(&self.email), "email", BLANK_MESSAGE);
        v.check_field(is_email_address(&self.email), "email", EMAIL_MESSAGE);
        v.check_field(not_blank(&self.password), "password", BLANK_MESSAGE);
        v.valid()
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct PasswordUpdateForm {
    #[serde(default)]
    pub current_password: String,
    #[serde(default)]
    pub new_password: String,
    #[serde(default)]
    pub confirm_new_password: String,
    #[serde(default)]
    pub csrf_token: String,
    #[serde(skip)]
    pub validator: Validator,
}

impl PasswordUpdateForm {
    pub fn validate(&mut self) -> bool {
        let v = &mut self.validator;
        v.check_field(
            not_blank(&self.current_password),
            "current_password",
            BLANK_MESSAGE,
        );
        v.check_field(not_blank(&self.new_password), "new_password", BLANK_MESSAGE);
        v.check_field(
            min_chars(&self.new_password, PASSWORD_MIN_CHARS),
            "new_password",
            PASSWORD_LENGTH_MESSAGE,
        );
        v.check_field(
            not_blank(&self.confirm_new_password),
            "confirm_new_password",
            BLANK_MESSAGE,
        );
        v.check_field(
            self.new_password == self.confirm_new_password,
            "confirm_new_password",
            PASSWORD_MISMATCH_MESSAGE,
        );
        v.valid()
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct LogoutForm {
    #[serde(default)]
    pub csrf_token: String,
}
