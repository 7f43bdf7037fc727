//! Snippetbox: publish and browse short-lived text snippets.

pub mod app_state;
pub mod cleanup;
pub mod config;
pub mod csrf;
pub mod database;
pub mod forms;
pub mod logging;
pub mod models;
pub mod password;
pub mod server;
pub mod sessions;
pub mod templates;
pub mod validator;
