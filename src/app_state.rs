use std::sync::Arc;

use crate::{
    config::AppConfig,
    models::{SnippetRepository, UserRepository},
};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    /// Snippet storage
    snippets: Arc<dyn SnippetRepository>,
    /// Account storage
    users: Arc<dyn UserRepository>,
    /// Application configuration
    config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(
        snippets: Arc<dyn SnippetRepository>,
        users: Arc<dyn UserRepository>,
        config: AppConfig,
    ) -> Self {
        Self {
            snippets,
            users,
            config: Arc::new(config),
        }
    }

    pub fn snippets(&self) -> &dyn SnippetRepository {
        self.snippets.as_ref()
    }

    pub fn users(&self) -> &dyn UserRepository {
        self.users.as_ref()
    }

    /// Get a reference to the application configuration
    pub fn config(&self) -> &AppConfig {
        &self.config
    }
}
