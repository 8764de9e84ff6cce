use helpdesk_core::config::Config;
use helpdesk_core::store::FileStore;
use std::path::PathBuf;
use std::sync::Arc;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub root: PathBuf,
    pub store: Arc<FileStore>,
    /// Bearer token clients must present; `None` leaves the API open.
    pub token: Option<String>,
}

impl AppState {
    /// Build state for the workspace at `root`. A missing or unreadable
    /// config falls back to defaults so the server can still answer health
    /// checks.
    pub fn new(root: PathBuf) -> Self {
        let config = Config::load(&root).ok();
        let page_size = config
            .as_ref()
            .map(Config::page_size)
            .unwrap_or_else(|| Config::new("").page_size());
        let token = config.as_ref().and_then(|c| c.server.token());
        Self {
            store: Arc::new(FileStore::new(root.clone()).with_page_size(page_size)),
            root,
            token,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }
}
