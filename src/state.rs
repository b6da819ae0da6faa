use crate::config::AppConfig;
use crate::embed::Embedder;
use crate::manager::DatabaseManager;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub manager: Arc<DatabaseManager>,
}

impl AppState {
    pub fn new(config: AppConfig, embedder: Arc<dyn Embedder>) -> Self {
        Self {
            config,
            manager: Arc::new(DatabaseManager::new(embedder)),
        }
    }
}
