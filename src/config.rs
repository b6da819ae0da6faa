use serde::{Deserialize, Serialize};

/// Default Cohere v2 embed endpoint. Overridable for self-hosted gateways.
pub const DEFAULT_EMBED_API_URL: &str = "https://api.cohere.com/v2/embed";

/// Dimension of `embed-english-v3.0` vectors.
pub const DEFAULT_EMBED_DIM: usize = 1024;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub listen_addr: String,
    pub embed_api_url: String,
    pub embed_model: String,
    pub embed_dim: usize,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let port = std::env::var("SHELFDB_PORT").unwrap_or_else(|_| "8000".to_string());

        Self {
            listen_addr: format!("127.0.0.1:{}", port),
            embed_api_url: std::env::var("SHELFDB_EMBED_API_URL")
                .unwrap_or_else(|_| DEFAULT_EMBED_API_URL.to_string()),
            embed_model: std::env::var("SHELFDB_EMBED_MODEL")
                .unwrap_or_else(|_| "embed-english-v3.0".to_string()),
            embed_dim: std::env::var("SHELFDB_EMBED_DIM")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_EMBED_DIM),
        }
    }
}
