use crate::config::AppConfig;
use crate::error::{AppError, AppResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// The provider embeds documents and queries differently; passing the wrong
/// input type degrades retrieval quality silently, so it is part of the trait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbedInput {
    Document,
    Query,
}

impl EmbedInput {
    fn as_str(&self) -> &'static str {
        match self {
            EmbedInput::Document => "search_document",
            EmbedInput::Query => "search_query",
        }
    }
}

/// Text → fixed-length f32 vector, via a remote provider.
///
/// From the store's point of view this is a pure function; all state lives on
/// the provider side. Implementations must be cheap to share across handlers.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, texts: &[String], input: EmbedInput) -> AppResult<Vec<Vec<f32>>>;

    /// Vector length produced by this provider/model pair.
    fn dimension(&self) -> usize;
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    texts: &'a [String],
    input_type: &'a str,
    embedding_types: [&'a str; 1],
}

#[derive(Deserialize)]
struct EmbedResponse {
    embeddings: EmbedVectors,
}

#[derive(Deserialize)]
struct EmbedVectors {
    float: Vec<Vec<f32>>,
}

/// Cohere v2 `/embed` client.
pub struct CohereEmbedder {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    model: String,
    dim: usize,
}

impl CohereEmbedder {
    pub fn new(api_url: String, api_key: String, model: String, dim: usize) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url,
            api_key,
            model,
            dim,
        }
    }

    /// Build from `AppConfig`, reading the provider key from `COHERE_API_KEY`.
    pub fn from_config(config: &AppConfig) -> AppResult<Self> {
        let api_key = std::env::var("COHERE_API_KEY").map_err(|_| {
            AppError::Embedding("COHERE_API_KEY is not set".to_string())
        })?;
        Ok(Self::new(
            config.embed_api_url.clone(),
            api_key,
            config.embed_model.clone(),
            config.embed_dim,
        ))
    }
}

#[async_trait]
impl Embedder for CohereEmbedder {
    async fn embed(&self, texts: &[String], input: EmbedInput) -> AppResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!(count = texts.len(), input = input.as_str(), "embedding texts");

        let request = EmbedRequest {
            model: &self.model,
            texts,
            input_type: input.as_str(),
            embedding_types: ["float"],
        };

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::Embedding(format!("request to provider failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Embedding(format!(
                "provider returned {}: {}",
                status, body
            )));
        }

        let parsed: EmbedResponse = response
            .json()
            .await
            .map_err(|e| AppError::Embedding(format!("malformed provider response: {}", e)))?;

        let vectors = parsed.embeddings.float;
        if vectors.len() != texts.len() {
            return Err(AppError::Embedding(format!(
                "provider returned {} vectors for {} texts",
                vectors.len(),
                texts.len()
            )));
        }

        Ok(vectors)
    }

    fn dimension(&self) -> usize {
        self.dim
    }
}
