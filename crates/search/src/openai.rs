//! OpenAI-compatible embeddings backend

use crate::error::{Result, SearchError};
use crate::semantic::Embedder;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

const OPENAI_EMBEDDINGS_URL: &str = "https://api.openai.com/v1/embeddings";
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Embeds texts through the `/v1/embeddings` endpoint
pub struct OpenAiEmbedder {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenAiEmbedder {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: OPENAI_EMBEDDINGS_URL.to_string(),
            model: "text-embedding-3-small".to_string(),
        }
    }

    /// Read the key from `OPENAI_API_KEY`
    pub fn from_env() -> Result<Self> {
        match std::env::var(API_KEY_ENV) {
            Ok(key) if !key.trim().is_empty() => Ok(Self::new(key.trim())),
            _ => Err(SearchError::Config(format!("{API_KEY_ENV} is not set"))),
        }
    }

    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Point at any OpenAI-compatible embeddings URL
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    async fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        log::debug!("Embedding {} texts with {}", texts.len(), self.model);

        let body = EmbeddingRequest {
            model: &self.model,
            input: texts,
        };
        let resp = self
            .client
            .post(&self.base_url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(SearchError::semantic_backend(format!(
                "embeddings request failed ({status}): {message}"
            )));
        }

        let mut parsed: EmbeddingResponse = resp.json().await?;
        parsed.data.sort_by_key(|d| d.index);
        Ok(parsed.data.into_iter().map(|d| d.embedding).collect())
    }
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}
