//! Embedding generation via an OpenAI-compatible API

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::error::{AgendaError, Result};
use crate::settings::{parse_endpoint, EmbeddingSettings};

/// Anything that can turn text into a vector
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Generate the embedding vector for `input`
    async fn embed(&self, input: &str) -> Result<Vec<f32>>;
}

/// Client for the `/embeddings` endpoint of an OpenAI-compatible API
pub struct EmbeddingClient {
    client: Client,
    endpoint: Url,
    api_key: Option<String>,
    model: String,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

impl EmbeddingClient {
    /// Create a new embedding client
    pub fn new(settings: &EmbeddingSettings) -> Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;

        Ok(Self {
            client,
            endpoint: embeddings_endpoint(&settings.base_url)?,
            api_key: settings.api_key.clone(),
            model: settings.model.clone(),
        })
    }
}

#[async_trait]
impl Embedder for EmbeddingClient {
    async fn embed(&self, input: &str) -> Result<Vec<f32>> {
        debug!("Requesting embedding ({} chars) with model {}", input.len(), self.model);

        let mut request = self.client.post(self.endpoint.clone()).json(&EmbeddingRequest {
            model: &self.model,
            input,
        });
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(AgendaError::from_response(response).await);
        }

        let body: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| AgendaError::MalformedResponse(e.to_string()))?;

        let vector = body
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| AgendaError::MalformedResponse("no embedding in response".to_string()))?;

        debug!("Received embedding with {} dimensions", vector.len());
        Ok(vector)
    }
}

/// Resolve `{base}/embeddings`, keeping any path prefix of the base URL
fn embeddings_endpoint(base_url: &str) -> Result<Url> {
    let mut url = parse_endpoint("embeddings.baseUrl", base_url)?;
    url.path_segments_mut()
        .map_err(|_| AgendaError::Config(format!("cannot use {} as a base URL", base_url)))?
        .pop_if_empty()
        .push("embeddings");
    Ok(url)
}
