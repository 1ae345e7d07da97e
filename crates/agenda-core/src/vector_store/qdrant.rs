//! Qdrant REST client

use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

use super::traits::VectorStore;
use super::types::{NewPoint, ScoredPoint};
use crate::error::{AgendaError, Result};
use crate::settings::{parse_endpoint, QdrantSettings};

/// Qdrant client bound to one collection
pub struct QdrantClient {
    client: Client,
    base_url: Url,
    collection: String,
}

/// Envelope wrapping every Qdrant response
#[derive(Deserialize)]
struct QdrantResponse<T> {
    result: T,
}

#[derive(Deserialize)]
struct PointsResult {
    points: Vec<ScoredPoint>,
}

impl QdrantClient {
    /// Create a new client from settings
    pub fn new(settings: &QdrantSettings) -> Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;

        Ok(Self {
            client,
            base_url: parse_endpoint("qdrant.url", &settings.url)?,
            collection: settings.collection.clone(),
        })
    }

    /// Build `{base}/collections/{collection}/{segments...}`
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| AgendaError::Config(format!("cannot use {} as a base URL", self.base_url)))?
            .pop_if_empty()
            .push("collections")
            .push(&self.collection)
            .extend(segments);
        Ok(url)
    }

    /// Send a request and decode the `result` field of the response
    async fn send<T: DeserializeOwned>(
        &self,
        method: Method,
        url: Url,
        body: Option<Value>,
    ) -> Result<T> {
        debug!("Qdrant {} {}", method, url);

        let mut request = self.client.request(method, url);
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(AgendaError::from_response(response).await);
        }

        let envelope: QdrantResponse<T> = response
            .json()
            .await
            .map_err(|e| AgendaError::MalformedResponse(e.to_string()))?;
        Ok(envelope.result)
    }
}

#[async_trait]
impl VectorStore for QdrantClient {
    async fn query(&self, vector: Vec<f32>, limit: usize) -> Result<Vec<ScoredPoint>> {
        let url = self.endpoint(&["points", "query"])?;
        let body = json!({ "query": vector, "limit": limit, "with_payload": true });

        let result: PointsResult = self.send(Method::POST, url, Some(body)).await?;
        debug!("Query returned {} points", result.points.len());
        Ok(result.points)
    }

    async fn scroll(&self, limit: usize) -> Result<Vec<ScoredPoint>> {
        let url = self.endpoint(&["points", "scroll"])?;
        let body = json!({ "limit": limit, "with_payload": true });

        let result: PointsResult = self.send(Method::POST, url, Some(body)).await?;
        debug!("Scroll returned {} points", result.points.len());
        Ok(result.points)
    }

    async fn collection_exists(&self) -> Result<bool> {
        let url = self.endpoint(&[])?;
        let response = self.client.get(url).send().await?;

        match response.status() {
            status if status.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            _ => Err(AgendaError::from_response(response).await),
        }
    }

    async fn create_collection(&self, vector_size: u64) -> Result<()> {
        info!("Creating collection {} (size {})", self.collection, vector_size);

        let url = self.endpoint(&[])?;
        let body = json!({ "vectors": { "size": vector_size, "distance": "Cosine" } });
        let _: Value = self.send(Method::PUT, url, Some(body)).await?;
        Ok(())
    }

    async fn delete_collection(&self) -> Result<()> {
        info!("Deleting collection {}", self.collection);

        let url = self.endpoint(&[])?;
        let _: Value = self.send(Method::DELETE, url, None).await?;
        Ok(())
    }

    async fn upsert(&self, points: Vec<NewPoint>) -> Result<()> {
        let mut url = self.endpoint(&["points"])?;
        url.query_pairs_mut().append_pair("wait", "true");

        let body = json!({ "points": points });
        let _: Value = self.send(Method::PUT, url, Some(body)).await?;
        Ok(())
    }

    fn collection(&self) -> &str {
        &self.collection
    }
}
