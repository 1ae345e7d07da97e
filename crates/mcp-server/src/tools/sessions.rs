//! `sessions` tool: semantic search over the agenda

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, error, info};

use super::registry::{Tool, ToolError, ToolHandler};
use super::schema::{FieldConstraint, ParamSchema, ToolParams};
use crate::protocol::ToolCallResult;
use agenda_core::{Embedder, VectorStore};

/// Number of sessions returned per search
const SEARCH_LIMIT: usize = 3;

pub struct SessionsTool {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
}

impl SessionsTool {
    pub fn new(embedder: Arc<dyn Embedder>, store: Arc<dyn VectorStore>) -> Self {
        Self { embedder, store }
    }

    pub fn into_tool(self) -> Tool {
        Tool::new(
            "sessions",
            "Get the sessions from codemotion agenda in Qdrant",
            ParamSchema::new()
                .field(
                    "date",
                    FieldConstraint::string()
                        .optional()
                        .describe("Day of the agenda the question is about"),
                )
                .field(
                    "query",
                    FieldConstraint::string()
                        .length(1, 100)
                        .describe("What the sessions should be about"),
                ),
            self,
        )
    }
}

#[async_trait]
impl ToolHandler for SessionsTool {
    async fn invoke(&self, params: ToolParams) -> Result<ToolCallResult, ToolError> {
        let date = params.str("date");
        let query = params
            .str("query")
            .ok_or_else(|| ToolError::Message("query is required".to_string()))?;

        info!("Sessions tool called (date: {:?}, query: {})", date, query);

        // Embedding failures propagate and are reported by the registry
        let vector = self.embedder.embed(query).await?;
        debug!("Searching sessions in {}", self.store.collection());

        let points = match self.store.query(vector, SEARCH_LIMIT).await {
            Ok(points) => points,
            Err(e) => {
                error!("Error searching for sessions in Qdrant: {}", e);
                return Ok(ToolCallResult::text("Error searching for sessions in Qdrant"));
            }
        };

        info!("{} sessions found", points.len());

        let mut result = format!(
            "Sessions for {} with query {}:\n",
            date.unwrap_or("today"),
            query
        );
        for point in &points {
            let field = |key: &str| point.payload_text(key).unwrap_or_default();
            result.push_str(&format!(
                "- {}: {} by {}\n",
                field("date"),
                field("title"),
                field("speaker")
            ));
        }

        Ok(ToolCallResult::text(result))
    }
}
