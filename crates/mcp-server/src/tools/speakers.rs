//! `speakers` tool: speakers of the agenda, optionally matching a query

use async_trait::async_trait;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{error, info};

use super::registry::{Tool, ToolError, ToolHandler};
use super::schema::{FieldConstraint, ParamSchema, ToolParams};
use crate::protocol::ToolCallResult;
use agenda_core::{Embedder, Result as AgendaResult, ScoredPoint, VectorStore};

/// Points considered when searching with a query
const SEARCH_LIMIT: usize = 10;

/// Points scanned when listing every speaker
const SCROLL_LIMIT: usize = 100;

pub struct SpeakersTool {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
}

impl SpeakersTool {
    pub fn new(embedder: Arc<dyn Embedder>, store: Arc<dyn VectorStore>) -> Self {
        Self { embedder, store }
    }

    pub fn into_tool(self) -> Tool {
        Tool::new(
            "speakers",
            "Get the list of speakers from Codemotion agenda",
            Self::schema(),
            self,
        )
    }

    fn schema() -> ParamSchema {
        ParamSchema::new().field(
            "query",
            FieldConstraint::string()
                .optional()
                .length(1, 100)
                .describe("Topic to filter speakers by"),
        )
    }

    async fn fetch(&self, query: Option<&str>) -> AgendaResult<Vec<ScoredPoint>> {
        match query {
            Some(query) => {
                let vector = self.embedder.embed(query).await?;
                self.store.query(vector, SEARCH_LIMIT).await
            }
            None => {
                info!("No query provided, fetching all speakers");
                self.store.scroll(SCROLL_LIMIT).await
            }
        }
    }
}

/// Unique speaker names, sorted
///
/// A point lists its speakers comma-separated in `speakers`, or `speaker`
/// for points written by the ingestion job.
fn collect_speakers(points: &[ScoredPoint]) -> Vec<String> {
    let mut speakers = BTreeSet::new();
    for point in points {
        let Some(names) = point
            .payload_text("speakers")
            .or_else(|| point.payload_text("speaker"))
        else {
            continue;
        };
        for name in names.split(", ") {
            let name = name.trim();
            if !name.is_empty() {
                speakers.insert(name.to_string());
            }
        }
    }
    speakers.into_iter().collect()
}

#[async_trait]
impl ToolHandler for SpeakersTool {
    async fn invoke(&self, params: ToolParams) -> Result<ToolCallResult, ToolError> {
        let query = params.str("query");
        info!("Speakers tool called (query: {:?})", query);

        let points = match self.fetch(query).await {
            Ok(points) => points,
            Err(e) => {
                error!("Error fetching speakers from Qdrant: {}", e);
                return Ok(ToolCallResult::text(format!(
                    "Error fetching speakers from Qdrant: {}",
                    e
                )));
            }
        };

        let speakers = collect_speakers(&points);
        info!("{} unique speakers found", speakers.len());

        let heading = match query {
            Some(query) => format!("Speakers from Codemotion agenda matching \"{}\":", query),
            None => "Speakers from Codemotion agenda:".to_string(),
        };
        let list = speakers
            .iter()
            .map(|s| format!("- {}", s))
            .collect::<Vec<_>>()
            .join("\n");

        Ok(ToolCallResult::text(format!("{}\n{}\n", heading, list)))
    }
}
