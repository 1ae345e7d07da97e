//! Agenda ingestion into the vector store

use std::sync::Arc;
use tracing::{error, info};

use crate::agenda::{by_day, AgendaItem};
use crate::embeddings::Embedder;
use crate::error::Result;
use crate::vector_store::{NewPoint, VectorStore};

/// Ingestion options
#[derive(Debug, Clone, Copy)]
pub struct IngestOptions {
    /// Vector size used when the collection has to be created
    pub vector_size: u64,
    /// Drop and recreate the collection before inserting
    pub recreate: bool,
}

/// Outcome of an ingestion run
#[derive(Debug, Default)]
pub struct IngestReport {
    pub total: usize,
    pub inserted: usize,
    /// Titles of items that could not be inserted
    pub failed: Vec<String>,
}

/// Embeds agenda items and stores them as points
pub struct Ingestor {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
}

impl Ingestor {
    pub fn new(embedder: Arc<dyn Embedder>, store: Arc<dyn VectorStore>) -> Self {
        Self { embedder, store }
    }

    /// Prepare the collection according to `options`
    pub async fn prepare_collection(&self, options: IngestOptions) -> Result<()> {
        let exists = self.store.collection_exists().await?;

        if exists && options.recreate {
            self.store.delete_collection().await?;
            self.store.create_collection(options.vector_size).await?;
        } else if !exists {
            self.store.create_collection(options.vector_size).await?;
        } else {
            info!("Collection {} already exists", self.store.collection());
        }

        Ok(())
    }

    /// Insert every item, one point per item with sequential ids
    ///
    /// Items that fail to embed or upsert are logged and skipped; they do
    /// not consume an id.
    pub async fn run(&self, items: &[AgendaItem], options: IngestOptions) -> Result<IngestReport> {
        log_summary(items);
        self.prepare_collection(options).await?;

        let mut report = IngestReport {
            total: items.len(),
            ..Default::default()
        };
        let mut next_id: u64 = 0;

        for item in items {
            match self.insert(next_id, item).await {
                Ok(()) => {
                    next_id += 1;
                    report.inserted += 1;
                }
                Err(e) => {
                    error!("Error inserting item {}: {}", item.title, e);
                    report.failed.push(item.title.clone());
                }
            }
        }

        info!("{} of {} items inserted", report.inserted, report.total);
        Ok(report)
    }

    async fn insert(&self, id: u64, item: &AgendaItem) -> Result<()> {
        let vector = self.embedder.embed(&item.embedding_text()).await?;
        self.store
            .upsert(vec![NewPoint {
                id,
                vector,
                payload: item.payload(),
            }])
            .await
    }
}

fn log_summary(items: &[AgendaItem]) {
    for (date, slots) in by_day(items) {
        info!("Agenda {}: {} items", date, slots.len());
        for slot in slots {
            info!("  {} [{}] {} ({})", slot.time, slot.stage, slot.title, slot.kind);
        }
    }
    info!("Total agenda items: {}", items.len());
}
