//! # agenda-core
//!
//! Core functionality for the Codemotion agenda MCP server:
//! - Layered settings (defaults, JSON file, environment)
//! - OpenAI-compatible embedding client
//! - Qdrant vector store client
//! - Agenda ingestion into the vector store

pub mod agenda;
pub mod embeddings;
pub mod error;
pub mod ingest;
pub mod settings;
pub mod vector_store;

pub use agenda::{load_agenda, AgendaItem};
pub use embeddings::{Embedder, EmbeddingClient};
pub use error::{AgendaError, Result};
pub use ingest::{IngestOptions, IngestReport, Ingestor};
pub use settings::{EmbeddingSettings, QdrantSettings, ServerSettings, Settings};
pub use vector_store::{NewPoint, QdrantClient, ScoredPoint, VectorStore};
