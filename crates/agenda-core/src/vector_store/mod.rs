//! Vector store access for agenda points

mod qdrant;
mod traits;
mod types;

pub use qdrant::QdrantClient;
pub use traits::VectorStore;
pub use types::{NewPoint, ScoredPoint};
