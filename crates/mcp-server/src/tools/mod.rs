//! Tool registry, parameter schemas and the agenda tools

mod registry;
mod schema;
mod sessions;
mod speakers;
mod time;

pub use registry::{DispatchError, Tool, ToolError, ToolHandler, ToolRegistry};
pub use schema::{FieldConstraint, FieldKind, ParamSchema, ToolParams};
pub use sessions::SessionsTool;
pub use speakers::SpeakersTool;
pub use time::TimeTool;

use std::sync::Arc;

use crate::error::ServerError;
use agenda_core::{Embedder, VectorStore};

/// Build the registry exposed by the agenda server
pub fn agenda_tools(
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
) -> Result<ToolRegistry, ServerError> {
    let mut registry = ToolRegistry::new();
    registry.register(TimeTool::new().into_tool())?;
    registry.register(SessionsTool::new(embedder.clone(), store.clone()).into_tool())?;
    registry.register(SpeakersTool::new(embedder, store).into_tool())?;
    Ok(registry)
}
