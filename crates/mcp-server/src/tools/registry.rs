//! Tool registry and dispatch

use async_trait::async_trait;
use indexmap::IndexMap;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

use super::schema::{ParamSchema, ToolParams};
use crate::error::ServerError;
use crate::protocol::{McpError, McpTool, ToolCallResult};
use agenda_core::AgendaError;

/// Failure reported by a tool handler
#[derive(Error, Debug)]
pub enum ToolError {
    #[error(transparent)]
    Upstream(#[from] AgendaError),

    #[error("{0}")]
    Message(String),
}

/// Failure to dispatch a tool call
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Invalid arguments for tool {tool}: {reason}")]
    InvalidParams { tool: String, reason: String },
}

impl DispatchError {
    /// Protocol representation: unknown tools are a JSON-RPC error, invalid
    /// arguments are an error result the model can read and correct.
    pub fn into_protocol(self) -> Result<ToolCallResult, McpError> {
        match self {
            DispatchError::UnknownTool(_) => Err(McpError::invalid_params(self.to_string())),
            DispatchError::InvalidParams { .. } => Ok(ToolCallResult::error(self.to_string())),
        }
    }
}

/// A capability invocable through the registry
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn invoke(&self, params: ToolParams) -> Result<ToolCallResult, ToolError>;
}

/// A registered tool
#[derive(Clone)]
pub struct Tool {
    pub name: String,
    pub description: String,
    pub schema: ParamSchema,
    handler: Arc<dyn ToolHandler>,
}

impl Tool {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        schema: ParamSchema,
        handler: impl ToolHandler + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            schema,
            handler: Arc::new(handler),
        }
    }

    /// Descriptor advertised by `tools/list`
    pub fn descriptor(&self) -> McpTool {
        McpTool {
            name: self.name.clone(),
            description: Some(self.description.clone()),
            input_schema: self.schema.to_input_schema(),
        }
    }
}

impl fmt::Debug for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tool")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("schema", &self.schema)
            .finish_non_exhaustive()
    }
}

/// Registry of tools, filled during server composition and read-only after
#[derive(Debug, Default)]
pub struct ToolRegistry {
    tools: IndexMap<String, Tool>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool; names must be unique
    pub fn register(&mut self, tool: Tool) -> Result<(), ServerError> {
        if self.tools.contains_key(&tool.name) {
            return Err(ServerError::DuplicateTool(tool.name));
        }
        debug!("Registered tool {}", tool.name);
        self.tools.insert(tool.name.clone(), tool);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(String::as_str).collect()
    }

    /// Descriptors in registration order
    pub fn list(&self) -> Vec<McpTool> {
        self.tools.values().map(Tool::descriptor).collect()
    }

    /// Validate arguments and invoke the named tool
    ///
    /// Handler failures never escape: they come back as an error result.
    pub async fn dispatch(
        &self,
        name: &str,
        arguments: Option<Value>,
    ) -> Result<ToolCallResult, DispatchError> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| DispatchError::UnknownTool(name.to_string()))?;

        let params = tool
            .schema
            .validate(arguments)
            .map_err(|reason| DispatchError::InvalidParams {
                tool: name.to_string(),
                reason,
            })?;

        debug!("Invoking tool {} with {} argument(s)", name, params.len());

        match tool.handler.invoke(params).await {
            Ok(result) => Ok(result),
            Err(e) => {
                warn!("Tool {} failed: {}", name, e);
                Ok(ToolCallResult::error(format!("Tool {} failed: {}", name, e)))
            }
        }
    }
}
