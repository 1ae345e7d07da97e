//! MCP request handler

use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info};

use super::capabilities::ServerCapabilities;
use super::types::*;
use crate::tools::ToolRegistry;
use crate::transport::Notifier;

/// Handler for the MCP requests of one session
pub struct RequestHandler {
    /// Tools exposed to the session
    tools: Arc<ToolRegistry>,
    /// Name and version reported to clients
    server_info: ServerInfo,
    /// Server-initiated messages for the session's stream
    notifier: Notifier,
}

impl RequestHandler {
    /// Create a new request handler
    pub fn new(tools: Arc<ToolRegistry>, server_info: ServerInfo, notifier: Notifier) -> Self {
        Self {
            tools,
            server_info,
            notifier,
        }
    }

    /// Handle an incoming message of an initialized session
    ///
    /// Returns the response for requests and `None` for notifications and
    /// client responses.
    pub async fn handle(&self, message: McpMessage) -> Option<McpMessage> {
        if message.is_request() {
            let method = message.method.as_deref().unwrap_or_default();
            let id = message.id.clone().unwrap_or(Value::Null);

            debug!("Handling request: {}", method);

            let result = match method {
                "initialize" => Err(McpError::invalid_request(
                    "Invalid Request: Server already initialized",
                )),
                "ping" => self.handle_ping().await,
                "tools/list" => self.handle_tools_list().await,
                "tools/call" => self.handle_tools_call(message.params).await,
                "logging/setLevel" => self.handle_set_level(message.params),
                _ => Err(McpError::method_not_found()),
            };

            Some(match result {
                Ok(result) => McpMessage::response(id, result),
                Err(error) => McpMessage::error_response(Some(id), error),
            })
        } else if message.is_notification() {
            let method = message.method.as_deref().unwrap_or_default();
            debug!("Received notification: {}", method);

            match method {
                "notifications/initialized" | "initialized" => {
                    info!("Client initialized");
                }
                "notifications/cancelled" => {
                    debug!("Request cancelled");
                }
                _ => {
                    debug!("Unknown notification: {}", method);
                }
            }

            None
        } else {
            // Responses to server-initiated requests; we never send any
            debug!("Received unexpected response");
            None
        }
    }

    /// Build the `initialize` result
    pub fn initialize(&self, params: Option<Value>) -> Result<Value, McpError> {
        let params: InitializeParams = params
            .map(serde_json::from_value)
            .transpose()
            .map_err(|e| McpError::invalid_params(e.to_string()))?
            .ok_or_else(|| McpError::invalid_params("Missing params"))?;

        info!(
            "Initializing session with client: {} v{}",
            params.client_info.name, params.client_info.version
        );

        let protocol_version = if SUPPORTED_PROTOCOL_VERSIONS.contains(&params.protocol_version.as_str()) {
            params.protocol_version
        } else {
            LATEST_PROTOCOL_VERSION.to_string()
        };

        let result = InitializeResult {
            protocol_version,
            capabilities: ServerCapabilities::with_tools_and_logging(),
            server_info: self.server_info.clone(),
        };

        serde_json::to_value(result).map_err(|e| McpError::internal_error(e.to_string()))
    }

    /// Handle ping request
    async fn handle_ping(&self) -> Result<Value, McpError> {
        Ok(json!({}))
    }

    /// Handle tools/list request
    async fn handle_tools_list(&self) -> Result<Value, McpError> {
        let result = ToolsListResult {
            tools: self.tools.list(),
        };
        serde_json::to_value(result).map_err(|e| McpError::internal_error(e.to_string()))
    }

    /// Handle tools/call request
    async fn handle_tools_call(&self, params: Option<Value>) -> Result<Value, McpError> {
        let params: ToolCallParams = params
            .map(serde_json::from_value)
            .transpose()
            .map_err(|e| McpError::invalid_params(e.to_string()))?
            .ok_or_else(|| McpError::invalid_params("Missing params"))?;

        debug!("Calling tool: {}", params.name);

        let result = match self.tools.dispatch(&params.name, params.arguments).await {
            Ok(result) => result,
            Err(e) => e.into_protocol()?,
        };

        if result.is_error() {
            self.notifier.log(
                LoggingLevel::Error,
                "tools",
                json!({ "tool": params.name, "error": result.text_content() }),
            );
        }

        serde_json::to_value(result).map_err(|e| McpError::internal_error(e.to_string()))
    }

    /// Handle logging/setLevel request
    fn handle_set_level(&self, params: Option<Value>) -> Result<Value, McpError> {
        let params: SetLevelParams = params
            .map(serde_json::from_value)
            .transpose()
            .map_err(|e| McpError::invalid_params(e.to_string()))?
            .ok_or_else(|| McpError::invalid_params("Missing params"))?;

        debug!("Setting log level to {:?}", params.level);
        self.notifier.set_level(params.level);
        Ok(json!({}))
    }
}
