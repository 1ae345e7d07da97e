//! Error types for mcp-server

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::protocol::{McpError, McpMessage};

/// Session registry errors
#[derive(Error, Debug, PartialEq, Eq)]
pub enum SessionError {
    #[error("Session already registered: {0}")]
    AlreadyRegistered(String),
}

/// Per-session transport errors
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Transport is closed")]
    Closed,

    #[error("Transport is not initialized")]
    NotInitialized,

    #[error("Server already initialized")]
    AlreadyInitialized,

    #[error("Payload is not an initialize request")]
    NotInitializeRequest,

    #[error("Only one SSE stream is allowed per session")]
    StreamConflict,
}

/// Server composition and startup errors
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Tool already registered: {0}")]
    DuplicateTool(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors surfaced by the HTTP endpoint, each mapped to a status and body
#[derive(Error, Debug)]
pub enum HttpError {
    #[error("Bad Request: No valid session ID provided")]
    NoValidSession,

    #[error("Invalid or missing session ID")]
    InvalidSession,

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid Request: {0}")]
    InvalidRequest(String),

    #[error("Conflict: Only one SSE stream is allowed per session")]
    StreamConflict,

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<TransportError> for HttpError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::StreamConflict => HttpError::StreamConflict,
            other => HttpError::Internal(other.to_string()),
        }
    }
}

impl From<SessionError> for HttpError {
    fn from(err: SessionError) -> Self {
        HttpError::Internal(err.to_string())
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let message = self.to_string();

        match self {
            HttpError::NoValidSession => (
                StatusCode::BAD_REQUEST,
                Json(McpMessage::error_response(None, McpError::server_error(message))),
            )
                .into_response(),
            HttpError::InvalidSession => (StatusCode::BAD_REQUEST, message).into_response(),
            HttpError::Parse(detail) => (
                StatusCode::BAD_REQUEST,
                Json(McpMessage::error_response(
                    None,
                    McpError::parse_error().with_data(json!(detail)),
                )),
            )
                .into_response(),
            HttpError::InvalidRequest(_) => (
                StatusCode::BAD_REQUEST,
                Json(McpMessage::error_response(None, McpError::invalid_request(message))),
            )
                .into_response(),
            HttpError::StreamConflict => (
                StatusCode::CONFLICT,
                Json(McpMessage::error_response(None, McpError::server_error(message))),
            )
                .into_response(),
            HttpError::Internal(details) => {
                error!("Error handling MCP request: {}", details);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "Internal server error", "details": details })),
                )
                    .into_response()
            }
        }
    }
}
