//! # mcp-server
//!
//! MCP (Model Context Protocol) server for the Codemotion agenda over the
//! Streamable HTTP transport. One endpoint serves many concurrent sessions,
//! each with its own transport and a shared, immutable tool registry.

pub mod error;
pub mod protocol;
mod server;
pub mod session;
pub mod tools;
pub mod transport;

pub use error::{HttpError, ServerError, SessionError, TransportError};
pub use protocol::{McpError, McpMessage, ServerCapabilities};
pub use server::{McpServer, ServerConfig};
pub use session::SessionRegistry;
pub use tools::{agenda_tools, Tool, ToolHandler, ToolRegistry};
pub use transport::{StreamableTransport, SESSION_HEADER};
