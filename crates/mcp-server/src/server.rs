//! Main MCP server orchestration

use axum::Router;
use std::sync::Arc;
use tracing::info;

use crate::error::ServerError;
use crate::protocol::ServerInfo;
use crate::session::SessionRegistry;
use crate::tools::ToolRegistry;
use crate::transport::{self, AppState};
use agenda_core::ServerSettings;

/// Listener and identity settings of the server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Path of the MCP endpoint
    pub path: String,
    pub name: String,
    pub version: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::from(&ServerSettings::default())
    }
}

impl From<&ServerSettings> for ServerConfig {
    fn from(settings: &ServerSettings) -> Self {
        Self {
            host: settings.host.clone(),
            port: settings.port,
            path: settings.path.clone(),
            name: settings.name.clone(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// MCP server
///
/// Owns the session registry and the tool registry; every session shares
/// the same immutable tool set.
pub struct McpServer {
    config: ServerConfig,
    tools: Arc<ToolRegistry>,
    sessions: Arc<SessionRegistry>,
}

impl McpServer {
    /// Create a new MCP server with default settings
    pub fn new(tools: ToolRegistry) -> Self {
        Self {
            config: ServerConfig::default(),
            tools: Arc::new(tools),
            sessions: Arc::new(SessionRegistry::new()),
        }
    }

    /// Set the server configuration
    pub fn with_config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn sessions(&self) -> &Arc<SessionRegistry> {
        &self.sessions
    }

    pub fn tools(&self) -> &Arc<ToolRegistry> {
        &self.tools
    }

    /// HTTP router serving the MCP endpoint
    pub fn router(&self) -> Router {
        let state = AppState {
            sessions: self.sessions.clone(),
            tools: self.tools.clone(),
            server_info: ServerInfo {
                name: self.config.name.clone(),
                version: self.config.version.clone(),
            },
        };
        transport::router(state, &self.config.path)
    }

    /// Run the HTTP server until Ctrl-C, then close every session
    pub async fn run(&self) -> Result<(), ServerError> {
        if !self.config.path.starts_with('/') {
            return Err(ServerError::Config(format!(
                "endpoint path must start with '/': {}",
                self.config.path
            )));
        }

        let addr = format!("{}:{}", self.config.host, self.config.port);
        info!(
            "Starting MCP HTTP server on {} (endpoint {}, {} tools)",
            addr,
            self.config.path,
            self.tools.len()
        );

        let listener = tokio::net::TcpListener::bind(&addr).await?;
        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        let closed = self.close_all_sessions();
        info!("MCP server stopped, closed {} session(s)", closed);
        Ok(())
    }

    /// Close and forget every live session
    pub fn close_all_sessions(&self) -> usize {
        self.sessions
            .drain()
            .into_iter()
            .filter_map(|(_, transport)| transport.close())
            .count()
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
