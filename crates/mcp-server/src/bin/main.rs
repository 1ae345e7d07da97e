//! Codemotion agenda MCP server
//!
//! `serve` (the default) exposes the agenda tools over Streamable HTTP.
//! `ingest` loads an agenda JSON file into the Qdrant collection the tools
//! search.
//!
//! Settings come from built-in defaults, then the optional `--config` JSON
//! file, then environment variables, then command-line flags.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use agenda_core::{
    load_agenda, Embedder, EmbeddingClient, IngestOptions, Ingestor, QdrantClient, Settings,
    VectorStore,
};
use mcp_server::{agenda_tools, McpServer, ServerConfig};

/// Codemotion agenda MCP server - semantic search over sessions and speakers
#[derive(Parser, Debug)]
#[command(name = "agenda-mcp-server")]
#[command(version)]
#[command(about = "MCP server exposing the Codemotion agenda over Streamable HTTP")]
struct Args {
    /// JSON settings file
    #[arg(long, global = true, env = "AGENDA_MCP_CONFIG")]
    config: Option<PathBuf>,

    /// Base URL of the OpenAI-compatible embeddings API
    #[arg(long, global = true, env = "GITHUB_MODELS_URL")]
    embeddings_url: Option<String>,

    /// Token for the embeddings API
    #[arg(long, global = true, env = "GITHUB_TOKEN", hide_env_values = true)]
    api_key: Option<String>,

    /// Embedding model name
    #[arg(long, global = true, env = "GITHUB_MODELS_MODEL_FOR_EMBEDDINGS")]
    embedding_model: Option<String>,

    /// Qdrant REST endpoint
    #[arg(long, global = true, env = "QDRANT_URL")]
    qdrant_url: Option<String>,

    /// Qdrant collection name
    #[arg(long, global = true, env = "QDRANT_COLLECTION_NAME")]
    collection: Option<String>,

    /// Address to bind the HTTP server to
    #[arg(long, global = true, env = "MCP_HOST")]
    host: Option<String>,

    /// Port for the HTTP server
    #[arg(long, global = true, env = "MCP_PORT")]
    port: Option<u16>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the MCP endpoint (default)
    Serve,

    /// Load an agenda JSON file into the vector store
    Ingest {
        /// Agenda file: an array of {title, date, time, stage, speaker, type}
        file: PathBuf,

        /// Drop and recreate the collection first
        #[arg(long)]
        recreate: bool,

        /// Vector size used when creating the collection
        #[arg(long)]
        vector_size: Option<u64>,
    },
}

impl Args {
    /// Layer environment and CLI values over the settings file
    fn settings(&self) -> agenda_core::Result<Settings> {
        let mut settings = match &self.config {
            Some(path) => Settings::load(path)?,
            None => Settings::new(),
        };

        if let Some(url) = &self.embeddings_url {
            settings.embeddings.base_url = url.clone();
        }
        if let Some(key) = &self.api_key {
            settings.embeddings.api_key = Some(key.clone());
        }
        if let Some(model) = &self.embedding_model {
            settings.embeddings.model = model.clone();
        }
        if let Some(url) = &self.qdrant_url {
            settings.qdrant.url = url.clone();
        }
        if let Some(collection) = &self.collection {
            settings.qdrant.collection = collection.clone();
        }
        if let Some(host) = &self.host {
            settings.server.host = host.clone();
        }
        if let Some(port) = self.port {
            settings.server.port = port;
        }

        settings.validate()?;
        Ok(settings)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let settings = args
        .settings()
        .map_err(|e| format!("Failed to load settings: {}", e))?;

    if settings.embeddings.api_key.is_none() {
        warn!("No embeddings API token configured; requests will be unauthenticated");
    }

    let embedder: Arc<dyn Embedder> = Arc::new(EmbeddingClient::new(&settings.embeddings)?);
    let store: Arc<dyn VectorStore> = Arc::new(QdrantClient::new(&settings.qdrant)?);

    match args.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            let tools = agenda_tools(embedder, store)?;
            let server =
                McpServer::new(tools).with_config(ServerConfig::from(&settings.server));

            info!(
                "Starting MCP server on http://{}:{}{}",
                settings.server.host, settings.server.port, settings.server.path
            );
            server.run().await?;
        }
        Command::Ingest {
            file,
            recreate,
            vector_size,
        } => {
            let items = load_agenda(&file).await?;
            info!("Loaded {} agenda items from {:?}", items.len(), file);

            let options = IngestOptions {
                vector_size: vector_size.unwrap_or(settings.qdrant.vector_size),
                recreate,
            };
            let report = Ingestor::new(embedder, store).run(&items, options).await?;

            if !report.failed.is_empty() {
                warn!("{} item(s) failed: {:?}", report.failed.len(), report.failed);
            }
            info!(
                "Ingestion complete: {} of {} items inserted",
                report.inserted, report.total
            );
        }
    }

    Ok(())
}
