//! Per-session Streamable HTTP protocol engine

use futures::stream::Stream;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{debug, info};
use uuid::Uuid;

use super::notifier::Notifier;
use crate::error::TransportError;
use crate::protocol::{JsonRpcPayload, McpMessage, RequestHandler, ServerInfo};
use crate::tools::ToolRegistry;

/// Emitted once, when the transport accepts its `initialize` request
#[derive(Debug)]
pub struct Initialized {
    pub session_id: String,
    pub response: McpMessage,
}

/// Emitted once, when an initialized transport closes
#[derive(Debug, PartialEq, Eq)]
pub struct Closed {
    pub session_id: String,
}

/// Outcome of one POST exchange
#[derive(Debug)]
pub enum ExchangeReply {
    /// Nothing to answer (notifications or client responses only)
    Accepted,
    Single(McpMessage),
    Batch(Vec<McpMessage>),
}

/// Protocol engine bound to a single session
///
/// Inert until [`initialize`](Self::initialize) assigns the session id.
/// Lifecycle changes are returned to the caller as [`Initialized`] and
/// [`Closed`] values; the transport never touches the session registry.
pub struct StreamableTransport {
    session_id: OnceLock<String>,
    closed: AtomicBool,
    handler: RequestHandler,
    notifier: Notifier,
}

impl StreamableTransport {
    /// Create a transport exposing `tools`
    pub fn new(tools: Arc<ToolRegistry>, server_info: ServerInfo) -> Self {
        let notifier = Notifier::default();
        Self {
            session_id: OnceLock::new(),
            closed: AtomicBool::new(false),
            handler: RequestHandler::new(tools, server_info, notifier.clone()),
            notifier,
        }
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.get().map(String::as_str)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Process the `initialize` request and assign the session id
    ///
    /// Runs without suspending, so the caller can record the returned id
    /// before any other request for the session is processed.
    pub fn initialize(&self, message: &McpMessage) -> Result<Initialized, TransportError> {
        if self.is_closed() {
            return Err(TransportError::Closed);
        }
        if self.session_id.get().is_some() {
            return Err(TransportError::AlreadyInitialized);
        }
        if !message.is_request_for("initialize") {
            return Err(TransportError::NotInitializeRequest);
        }

        let id = message.id.clone().unwrap_or_default();
        let result = self
            .handler
            .initialize(message.params.clone())
            .map_err(|_| TransportError::NotInitializeRequest)?;

        let session_id = Uuid::new_v4().to_string();
        self.session_id
            .set(session_id.clone())
            .map_err(|_| TransportError::AlreadyInitialized)?;

        info!("Session {} initialized", session_id);

        Ok(Initialized {
            session_id,
            response: McpMessage::response(id, result),
        })
    }

    /// Process one POST body
    pub async fn handle_exchange(
        &self,
        payload: JsonRpcPayload,
    ) -> Result<ExchangeReply, TransportError> {
        if self.is_closed() {
            return Err(TransportError::Closed);
        }
        if self.session_id.get().is_none() {
            return Err(TransportError::NotInitialized);
        }

        match payload {
            JsonRpcPayload::Single(message) => Ok(match self.handler.handle(message).await {
                Some(response) => ExchangeReply::Single(response),
                None => ExchangeReply::Accepted,
            }),
            JsonRpcPayload::Batch(messages) => {
                debug!("Handling batch of {} messages", messages.len());
                let mut responses = Vec::new();
                for message in messages {
                    if let Some(response) = self.handler.handle(message).await {
                        responses.push(response);
                    }
                }
                Ok(if responses.is_empty() {
                    ExchangeReply::Accepted
                } else {
                    ExchangeReply::Batch(responses)
                })
            }
        }
    }

    /// Open the server-to-client notification stream
    ///
    /// The stream ends when the transport closes. Dropping it (client
    /// disconnect) releases the stream without closing the session.
    pub fn open_stream(&self) -> Result<impl Stream<Item = McpMessage>, TransportError> {
        if self.is_closed() {
            return Err(TransportError::Closed);
        }
        let rx = self.notifier.attach()?;
        info!("Notification stream opened for session {:?}", self.session_id());
        Ok(UnboundedReceiverStream::new(rx))
    }

    /// Close the session and release any open stream
    ///
    /// Only the first call on an initialized transport reports [`Closed`].
    pub fn close(&self) -> Option<Closed> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return None;
        }
        self.notifier.detach();

        let session_id = self.session_id.get()?.clone();
        info!("Session {} closed", session_id);
        Some(Closed { session_id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::TimeTool;
    use futures::StreamExt;
    use serde_json::json;

    fn transport() -> StreamableTransport {
        let mut tools = ToolRegistry::new();
        tools.register(TimeTool::new().into_tool()).unwrap();
        StreamableTransport::new(
            Arc::new(tools),
            ServerInfo {
                name: "test".to_string(),
                version: "0.0.1".to_string(),
            },
        )
    }

    fn initialize_request() -> McpMessage {
        McpMessage::request(
            0,
            "initialize",
            Some(json!({
                "protocolVersion": "2025-03-26",
                "capabilities": {},
                "clientInfo": {"name": "test-client", "version": "1.0.0"}
            })),
        )
    }

    #[test]
    fn test_initialize_assigns_session_id_once() {
        let transport = transport();
        assert!(transport.session_id().is_none());

        let initialized = transport.initialize(&initialize_request()).unwrap();
        assert_eq!(transport.session_id(), Some(initialized.session_id.as_str()));
        assert_eq!(initialized.response.id, Some(json!(0)));
        assert!(initialized.response.result.is_some());

        assert!(matches!(
            transport.initialize(&initialize_request()),
            Err(TransportError::AlreadyInitialized)
        ));
    }

    #[test]
    fn test_initialize_rejects_other_methods() {
        let transport = transport();
        let result = transport.initialize(&McpMessage::request(1, "ping", None));
        assert!(matches!(result, Err(TransportError::NotInitializeRequest)));
        assert!(transport.session_id().is_none());
    }

    #[test]
    fn test_session_ids_are_unique() {
        let ids: std::collections::HashSet<String> = (0..50)
            .map(|_| {
                transport()
                    .initialize(&initialize_request())
                    .unwrap()
                    .session_id
            })
            .collect();
        assert_eq!(ids.len(), 50);
    }

    #[tokio::test]
    async fn test_exchange_requires_initialization() {
        let transport = transport();
        let payload = JsonRpcPayload::Single(McpMessage::request(1, "ping", None));
        assert!(matches!(
            transport.handle_exchange(payload).await,
            Err(TransportError::NotInitialized)
        ));
    }

    #[tokio::test]
    async fn test_exchange_single_batch_and_notification() {
        let transport = transport();
        transport.initialize(&initialize_request()).unwrap();

        let reply = transport
            .handle_exchange(JsonRpcPayload::Single(McpMessage::request(1, "ping", None)))
            .await
            .unwrap();
        assert!(matches!(reply, ExchangeReply::Single(ref m) if m.result == Some(json!({}))));

        let reply = transport
            .handle_exchange(JsonRpcPayload::Single(McpMessage::notification(
                "notifications/initialized",
                None,
            )))
            .await
            .unwrap();
        assert!(matches!(reply, ExchangeReply::Accepted));

        let reply = transport
            .handle_exchange(JsonRpcPayload::Batch(vec![
                McpMessage::request(2, "ping", None),
                McpMessage::notification("notifications/initialized", None),
                McpMessage::request(3, "tools/list", None),
            ]))
            .await
            .unwrap();
        match reply {
            ExchangeReply::Batch(responses) => {
                let ids: Vec<_> = responses.iter().map(|r| r.id.clone()).collect();
                assert_eq!(ids, vec![Some(json!(2)), Some(json!(3))]);
            }
            other => panic!("expected batch reply, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let transport = transport();
        let initialized = transport.initialize(&initialize_request()).unwrap();

        assert_eq!(
            transport.close(),
            Some(Closed {
                session_id: initialized.session_id
            })
        );
        assert_eq!(transport.close(), None);
        assert!(transport.is_closed());

        let payload = JsonRpcPayload::Single(McpMessage::request(1, "ping", None));
        assert!(matches!(
            transport.handle_exchange(payload).await,
            Err(TransportError::Closed)
        ));
        assert!(matches!(transport.open_stream(), Err(TransportError::Closed)));
    }

    #[test]
    fn test_close_uninitialized_reports_nothing() {
        let transport = transport();
        assert_eq!(transport.close(), None);
        assert!(transport.is_closed());
    }

    #[tokio::test]
    async fn test_stream_receives_notifications_and_ends_on_close() {
        let transport = transport();
        transport.initialize(&initialize_request()).unwrap();

        let mut stream = Box::pin(transport.open_stream().unwrap());
        assert!(matches!(
            transport.open_stream(),
            Err(TransportError::StreamConflict)
        ));

        // A failing tool call is logged to the stream
        transport
            .handle_exchange(JsonRpcPayload::Single(McpMessage::request(
                4,
                "tools/call",
                Some(json!({"name": "time", "arguments": {"timezone": 3}})),
            )))
            .await
            .unwrap();

        let message = stream.next().await.unwrap();
        assert_eq!(message.method.as_deref(), Some("notifications/message"));
        assert_eq!(message.params.unwrap()["level"], "error");

        transport.close();
        assert!(stream.next().await.is_none());
    }
}
