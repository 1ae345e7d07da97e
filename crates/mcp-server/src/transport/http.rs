//! Streamable HTTP endpoint: routes POST, GET and DELETE to per-session
//! transports

use axum::{
    body::Bytes,
    extract::State,
    http::{header::ToStrError, HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::get,
    Json, Router,
};
use futures::stream::{Stream, StreamExt};
use serde_json::Value;
use std::convert::Infallible;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use super::streamable::{ExchangeReply, StreamableTransport};
use crate::error::HttpError;
use crate::protocol::{is_initialize_request, JsonRpcPayload, McpMessage, ServerInfo};
use crate::session::SessionRegistry;
use crate::tools::ToolRegistry;

/// Header carrying the session id in both directions
pub const SESSION_HEADER: &str = "mcp-session-id";

/// Shared state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionRegistry>,
    pub tools: Arc<ToolRegistry>,
    pub server_info: ServerInfo,
}

/// Where a POST goes
pub enum Route {
    /// The session id resolved; forward the body as is
    Existing(Arc<StreamableTransport>),
    /// No session id and a well-formed initialize request
    Initialize(McpMessage),
    Reject,
}

/// Decide how to handle a POST
///
/// `body` is `None` when the request body was not valid JSON.
pub fn classify(sessions: &SessionRegistry, session_id: Option<&str>, body: Option<&Value>) -> Route {
    if let Some(session_id) = session_id {
        return match sessions.lookup(session_id) {
            Some(transport) => Route::Existing(transport),
            None => Route::Reject,
        };
    }

    match body {
        Some(body) if is_initialize_request(body) => {
            match serde_json::from_value::<McpMessage>(body.clone()) {
                Ok(message) => Route::Initialize(message),
                Err(_) => Route::Reject,
            }
        }
        _ => Route::Reject,
    }
}

/// Build the endpoint router, mounted at `path`
pub fn router(state: AppState, path: &str) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .expose_headers([HeaderName::from_static(SESSION_HEADER)]);

    Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .route(
            path,
            get(handle_get).post(handle_post).delete(handle_delete),
        )
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

/// Health check endpoint
async fn health() -> &'static str {
    "OK"
}

/// Session id sent by the client
///
/// `Some(Err(_))` is a header that is present but not visible ASCII, which
/// can never name a session.
fn header_session_id(headers: &HeaderMap) -> Option<Result<&str, ToStrError>> {
    headers.get(SESSION_HEADER).map(HeaderValue::to_str)
}

/// Resolve the session of a GET or DELETE
fn resolve(state: &AppState, headers: &HeaderMap) -> Result<Arc<StreamableTransport>, HttpError> {
    header_session_id(headers)
        .and_then(Result::ok)
        .and_then(|id| state.sessions.lookup(id))
        .ok_or(HttpError::InvalidSession)
}

/// Handle a JSON-RPC payload via HTTP POST
pub async fn handle_post(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, HttpError> {
    let session_id = match header_session_id(&headers) {
        Some(Ok(id)) => Some(id),
        Some(Err(_)) => {
            debug!("Rejecting POST with an undecodable session id");
            return Err(HttpError::NoValidSession);
        }
        None => None,
    };
    let parsed = serde_json::from_slice::<Value>(&body);

    match classify(&state.sessions, session_id, parsed.as_ref().ok()) {
        Route::Existing(transport) => {
            let value = parsed.map_err(|e| HttpError::Parse(e.to_string()))?;
            let payload: JsonRpcPayload = serde_json::from_value(value)
                .map_err(|e| HttpError::InvalidRequest(e.to_string()))?;
            if matches!(&payload, JsonRpcPayload::Batch(messages) if messages.is_empty()) {
                return Err(HttpError::InvalidRequest("empty batch".to_string()));
            }

            debug!("POST for session {:?}", transport.session_id());

            Ok(match transport.handle_exchange(payload).await? {
                ExchangeReply::Accepted => StatusCode::ACCEPTED.into_response(),
                ExchangeReply::Single(response) => Json(response).into_response(),
                ExchangeReply::Batch(responses) => Json(responses).into_response(),
            })
        }
        Route::Initialize(message) => {
            let transport = Arc::new(StreamableTransport::new(
                state.tools.clone(),
                state.server_info.clone(),
            ));

            // Identify and register without yielding in between
            let initialized = transport.initialize(&message)?;
            if let Err(e) = state
                .sessions
                .register(&initialized.session_id, transport.clone())
            {
                transport.close();
                return Err(e.into());
            }

            let header = HeaderValue::from_str(&initialized.session_id)
                .map_err(|e| HttpError::Internal(e.to_string()))?;
            let mut response = Json(initialized.response).into_response();
            response.headers_mut().insert(SESSION_HEADER, header);
            Ok(response)
        }
        Route::Reject => {
            debug!("Rejecting POST without a valid session");
            Err(HttpError::NoValidSession)
        }
    }
}

/// Open the notification stream via Server-Sent Events
pub async fn handle_get(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, HttpError> {
    let transport = resolve(&state, &headers)?;
    let messages = transport.open_stream()?;

    info!("SSE connection established");

    let events = messages.map(|message| {
        let event = Event::default()
            .event("message")
            .json_data(&message)
            .unwrap_or_else(|e| {
                warn!("Dropping unserializable notification: {}", e);
                Event::default().comment("dropped")
            });
        Ok::<_, Infallible>(event)
    });

    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}

/// Terminate a session
pub async fn handle_delete(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<StatusCode, HttpError> {
    let transport = resolve(&state, &headers)?;

    let session_id = match transport.close() {
        Some(closed) => closed.session_id,
        None => header_session_id(&headers)
            .and_then(Result::ok)
            .unwrap_or_default()
            .to_string(),
    };
    state.sessions.remove(&session_id);

    info!("Session {} terminated", session_id);
    Ok(StatusCode::OK)
}
