//! End-to-end session lifecycle over the HTTP router

use agenda_core::{NewPoint, Result, ScoredPoint, VectorStore};
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{HeaderValue, Request, Response, StatusCode};
use axum::Router;
use futures::future::join_all;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::Arc;
use tower::ServiceExt;

use mcp_server::{agenda_tools, McpServer, SESSION_HEADER};

struct StaticEmbedder;

#[async_trait]
impl agenda_core::Embedder for StaticEmbedder {
    async fn embed(&self, _input: &str) -> Result<Vec<f32>> {
        Ok(vec![0.5; 4])
    }
}

struct StaticStore;

#[async_trait]
impl VectorStore for StaticStore {
    async fn query(&self, _vector: Vec<f32>, _limit: usize) -> Result<Vec<ScoredPoint>> {
        Ok(vec![ScoredPoint {
            id: json!(1),
            score: Some(0.9),
            payload: json!({
                "title": "Rust in production",
                "date": "2025-10-22",
                "speaker": "Ada"
            })
            .as_object()
            .cloned(),
        }])
    }

    async fn scroll(&self, _limit: usize) -> Result<Vec<ScoredPoint>> {
        Ok(Vec::new())
    }

    async fn collection_exists(&self) -> Result<bool> {
        Ok(true)
    }

    async fn create_collection(&self, _vector_size: u64) -> Result<()> {
        Ok(())
    }

    async fn delete_collection(&self) -> Result<()> {
        Ok(())
    }

    async fn upsert(&self, _points: Vec<NewPoint>) -> Result<()> {
        Ok(())
    }

    fn collection(&self) -> &str {
        "codemotion"
    }
}

fn server() -> McpServer {
    let tools = agenda_tools(Arc::new(StaticEmbedder), Arc::new(StaticStore)).unwrap();
    McpServer::new(tools)
}

fn initialize_body() -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": 0,
        "method": "initialize",
        "params": {
            "protocolVersion": "2025-03-26",
            "capabilities": {},
            "clientInfo": {"name": "test-client", "version": "1.0.0"}
        }
    })
}

fn post(session_id: Option<&str>, body: impl Into<Body>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/mcp")
        .header("content-type", "application/json")
        .header("accept", "application/json, text/event-stream");
    if let Some(id) = session_id {
        builder = builder.header(SESSION_HEADER, id);
    }
    builder.body(body.into()).unwrap()
}

fn post_json(session_id: Option<&str>, body: &Value) -> Request<Body> {
    post(session_id, serde_json::to_string(body).unwrap())
}

fn bodyless(method: &str, session_id: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri("/mcp");
    if let Some(id) = session_id {
        builder = builder.header(SESSION_HEADER, id);
    }
    builder.body(Body::empty()).unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> Response<Body> {
    app.clone().oneshot(request).await.unwrap()
}

async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

async fn body_json(response: Response<Body>) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

async fn initialize(app: &Router) -> String {
    let response = send(app, post_json(None, &initialize_body())).await;
    assert_eq!(response.status(), StatusCode::OK);
    response
        .headers()
        .get(SESSION_HEADER)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string()
}

fn tool_call(id: u64, name: &str, arguments: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": "tools/call",
        "params": {"name": name, "arguments": arguments}
    })
}

fn assert_no_session_envelope(body: &Value) {
    assert_eq!(
        body,
        &json!({
            "jsonrpc": "2.0",
            "error": {"code": -32000, "message": "Bad Request: No valid session ID provided"},
            "id": null
        })
    );
}

#[tokio::test]
async fn test_initialize_creates_session() {
    let server = server();
    let app = server.router();

    let response = send(&app, post_json(None, &initialize_body())).await;
    assert_eq!(response.status(), StatusCode::OK);
    let session_id = response.headers().get(SESSION_HEADER).cloned().unwrap();

    let body = body_json(response).await;
    assert_eq!(body["id"], 0);
    assert_eq!(body["result"]["protocolVersion"], "2025-03-26");
    assert_eq!(body["result"]["serverInfo"]["name"], "Codemotion MCP Server");
    assert!(body["result"]["capabilities"]["tools"].is_object());

    assert_eq!(server.sessions().len(), 1);
    assert!(server.sessions().contains(session_id.to_str().unwrap()));
}

#[tokio::test]
async fn test_tool_call_on_existing_session() {
    let server = server();
    let app = server.router();
    let session_id = initialize(&app).await;

    let response = send(&app, post_json(Some(&session_id), &tool_call(1, "time", json!({})))).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    let content = body["result"]["content"].as_array().unwrap();
    assert_eq!(content.len(), 1);
    assert_eq!(content[0]["type"], "text");
    assert!(content[0]["text"].as_str().unwrap().ends_with('Z'));
    assert_eq!(server.sessions().len(), 1);

    let response = send(
        &app,
        post_json(
            Some(&session_id),
            &tool_call(2, "sessions", json!({"query": "rust", "date": "2025-10-22"})),
        ),
    )
    .await;
    let body = body_json(response).await;
    assert_eq!(
        body["result"]["content"][0]["text"],
        "Sessions for 2025-10-22 with query rust:\n- 2025-10-22: Rust in production by Ada\n"
    );
}

#[tokio::test]
async fn test_stream_with_unknown_session() {
    let server = server();
    let app = server.router();

    for session_id in [Some("never-issued"), None] {
        let response = send(&app, bodyless("GET", session_id)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_bytes(response).await, b"Invalid or missing session ID");
    }
    assert!(server.sessions().is_empty());
}

#[tokio::test]
async fn test_delete_terminates_session() {
    let server = server();
    let app = server.router();
    let session_id = initialize(&app).await;

    let response = send(&app, bodyless("DELETE", Some(&session_id))).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(server.sessions().is_empty());

    let ping = json!({"jsonrpc": "2.0", "id": 1, "method": "ping"});
    let response = send(&app, post_json(Some(&session_id), &ping)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_no_session_envelope(&body_json(response).await);

    // Terminating twice yields the same rejection as an unknown session
    let response = send(&app, bodyless("DELETE", Some(&session_id))).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_bytes(response).await, b"Invalid or missing session ID");
    assert_eq!(server.sessions().len(), 0);
}

#[tokio::test]
async fn test_invalid_params_keep_session_usable() {
    let server = server();
    let app = server.router();
    let session_id = initialize(&app).await;

    let response = send(
        &app,
        post_json(Some(&session_id), &tool_call(1, "sessions", json!({"query": ""}))),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["result"]["isError"], true);
    assert_eq!(
        body["result"]["content"][0]["text"],
        "Invalid arguments for tool sessions: query: must be at least 1 character(s)"
    );

    let ping = json!({"jsonrpc": "2.0", "id": 2, "method": "ping"});
    let response = send(&app, post_json(Some(&session_id), &ping)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["result"], json!({}));
    assert_eq!(server.sessions().len(), 1);
}

#[tokio::test]
async fn test_post_without_session_or_initialize() {
    let server = server();
    let app = server.router();

    let ping = json!({"jsonrpc": "2.0", "id": 1, "method": "ping"});
    let response = send(&app, post_json(None, &ping)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_no_session_envelope(&body_json(response).await);

    let response = send(&app, post(None, "not json")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_no_session_envelope(&body_json(response).await);

    assert!(server.sessions().is_empty());
}

#[tokio::test]
async fn test_initialize_with_unknown_session_is_rejected() {
    let server = server();
    let app = server.router();

    let response = send(&app, post_json(Some("never-issued"), &initialize_body())).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_no_session_envelope(&body_json(response).await);
    assert!(server.sessions().is_empty());
}

#[tokio::test]
async fn test_reinitialize_on_known_session() {
    let server = server();
    let app = server.router();
    let session_id = initialize(&app).await;

    let response = send(&app, post_json(Some(&session_id), &initialize_body())).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], -32600);
    assert_eq!(
        body["error"]["message"],
        "Invalid Request: Server already initialized"
    );
    assert_eq!(server.sessions().len(), 1);
}

#[tokio::test]
async fn test_notifications_batches_and_parse_errors() {
    let server = server();
    let app = server.router();
    let session_id = initialize(&app).await;

    let initialized = json!({"jsonrpc": "2.0", "method": "notifications/initialized"});
    let response = send(&app, post_json(Some(&session_id), &initialized)).await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    assert!(body_bytes(response).await.is_empty());

    let batch = json!([
        {"jsonrpc": "2.0", "id": 1, "method": "ping"},
        {"jsonrpc": "2.0", "id": 2, "method": "tools/list"}
    ]);
    let response = send(&app, post_json(Some(&session_id), &batch)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body.as_array().unwrap().len(), 2);
    assert_eq!(body[1]["result"]["tools"][1]["name"], "sessions");

    let response = send(&app, post(Some(&session_id), "{not json")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"]["code"], -32700);
}

#[tokio::test]
async fn test_single_stream_per_session() {
    let server = server();
    let app = server.router();
    let session_id = initialize(&app).await;

    let first = send(&app, bodyless("GET", Some(&session_id))).await;
    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(
        first.headers().get("content-type").unwrap(),
        "text/event-stream"
    );

    let second = send(&app, bodyless("GET", Some(&session_id))).await;
    assert_eq!(second.status(), StatusCode::CONFLICT);

    // Dropping the stream frees the slot without closing the session
    drop(first);
    let third = send(&app, bodyless("GET", Some(&session_id))).await;
    assert_eq!(third.status(), StatusCode::OK);
    assert_eq!(server.sessions().len(), 1);
}

#[tokio::test]
async fn test_registry_tracks_live_sessions() {
    let server = server();
    let app = server.router();

    let mut ids = Vec::new();
    for _ in 0..5 {
        ids.push(initialize(&app).await);
    }
    let mut unique = ids.clone();
    unique.sort();
    unique.dedup();
    assert_eq!(unique.len(), 5);
    assert_eq!(server.sessions().len(), 5);

    for id in &ids[..2] {
        send(&app, bodyless("DELETE", Some(id))).await;
    }
    assert_eq!(server.sessions().len(), 3);

    assert_eq!(server.close_all_sessions(), 3);
    assert!(server.sessions().is_empty());
}

#[tokio::test]
async fn test_health() {
    let app = server().router();
    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let response = send(&app, request).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_bytes(response).await, b"OK");
}

#[tokio::test]
async fn test_undecodable_session_header_is_not_absent() {
    let server = server();
    let app = server.router();
    let garbled = HeaderValue::from_bytes(b"unknown-\xff-id").unwrap();

    let request = Request::builder()
        .method("POST")
        .uri("/mcp")
        .header("content-type", "application/json")
        .header(SESSION_HEADER, garbled.clone())
        .body(Body::from(serde_json::to_string(&initialize_body()).unwrap()))
        .unwrap();
    let response = send(&app, request).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(response.headers().get(SESSION_HEADER).is_none());
    assert_no_session_envelope(&body_json(response).await);
    assert!(server.sessions().is_empty());

    for method in ["GET", "DELETE"] {
        let request = Request::builder()
            .method(method)
            .uri("/mcp")
            .header(SESSION_HEADER, garbled.clone())
            .body(Body::empty())
            .unwrap();
        let response = send(&app, request).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_bytes(response).await, b"Invalid or missing session ID");
    }
}

#[tokio::test]
async fn test_empty_batch_and_null_id() {
    let server = server();
    let app = server.router();
    let session_id = initialize(&app).await;

    let response = send(&app, post_json(Some(&session_id), &json!([]))).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], -32600);
    assert_eq!(body["id"], Value::Null);

    // An explicit null id is a request, not a notification
    let ping = json!({"jsonrpc": "2.0", "id": null, "method": "ping"});
    let response = send(&app, post_json(Some(&session_id), &ping)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["id"], Value::Null);
    assert_eq!(body["result"], json!({}));

    assert_eq!(server.sessions().len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_registry_consistent_under_concurrent_calls() {
    let server = server();
    let app = server.router();

    let first: Vec<String> = join_all((0..16).map(|_| initialize(&app))).await;

    // Terminate some sessions while others are being created and used
    let deletes = join_all(
        first[..6]
            .iter()
            .map(|id| send(&app, bodyless("DELETE", Some(id)))),
    );
    let creates = join_all((0..8).map(|_| initialize(&app)));
    let pings = join_all(first[6..].iter().map(|id| {
        send(
            &app,
            post_json(Some(id), &json!({"jsonrpc": "2.0", "id": 1, "method": "ping"})),
        )
    }));
    let (deleted, created, pinged) = tokio::join!(deletes, creates, pings);

    assert!(deleted.iter().all(|r| r.status() == StatusCode::OK));
    assert!(pinged.iter().all(|r| r.status() == StatusCode::OK));

    let expected: HashSet<String> = first[6..].iter().cloned().chain(created).collect();
    assert_eq!(expected.len(), 18);

    let live: HashSet<String> = server.sessions().session_ids().into_iter().collect();
    assert_eq!(live, expected);
    assert_eq!(server.sessions().len(), 18);
}
