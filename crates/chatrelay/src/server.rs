use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{any, get, post};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::functions::{self, FunctionEvent};
use crate::handlers;
use crate::relay::Relay;
use crate::static_files;

/// Where function-style routes are mounted, matching the bundled client.
pub const FUNCTIONS_PREFIX: &str = "/.netlify/functions";

/// Shared application state for the long-running server.
#[derive(Clone)]
pub struct AppState {
    pub relay: Arc<Relay>,
    pub public_dir: PathBuf,
}

/// Router for the long-running server: API routes plus static files.
///
/// Methods the API routes do not handle fall through to static files, as does
/// every other path. No CORS headers are set.
pub fn build_app(state: AppState, request_timeout_secs: u64) -> Router {
    Router::new()
        .route(
            "/api/chat",
            post(handlers::chat).fallback(static_files::serve),
        )
        .route(
            "/api/test-key",
            get(handlers::test_key).fallback(static_files::serve),
        )
        .fallback(static_files::serve)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(request_timeout_secs),
        ))
}

/// Router for the function variant: one route per function, CORS on every
/// response.
pub fn build_functions_app(relay: Arc<Relay>, request_timeout_secs: u64) -> Router {
    Router::new()
        .route(
            &format!("{FUNCTIONS_PREFIX}/{{name}}"),
            any(invoke_function),
        )
        .with_state(relay)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(request_timeout_secs),
        ))
}

/// ANY /.netlify/functions/{name}
async fn invoke_function(
    State(relay): State<Arc<Relay>>,
    Path(name): Path<String>,
    method: Method,
    body: Bytes,
) -> Response {
    let event = FunctionEvent {
        http_method: method,
        body: (!body.is_empty()).then_some(body),
    };
    functions::invoke(&relay, &name, event)
        .await
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, header};
    use http_body_util::BodyExt;
    use serde_json::{Value, json};
    use tempfile::TempDir;
    use tower::ServiceExt;

    use crate::relay::tests::{FakeUpstream, credentials};

    fn public_dir() -> TempDir {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("index.html"), "<h1>chat</h1>").unwrap();
        std::fs::write(dir.path().join("style.css"), "body {}").unwrap();
        std::fs::write(dir.path().join("404.html"), "<h1>missing</h1>").unwrap();
        dir
    }

    fn app(relay: Relay, public_dir: &TempDir) -> Router {
        let state = AppState {
            relay: Arc::new(relay),
            public_dir: public_dir.path().to_path_buf(),
        };
        build_app(state, 30)
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Response) {
        let response = app.oneshot(request).await.unwrap();
        (response.status(), response)
    }

    async fn body_bytes(response: Response) -> Vec<u8> {
        response
            .into_body()
            .collect()
            .await
            .unwrap()
            .to_bytes()
            .to_vec()
    }

    async fn body_json(response: Response) -> Value {
        serde_json::from_slice(&body_bytes(response).await).unwrap()
    }

    fn post_chat(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    // --- server variant ---

    #[tokio::test]
    async fn test_chat_messages_not_array() {
        let dir = public_dir();
        let relay = Relay::new(
            credentials(Some("gsk_k"), None),
            FakeUpstream::responding(StatusCode::OK, "{}"),
        );

        let (status, response) = send(
            app(relay, &dir),
            post_chat("/api/chat", r#"{"messages":"not an array"}"#),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await,
            json!({"error": "Invalid request: messages must be an array"})
        );
    }

    #[tokio::test]
    async fn test_chat_empty_body_without_keys() {
        let dir = public_dir();
        let relay = Relay::new(
            credentials(None, None),
            FakeUpstream::responding(StatusCode::OK, "{}"),
        );

        let (status, response) = send(app(relay, &dir), post_chat("/api/chat", "")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        let instructions = body["instructions"].as_str().unwrap();
        assert!(instructions.contains("https://console.groq.com/keys"));
        assert!(instructions.contains("https://platform.openai.com/api-keys"));
    }

    #[tokio::test]
    async fn test_chat_preserves_upstream_status() {
        let dir = public_dir();
        let relay = Relay::new(
            credentials(Some("gsk_k"), None),
            FakeUpstream::responding(StatusCode::TOO_MANY_REQUESTS, "rate limited"),
        );

        let (status, response) =
            send(app(relay, &dir), post_chat("/api/chat", r#"{"messages":[]}"#)).await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert!(
            response
                .headers()
                .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .is_none()
        );
        assert_eq!(body_json(response).await, json!({"raw": "rate limited"}));
    }

    #[tokio::test]
    async fn test_key_route_service_account() {
        let dir = public_dir();
        let relay = Relay::new(
            credentials(None, Some("sk-svcacct-xxx")),
            FakeUpstream::responding(StatusCode::OK, r#"{"data":[]}"#),
        );

        let (status, response) = send(app(relay, &dir), get("/api/test-key")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body_json(response).await,
            json!({
                "status": 200,
                "keyType": "Service Account",
                "keyValid": true,
                "response": "API key is valid!"
            })
        );
    }

    #[tokio::test]
    async fn test_key_route_uses_upstream_status() {
        let dir = public_dir();
        let relay = Relay::new(
            credentials(None, Some("sk-bad")),
            FakeUpstream::responding(StatusCode::UNAUTHORIZED, "invalid"),
        );

        let (status, response) = send(app(relay, &dir), get("/api/test-key")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(response).await["keyValid"], false);
    }

    #[tokio::test]
    async fn test_root_serves_index() {
        let dir = public_dir();
        let relay = Relay::new(
            credentials(None, None),
            FakeUpstream::responding(StatusCode::OK, "{}"),
        );

        let (status, response) = send(app(relay, &dir), get("/")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "text/html");
        assert_eq!(body_bytes(response).await, b"<h1>chat</h1>");
    }

    #[tokio::test]
    async fn test_static_content_type() {
        let dir = public_dir();
        let relay = Relay::new(
            credentials(None, None),
            FakeUpstream::responding(StatusCode::OK, "{}"),
        );

        let (status, response) = send(app(relay, &dir), get("/style.css?v=2")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "text/css");
    }

    #[tokio::test]
    async fn test_missing_file_serves_404_page() {
        let dir = public_dir();
        let relay = Relay::new(
            credentials(None, None),
            FakeUpstream::responding(StatusCode::OK, "{}"),
        );

        let (status, response) = send(app(relay, &dir), get("/nope.js")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "text/html");
        assert_eq!(body_bytes(response).await, b"<h1>missing</h1>");
    }

    #[tokio::test]
    async fn test_missing_file_without_404_page() {
        let dir = TempDir::new().unwrap();
        let relay = Relay::new(
            credentials(None, None),
            FakeUpstream::responding(StatusCode::OK, "{}"),
        );

        let (status, response) = send(app(relay, &dir), get("/nope.js")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body_bytes(response).await, b"File not found");
    }

    #[tokio::test]
    async fn test_directory_read_is_server_error() {
        let dir = public_dir();
        std::fs::create_dir(dir.path().join("assets")).unwrap();
        let relay = Relay::new(
            credentials(None, None),
            FakeUpstream::responding(StatusCode::OK, "{}"),
        );

        let (status, response) = send(app(relay, &dir), get("/assets")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        let body = String::from_utf8(body_bytes(response).await).unwrap();
        assert!(body.starts_with("Server Error: "));
    }

    #[tokio::test]
    async fn test_get_on_chat_route_falls_through_to_static() {
        let dir = public_dir();
        let upstream = FakeUpstream::responding(StatusCode::OK, "{}");
        let relay = Relay::new(credentials(Some("gsk_k"), None), upstream.clone());

        let (status, _) = send(app(relay, &dir), get("/api/chat")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(upstream.calls().is_empty());
    }

    // --- function variant ---

    fn functions_app(relay: Relay) -> Router {
        build_functions_app(Arc::new(relay), 30)
    }

    #[tokio::test]
    async fn test_function_preflight() {
        let relay = Relay::new(
            credentials(None, None),
            FakeUpstream::responding(StatusCode::OK, "{}"),
        );
        let request = Request::builder()
            .method("OPTIONS")
            .uri("/.netlify/functions/chat")
            .body(Body::empty())
            .unwrap();

        let (status, response) = send(functions_app(relay), request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_METHODS],
            "POST, OPTIONS"
        );
        assert!(body_bytes(response).await.is_empty());
    }

    #[tokio::test]
    async fn test_function_chat() {
        let relay = Relay::new(
            credentials(None, Some("sk-o")),
            FakeUpstream::responding(
                StatusCode::OK,
                r#"{"choices":[{"message":{"content":"Hi!"}}]}"#,
            ),
        );

        let (status, response) = send(
            functions_app(relay),
            post_chat(
                "/.netlify/functions/chat",
                r#"{"messages":[{"role":"user","content":"Hello"}]}"#,
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert_eq!(
            body_json(response).await["choices"][0]["message"]["content"],
            "Hi!"
        );
    }

    #[tokio::test]
    async fn test_function_test_key_reports_200() {
        let relay = Relay::new(
            credentials(None, Some("sk-bad")),
            FakeUpstream::responding(StatusCode::UNAUTHORIZED, "invalid"),
        );

        let (status, response) =
            send(functions_app(relay), get("/.netlify/functions/test-key")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body_json(response).await["status"], 401);
    }

    #[tokio::test]
    async fn test_invalid_utf8_body_rejected_by_both_variants() {
        let mut payload = br#"{"messages":[{"role":"user","content":"hi "#.to_vec();
        payload.extend_from_slice(&[0xff, 0xfe]);
        payload.extend_from_slice(br#""}]}"#);
        let request = |uri: &str| {
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(payload.clone()))
                .unwrap()
        };

        let dir = public_dir();
        let upstream = FakeUpstream::responding(StatusCode::OK, "{}");
        let relay = Relay::new(credentials(Some("gsk_k"), None), upstream.clone());
        let (status, response) = send(app(relay, &dir), request("/api/chat")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"], "Invalid JSON body");
        assert!(upstream.calls().is_empty());

        let upstream = FakeUpstream::responding(StatusCode::OK, "{}");
        let relay = Relay::new(credentials(Some("gsk_k"), None), upstream.clone());
        let (status, response) =
            send(functions_app(relay), request("/.netlify/functions/chat")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"], "Invalid JSON body");
        assert!(upstream.calls().is_empty());
    }

    #[tokio::test]
    async fn test_function_unknown_name() {
        let relay = Relay::new(
            credentials(None, None),
            FakeUpstream::responding(StatusCode::OK, "{}"),
        );

        let (status, _) = send(functions_app(relay), get("/.netlify/functions/other")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
