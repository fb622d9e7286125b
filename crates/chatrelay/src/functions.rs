//! On-demand function adapter.
//!
//! Mirrors a serverless function host: each invocation receives a
//! [`FunctionEvent`] and returns a [`FunctionResponse`]. Every response carries
//! permissive CORS headers, `OPTIONS` preflights answer 200 with an empty body,
//! and any other unexpected method answers 405.

use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde_json::{Value, json};

use crate::relay::{Relay, RelayError, Reply};

pub const CHAT_FUNCTION: &str = "chat";
pub const TEST_KEY_FUNCTION: &str = "test-key";

/// An incoming function invocation. The body is kept as raw bytes so that
/// non-UTF-8 input is rejected by the JSON parser, not rewritten.
#[derive(Debug, Clone)]
pub struct FunctionEvent {
    pub http_method: Method,
    pub body: Option<Bytes>,
}

/// What a function hands back to its host.
#[derive(Debug, Clone)]
pub struct FunctionResponse {
    pub status_code: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl FunctionResponse {
    fn json(status_code: StatusCode, headers: HeaderMap, body: &Value) -> Self {
        Self {
            status_code,
            headers,
            body: body.to_string(),
        }
    }

    fn from_reply(reply: Reply, headers: HeaderMap) -> Self {
        Self::json(reply.status, headers, &reply.body)
    }

    fn from_error(err: RelayError, headers: HeaderMap) -> Self {
        Self::from_reply(err.into_reply(), headers)
    }
}

impl IntoResponse for FunctionResponse {
    fn into_response(self) -> Response {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status_code;
        *response.headers_mut() = self.headers;
        response
    }
}

fn cors_headers(allowed_methods: &'static str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static(allowed_methods),
    );
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    headers
}

/// Answer preflight and wrong-method requests; `None` means "handle it".
fn guard_method(
    event: &FunctionEvent,
    expected: &Method,
    headers: &HeaderMap,
) -> Option<FunctionResponse> {
    if event.http_method == Method::OPTIONS {
        return Some(FunctionResponse {
            status_code: StatusCode::OK,
            headers: headers.clone(),
            body: String::new(),
        });
    }
    if event.http_method != *expected {
        return Some(FunctionResponse::json(
            StatusCode::METHOD_NOT_ALLOWED,
            headers.clone(),
            &json!({ "error": "Method not allowed" }),
        ));
    }
    None
}

/// The chat function.
pub async fn chat(relay: &Relay, event: FunctionEvent) -> FunctionResponse {
    let headers = cors_headers("POST, OPTIONS");
    if let Some(response) = guard_method(&event, &Method::POST, &headers) {
        return response;
    }

    let body = event.body.unwrap_or_default();
    match relay.chat(&body).await {
        Ok(reply) => FunctionResponse::from_reply(reply, headers),
        Err(e) => FunctionResponse::from_error(e, headers),
    }
}

/// The key test function. Always answers 200 once the probe ran; the
/// upstream status is reported in the body.
pub async fn test_key(relay: &Relay, event: FunctionEvent) -> FunctionResponse {
    let headers = cors_headers("GET, OPTIONS");
    if let Some(response) = guard_method(&event, &Method::GET, &headers) {
        return response;
    }

    match relay.test_key().await {
        Ok(report) => match serde_json::to_value(&report) {
            Ok(body) => FunctionResponse::json(StatusCode::OK, headers, &body),
            Err(e) => FunctionResponse::json(
                StatusCode::INTERNAL_SERVER_ERROR,
                headers,
                &json!({ "error": "Test failed", "detail": e.to_string() }),
            ),
        },
        Err(e) => FunctionResponse::from_error(e, headers),
    }
}

/// Dispatch an invocation by function name.
pub async fn invoke(relay: &Relay, name: &str, event: FunctionEvent) -> FunctionResponse {
    match name {
        CHAT_FUNCTION => chat(relay, event).await,
        TEST_KEY_FUNCTION => test_key(relay, event).await,
        _ => FunctionResponse::json(
            StatusCode::NOT_FOUND,
            cors_headers("GET, POST, OPTIONS"),
            &json!({ "error": "Function not found" }),
        ),
    }
}
