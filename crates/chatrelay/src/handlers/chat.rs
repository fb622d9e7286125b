use axum::body::Bytes;
use axum::extract::State;
use axum::response::{IntoResponse, Response};

use crate::server::AppState;

/// POST /api/chat
pub async fn chat(State(state): State<AppState>, body: Bytes) -> Response {
    match state.relay.chat(&body).await {
        Ok(reply) => reply.into_response(),
        Err(e) => e.into_response(),
    }
}
