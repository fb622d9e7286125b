use axum::Json;
use axum::extract::State;
use axum::response::{IntoResponse, Response};

use crate::server::AppState;

/// GET /api/test-key
///
/// Answers with the upstream status, so an invalid key shows up as a 401.
pub async fn test_key(State(state): State<AppState>) -> Response {
    match state.relay.test_key().await {
        Ok(report) => (report.status, Json(report)).into_response(),
        Err(e) => e.into_response(),
    }
}
