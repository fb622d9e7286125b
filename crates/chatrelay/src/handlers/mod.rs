//! HTTP request handlers for the long-running server.

mod chat;
mod test_key;

use axum::Json;
use axum::response::{IntoResponse, Response};

use crate::relay::{RelayError, Reply};

pub use chat::chat;
pub use test_key::test_key;

impl IntoResponse for Reply {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        self.into_reply().into_response()
    }
}
