//! Static file fallback for the long-running server.
//!
//! Any request the API routes do not claim is served from the public
//! directory. Missing files get `404.html`; other filesystem errors a 500.

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use axum::extract::State;
use axum::http::{StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use tokio::fs;
use tracing::warn;

use crate::server::AppState;

const INDEX_FILE: &str = "index.html";
const NOT_FOUND_FILE: &str = "404.html";

/// Content type for a file, by extension.
pub fn content_type(path: &Path) -> &'static str {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("html") => "text/html",
        Some("css") => "text/css",
        Some("js") => "text/javascript",
        Some("json") => "application/json",
        Some("png") => "image/png",
        Some("jpg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("svg") => "image/svg+xml",
        Some("ico") => "image/x-icon",
        _ => "application/octet-stream",
    }
}

/// Map a request path onto a file under `public_dir`.
///
/// Returns `None` for paths that would escape the directory.
pub fn resolve(public_dir: &Path, request_path: &str) -> Option<PathBuf> {
    let relative = request_path.trim_start_matches('/');
    if relative.is_empty() {
        return Some(public_dir.join(INDEX_FILE));
    }

    let relative = Path::new(relative);
    if !relative
        .components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
    {
        return None;
    }
    Some(public_dir.join(relative))
}

/// Fallback handler: serve a file from the public directory.
pub async fn serve(State(state): State<AppState>, uri: Uri) -> Response {
    let Some(path) = resolve(&state.public_dir, uri.path()) else {
        return not_found(&state.public_dir).await;
    };

    match fs::read(&path).await {
        Ok(content) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, content_type(&path))],
            content,
        )
            .into_response(),
        Err(e) if e.kind() == ErrorKind::NotFound => not_found(&state.public_dir).await,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Failed to read static file");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Server Error: {:?}", e.kind()),
            )
                .into_response()
        }
    }
}

async fn not_found(public_dir: &Path) -> Response {
    let body = fs::read(public_dir.join(NOT_FOUND_FILE))
        .await
        .unwrap_or_else(|_| b"File not found".to_vec());
    (
        StatusCode::NOT_FOUND,
        [(header::CONTENT_TYPE, "text/html")],
        body,
    )
        .into_response()
}
