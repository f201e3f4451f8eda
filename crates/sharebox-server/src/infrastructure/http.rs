//! The HTTP surface: router assembly, the clipboard export route, error
//! rendering, and server startup.
//!
//! Routes:
//!
//! | Route                  | Method | Purpose                                |
//! |------------------------|--------|----------------------------------------|
//! | `/clipboard/download`  | GET    | Clipboard export as a JSON attachment  |
//! | `/` and `/*path`       | GET    | Browse the web root (listing or file)  |
//! | `/` and `/*path`       | POST   | Multipart upload into that directory   |
//!
//! When basic auth is configured, the middleware in [`crate::infrastructure::auth`]
//! gates every route.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::Context;
use axum::body::Body;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::{header, StatusCode};
use axum::middleware;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use tracing::info;

use sharebox_core::Clipboard;

use crate::domain::ServerConfig;
use crate::infrastructure::auth::require_basic_auth;
use crate::infrastructure::files::{browse, browse_root, upload, upload_root};

/// Largest accepted upload request body.
const MAX_UPLOAD_BYTES: usize = 256 * 1024 * 1024;

/// Shared application state threaded through every handler.
#[derive(Clone)]
pub struct AppState {
    pub clipboard: Arc<Clipboard>,
    pub config: Arc<ServerConfig>,
}

/// Assembles the router over the given state.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/clipboard/download", get(download_clipboard))
        .route("/", get(browse_root).post(upload_root))
        .route("/*path", get(browse).post(upload))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            require_basic_auth,
        ))
        .with_state(state)
}

/// Binds the HTTP listener and serves until `running` is cleared.
///
/// # Errors
///
/// Returns an error if the listener cannot be bound or the server fails.
pub async fn run_http_server(
    config: Arc<ServerConfig>,
    clipboard: Arc<Clipboard>,
    running: Arc<AtomicBool>,
) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(config.http_bind_addr)
        .await
        .with_context(|| format!("failed to bind HTTP listener on {}", config.http_bind_addr))?;
    info!("HTTP listener on {}", config.http_bind_addr);

    let app = router(AppState { clipboard, config });
    axum::serve(listener, app)
        .with_graceful_shutdown(flag_cleared(running))
        .await
        .context("HTTP server failed")?;
    Ok(())
}

/// Resolves once the shared shutdown flag is cleared. Polled at the same
/// cadence as the clipboard accept loop.
async fn flag_cleared(running: Arc<AtomicBool>) {
    while running.load(Ordering::Relaxed) {
        tokio::time::sleep(Duration::from_millis(200)).await;
    }
}

// ── Clipboard export route ────────────────────────────────────────────────────

/// Serves the clipboard export as a downloadable attachment.
///
/// The body is exactly `Clipboard::serialize()`, callable at any time
/// without coordinating with the hub loop. The generation timestamp lives in
/// the filename, never in the body, so the export stays a pure function of
/// clipboard state.
pub async fn download_clipboard(State(state): State<AppState>) -> Result<Response, HttpError> {
    let content = state.clipboard.serialize().map_err(HttpError::internal)?;
    let filename = format!("{}-clipboard.json", unix_seconds());

    Response::builder()
        .header(header::CONTENT_TYPE, "application/octet-stream")
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{filename}\""),
        )
        .body(Body::from(content))
        .map_err(HttpError::internal)
}

fn unix_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

// ── Error rendering ───────────────────────────────────────────────────────────

/// A handler failure carrying the status code and message rendered to the
/// browser.
#[derive(Debug)]
pub struct HttpError {
    pub status: StatusCode,
    pub message: String,
}

impl HttpError {
    pub fn not_found(path: &str) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: format!("no such file or directory: /{path}"),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub fn internal(err: impl std::fmt::Display) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        (self.status, Html(error_page(self.status, &self.message))).into_response()
    }
}

/// Minimal HTML error page.
pub(crate) fn error_page(status: StatusCode, message: &str) -> String {
    let reason = status.canonical_reason().unwrap_or("Error");
    format!(
        "<!doctype html>\n<html><head><meta charset=\"utf-8\">\
         <title>{code} {reason}</title></head>\n\
         <body><h1>{code} {reason}</h1><p>{message}</p></body></html>\n",
        code = status.as_u16(),
        message = crate::infrastructure::files::html_escape(message),
    )
}

// ── Tests ─────────────────────────────────────────────────────────────────────
