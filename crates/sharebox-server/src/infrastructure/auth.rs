//! Basic-auth middleware for the HTTP surface.
//!
//! Active only when credentials are configured; otherwise every request
//! passes straight through. The clipboard WebSocket listener is a separate
//! surface and is not gated here; per-operation clipboard authentication is
//! an explicit non-goal.

use axum::extract::{Request, State};
use axum::http::{header, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

use crate::domain::BasicAuth;
use crate::infrastructure::http::AppState;

/// Rejects requests lacking the configured credentials with `401` and the
/// challenge header; passes everything else to the inner router.
pub async fn require_basic_auth(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let Some(expected) = &state.config.basic_auth else {
        return next.run(request).await;
    };

    let provided = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok());

    if credentials_match(provided, expected) {
        next.run(request).await
    } else {
        (
            StatusCode::UNAUTHORIZED,
            [(header::WWW_AUTHENTICATE, "Basic realm=\"sharebox\"")],
            "Not authorized",
        )
            .into_response()
    }
}

/// Checks an `Authorization` header value against the configured
/// credentials.
pub(crate) fn credentials_match(header_value: Option<&str>, expected: &BasicAuth) -> bool {
    let Some(value) = header_value else {
        return false;
    };
    let Some(encoded) = value.strip_prefix("Basic ") else {
        return false;
    };
    let Ok(decoded) = BASE64.decode(encoded.trim()) else {
        return false;
    };
    let Ok(text) = String::from_utf8(decoded) else {
        return false;
    };
    match text.split_once(':') {
        Some((user, password)) => user == expected.user && password == expected.password,
        None => false,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
