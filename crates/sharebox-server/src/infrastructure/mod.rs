//! Infrastructure layer: every socket, file handle, and HTTP concern.
//!
//! - `ws_server` binds the clipboard WebSocket listener and spawns one task
//!   per session.
//! - `connection` is one client's session: handshake, hub registration, and
//!   the read/write pumps.
//! - `http` is the axum router: web-root browsing, uploads, the clipboard
//!   export route, and server startup.
//! - `files` covers web-root path resolution, directory listings, file streaming,
//!   upload handling.
//! - `auth` is the optional basic-auth middleware over the HTTP surface.

pub mod auth;
pub mod connection;
pub mod files;
pub mod http;
pub mod ws_server;

pub use http::{run_http_server, AppState};
