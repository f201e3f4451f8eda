//! sharebox-server library crate.
//!
//! # Architecture
//!
//! ```text
//! Clients (JSON over WebSocket)          Browsers (HTTP)
//!         ↕                                    ↕
//! [sharebox-server]
//!   ├── domain/           ServerConfig, config-file schema
//!   ├── application/      The clipboard hub: the single authority over the
//!   │                     live connection set and all broadcast decisions
//!   └── infrastructure/
//!         ├── ws_server/  Clipboard WebSocket accept loop
//!         ├── connection/ Per-session read/write pumps
//!         ├── http/       axum router: files, uploads, clipboard export
//!         ├── files/      Web-root serving, listings, upload handling
//!         └── auth/       Basic-auth middleware
//!         ↕
//! sharebox-core (clipboard state + wire protocol)
//! ```
//!
//! # Layer rules
//!
//! - `domain` has no I/O and no async.
//! - `application` owns the hub event loop; it touches channels and the
//!   clipboard, never sockets.
//! - `infrastructure` owns every socket, file handle, and HTTP concern.

pub mod application;
pub mod domain;
pub mod infrastructure;
