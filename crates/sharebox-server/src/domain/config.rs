//! Server configuration types.
//!
//! [`ServerConfig`] is the single source of truth for all runtime settings,
//! built once at startup and shared via `Arc` across every task. It can be
//! populated from CLI arguments, an optional TOML config file, or defaults,
//! with CLI values winning over file values winning over defaults; the
//! resolution itself lives in `main.rs` next to the CLI definition.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// Default HTTP port (files, uploads, clipboard export).
pub const DEFAULT_HTTP_PORT: u16 = 8000;
/// Default clipboard WebSocket port.
pub const DEFAULT_WS_PORT: u16 = 8001;
/// Default per-connection outbound queue capacity.
pub const DEFAULT_OUTBOUND_QUEUE: usize = 64;

/// Error type for configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("basic auth must be given as user:password")]
    InvalidAuth,
}

/// Basic-auth credentials gating the HTTP surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicAuth {
    pub user: String,
    pub password: String,
}

impl BasicAuth {
    /// Parses the `user:password` form used by the CLI flag and config file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidAuth`] when either side of the colon is
    /// empty or the colon is missing.
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        match raw.split_once(':') {
            Some((user, password)) if !user.is_empty() && !password.is_empty() => Ok(Self {
                user: user.to_string(),
                password: password.to_string(),
            }),
            _ => Err(ConfigError::InvalidAuth),
        }
    }
}

/// All resolved runtime configuration for the server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address of the HTTP listener (files, uploads, clipboard export).
    pub http_bind_addr: SocketAddr,

    /// Address of the clipboard WebSocket listener.
    pub ws_bind_addr: SocketAddr,

    /// Directory served by the HTTP surface and written to by uploads.
    pub webroot: PathBuf,

    /// When set, every HTTP route requires these credentials.
    pub basic_auth: Option<BasicAuth>,

    /// Capacity of each connection's outbound message queue. A connection
    /// whose queue is full when a broadcast arrives is disconnected rather
    /// than allowed to stall delivery to the others.
    pub outbound_queue: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_bind_addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_HTTP_PORT)),
            ws_bind_addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_WS_PORT)),
            webroot: PathBuf::from("."),
            basic_auth: None,
            outbound_queue: DEFAULT_OUTBOUND_QUEUE,
        }
    }
}

// ── Config file schema ────────────────────────────────────────────────────────

/// Schema of the optional TOML config file. Every field may be omitted.
///
/// ```toml
/// bind = "0.0.0.0"
/// port = 8000
/// ws_port = 8001
/// webroot = "/srv/share"
/// auth = "gopher:s3cret"
/// outbound_queue = 64
/// ```
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct FileConfig {
    pub bind: Option<String>,
    pub port: Option<u16>,
    pub ws_port: Option<u16>,
    pub webroot: Option<PathBuf>,
    pub auth: Option<String>,
    pub outbound_queue: Option<usize>,
}

/// Loads the config file at `path`.
///
/// Unlike an implicit platform config location, the file is only read when the
/// operator asked for it, so a missing file is an error rather than a silent
/// default.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] if the file cannot be read and
/// [`ConfigError::Parse`] if it is not valid TOML.
pub fn load_file_config(path: &Path) -> Result<FileConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(toml::from_str(&content)?)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
