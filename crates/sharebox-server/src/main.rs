//! Sharebox entry point.
//!
//! A self-hosted file-sharing server with a live shared clipboard. One
//! binary runs three long-lived pieces:
//!
//! 1. The **clipboard hub** event loop: the single authority over the live
//!    connection set and every broadcast decision.
//! 2. The **clipboard WebSocket listener**: accepts client connections and
//!    spawns one session task per client.
//! 3. The **HTTP listener**: serves the web root, accepts uploads, and
//!    exposes the clipboard export download.
//!
//! # Usage
//!
//! ```text
//! sharebox [OPTIONS]
//!
//! Options:
//!   --bind <IP>              Bind address for both listeners [default: 0.0.0.0]
//!   -p, --port <PORT>        HTTP port [default: 8000]
//!       --ws-port <PORT>     Clipboard WebSocket port [default: 8001]
//!   -d, --webroot <DIR>      Directory to serve [default: .]
//!   -P, --auth <USER:PASS>   Gate the HTTP surface with basic auth
//!       --outbound-queue <N> Per-connection outbound queue capacity [default: 64]
//!       --config <FILE>      TOML config file; CLI flags override its values
//! ```
//!
//! Every flag can also come from a `SHAREBOX_*` environment variable; CLI
//! arguments take precedence, then the config file, then built-in defaults.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use sharebox_core::Clipboard;
use sharebox_server::application::hub::Hub;
use sharebox_server::domain::config::{
    load_file_config, BasicAuth, FileConfig, ServerConfig, DEFAULT_HTTP_PORT, DEFAULT_OUTBOUND_QUEUE,
    DEFAULT_WS_PORT,
};
use sharebox_server::infrastructure::http::run_http_server;
use sharebox_server::infrastructure::ws_server;

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Self-hosted file sharing with a live shared clipboard.
#[derive(Debug, Parser)]
#[command(
    name = "sharebox",
    about = "Self-hosted file sharing with a live shared clipboard",
    version
)]
struct Cli {
    /// IP address to bind both listeners to.
    #[arg(long, env = "SHAREBOX_BIND")]
    bind: Option<String>,

    /// HTTP port (files, uploads, clipboard export).
    #[arg(short = 'p', long, env = "SHAREBOX_PORT")]
    port: Option<u16>,

    /// Clipboard WebSocket port.
    #[arg(long, env = "SHAREBOX_WS_PORT")]
    ws_port: Option<u16>,

    /// Directory to serve.
    #[arg(short = 'd', long, env = "SHAREBOX_WEBROOT")]
    webroot: Option<PathBuf>,

    /// Gate the HTTP surface with basic auth, given as user:password.
    #[arg(short = 'P', long, env = "SHAREBOX_AUTH")]
    auth: Option<String>,

    /// Per-connection outbound queue capacity. A connection that falls this
    /// far behind a broadcast burst is disconnected.
    #[arg(long, env = "SHAREBOX_OUTBOUND_QUEUE")]
    outbound_queue: Option<usize>,

    /// TOML config file; CLI flags override its values.
    #[arg(long, env = "SHAREBOX_CONFIG")]
    config: Option<PathBuf>,
}

impl Cli {
    /// Resolves the final [`ServerConfig`]: CLI over config file over
    /// defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be loaded, the bind address
    /// does not parse, or the auth flag is not `user:password`.
    fn into_server_config(self) -> anyhow::Result<ServerConfig> {
        let file = match &self.config {
            Some(path) => load_file_config(path)
                .with_context(|| format!("loading config file {}", path.display()))?,
            None => FileConfig::default(),
        };
        resolve_config(self, file)
    }
}

/// Merges CLI arguments and config-file values into the final settings.
fn resolve_config(cli: Cli, file: FileConfig) -> anyhow::Result<ServerConfig> {
    let defaults = ServerConfig::default();

    let bind = cli
        .bind
        .or(file.bind)
        .unwrap_or_else(|| defaults.http_bind_addr.ip().to_string());
    let bind_ip: IpAddr = bind
        .parse()
        .with_context(|| format!("invalid bind address '{bind}'"))?;

    let port = cli.port.or(file.port).unwrap_or(DEFAULT_HTTP_PORT);
    let ws_port = cli.ws_port.or(file.ws_port).unwrap_or(DEFAULT_WS_PORT);
    let webroot = cli.webroot.or(file.webroot).unwrap_or(defaults.webroot);
    let basic_auth = match cli.auth.or(file.auth) {
        Some(raw) => Some(BasicAuth::parse(&raw)?),
        None => None,
    };
    let outbound_queue = cli
        .outbound_queue
        .or(file.outbound_queue)
        .unwrap_or(DEFAULT_OUTBOUND_QUEUE);

    Ok(ServerConfig {
        http_bind_addr: SocketAddr::new(bind_ip, port),
        ws_bind_addr: SocketAddr::new(bind_ip, ws_port),
        webroot,
        basic_auth,
        outbound_queue,
    })
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = Arc::new(cli.into_server_config()?);

    anyhow::ensure!(
        config.webroot.is_dir(),
        "web root {} is not a directory",
        config.webroot.display()
    );

    info!(
        "serving {} on http://{}",
        config.webroot.display(),
        config.http_bind_addr
    );
    info!("clipboard WebSocket on ws://{}", config.ws_bind_addr);
    if let Some(auth) = &config.basic_auth {
        info!("basic auth enabled for user '{}'", auth.user);
    }

    // The clipboard and its hub live for the process lifetime.
    let clipboard = Arc::new(Clipboard::new());
    let (hub, hub_handle) = Hub::new(Arc::clone(&clipboard));
    let hub_task = tokio::spawn(hub.run());

    // Shared shutdown flag, cleared by Ctrl+C. Both accept loops poll it.
    let running = Arc::new(AtomicBool::new(true));
    let running_signal = Arc::clone(&running);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("received Ctrl+C, shutting down");
                running_signal.store(false, Ordering::Relaxed);
            }
            Err(e) => {
                tracing::error!("failed to listen for Ctrl+C: {e}");
            }
        }
    });

    // Bind the clipboard listener before going into the background so a bad
    // port fails startup instead of a task.
    let ws_listener = ws_server::bind(config.ws_bind_addr).await?;
    let ws_task = tokio::spawn(ws_server::serve(
        ws_listener,
        hub_handle.clone(),
        config.outbound_queue,
        Arc::clone(&running),
    ));

    run_http_server(Arc::clone(&config), Arc::clone(&clipboard), Arc::clone(&running)).await?;

    // The HTTP server returned, so the shutdown flag is cleared: stop the hub
    // and wait for the accept loop. In-flight sessions notice their queues
    // closing and wind down on their own.
    let _ = hub_handle.shutdown().await;
    let _ = ws_task.await;
    let _ = hub_task.await;
    info!("sharebox stopped");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
