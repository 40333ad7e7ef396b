//! HTTP server bootstrap for the sequencer.
//!
//! Wires together configuration, the sequencer core, metrics and the Axum
//! router.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

use crate::api;
use crate::core::{Sequencer, SequencerConfig};
use crate::metrics::SequencerMetrics;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server listen address.
    pub listen_addr: SocketAddr,
    /// Epoch the sequencer starts in.
    pub initial_epoch: u64,
    /// Maximum retained conflict-window entries.
    pub window_size: usize,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port: u16 = std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(8080);
        let listen_addr: SocketAddr = format!("{host}:{port}")
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid listen address {host}:{port}: {e}"))?;

        let initial_epoch: u64 = std::env::var("SEQUENCER_EPOCH")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(0);

        let window_size: usize = std::env::var("CONFLICT_WINDOW_SIZE")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(SequencerConfig::DEFAULT_WINDOW_SIZE);

        Ok(Self {
            listen_addr,
            initial_epoch,
            window_size,
        })
    }
}

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub sequencer: Arc<Sequencer>,
    pub metrics: Arc<SequencerMetrics>,
    /// Endpoint identity reported in the server-metrics payload.
    pub endpoint: String,
}

impl AppState {
    pub fn new(config: &Config) -> Self {
        let sequencer = Arc::new(Sequencer::new(SequencerConfig {
            initial_epoch: config.initial_epoch,
            window_size: config.window_size,
        }));
        Self {
            sequencer,
            metrics: Arc::new(SequencerMetrics::new()),
            endpoint: config.listen_addr.to_string(),
        }
    }
}

/// Start the HTTP server.
pub async fn run() -> anyhow::Result<()> {
    init_tracing();

    info!("Starting streamlog-sequencer v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env()?;
    info!("Configuration loaded");
    info!("  Listen address: {}", config.listen_addr);
    info!("  Initial epoch: {}", config.initial_epoch);
    info!("  Conflict window size: {}", config.window_size);

    let state = AppState::new(&config);
    let app = build_router().with_state(state);

    info!("Starting HTTP server on {}", config.listen_addr);
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;

    info!("Sequencer is ready to accept connections");
    axum::serve(listener, app).await?;

    Ok(())
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(Level::INFO.to_string()));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .init();
}

/// Build the full router, API plus health endpoints.
pub fn build_router() -> Router<AppState> {
    Router::new()
        .nest("/api", api::router())
        .route("/health", get(api::handlers::health::health))
        .route("/ready", get(api::handlers::health::ready))
        .layer(TraceLayer::new_for_http())
}
