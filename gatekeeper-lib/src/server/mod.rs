mod handler;

pub use handler::{EnforcementRequest, EnforcementResponse};

use arc_swap::ArcSwap;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use prometheus::Registry;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{info, warn};

use crate::config::{Config, EnforcementMode};
use crate::enforcement::{BlockStore, BucketStore, Enforcer};
use crate::error::{GatekeeperError, Result};
use crate::telemetry::{init_metrics, Metrics};

/// Process-wide shared state behind every request handler.
///
/// Owns the enforcement stores (never torn down; a restart clears them), the
/// runtime mode flag, and the metrics handles.
pub struct AppState {
    pub enforcer: Enforcer,
    /// Fail-open/fail-closed flag published via /mode. Swapped whole on
    /// update; the enforcement core never reads it.
    pub mode: ArcSwap<EnforcementMode>,
    pub metrics: Arc<Metrics>,
    pub registry: Registry,
}

impl AppState {
    pub fn new(config: &Config) -> Result<Self> {
        let (metrics, registry) = init_metrics()
            .map_err(|e| GatekeeperError::Config(format!("Failed to initialize metrics: {e}")))?;

        let blocks = Arc::new(BlockStore::new());
        let buckets = Arc::new(BucketStore::new());
        let enforcer = Enforcer::new(blocks, buckets, &config.enforcement);

        Ok(Self {
            enforcer,
            mode: ArcSwap::from_pointee(config.enforcement.mode),
            metrics,
            registry,
        })
    }
}

/// Bind the configured listener and serve until SIGTERM or SIGINT.
pub async fn run(config: Arc<Config>) -> Result<()> {
    let state = Arc::new(AppState::new(&config)?);

    let listener = TcpListener::bind(config.listen)
        .await
        .map_err(GatekeeperError::Io)?;
    info!(addr = %config.listen, mode = config.enforcement.mode.as_str(), "gatekeeper listening");

    let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate()).map_err(|e| {
        GatekeeperError::Io(std::io::Error::other(format!(
            "Failed to setup SIGTERM handler: {e}"
        )))
    })?;
    let mut sigint = signal::unix::signal(signal::unix::SignalKind::interrupt()).map_err(|e| {
        GatekeeperError::Io(std::io::Error::other(format!(
            "Failed to setup SIGINT handler: {e}"
        )))
    })?;

    tokio::select! {
        result = serve(listener, state) => result,
        _ = sigterm.recv() => {
            info!("Received SIGTERM, shutting down");
            Ok(())
        }
        _ = sigint.recv() => {
            info!("Received SIGINT, shutting down");
            Ok(())
        }
    }
}

/// Accept loop over an already-bound listener.
///
/// Split from [`run`] so tests can bind an ephemeral port and drive the full
/// HTTP surface in-process.
pub async fn serve(listener: TcpListener, state: Arc<AppState>) -> Result<()> {
    let builder = ConnBuilder::new(TokioExecutor::new());

    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(conn) => conn,
            Err(e) => {
                warn!(error = %e, "accept error");
                continue;
            }
        };

        let builder = builder.clone();
        let state = Arc::clone(&state);
        tokio::spawn(async move {
            let svc = hyper::service::service_fn(move |req| {
                let state = Arc::clone(&state);
                async move { handler::route(req, state).await }
            });

            if let Err(e) = builder.serve_connection(TokioIo::new(stream), svc).await {
                warn!(?peer, error = %e, "serve_connection error");
            }
        });
    }
}
