//! HTTP server for the admission API.
//!
//! # Features
//!
//! - **HTTP/1.1 and HTTP/2** - protocol auto-detection via hyper-util
//! - **Middleware chain** - CORS, access log and admission run in front of
//!   the API router
//! - **Graceful shutdown** - open connections drain up to a timeout
//! - **Internal server** - `/health`, `/metrics` and `/config` on a
//!   separate address
//!
//! # Example
//!
//! ```rust,no_run
//! use ratevis::config::Config;
//! use ratevis::server::Server;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//! let server = Server::bind(Config::from_env()?).await?;
//! let shutdown = server.shutdown_handle();
//! tokio::spawn(async move {
//!     let _ = tokio::signal::ctrl_c().await;
//!     shutdown.trigger();
//! });
//! server.run().await
//! # }
//! ```
//!
//! # Architecture
//!
//! ```text
//! accept loop ──► connection (hyper auto) ──► MiddlewareChain
//!                                               cors -> access_log -> admission
//!                                                           │
//!                                                           ▼
//!                                                   routing::route ──► Engine
//! ```

mod connection;
mod internal;
mod routing;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use http::Uri;
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto;
use hyper_util::server::graceful::GracefulShutdown;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::engine::Engine;
use crate::middleware::{AccessLogMiddleware, AdmissionMiddleware, CorsMiddleware, MiddlewareChain};
use crate::observability::Metrics;
use crate::simulator::TrafficSimulator;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Everything a request handler can reach.
pub struct AppState {
    pub engine: Arc<Engine>,
    pub metrics: Arc<Metrics>,
    pub simulator: TrafficSimulator,
    pub chain: MiddlewareChain,
    /// Effective configuration, with the addresses actually bound.
    pub config: Config,
    pub started_at: Instant,
}

impl AppState {
    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }
}

/// Signals a running [`Server`] to stop accepting and drain.
#[derive(Clone)]
pub struct ShutdownHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl ShutdownHandle {
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_triggered(&self) -> bool {
        *self.tx.borrow()
    }
}

pub struct Server {
    listener: TcpListener,
    internal_listener: Option<TcpListener>,
    state: Arc<AppState>,
    shutdown_tx: Arc<watch::Sender<bool>>,
    shutdown_rx: watch::Receiver<bool>,
}

impl Server {
    /// Bind the API (and internal) listeners and build the shared state.
    ///
    /// Port 0 binds an ephemeral port; [`Server::local_addr`] reports it.
    pub async fn bind(mut config: Config) -> Result<Self, BoxError> {
        let listener = TcpListener::bind(config.server.listen_addr).await?;
        config.server.listen_addr = listener.local_addr()?;

        let internal_listener = match config.server.internal_addr {
            Some(addr) => {
                let internal = TcpListener::bind(addr).await?;
                config.server.internal_addr = Some(internal.local_addr()?);
                Some(internal)
            }
            None => None,
        };

        let limiter = &config.limiter;
        let engine = Arc::new(Engine::with_system_clock(
            limiter.algorithm,
            limiter.algorithm_config(),
            limiter.partition_mode,
        )?);
        let metrics = Arc::new(Metrics::new()?);

        let target: Uri = config
            .simulator
            .target_for(config.server.listen_addr)
            .parse()?;
        let simulator = TrafficSimulator::new(target);

        let mut chain = MiddlewareChain::new().add(CorsMiddleware::new());
        if config.server.access_log {
            chain = chain.add(AccessLogMiddleware::new());
            info!("Access logging enabled (ACCESS_LOG=1)");
        }
        let chain = chain.add(
            AdmissionMiddleware::new(Arc::clone(&engine)).with_metrics(Arc::clone(&metrics)),
        );

        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        Ok(Self {
            listener,
            internal_listener,
            state: Arc::new(AppState {
                engine,
                metrics,
                simulator,
                chain,
                config,
                started_at: Instant::now(),
            }),
            shutdown_tx: Arc::new(shutdown_tx),
            shutdown_rx,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.state.config.server.listen_addr
    }

    pub fn internal_addr(&self) -> Option<SocketAddr> {
        self.state.config.server.internal_addr
    }

    pub fn state(&self) -> Arc<AppState> {
        Arc::clone(&self.state)
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            tx: Arc::clone(&self.shutdown_tx),
        }
    }

    /// Serve until the shutdown handle fires, then drain.
    pub async fn run(self) -> Result<(), BoxError> {
        let Server {
            listener,
            internal_listener,
            state,
            shutdown_rx,
            ..
        } = self;

        let (kind, config) = state.engine.active();
        info!(
            "Server listening on http://{} (algorithm: {}, limit: {}, partition: {})",
            state.config.server.listen_addr,
            kind,
            config.limit,
            state.engine.partition_mode().as_str()
        );

        let internal_task = internal_listener.map(|internal| {
            info!(
                "Internal server listening on http://{}",
                state
                    .config
                    .server
                    .internal_addr
                    .map(|a| a.to_string())
                    .unwrap_or_default()
            );
            let state = Arc::clone(&state);
            let mut shutdown_rx = shutdown_rx.clone();
            tokio::spawn(async move {
                tokio::select! {
                    result = internal::run_internal_server(internal, state) => {
                        if let Err(e) = result {
                            error!("Internal server error: {}", e);
                        }
                    }
                    _ = shutdown_rx.changed() => {
                        debug!("Internal server received shutdown signal");
                    }
                }
            })
        });

        let builder = auto::Builder::new(TokioExecutor::new());
        let graceful = GracefulShutdown::new();
        let mut shutdown_rx = shutdown_rx;

        loop {
            tokio::select! {
                result = listener.accept() => {
                    let (stream, remote_addr) = match result {
                        Ok(conn) => conn,
                        Err(e) => {
                            error!("Accept error: {}", e);
                            continue;
                        }
                    };
                    let _ = stream.set_nodelay(true);

                    let state = Arc::clone(&state);
                    let service = service_fn(move |req| {
                        connection::handle_request(Arc::clone(&state), req, remote_addr)
                    });

                    let conn = builder.serve_connection_with_upgrades(TokioIo::new(stream), service);
                    let conn = graceful.watch(conn.into_owned());
                    tokio::spawn(async move {
                        if let Err(e) = conn.await {
                            debug!("Connection error: {:?}", e);
                        }
                    });
                }
                _ = shutdown_rx.changed() => {
                    debug!("Shutdown signal received, stopping accept loop");
                    break;
                }
            }
        }

        drop(listener);
        if state.simulator.stop() {
            state.metrics.set_simulator_running(false);
        }

        let drain_timeout = state.config.server.drain_timeout;
        tokio::select! {
            _ = graceful.shutdown() => debug!("All connections drained"),
            _ = tokio::time::sleep(drain_timeout) => {
                warn!("Drain timeout reached after {:?}", drain_timeout);
            }
        }

        if let Some(task) = internal_task {
            task.abort();
        }

        info!("Server stopped");
        Ok(())
    }
}
