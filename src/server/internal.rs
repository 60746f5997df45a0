//! Internal HTTP server for health, metrics and config endpoints.

use std::convert::Infallible;
use std::sync::Arc;

use bytes::Bytes;
use http::StatusCode;
use http_body_util::Full;
use hyper::body::Incoming as IncomingBody;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use serde_json::json;
use tokio::net::TcpListener;

use super::connection::into_hyper;
use super::{AppState, BoxError};
use crate::core::Response;

const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Serve `/health`, `/metrics` and `/config` until the task is dropped.
pub async fn run_internal_server(
    listener: TcpListener,
    state: Arc<AppState>,
) -> Result<(), BoxError> {
    loop {
        let (stream, _) = listener.accept().await?;
        let _ = stream.set_nodelay(true);
        let state = Arc::clone(&state);

        tokio::spawn(async move {
            let service = service_fn(move |req| {
                let state = Arc::clone(&state);
                async move { handle_internal_request(req, state).await }
            });

            let io = TokioIo::new(stream);
            let _ = http1::Builder::new().serve_connection(io, service).await;
        });
    }
}

async fn handle_internal_request(
    req: hyper::Request<IncomingBody>,
    state: Arc<AppState>,
) -> Result<hyper::Response<Full<Bytes>>, Infallible> {
    Ok(into_hyper(internal_response(req.uri().path(), &state)))
}

fn internal_response(path: &str, state: &AppState) -> Response {
    match path {
        "/health" => {
            let (kind, _) = state.engine.active();
            Response::json(
                StatusCode::OK,
                &json!({
                    "status": "ok",
                    "algorithm": kind,
                    "uptimeSecs": state.uptime().as_secs(),
                    "simulatorRunning": state.simulator.is_running(),
                }),
            )
        }
        "/metrics" => {
            state.metrics.update_uptime(state.uptime().as_secs_f64());
            Response::builder()
                .header("Content-Type", PROMETHEUS_CONTENT_TYPE)
                .body(state.metrics.export())
                .build()
        }
        "/config" => {
            let body = serde_json::to_string_pretty(&state.config.to_json())
                .unwrap_or_else(|_| "{}".to_string());
            Response::builder().json().body(body).build()
        }
        _ => Response::not_found(),
    }
}
