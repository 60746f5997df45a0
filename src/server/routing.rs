//! API routes.
//!
//! | Method | Path | Handler |
//! |--------|------|---------|
//! | POST | `/api/algorithm` | switch algorithm, optionally replacing the limit |
//! | GET | `/api/state` | snapshot of the caller's partition |
//! | GET | `/api/stats` | allowed/denied counters and history |
//! | GET | `/api/test`, `/simulated` | admission-checked no-op |
//! | POST | `/api/simulator` | start/stop the traffic simulator |

use std::net::IpAddr;

use http::{Method, StatusCode};
use serde::Deserialize;
use serde_json::json;

use super::AppState;
use crate::core::{Request, Response};
use crate::limiter::{AlgorithmKind, LimiterError};

/// Largest `rpsLimit` a switch request may install.
const MAX_RPS_LIMIT: f64 = 1_000_000.0;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SwitchRequest {
    algorithm: String,
    #[serde(default)]
    rps_limit: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct SimulatorRequest {
    action: String,
    #[serde(default)]
    rps: Option<f64>,
}

pub(crate) fn route(state: &AppState, req: &Request, client_ip: IpAddr) -> Response {
    match (req.method(), req.path()) {
        (&Method::POST, "/api/algorithm") => switch_algorithm(state, req),
        (&Method::GET, "/api/state") => {
            let key = state.engine.partition_for(client_ip);
            Response::json(StatusCode::OK, &state.engine.snapshot(&key))
        }
        (&Method::GET, "/api/stats") => Response::json(StatusCode::OK, &state.engine.stats()),
        (&Method::GET, "/api/test") | (&Method::GET, "/simulated") => {
            Response::json(StatusCode::OK, &json!({ "ok": true }))
        }
        (&Method::POST, "/api/simulator") => simulator(state, req),
        _ => Response::not_found(),
    }
}

fn switch_algorithm(state: &AppState, req: &Request) -> Response {
    let body: SwitchRequest = match req.json() {
        Ok(body) => body,
        Err(e) => return invalid_body(e),
    };

    // unknown names are reported before any limit problem
    let kind: AlgorithmKind = match body.algorithm.parse() {
        Ok(kind) => kind,
        Err(e) => return limiter_error(e),
    };

    let limit = match parse_limit(body.rps_limit) {
        Ok(limit) => limit,
        Err(e) => return limiter_error(e),
    };

    match state.engine.switch_to(kind.as_str(), limit) {
        Ok(snapshot) => {
            state.metrics.record_switch(snapshot.algorithm);
            Response::json(
                StatusCode::OK,
                &json!({
                    "success": true,
                    "algorithm": snapshot.algorithm,
                    "config": snapshot.config,
                }),
            )
        }
        Err(e) => limiter_error(e),
    }
}

/// Whole number of admissions in `1..=MAX_RPS_LIMIT`, if one was given.
fn parse_limit(rps_limit: Option<f64>) -> Result<Option<u64>, LimiterError> {
    match rps_limit {
        None => Ok(None),
        Some(rps) if rps >= 1.0 && rps <= MAX_RPS_LIMIT && rps.fract() == 0.0 => {
            Ok(Some(rps as u64))
        }
        Some(rps) => Err(LimiterError::InvalidConfig {
            field: "rpsLimit",
            value: rps.to_string(),
        }),
    }
}

fn simulator(state: &AppState, req: &Request) -> Response {
    let body: SimulatorRequest = match req.json() {
        Ok(body) => body,
        Err(e) => return invalid_body(e),
    };

    match body.action.as_str() {
        "start" => {
            let rps = body.rps.unwrap_or(state.config.simulator.default_rps);
            match state.simulator.start(rps) {
                Ok(()) => {
                    state.metrics.set_simulator_running(true);
                    Response::json(StatusCode::OK, &json!({ "started": true, "rps": rps }))
                }
                Err(e) => Response::json(
                    StatusCode::BAD_REQUEST,
                    &json!({ "error": "Invalid rps", "detail": e.to_string() }),
                ),
            }
        }
        "stop" => {
            state.simulator.stop();
            state.metrics.set_simulator_running(false);
            Response::json(StatusCode::OK, &json!({ "stopped": true }))
        }
        _ => Response::bad_request("Unknown action"),
    }
}

fn invalid_body(err: crate::core::Error) -> Response {
    Response::json(
        StatusCode::BAD_REQUEST,
        &json!({ "error": "Invalid request body", "detail": err.to_string() }),
    )
}

fn limiter_error(err: LimiterError) -> Response {
    match err {
        LimiterError::UnknownAlgorithm { .. } => Response::bad_request("Unknown algorithm"),
        LimiterError::InvalidConfig { .. } => Response::json(
            StatusCode::BAD_REQUEST,
            &json!({ "error": "Invalid config", "detail": err.to_string() }),
        ),
    }
}
