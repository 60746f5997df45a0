//! Traffic simulator.
//!
//! Fires `GET <target>` at a fixed rate so the limiter has something to
//! decide on without a browser attached. Each request runs in its own task
//! so a slow response never delays the next tick.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use http::{Method, StatusCode, Uri};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::client::{self, HttpClient};

/// Shortest tick period, i.e. at most 1000 requests per second.
pub const MIN_PERIOD: Duration = Duration::from_millis(1);

/// Longest tick period, i.e. at least one request per hour.
pub const MAX_PERIOD: Duration = Duration::from_secs(3_600);

#[derive(Debug, Clone, PartialEq)]
pub enum SimulatorError {
    InvalidRate(f64),
}

impl std::fmt::Display for SimulatorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SimulatorError::InvalidRate(rps) => write!(
                f,
                "rps must give a tick period between {:?} and {:?}, got {}",
                MIN_PERIOD, MAX_PERIOD, rps
            ),
        }
    }
}

impl std::error::Error for SimulatorError {}

struct Running {
    rps: f64,
    handle: JoinHandle<()>,
}

pub struct TrafficSimulator {
    target: Uri,
    http: HttpClient,
    running: Mutex<Option<Running>>,
}

impl TrafficSimulator {
    pub fn new(target: Uri) -> Self {
        Self::with_client(target, client::http_client())
    }

    pub fn with_client(target: Uri, http: HttpClient) -> Self {
        Self {
            target,
            http,
            running: Mutex::new(None),
        }
    }

    pub fn target(&self) -> &Uri {
        &self.target
    }

    /// Tick interval for `rps` requests per second.
    ///
    /// Fails unless the period lies within [`MIN_PERIOD`, `MAX_PERIOD`].
    pub fn interval_for(rps: f64) -> Result<Duration, SimulatorError> {
        if !(rps.is_finite() && rps > 0.0) {
            return Err(SimulatorError::InvalidRate(rps));
        }
        match Duration::try_from_secs_f64(1.0 / rps) {
            Ok(period) if (MIN_PERIOD..=MAX_PERIOD).contains(&period) => Ok(period),
            _ => Err(SimulatorError::InvalidRate(rps)),
        }
    }

    /// Start firing at `rps`, replacing any generator already running.
    ///
    /// Must be called from within a tokio runtime. A rejected rate leaves
    /// any running generator untouched.
    pub fn start(&self, rps: f64) -> Result<(), SimulatorError> {
        let period = Self::interval_for(rps)?;

        let mut running = self.running.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = running.take() {
            previous.handle.abort();
        }

        let target = self.target.clone();
        let http = self.http.clone();

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                let target = target.clone();
                let http = http.clone();
                tokio::spawn(async move {
                    match client::send(&http, Method::GET, target, None).await {
                        Ok((StatusCode::TOO_MANY_REQUESTS, _)) => debug!("Simulated request denied"),
                        Ok((status, _)) => debug!(status = status.as_u16(), "Simulated request"),
                        Err(e) => debug!(error = %e, "Simulated request failed"),
                    }
                });
            }
        });

        *running = Some(Running { rps, handle });
        info!(rps, target = %self.target, "Traffic simulator started");
        Ok(())
    }

    /// Stop the generator. The timer task is aborted before this returns;
    /// calling it while stopped is a no-op.
    pub fn stop(&self) -> bool {
        let previous = self
            .running
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        match previous {
            Some(running) => {
                running.handle.abort();
                info!("Traffic simulator stopped");
                true
            }
            None => false,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|r| !r.handle.is_finished())
    }

    /// Rate of the running generator, if any.
    pub fn rps(&self) -> Option<f64> {
        self.running
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|r| r.rps)
    }
}

impl Drop for TrafficSimulator {
    fn drop(&mut self) {
        if let Some(running) = self
            .running
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            running.handle.abort();
        }
    }
}

impl std::fmt::Debug for TrafficSimulator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrafficSimulator")
            .field("target", &self.target)
            .field("rps", &self.rps())
            .finish()
    }
}
