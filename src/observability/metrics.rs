//! Prometheus metrics for ratevis.
//!
//! Admission outcomes per algorithm plus RED metrics (rate, errors,
//! duration) for the HTTP API.

use prometheus::{
    CounterVec, Encoder, Gauge, HistogramOpts, HistogramVec, IntGauge, Opts, Registry,
    TextEncoder,
};

use crate::limiter::{AlgorithmKind, Decision};

/// Prometheus registry with all application metrics.
pub struct Metrics {
    registry: Registry,

    /// Admission decisions by algorithm and outcome
    pub admissions_total: CounterVec,

    /// Successful algorithm switches by target algorithm
    pub algorithm_switches_total: CounterVec,

    /// HTTP requests by method and status
    pub http_requests_total: CounterVec,

    /// HTTP request duration in seconds
    pub http_request_duration_seconds: HistogramVec,

    /// 1 while the traffic simulator is firing
    pub simulator_running: IntGauge,

    /// Process uptime in seconds
    pub process_uptime_seconds: Gauge,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let http_buckets = vec![
            0.0001, 0.0005, 0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0,
        ];

        let admissions_total = CounterVec::new(
            Opts::new("ratevis_admissions_total", "Admission decisions"),
            &["algorithm", "decision"],
        )?;
        registry.register(Box::new(admissions_total.clone()))?;

        let algorithm_switches_total = CounterVec::new(
            Opts::new(
                "ratevis_algorithm_switches_total",
                "Rate limiting algorithm switches",
            ),
            &["algorithm"],
        )?;
        registry.register(Box::new(algorithm_switches_total.clone()))?;

        let http_requests_total = CounterVec::new(
            Opts::new("ratevis_http_requests_total", "Total HTTP requests"),
            &["method", "status"],
        )?;
        registry.register(Box::new(http_requests_total.clone()))?;

        let http_request_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "ratevis_http_request_duration_seconds",
                "HTTP request duration in seconds",
            )
            .buckets(http_buckets),
            &["method"],
        )?;
        registry.register(Box::new(http_request_duration_seconds.clone()))?;

        let simulator_running = IntGauge::new(
            "ratevis_simulator_running",
            "Whether the traffic simulator is running",
        )?;
        registry.register(Box::new(simulator_running.clone()))?;

        let process_uptime_seconds = Gauge::new(
            "ratevis_process_uptime_seconds",
            "Process uptime in seconds",
        )?;
        registry.register(Box::new(process_uptime_seconds.clone()))?;

        Ok(Self {
            registry,
            admissions_total,
            algorithm_switches_total,
            http_requests_total,
            http_request_duration_seconds,
            simulator_running,
            process_uptime_seconds,
        })
    }

    pub fn record_admission(&self, algorithm: AlgorithmKind, decision: Decision) {
        self.admissions_total
            .with_label_values(&[algorithm.as_str(), decision.as_str()])
            .inc();
    }

    pub fn record_switch(&self, algorithm: AlgorithmKind) {
        self.algorithm_switches_total
            .with_label_values(&[algorithm.as_str()])
            .inc();
    }

    pub fn record_http_request(&self, method: &str, status: u16, duration_secs: f64) {
        let status = status.to_string();
        self.http_requests_total
            .with_label_values(&[method, &status])
            .inc();
        self.http_request_duration_seconds
            .with_label_values(&[method])
            .observe(duration_secs);
    }

    pub fn set_simulator_running(&self, running: bool) {
        self.simulator_running.set(i64::from(running));
    }

    pub fn update_uptime(&self, seconds: f64) {
        self.process_uptime_seconds.set(seconds);
    }

    /// Export metrics in Prometheus text format.
    pub fn export(&self) -> String {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        if let Err(e) = encoder.encode(&self.registry.gather(), &mut buffer) {
            tracing::warn!(error = %e, "Failed to encode metrics");
        }
        String::from_utf8_lossy(&buffer).into_owned()
    }
}
