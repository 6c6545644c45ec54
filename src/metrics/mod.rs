//! Prometheus metrics for monitoring
//!
//! Exposes metrics for:
//! - Settled transfers and executed bridges
//! - Send failures by reason
//! - Send latency per path
//! - Health checks

use crate::chain::Chain;
use crate::error::LedgerResult;

use axum::{routing::get, Router};
use lazy_static::lazy_static;
use prometheus::{
    register_counter_vec, register_histogram_vec, CounterVec, Encoder, HistogramVec, TextEncoder,
};
use std::net::SocketAddr;
use tracing::info;

lazy_static! {
    pub static ref TRANSFERS_SETTLED: CounterVec = register_counter_vec!(
        "swiftwallet_transfers_settled_total",
        "Total transfers settled per chain",
        &["chain"]
    )
    .unwrap();

    pub static ref BRIDGES_EXECUTED: CounterVec = register_counter_vec!(
        "swiftwallet_bridges_executed_total",
        "Total bridges executed per chain pair",
        &["from_chain", "to_chain"]
    )
    .unwrap();

    pub static ref SEND_FAILURES: CounterVec = register_counter_vec!(
        "swiftwallet_send_failures_total",
        "Total failed sends by reason",
        &["reason"]
    )
    .unwrap();

    pub static ref SEND_LATENCY: HistogramVec = register_histogram_vec!(
        "swiftwallet_send_latency_seconds",
        "End-to-end send latency",
        &["path"],
        vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]
    )
    .unwrap();

    pub static ref HEALTH_CHECK_SUCCESS: CounterVec = register_counter_vec!(
        "swiftwallet_health_check_success_total",
        "Total successful health checks",
        &[]
    )
    .unwrap();

    pub static ref HEALTH_CHECK_FAILURE: CounterVec = register_counter_vec!(
        "swiftwallet_health_check_failure_total",
        "Total failed health checks",
        &[]
    )
    .unwrap();
}

/// Prometheus metrics server
pub struct MetricsServer {
    port: u16,
}

impl MetricsServer {
    pub fn new(port: u16) -> Self {
        Self { port }
    }

    pub async fn run(&self) -> LedgerResult<()> {
        let app = Router::new().route("/metrics", get(metrics_handler));

        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        info!("Starting metrics server on {}", addr);

        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| crate::error::LedgerError::Internal(e.to_string()))?;
        axum::serve(listener, app)
            .await
            .map_err(|e| crate::error::LedgerError::Internal(e.to_string()))?;

        Ok(())
    }
}

async fn metrics_handler() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer).unwrap_or_default();
    String::from_utf8(buffer).unwrap_or_default()
}

// Helper functions to record metrics

pub fn record_transfer(chain: Chain) {
    TRANSFERS_SETTLED.with_label_values(&[chain.as_str()]).inc();
}

pub fn record_bridge(from: Chain, to: Chain) {
    BRIDGES_EXECUTED
        .with_label_values(&[from.as_str(), to.as_str()])
        .inc();
}

pub fn record_send_failure(reason: &str) {
    SEND_FAILURES.with_label_values(&[reason]).inc();
}

pub fn record_send_latency(path: &str, latency_secs: f64) {
    SEND_LATENCY.with_label_values(&[path]).observe(latency_secs);
}

pub fn record_health_check() {
    HEALTH_CHECK_SUCCESS.with_label_values(&[]).inc();
}

pub fn record_health_check_failure() {
    HEALTH_CHECK_FAILURE.with_label_values(&[]).inc();
}
