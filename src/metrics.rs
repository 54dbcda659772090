// src/metrics.rs
use anyhow::{Context, Result};
use axum::{routing::get, Router};
use metrics::{describe_counter, describe_gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

/// Describe the core series once so they show up on /metrics before the
/// first increment.
pub fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "snapshot_parse_errors_total",
            "Snapshot lines skipped by the parser."
        );
        describe_gauge!("ledger_entries", "Titles in the most recently built ledger.");
        describe_counter!(
            "ingest_provider_errors_total",
            "Sources that failed after all retries."
        );
        describe_counter!("notify_batches_total", "Payloads accepted, per channel.");
        describe_counter!("notify_failures_total", "Payloads that failed, per channel.");
        describe_counter!(
            "batch_oversized_total",
            "Batches holding a single unit larger than the channel budget."
        );
    });
}

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the Prometheus recorder process-wide.
    pub fn init() -> Result<Self> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("prometheus: install recorder")?;
        ensure_metrics_described();
        Ok(Self { handle })
    }

    /// A recorder that is not installed globally; renders an empty page.
    pub fn detached() -> Self {
        let recorder = PrometheusBuilder::new().build_recorder();
        Self {
            handle: recorder.handle(),
        }
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}
