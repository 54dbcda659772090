// src/ingest/mod.rs
//! Fetching side of a crawl round.

pub mod providers;
pub mod types;

use std::time::{Duration, Instant};

use metrics::{counter, describe_counter, describe_histogram, histogram};
use once_cell::sync::OnceCell;
use rand::Rng;

use crate::ingest::types::SourceProvider;
use crate::ordered::OrderedMap;
use crate::snapshot::SourceTitles;

pub use providers::newsnow::{decode_items, NewsNowProvider, RetryPolicy, DEFAULT_API_BASE};

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "ingest_provider_errors_total",
            "Sources that failed after all retries."
        );
        describe_counter!("ingest_titles_total", "Titles fetched across all sources.");
        describe_histogram!("ingest_crawl_ms", "Wall time of a crawl round in milliseconds.");
    });
}

/// Lower bound of the pause between two providers.
pub const MIN_INTERVAL_MS: u64 = 50;

/// Everything one crawl round produced, in provider order.
#[derive(Debug, Clone, Default)]
pub struct CrawlResult {
    pub results: SourceTitles,
    pub names: OrderedMap<String>,
    pub failed: Vec<String>,
}

impl CrawlResult {
    pub fn title_count(&self) -> usize {
        self.results.values().map(|t| t.len()).sum()
    }
}

/// `interval_ms` shifted by a random -10..=+20 ms, never below 50 ms.
pub fn jittered_interval(interval_ms: u64) -> Duration {
    let jitter: i64 = rand::rng().random_range(-10..=20);
    let ms = (interval_ms as i64 + jitter).max(MIN_INTERVAL_MS as i64);
    Duration::from_millis(ms as u64)
}

/// Fetch every provider in turn, pausing between them. A provider error
/// lands in `failed`; it never aborts the round.
pub async fn crawl(providers: &[Box<dyn SourceProvider>], interval_ms: u64) -> CrawlResult {
    ensure_metrics_described();
    let t0 = Instant::now();
    let mut out = CrawlResult::default();

    for (i, p) in providers.iter().enumerate() {
        out.names.insert(p.id(), p.name().to_string());
        match p.fetch_latest().await {
            Ok(titles) => {
                tracing::info!(target: "ingest", source = %p.id(), titles = titles.len(), "fetched");
                counter!("ingest_titles_total").increment(titles.len() as u64);
                out.results.insert(p.id(), titles);
            }
            Err(e) => {
                tracing::warn!(target: "ingest", error = ?e, source = %p.id(), "provider error");
                counter!("ingest_provider_errors_total").increment(1);
                out.failed.push(p.id().to_string());
            }
        }
        if i + 1 < providers.len() {
            tokio::time::sleep(jittered_interval(interval_ms)).await;
        }
    }

    histogram!("ingest_crawl_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
    tracing::info!(
        target: "ingest",
        ok = out.results.len(),
        failed = out.failed.len(),
        "crawl finished"
    );
    out
}
