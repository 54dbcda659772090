// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod error;
pub mod ordered;

// Stored crawl rounds and the per-day fold
pub mod ledger;
pub mod novelty;
pub mod snapshot;

// Scoring, selection and report assembly
pub mod analyze;
pub mod mode;
pub mod report;

// Output: per-channel markup, size-bounded batches, the HTML page
pub mod batch;
pub mod html;
pub mod render;

// Collaborators and wiring
pub mod api;
pub mod config;
pub mod ingest;
pub mod metrics;
pub mod notify;
pub mod pipeline;

// ---- Re-exports for stable public API ----
pub use crate::api::router;
pub use crate::batch::{split, Batch};
pub use crate::config::AppConfig;
pub use crate::ledger::{Ledger, LedgerEntry};
pub use crate::mode::ReportMode;
pub use crate::notify::NotifierMux;
pub use crate::pipeline::Pipeline;
pub use crate::report::ReportData;
