// src/snapshot/mod.rs
//! Persisted crawl rounds: types, text codec and the per-day file store.

pub mod parser;
pub mod store;
pub mod types;
pub mod writer;

pub use parser::{parse_snapshot, ParseOutcome, FAILED_SENTINEL};
pub use store::SnapshotStore;
pub use types::{ParsedSnapshot, SourceTitles, TitleMap, TitleObservation};
pub use writer::{clean_title, render_snapshot};
