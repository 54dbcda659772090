// src/ingest/types.rs
use anyhow::Result;

use crate::snapshot::TitleMap;

/// One ranked-title feed.
#[async_trait::async_trait]
pub trait SourceProvider: Send + Sync {
    /// Current ranking, `title → observation`, ranks starting at 1.
    async fn fetch_latest(&self) -> Result<TitleMap>;
    /// Stable id written to snapshots.
    fn id(&self) -> &str;
    /// Display name; the id when none is configured.
    fn name(&self) -> &str {
        self.id()
    }
}
