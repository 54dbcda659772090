// src/snapshot/types.rs
use serde::{Deserialize, Serialize};

use crate::ordered::OrderedMap;

/// One title as seen in a single snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TitleObservation {
    /// Positions within this snapshot, in the order they were seen. May repeat
    /// if the source itself lists the item twice.
    pub ranks: Vec<u32>,
    pub url: Option<String>,
    pub mobile_url: Option<String>,
    pub summary: Option<String>,
}

impl TitleObservation {
    pub fn ranked(rank: u32) -> Self {
        Self {
            ranks: vec![rank],
            ..Default::default()
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = non_empty(url.into());
        self
    }

    pub fn with_mobile_url(mut self, url: impl Into<String>) -> Self {
        self.mobile_url = non_empty(url.into());
        self
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = non_empty(summary.into());
        self
    }
}

/// `title → observation` for one source, in rank order.
pub type TitleMap = OrderedMap<TitleObservation>;

/// `source_id → titles` for one crawl round.
pub type SourceTitles = OrderedMap<TitleMap>;

/// One decoded crawl round.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedSnapshot {
    /// Snapshot identifier (the file stem, e.g. `"09-30"`). Ordered lexically
    /// in the same order the snapshots were taken.
    pub id: String,
    pub titles: SourceTitles,
    /// `source_id → display name`; defaults to the id itself.
    pub names: OrderedMap<String>,
    /// Sources listed in the failed-sources footer.
    pub failed: Vec<String>,
}

impl ParsedSnapshot {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn title_count(&self) -> usize {
        self.titles.values().map(|t| t.len()).sum()
    }

    /// Drop every source outside `allow`, keeping order.
    pub fn retain_sources(&mut self, allow: &[String]) {
        self.titles.retain(|id, _| allow.iter().any(|a| a == id));
        self.names.retain(|id, _| allow.iter().any(|a| a == id));
    }
}

pub(crate) fn non_empty(s: String) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}
