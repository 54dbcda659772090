// src/ledger.rs
//! # Title Ledger
//! The day's accumulated history of titles per source, rebuilt on every run
//! by replaying today's snapshots oldest → newest.
//!
//! `Ledger = snapshots.fold(Ledger::default(), merge_snapshot)`; the merge is
//! a pure function of its inputs, so replaying the same day twice always
//! yields the same ledger.
//!
//! Invariants kept by `merge_snapshot`:
//! - `count` grows by at most 1 per distinct snapshot id.
//! - `ranks` never shrinks, never holds duplicates, and keeps first-seen order.
//! - `url`, `mobile_url`, `summary` are fill-once.

use metrics::gauge;
use serde::Serialize;

use crate::ordered::OrderedMap;
use crate::snapshot::{ParsedSnapshot, TitleObservation};

/// One source + one title, accumulated across today's snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerEntry {
    pub first_time: String,
    pub last_time: String,
    /// Number of distinct snapshots the title appeared in.
    pub count: u32,
    pub ranks: Vec<u32>,
    pub url: Option<String>,
    pub mobile_url: Option<String>,
    pub summary: Option<String>,
}

impl LedgerEntry {
    fn seed(snapshot_id: &str, obs: &TitleObservation) -> Self {
        let mut entry = Self {
            first_time: snapshot_id.to_string(),
            last_time: snapshot_id.to_string(),
            count: 1,
            ranks: Vec::with_capacity(obs.ranks.len()),
            url: None,
            mobile_url: None,
            summary: None,
        };
        entry.absorb(obs);
        entry
    }

    fn absorb(&mut self, obs: &TitleObservation) {
        for &r in &obs.ranks {
            if !self.ranks.contains(&r) {
                self.ranks.push(r);
            }
        }
        fill_once(&mut self.url, &obs.url);
        fill_once(&mut self.mobile_url, &obs.mobile_url);
        fill_once(&mut self.summary, &obs.summary);
    }

    /// True if the title was first seen in snapshot `id`.
    pub fn first_seen_in(&self, id: &str) -> bool {
        self.first_time == id
    }

    pub fn min_rank(&self) -> Option<u32> {
        self.ranks.iter().copied().min()
    }
}

fn fill_once(slot: &mut Option<String>, candidate: &Option<String>) {
    if slot.is_none() {
        if let Some(v) = candidate.as_ref().filter(|v| !v.is_empty()) {
            *slot = Some(v.clone());
        }
    }
}

/// `source_id → title → entry`, plus display names and the folded snapshot ids.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ledger {
    entries: OrderedMap<OrderedMap<LedgerEntry>>,
    names: OrderedMap<String>,
    snapshots: Vec<String>,
}

impl Ledger {
    pub fn is_empty(&self) -> bool {
        self.entries.values().all(|t| t.is_empty())
    }

    /// Total number of (source, title) entries.
    pub fn len(&self) -> usize {
        self.entries.values().map(|t| t.len()).sum()
    }

    pub fn get(&self, source_id: &str, title: &str) -> Option<&LedgerEntry> {
        self.entries.get(source_id).and_then(|t| t.get(title))
    }

    pub fn sources(&self) -> impl Iterator<Item = (&str, &OrderedMap<LedgerEntry>)> {
        self.entries.iter()
    }

    /// Every entry as `(source_id, title, entry)`, in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str, &LedgerEntry)> {
        self.entries
            .iter()
            .flat_map(|(sid, titles)| titles.iter().map(move |(t, e)| (sid, t, e)))
    }

    /// Display name for a source, falling back to its id.
    pub fn source_name<'a>(&'a self, source_id: &'a str) -> &'a str {
        self.names.get(source_id).map(String::as_str).unwrap_or(source_id)
    }

    pub fn names(&self) -> &OrderedMap<String> {
        &self.names
    }

    /// Snapshot ids folded so far, oldest first.
    pub fn snapshot_ids(&self) -> &[String] {
        &self.snapshots
    }

    pub fn latest_snapshot(&self) -> Option<&str> {
        self.snapshots.last().map(String::as_str)
    }
}

/// Fold one snapshot into the ledger.
///
/// `allow` is the list of currently configured source ids; sources outside
/// it are dropped before merging. A snapshot id that was already folded is
/// ignored, which keeps replays idempotent.
pub fn merge_snapshot(mut ledger: Ledger, snapshot: &ParsedSnapshot, allow: Option<&[String]>) -> Ledger {
    if ledger.snapshots.iter().any(|id| id == &snapshot.id) {
        tracing::debug!(target: "ledger", snapshot = %snapshot.id, "snapshot already folded, skipping");
        return ledger;
    }
    ledger.snapshots.push(snapshot.id.clone());

    let allowed = |sid: &str| allow.map_or(true, |a| a.iter().any(|x| x == sid));

    for (sid, name) in snapshot.names.iter() {
        if allowed(sid) {
            ledger.names.insert(sid, name.clone());
        }
    }

    for (sid, titles) in snapshot.titles.iter() {
        if !allowed(sid) {
            continue;
        }
        let source = ledger.entries.entry_or_insert_with(sid, OrderedMap::new);
        for (title, obs) in titles.iter() {
            match source.get_mut(title) {
                Some(entry) => {
                    entry.last_time = snapshot.id.clone();
                    entry.count += 1;
                    entry.absorb(obs);
                }
                None => {
                    source.insert(title, LedgerEntry::seed(&snapshot.id, obs));
                }
            }
        }
    }

    ledger
}

/// Replay `snapshots` (oldest first) into a fresh ledger.
pub fn build(snapshots: &[ParsedSnapshot], allow: Option<&[String]>) -> Ledger {
    let ledger = snapshots
        .iter()
        .fold(Ledger::default(), |acc, s| merge_snapshot(acc, s, allow));
    gauge!("ledger_entries").set(ledger.len() as f64);
    tracing::debug!(
        target: "ledger",
        snapshots = ledger.snapshots.len(),
        entries = ledger.len(),
        "ledger rebuilt"
    );
    ledger
}
