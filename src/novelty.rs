// src/novelty.rs
//! Novelty delta: titles present in the latest snapshot that no earlier
//! snapshot of the day contained.

use crate::ledger::{Ledger, LedgerEntry};
use crate::ordered::OrderedMap;

/// `source_id → title → entry` for the titles new in the latest snapshot.
pub type Novelty = OrderedMap<OrderedMap<LedgerEntry>>;

/// Compute the delta for `latest_id`.
///
/// With fewer than two folded snapshots there is nothing to compare against
/// and the delta is empty.
pub fn detect(ledger: &Ledger, latest_id: &str) -> Novelty {
    let mut out = Novelty::new();
    if ledger.snapshot_ids().len() < 2 {
        return out;
    }
    for (sid, titles) in ledger.sources() {
        let fresh: OrderedMap<LedgerEntry> = titles
            .iter()
            .filter(|(_, e)| e.first_seen_in(latest_id))
            .map(|(t, e)| (t.to_string(), e.clone()))
            .collect();
        if !fresh.is_empty() {
            out.insert(sid, fresh);
        }
    }
    out
}

/// True if `(source_id, title)` is part of the delta.
pub fn contains(novelty: &Novelty, source_id: &str, title: &str) -> bool {
    novelty
        .get(source_id)
        .map_or(false, |t| t.contains_key(title))
}

pub fn total(novelty: &Novelty) -> usize {
    novelty.values().map(|t| t.len()).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::build;
    use crate::snapshot::{ParsedSnapshot, TitleMap, TitleObservation};

    fn snap(id: &str, titles: &[(&str, u32)]) -> ParsedSnapshot {
        let mut s = ParsedSnapshot::new(id);
        let mut t = TitleMap::new();
        for (title, r) in titles {
            t.insert(*title, TitleObservation::ranked(*r));
        }
        s.titles.insert("a", t);
        s
    }

    #[test]
    fn first_snapshot_has_no_delta() {
        let l = build(&[snap("08-00", &[("X", 1)])], None);
        assert!(detect(&l, "08-00").is_empty());
    }

    #[test]
    fn only_titles_unseen_earlier() {
        let l = build(
            &[snap("08-00", &[("X", 3)]), snap("09-00", &[("X", 1), ("Y", 5)])],
            None,
        );
        let n = detect(&l, "09-00");
        assert_eq!(total(&n), 1);
        assert!(contains(&n, "a", "Y"));
        assert!(!contains(&n, "a", "X"));
    }

    #[test]
    fn reappearing_title_is_not_new() {
        let l = build(
            &[
                snap("08-00", &[("X", 3)]),
                snap("09-00", &[("Z", 2)]),
                snap("10-00", &[("X", 1)]),
            ],
            None,
        );
        assert!(detect(&l, "10-00").is_empty());
    }
}
