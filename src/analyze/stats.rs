//! Keyword-group statistics over a mode selection.

use std::cmp::Ordering;

use serde::Serialize;

use super::keywords::KeywordRules;
use super::matching::{match_group, GroupMatch, CATCH_ALL_KEY};
use super::weights::{weight, WeightConfig};
use crate::ledger::LedgerEntry;

/// One selected ledger entry, as handed over by the mode selector.
#[derive(Debug, Clone, Copy)]
pub struct Candidate<'a> {
    pub source_id: &'a str,
    pub source_name: &'a str,
    pub title: &'a str,
    pub entry: &'a LedgerEntry,
    pub is_new: bool,
}

/// A ledger entry joined with its source name, weight and novelty flag.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredTitle {
    pub title: String,
    pub source_id: String,
    pub source_name: String,
    /// Empty for novelty-section rows.
    pub first_time: String,
    pub last_time: String,
    pub count: u32,
    pub ranks: Vec<u32>,
    pub rank_threshold: u32,
    pub url: Option<String>,
    pub mobile_url: Option<String>,
    pub summary: Option<String>,
    pub weight: f64,
    pub is_new: bool,
}

impl ScoredTitle {
    pub fn from_candidate(c: &Candidate<'_>, rank_threshold: u32, cfg: &WeightConfig) -> Self {
        let e = c.entry;
        Self {
            title: c.title.to_string(),
            source_id: c.source_id.to_string(),
            source_name: c.source_name.to_string(),
            first_time: e.first_time.clone(),
            last_time: e.last_time.clone(),
            count: e.count,
            ranks: e.ranks.clone(),
            rank_threshold,
            url: e.url.clone(),
            mobile_url: e.mobile_url.clone(),
            summary: e.summary.clone(),
            weight: weight(&e.ranks, e.count, rank_threshold, cfg),
            is_new: c.is_new,
        }
    }

    /// Smallest rank, or 999 when the title has none.
    pub fn sort_rank(&self) -> u32 {
        self.ranks.iter().copied().min().unwrap_or(999)
    }

    /// Preferred link: mobile URL, else desktop.
    pub fn link(&self) -> Option<&str> {
        self.mobile_url
            .as_deref()
            .filter(|s| !s.is_empty())
            .or(self.url.as_deref().filter(|s| !s.is_empty()))
    }
}

/// Descending weight, then ascending min rank, then descending count.
pub fn title_order(a: &ScoredTitle, b: &ScoredTitle) -> Ordering {
    b.weight
        .total_cmp(&a.weight)
        .then_with(|| a.sort_rank().cmp(&b.sort_rank()))
        .then_with(|| b.count.cmp(&a.count))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stat {
    pub word: String,
    pub count: usize,
    pub percentage: f64,
    pub titles: Vec<ScoredTitle>,
}

/// Group, weigh and order the selection.
///
/// Every configured group yields a `Stat` (possibly with `count == 0`);
/// stats are ordered by descending count, ties keep the configured order.
pub fn compute_stats(
    selection: &[Candidate<'_>],
    rules: &KeywordRules,
    rank_threshold: u32,
    cfg: &WeightConfig,
) -> Vec<Stat> {
    let keys: Vec<&str> = if rules.is_catch_all() {
        vec![CATCH_ALL_KEY]
    } else {
        rules.groups.iter().map(|g| g.group_key.as_str()).collect()
    };
    let mut buckets: Vec<Vec<ScoredTitle>> = vec![Vec::new(); keys.len()];

    for c in selection {
        let slot = match match_group(c.title, rules) {
            Some(GroupMatch::CatchAll) => 0,
            Some(GroupMatch::Group(i)) => i,
            None => continue,
        };
        buckets[slot].push(ScoredTitle::from_candidate(c, rank_threshold, cfg));
    }

    let total = selection.len();
    let mut stats: Vec<Stat> = keys
        .into_iter()
        .zip(buckets)
        .map(|(word, mut titles)| {
            titles.sort_by(title_order);
            let count = titles.len();
            Stat {
                word: word.to_string(),
                count,
                percentage: percentage(count, total),
                titles,
            }
        })
        .collect();
    stats.sort_by(|a, b| b.count.cmp(&a.count));

    tracing::debug!(
        target: "stats",
        selected = total,
        matched = stats.iter().map(|s| s.count).sum::<usize>(),
        groups = stats.len(),
        "stats computed"
    );
    stats
}

fn percentage(count: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (count as f64 / total as f64 * 10000.0).round() / 100.0
}
