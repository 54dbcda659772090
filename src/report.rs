// src/report.rs
//! `ReportData`: the immutable input of the batch formatter and HTML writer.

use serde::Serialize;

use crate::analyze::{matches, KeywordRules, ScoredTitle, Stat};
use crate::ledger::Ledger;
use crate::mode::ReportMode;
use crate::novelty::Novelty;

/// New titles of one source, shown in the novelty section.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NoveltySection {
    pub source_id: String,
    pub source_name: String,
    pub titles: Vec<ScoredTitle>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReportData {
    pub stats: Vec<Stat>,
    pub novelty: Vec<NoveltySection>,
    pub failed_sources: Vec<String>,
}

impl ReportData {
    pub fn is_empty(&self) -> bool {
        self.stats.is_empty() && self.novelty.is_empty() && self.failed_sources.is_empty()
    }

    pub fn novelty_total(&self) -> usize {
        self.novelty.iter().map(|s| s.titles.len()).sum()
    }

    pub fn matched_total(&self) -> usize {
        self.stats.iter().map(|s| s.count).sum()
    }

    /// Whether a notification is worth sending for `mode`.
    ///
    /// Incremental and current runs need at least one matched title; daily
    /// runs also accept a non-empty novelty section.
    pub fn has_valid_content(&self, mode: ReportMode) -> bool {
        let matched = self.stats.iter().any(|s| s.count > 0);
        match mode {
            ReportMode::Incremental | ReportMode::Current => matched,
            ReportMode::Daily => matched || self.novelty_total() > 0,
        }
    }
}

/// Assemble the report.
///
/// Stats with no titles are dropped. The novelty section is hidden in
/// incremental mode (every row there is already new); elsewhere it lists
/// the delta titles that pass keyword matching, each with count 1.
pub fn prepare_report_data(
    stats: Vec<Stat>,
    novelty: &Novelty,
    failed_sources: &[String],
    ledger: &Ledger,
    rules: &KeywordRules,
    mode: ReportMode,
    rank_threshold: u32,
) -> ReportData {
    let mut sections = Vec::new();
    if mode != ReportMode::Incremental {
        for (sid, titles) in novelty.iter() {
            let source_name = ledger.source_name(sid).to_string();
            let rows: Vec<ScoredTitle> = titles
                .iter()
                .filter(|(t, _)| matches(t, rules))
                .map(|(t, e)| ScoredTitle {
                    title: t.to_string(),
                    source_id: sid.to_string(),
                    source_name: source_name.clone(),
                    first_time: String::new(),
                    last_time: String::new(),
                    count: 1,
                    ranks: e.ranks.clone(),
                    rank_threshold,
                    url: e.url.clone(),
                    mobile_url: e.mobile_url.clone(),
                    summary: e.summary.clone(),
                    weight: 0.0,
                    is_new: true,
                })
                .collect();
            if !rows.is_empty() {
                sections.push(NoveltySection {
                    source_id: sid.to_string(),
                    source_name,
                    titles: rows,
                });
            }
        }
    }

    ReportData {
        stats: stats.into_iter().filter(|s| s.count > 0).collect(),
        novelty: sections,
        failed_sources: failed_sources.to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyze::{compute_stats, parse_keywords, WeightConfig};
    use crate::ledger::build;
    use crate::mode::select;
    use crate::novelty::detect;
    use crate::snapshot::{ParsedSnapshot, TitleMap, TitleObservation};

    fn snap(id: &str, titles: &[(&str, u32)]) -> ParsedSnapshot {
        let mut s = ParsedSnapshot::new(id);
        let mut t = TitleMap::new();
        for (title, r) in titles {
            t.insert(*title, TitleObservation::ranked(*r));
        }
        s.titles.insert("a", t);
        s.names.insert("a", "Source A".to_string());
        s
    }

    fn run(mode: ReportMode, words: &str) -> ReportData {
        let ledger = build(
            &[
                snap("08-00", &[("rust 1.0", 3)]),
                snap("09-00", &[("rust 2.0", 1), ("go news", 2)]),
            ],
            None,
        );
        let novelty = detect(&ledger, "09-00");
        let rules = parse_keywords(words);
        let sel = select(mode, &ledger, &novelty, "09-00", false);
        let stats = compute_stats(&sel, &rules, 5, &WeightConfig::default());
        prepare_report_data(stats, &novelty, &["zhihu".into()], &ledger, &rules, mode, 5)
    }

    #[test]
    fn novelty_is_filtered_by_keywords() {
        let r = run(ReportMode::Daily, "rust\n\ngolang\n");
        // "golang" group has no titles and is dropped
        assert_eq!(r.stats.len(), 1);
        assert_eq!(r.stats[0].word, "rust");
        assert_eq!(r.novelty.len(), 1);
        let rows: Vec<_> = r.novelty[0].titles.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(rows, vec!["rust 2.0"]);
        assert_eq!(r.novelty[0].source_name, "Source A");
        assert_eq!(r.novelty[0].titles[0].count, 1);
        assert_eq!(r.failed_sources, vec!["zhihu"]);
        assert!(r.has_valid_content(ReportMode::Daily));
    }

    #[test]
    fn incremental_hides_novelty_section() {
        let r = run(ReportMode::Incremental, "");
        assert!(r.novelty.is_empty());
        assert_eq!(r.matched_total(), 2);
        assert!(r.stats[0].titles.iter().all(|t| t.is_new));
    }

    #[test]
    fn nothing_matched_is_not_worth_sending() {
        let r = run(ReportMode::Current, "python\n");
        assert!(r.stats.is_empty());
        assert!(!r.has_valid_content(ReportMode::Current));
        assert!(!r.is_empty());
    }
}
