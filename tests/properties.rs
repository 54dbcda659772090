// tests/properties.rs
//
// Invariants that must hold for any input: ledger fold, weighting,
// group exclusivity and batch packing.

use std::collections::HashSet;

use chrono::{FixedOffset, TimeZone};

use trend_digest::analyze::weights::weight_parts;
use trend_digest::analyze::{compute_stats, parse_keywords, weight, ScoredTitle, Stat, WeightConfig};
use trend_digest::ledger::{self, merge_snapshot};
use trend_digest::mode::{select, ReportMode};
use trend_digest::novelty;
use trend_digest::render::{Channel, ChannelProfile, RenderContext, DEFAULT_FEISHU_SEPARATOR};
use trend_digest::report::{NoveltySection, ReportData};
use trend_digest::snapshot::{ParsedSnapshot, TitleMap, TitleObservation};
use trend_digest::{split, Ledger};

fn snap(id: &str, rows: Vec<(&str, TitleObservation)>) -> ParsedSnapshot {
    let mut s = ParsedSnapshot::new(id);
    let mut titles = TitleMap::new();
    for (title, obs) in rows {
        titles.insert(title, obs);
    }
    s.titles.insert("src", titles);
    s
}

fn multi(ranks: &[u32]) -> TitleObservation {
    TitleObservation {
        ranks: ranks.to_vec(),
        ..Default::default()
    }
}

#[test]
fn folding_the_same_snapshot_twice_counts_once() {
    let s = snap("08-00", vec![("A", multi(&[2])), ("B", multi(&[4]))]);
    let once = merge_snapshot(Ledger::default(), &s, None);
    let twice = merge_snapshot(once.clone(), &s, None);
    assert_eq!(once, twice);
    assert_eq!(twice.get("src", "A").unwrap().count, 1);
    assert_eq!(twice.snapshot_ids().to_vec(), vec!["08-00".to_string()]);
}

#[test]
fn ranks_stay_unique_in_first_seen_order() {
    let snaps = vec![
        snap("08-00", vec![("A", multi(&[3]))]),
        snap("08-30", vec![("A", multi(&[1, 3]))]),
        snap("09-00", vec![("A", multi(&[2, 1, 2]))]),
        snap("09-30", vec![("A", multi(&[3, 7]))]),
    ];
    let ledger = ledger::build(&snaps, None);
    let entry = ledger.get("src", "A").unwrap();
    assert_eq!(entry.ranks, vec![3, 1, 2, 7]);
    assert_eq!(entry.count, 4);

    let unique: HashSet<u32> = entry.ranks.iter().copied().collect();
    assert_eq!(unique.len(), entry.ranks.len());
}

#[test]
fn link_and_summary_are_filled_once() {
    let snaps = vec![
        snap("08-00", vec![("A", multi(&[1]))]),
        snap(
            "08-30",
            vec![("A", multi(&[1]).with_url("https://a/1").with_mobile_url("https://m/1"))],
        ),
        snap(
            "09-00",
            vec![(
                "A",
                multi(&[1])
                    .with_url("https://a/2")
                    .with_mobile_url("https://m/2")
                    .with_summary("first summary"),
            )],
        ),
        snap("09-30", vec![("A", multi(&[1]).with_summary("second summary"))]),
    ];

    let mut seen: Vec<(Option<String>, Option<String>, Option<String>)> = Vec::new();
    let mut ledger = Ledger::default();
    for s in &snaps {
        ledger = merge_snapshot(ledger, s, None);
        let e = ledger.get("src", "A").unwrap();
        seen.push((e.url.clone(), e.mobile_url.clone(), e.summary.clone()));
    }

    // Once a field has a value, every later state keeps it.
    for w in seen.windows(2) {
        let (a, b) = (&w[0], &w[1]);
        for (before, after) in [(&a.0, &b.0), (&a.1, &b.1), (&a.2, &b.2)] {
            if before.is_some() {
                assert_eq!(before, after);
            }
        }
    }
    let e = ledger.get("src", "A").unwrap();
    assert_eq!(e.url.as_deref(), Some("https://a/1"));
    assert_eq!(e.mobile_url.as_deref(), Some("https://m/1"));
    assert_eq!(e.summary.as_deref(), Some("first summary"));
}

#[test]
fn more_appearances_never_weigh_less() {
    let cfg = WeightConfig::default();
    for ranks in [vec![1], vec![4, 9], vec![12], vec![2, 2, 30]] {
        let mut last_freq = -1.0;
        let mut last_weight = f64::MIN;
        for count in 1..=10 {
            let freq = weight_parts(&ranks, count, 5).frequency_score;
            let w = weight(&ranks, count, 5, &cfg);
            assert!(freq > last_freq, "frequency must grow up to 10 appearances");
            assert!(w >= last_weight);
            last_freq = freq;
            last_weight = w;
        }
        // Saturates past 10.
        assert_eq!(weight(&ranks, 11, 5, &cfg), weight(&ranks, 10, 5, &cfg));
    }
    assert_eq!(weight(&[], 7, 5, &cfg), 0.0);
}

#[test]
fn a_title_lands_in_at_most_one_group() {
    // Deliberately overlapping groups.
    let rules = parse_keywords("ai\nchip\n\n+ai\n+startup\n\nchip\nnvidia\n\n!rumor\n");
    let titles = [
        "AI chip export rules",
        "Nvidia chip shortage",
        "AI startup raises",
        "Chip rumor denied",
        "Weather",
    ];
    let rows: Vec<(&str, TitleObservation)> = titles
        .iter()
        .enumerate()
        .map(|(i, t)| (*t, multi(&[i as u32 + 1])))
        .collect();
    let ledger = ledger::build(&[snap("10-00", rows)], None);
    let sel = select(ReportMode::Daily, &ledger, &novelty::detect(&ledger, "10-00"), "10-00", true);
    let stats = compute_stats(&sel, &rules, 5, &WeightConfig::default());

    let mut placed = HashSet::new();
    for s in &stats {
        for t in &s.titles {
            assert!(placed.insert(t.title.clone()), "{} placed twice", t.title);
        }
    }
    // First matching group wins.
    assert_eq!(stats.iter().map(|s| s.count).sum::<usize>(), 3);
    let ai = stats.iter().find(|s| s.word == "ai chip").unwrap();
    assert_eq!(ai.count, 3);
    assert!(!placed.contains("Chip rumor denied"));
    assert!(!placed.contains("Weather"));
}

fn row(title: String, rank: u32) -> ScoredTitle {
    ScoredTitle {
        title,
        source_id: "src".into(),
        source_name: "Source".into(),
        first_time: "08-00".into(),
        last_time: "09-30".into(),
        count: 2,
        ranks: vec![rank, rank + 1],
        rank_threshold: 5,
        url: Some(format!("https://example.com/{rank}")),
        mobile_url: None,
        summary: None,
        weight: 0.0,
        is_new: rank % 3 == 0,
    }
}

fn busy_report() -> ReportData {
    let stats = (0..5)
        .map(|g| {
            let titles: Vec<ScoredTitle> = (0..8)
                .map(|i| row(format!("group {g} headline {i} about something happening"), i + 1))
                .collect();
            Stat {
                word: format!("topic{g}"),
                count: titles.len(),
                percentage: 20.0,
                titles,
            }
        })
        .collect();
    ReportData {
        stats,
        novelty: vec![NoveltySection {
            source_id: "src".into(),
            source_name: "Source".into(),
            titles: (0..6).map(|i| row(format!("fresh headline {i}"), i + 1)).collect(),
        }],
        failed_sources: vec!["weibo".into(), "douyin".into()],
    }
}

fn ctx(report: &ReportData) -> RenderContext {
    let tz = FixedOffset::east_opt(8 * 3600).unwrap();
    RenderContext::new(tz.with_ymd_and_hms(2025, 10, 1, 9, 30, 0).unwrap(), ReportMode::Daily, report)
}

#[test]
fn batches_respect_the_byte_limit_on_every_channel() {
    let report = busy_report();
    let c = ctx(&report);
    for channel in Channel::ALL {
        for max in [900, 1500, 2500, 4000] {
            let profile = ChannelProfile::for_channel(channel, Some(max), DEFAULT_FEISHU_SEPARATOR);
            let batches = split(&report, &profile, &c);
            assert!(!batches.is_empty());
            for b in &batches {
                assert!(
                    b.oversized || b.len() <= max,
                    "{channel} batch of {} bytes exceeds {max}",
                    b.len()
                );
            }
            // Nothing is lost.
            let all: String = batches.iter().map(|b| b.text.as_str()).collect();
            for g in 0..5 {
                for i in 0..8 {
                    let needle = format!("group {g} headline {i} ");
                    assert!(all.contains(&needle), "{channel}/{max}: lost {needle:?}");
                }
            }
        }
    }
}

#[test]
fn no_batch_ends_on_a_bare_header() {
    let report = busy_report();
    let c = ctx(&report);
    for max in [700, 900, 1200] {
        let profile = ChannelProfile::for_channel(Channel::Ntfy, Some(max), DEFAULT_FEISHU_SEPARATOR);
        let batches = split(&report, &profile, &c);
        assert!(batches.len() > 1);
        for b in &batches {
            // Every group header is followed by a numbered line in the same batch.
            for (at, _) in b.text.match_indices("📈 [") {
                let rest = &b.text[at..];
                let body = rest.split_once(" items\n\n").map(|(_, tail)| tail).unwrap_or("");
                let first = body.trim_start_matches(' ');
                assert!(
                    first.starts_with(|ch: char| ch.is_ascii_digit()),
                    "header without its first line in batch:\n{}",
                    b.text
                );
            }
            for (at, _) in b.text.match_indices("**Source** (") {
                let rest = &b.text[at..];
                let body = rest.split_once("items):\n\n").map(|(_, tail)| tail).unwrap_or("");
                assert!(body.trim_start_matches(' ').starts_with(|ch: char| ch.is_ascii_digit()));
            }
        }
    }
}

#[test]
fn labels_of_four_digit_batch_counts_stay_within_the_limit() {
    let titles: Vec<ScoredTitle> = (0..1500).map(|i| row(format!("t{i}"), i + 1)).collect();
    let report = ReportData {
        stats: vec![Stat {
            word: "w".into(),
            count: titles.len(),
            percentage: 100.0,
            titles,
        }],
        ..Default::default()
    };
    let c = ctx(&report);
    let mut widest = 0;
    for max in (200..=260).step_by(5) {
        let profile = ChannelProfile::for_channel(Channel::Ntfy, Some(max), DEFAULT_FEISHU_SEPARATOR);
        let batches = split(&report, &profile, &c);
        widest = widest.max(batches.len());
        let n = batches.len();
        assert!(batches[n - 1].text.starts_with(&format!("**[Batch {n}/{n}]**")));
        for b in &batches {
            assert!(b.oversized || b.len() <= max, "batch of {} bytes exceeds {max}", b.len());
        }
    }
    assert!(widest >= 1000, "only {widest} batches");
}
