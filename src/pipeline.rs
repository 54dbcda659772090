// src/pipeline.rs
//! One run: crawl, persist, fold the day, report and push.
//!
//! | mode          | sent                     | written                         |
//! |---------------|--------------------------|---------------------------------|
//! | `daily`       | summary (whole ledger)   | `daily_summary.html`            |
//! | `incremental` | realtime (new titles)    | `HH-MM.html`, `daily_summary.html` |
//! | `current`     | realtime (current ranks) | `HH-MM.html`, `current_summary.html` |

use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::{DateTime, FixedOffset};

use crate::analyze::{compute_stats, load_keywords, KeywordRules};
use crate::batch::{self, Batch};
use crate::config::AppConfig;
use crate::html::{report_file_name, write_html_report};
use crate::ingest::{crawl, types::SourceProvider, NewsNowProvider};
use crate::ledger::{self, Ledger};
use crate::mode::{self, ReportMode};
use crate::notify::{DeliveryReport, NotifierMux, Outgoing, PushDecision, PushGate};
use crate::novelty::{self, Novelty};
use crate::render::{Channel, ChannelProfile, RenderContext};
use crate::report::{prepare_report_data, ReportData};
use crate::snapshot::SnapshotStore;

/// The day folded into a ledger, plus what the latest snapshot says.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub ledger: Ledger,
    pub novelty: Novelty,
    pub latest_id: String,
    pub first_of_day: bool,
    /// Failed sources of the latest snapshot.
    pub failed: Vec<String>,
}

/// Fold every stored snapshot of `day`. `None` when there are none yet.
pub fn analyze_day(store: &SnapshotStore, day: &str, allow: Option<&[String]>) -> Result<Option<Analysis>> {
    let snapshots = store.read_day(day)?;
    let Some(latest) = snapshots.last() else {
        tracing::info!(target: "pipeline", day, "no snapshots yet");
        return Ok(None);
    };
    let latest_id = latest.id.clone();
    let failed = latest.failed.clone();
    let ledger = ledger::build(&snapshots, allow);
    let novelty = novelty::detect(&ledger, &latest_id);
    Ok(Some(Analysis {
        ledger,
        novelty,
        latest_id,
        first_of_day: snapshots.len() <= 1,
        failed,
    }))
}

/// Stats and novelty for `selection` (the mode whose selection rule applies).
pub fn build_report(a: &Analysis, selection: ReportMode, rules: &KeywordRules, cfg: &AppConfig) -> ReportData {
    let threshold = cfg.report.rank_threshold;
    let candidates = mode::select(selection, &a.ledger, &a.novelty, &a.latest_id, a.first_of_day);
    let stats = compute_stats(&candidates, rules, threshold, &cfg.weight);
    prepare_report_data(stats, &a.novelty, &a.failed, &a.ledger, rules, selection, threshold)
}

/// Selection rule behind each report a mode produces.
fn realtime_selection(mode: ReportMode) -> Option<ReportMode> {
    match mode {
        ReportMode::Daily => None,
        m => Some(m),
    }
}

fn summary_selection(mode: ReportMode) -> ReportMode {
    match mode {
        ReportMode::Current => ReportMode::Current,
        ReportMode::Daily | ReportMode::Incremental => ReportMode::Daily,
    }
}

/// What a channel would receive for the stored snapshots of `now`'s day.
pub fn preview_batches(
    store: &SnapshotStore,
    cfg: &AppConfig,
    rules: &KeywordRules,
    now: DateTime<FixedOffset>,
    mode: ReportMode,
    channel: Channel,
) -> Result<Vec<Batch>> {
    let day = SnapshotStore::day_folder(&now);
    let allow = cfg.platform_ids();
    let report = match analyze_day(store, &day, allow.as_deref())? {
        Some(a) => build_report(&a, realtime_selection(mode).unwrap_or(mode), rules, cfg),
        None => ReportData::default(),
    };
    let n = &cfg.notification;
    let profile = ChannelProfile::for_channel(channel, Some(n.max_bytes(channel)), &n.feishu_separator);
    let ctx = RenderContext::new(now, mode, &report);
    Ok(batch::split(&report, &profile, &ctx))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    CrawlerDisabled,
    NoData,
    NoContent,
    NotificationDisabled,
    NoChannels,
    OutsideWindow,
    AlreadyPushed,
}

#[derive(Debug, Clone, Default)]
pub struct RunOutcome {
    pub snapshot_id: Option<String>,
    pub html: Vec<PathBuf>,
    pub delivery: Option<DeliveryReport>,
    pub skipped: Option<SkipReason>,
}

pub struct Pipeline {
    cfg: AppConfig,
    store: SnapshotStore,
    rules: KeywordRules,
    mux: NotifierMux,
    gate: PushGate,
}

impl Pipeline {
    pub fn new(cfg: AppConfig, rules: KeywordRules, mux: NotifierMux) -> Result<Self> {
        let store = SnapshotStore::new(&cfg.app.output_dir, cfg.offset()?);
        let gate = PushGate::new(&cfg.notification.push_window, &cfg.app.output_dir)?;
        Ok(Self {
            cfg,
            store,
            rules,
            mux,
            gate,
        })
    }

    /// Keyword rules from disk and every channel the configuration enables.
    pub fn from_config(cfg: AppConfig, keywords: Option<&Path>) -> Result<Self> {
        let rules = load_keywords(keywords)?;
        let mux = if cfg.notification.enabled {
            NotifierMux::from_settings(&cfg.notification, cfg.proxy())?
        } else {
            NotifierMux::default()
        };
        Self::new(cfg, rules, mux)
    }

    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    /// One provider per configured platform.
    pub fn providers(&self) -> Result<Vec<Box<dyn SourceProvider>>> {
        self.cfg
            .platforms
            .iter()
            .map(|p| {
                let provider = NewsNowProvider::new(
                    &self.cfg.crawler.api_base,
                    p.id.clone(),
                    p.name.as_deref(),
                    self.cfg.proxy(),
                )?;
                Ok(Box::new(provider) as Box<dyn SourceProvider>)
            })
            .collect()
    }

    pub async fn run(&self) -> Result<RunOutcome> {
        if !self.cfg.crawler.enabled {
            tracing::info!(target: "pipeline", "crawler disabled");
            return Ok(RunOutcome {
                skipped: Some(SkipReason::CrawlerDisabled),
                ..Default::default()
            });
        }
        let providers = self.providers()?;
        self.run_with(&providers, self.store.now()).await
    }

    /// Crawl `providers`, store the round as of `now`, then report.
    pub async fn run_with(&self, providers: &[Box<dyn SourceProvider>], now: DateTime<FixedOffset>) -> Result<RunOutcome> {
        let round = crawl(providers, self.cfg.crawler.request_interval_ms).await;
        let (path, id) = self
            .store
            .write(&now, &round.results, &round.names, &round.failed)?;
        tracing::info!(
            target: "pipeline",
            path = %path.display(),
            titles = round.title_count(),
            failed = round.failed.len(),
            "snapshot written"
        );
        let mut outcome = self.report(now).await?;
        outcome.snapshot_id = Some(id);
        Ok(outcome)
    }

    /// Report over what is already stored for `now`'s day.
    pub async fn report(&self, now: DateTime<FixedOffset>) -> Result<RunOutcome> {
        let mut outcome = RunOutcome::default();
        let day = SnapshotStore::day_folder(&now);
        let allow = self.cfg.platform_ids();
        let Some(analysis) = analyze_day(&self.store, &day, allow.as_deref())? else {
            outcome.skipped = Some(SkipReason::NoData);
            return Ok(outcome);
        };

        let mode = self.cfg.report.mode;
        let summary_mode = summary_selection(mode);
        let summary = build_report(&analysis, summary_mode, &self.rules, &self.cfg);
        let summary_ctx = RenderContext::new(now, summary_mode, &summary);
        outcome.html.push(write_html_report(
            &self.store,
            &day,
            &report_file_name(mode, true, &analysis.latest_id),
            &summary,
            &summary_ctx,
            true,
        )?);

        let (report, ctx, is_summary) = match realtime_selection(mode) {
            Some(sel) => {
                let report = build_report(&analysis, sel, &self.rules, &self.cfg);
                let ctx = RenderContext::new(now, sel, &report);
                outcome.html.push(write_html_report(
                    &self.store,
                    &day,
                    &report_file_name(mode, false, &analysis.latest_id),
                    &report,
                    &ctx,
                    false,
                )?);
                (report, ctx, false)
            }
            None => (summary, summary_ctx, true),
        };

        tracing::info!(
            target: "pipeline",
            mode = %mode,
            groups = report.stats.len(),
            matched = report.matched_total(),
            new = report.novelty_total(),
            "report ready"
        );

        outcome.skipped = self.gate_reason(&report, mode, &now);
        if outcome.skipped.is_none() {
            let out = Outgoing {
                report: &report,
                ctx: &ctx,
                is_summary,
            };
            let delivery = self.mux.notify(&out).await;
            if delivery.any_success() {
                self.gate.record_push(&now, out.report_type())?;
            }
            outcome.delivery = Some(delivery);
        }
        if self.gate.is_enabled() {
            let removed = self.gate.cleanup(&now)?;
            if removed > 0 {
                tracing::info!(target: "pipeline", removed, "old push records removed");
            }
        }
        Ok(outcome)
    }

    fn gate_reason(&self, report: &ReportData, mode: ReportMode, now: &DateTime<FixedOffset>) -> Option<SkipReason> {
        if !self.cfg.notification.enabled {
            return Some(SkipReason::NotificationDisabled);
        }
        if self.mux.is_empty() {
            return Some(SkipReason::NoChannels);
        }
        if !report.has_valid_content(mode) {
            tracing::info!(target: "pipeline", mode = %mode, "nothing worth sending");
            return Some(SkipReason::NoContent);
        }
        match self.gate.check(now) {
            PushDecision::Allowed => None,
            PushDecision::OutsideWindow => Some(SkipReason::OutsideWindow),
            PushDecision::AlreadyPushed => Some(SkipReason::AlreadyPushed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyze::parse_keywords;
    use crate::ingest::NewsNowProvider;
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> DateTime<FixedOffset> {
        FixedOffset::east_opt(8 * 3600)
            .unwrap()
            .with_ymd_and_hms(2025, 10, 1, h, m, 0)
            .unwrap()
    }

    fn provider(body_titles: &[&str]) -> Box<dyn SourceProvider> {
        let items: Vec<String> = body_titles
            .iter()
            .map(|t| format!(r#"{{"title":"{t}"}}"#))
            .collect();
        let body = format!(r#"{{"status":"success","items":[{}]}}"#, items.join(","));
        Box::new(NewsNowProvider::from_fixture("hn", Some("Hacker News"), &body))
    }

    fn pipeline(dir: &Path, mode: ReportMode) -> Pipeline {
        let mut cfg = AppConfig::default();
        cfg.app.output_dir = dir.to_path_buf();
        cfg.report.mode = mode;
        Pipeline::new(cfg, parse_keywords("rust\n\ngo"), NotifierMux::default()).unwrap()
    }

    #[tokio::test]
    async fn incremental_writes_realtime_and_summary_pages() {
        let tmp = tempfile::tempdir().unwrap();
        let p = pipeline(tmp.path(), ReportMode::Incremental);

        let first = p.run_with(&[provider(&["rust 2.0", "weather"])], at(9, 0)).await.unwrap();
        assert_eq!(first.snapshot_id.as_deref(), Some("09-00"));
        assert_eq!(first.skipped, Some(SkipReason::NoChannels));
        let names: Vec<String> = first
            .html
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["daily_summary.html", "09-00.html"]);
        assert!(tmp.path().join("2025-10-01/txt/09-00.txt").exists());

        p.run_with(&[provider(&["rust 2.0", "go 1.30"])], at(9, 30)).await.unwrap();
        let a = analyze_day(p.store(), "2025-10-01", None).unwrap().unwrap();
        assert_eq!(a.latest_id, "09-30");
        assert!(!a.first_of_day);
        let realtime = build_report(&a, ReportMode::Incremental, &p.rules, &p.cfg);
        let words: Vec<&str> = realtime.stats.iter().map(|s| s.word.as_str()).collect();
        assert_eq!(words, vec!["go"]);
        assert!(realtime.novelty.is_empty());
    }

    #[tokio::test]
    async fn report_without_snapshots_is_no_data() {
        let tmp = tempfile::tempdir().unwrap();
        let p = pipeline(tmp.path(), ReportMode::Daily);
        let out = p.report(at(10, 0)).await.unwrap();
        assert_eq!(out.skipped, Some(SkipReason::NoData));
        assert!(out.html.is_empty());
    }

    #[tokio::test]
    async fn daily_writes_only_the_summary() {
        let tmp = tempfile::tempdir().unwrap();
        let p = pipeline(tmp.path(), ReportMode::Daily);
        let out = p.run_with(&[provider(&["rust wins"])], at(9, 0)).await.unwrap();
        assert_eq!(out.html.len(), 1);
        assert!(out.html[0].ends_with("html/daily_summary.html"));
    }

    #[test]
    fn preview_on_empty_day_is_one_notice() {
        let tmp = tempfile::tempdir().unwrap();
        let mut cfg = AppConfig::default();
        cfg.app.output_dir = tmp.path().to_path_buf();
        let store = SnapshotStore::new(tmp.path(), cfg.offset().unwrap());
        let b = preview_batches(&store, &cfg, &KeywordRules::default(), at(9, 0), ReportMode::Current, Channel::Ntfy)
            .unwrap();
        assert_eq!(b.len(), 1);
        assert!(b[0].text.contains("No matching trending keywords in current ranking mode"));
    }
}
