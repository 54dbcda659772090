// src/mode.rs
//! Report modes and the per-mode ledger selection.
//!
//! | mode          | entries fed to stats                        | flagged new                  |
//! |---------------|---------------------------------------------|------------------------------|
//! | `daily`       | whole ledger                                | novelty delta                |
//! | `incremental` | whole ledger on the first run, else delta   | all                          |
//! | `current`     | entries still present in the latest poll    | all on first run, else delta |

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::analyze::Candidate;
use crate::error::ConfigError;
use crate::ledger::{Ledger, LedgerEntry};
use crate::novelty::{self, Novelty};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportMode {
    #[default]
    Daily,
    Incremental,
    Current,
}

impl ReportMode {
    pub fn as_str(self) -> &'static str {
        match self {
            ReportMode::Daily => "daily",
            ReportMode::Incremental => "incremental",
            ReportMode::Current => "current",
        }
    }

    /// Title used in report headers and HTML output.
    pub fn report_title(self) -> &'static str {
        match self {
            ReportMode::Daily => "Daily Summary",
            ReportMode::Incremental => "Incremental Update",
            ReportMode::Current => "Current Ranking",
        }
    }
}

impl fmt::Display for ReportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "daily" => Ok(ReportMode::Daily),
            "incremental" => Ok(ReportMode::Incremental),
            "current" => Ok(ReportMode::Current),
            _ => Err(ConfigError::UnknownMode(s.to_string())),
        }
    }
}

/// Pick the ledger entries a run reports on and flag the new ones.
///
/// `latest_id` is the snapshot this run just wrote (or the newest stored
/// one); `first_of_day` is true when it is the only snapshot of the day.
pub fn select<'a>(
    mode: ReportMode,
    ledger: &'a Ledger,
    novelty: &Novelty,
    latest_id: &str,
    first_of_day: bool,
) -> Vec<Candidate<'a>> {
    let candidate = |sid: &'a str, title: &'a str, entry: &'a LedgerEntry, is_new: bool| Candidate {
        source_id: sid,
        source_name: ledger.source_name(sid),
        title,
        entry,
        is_new,
    };

    let selected: Vec<Candidate<'a>> = match mode {
        ReportMode::Daily => ledger
            .iter()
            .map(|(sid, t, e)| candidate(sid, t, e, novelty::contains(novelty, sid, t)))
            .collect(),
        ReportMode::Incremental if first_of_day => ledger
            .iter()
            .map(|(sid, t, e)| candidate(sid, t, e, true))
            .collect(),
        ReportMode::Incremental => ledger
            .iter()
            .filter(|(sid, t, _)| novelty::contains(novelty, sid, t))
            .map(|(sid, t, e)| candidate(sid, t, e, true))
            .collect(),
        ReportMode::Current => ledger
            .iter()
            .filter(|(_, _, e)| e.last_time == latest_id)
            .map(|(sid, t, e)| {
                let is_new = first_of_day || novelty::contains(novelty, sid, t);
                candidate(sid, t, e, is_new)
            })
            .collect(),
    };

    tracing::info!(
        target: "mode",
        mode = %mode,
        first_of_day,
        ledger = ledger.len(),
        selected = selected.len(),
        new = selected.iter().filter(|c| c.is_new).count(),
        "selection ready"
    );
    selected
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::build;
    use crate::novelty::detect;
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

    fn titles(sel: &[Candidate<'_>]) -> Vec<(String, bool)> {
        sel.iter().map(|c| (c.title.to_string(), c.is_new)).collect()
    }

    fn day() -> Ledger {
        build(
            &[
                snap("08-00", &[("X", 3), ("Gone", 4)]),
                snap("09-00", &[("X", 1), ("Y", 5)]),
            ],
            None,
        )
    }

    #[test]
    fn parses_modes() {
        assert_eq!("Incremental".parse::<ReportMode>().unwrap(), ReportMode::Incremental);
        assert!(matches!(
            "weekly".parse::<ReportMode>(),
            Err(ConfigError::UnknownMode(_))
        ));
    }

    #[test]
    fn daily_takes_everything_and_flags_delta() {
        let l = day();
        let n = detect(&l, "09-00");
        let sel = select(ReportMode::Daily, &l, &n, "09-00", false);
        assert_eq!(
            titles(&sel),
            vec![("X".into(), false), ("Gone".into(), false), ("Y".into(), true)]
        );
    }

    #[test]
    fn incremental_only_delta_unless_first_run() {
        let l = day();
        let n = detect(&l, "09-00");
        let sel = select(ReportMode::Incremental, &l, &n, "09-00", false);
        assert_eq!(titles(&sel), vec![("Y".into(), true)]);

        let first = build(&[snap("08-00", &[("X", 3)])], None);
        let n = detect(&first, "08-00");
        let sel = select(ReportMode::Incremental, &first, &n, "08-00", true);
        assert_eq!(titles(&sel), vec![("X".into(), true)]);
    }

    #[test]
    fn current_keeps_latest_poll_with_full_history() {
        let l = day();
        let n = detect(&l, "09-00");
        let sel = select(ReportMode::Current, &l, &n, "09-00", false);
        assert_eq!(titles(&sel), vec![("X".into(), false), ("Y".into(), true)]);
        let x = sel[0].entry;
        assert_eq!((x.count, x.ranks.clone()), (2, vec![3, 1]));
    }
}
