// src/snapshot/store.rs
//! Flat per-day file layout:
//!
//! ```text
//! <root>/<YYYY-MM-DD>/txt/<HH-MM>.txt    one file per crawl round
//! <root>/<YYYY-MM-DD>/html/<name>.html   rendered reports
//! ```
//!
//! A missing day directory means "no data yet", never an error.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, FixedOffset, Utc};

use super::parser::parse_snapshot;
use super::types::{ParsedSnapshot, SourceTitles};
use super::writer::render_snapshot;
use crate::ordered::OrderedMap;

#[derive(Debug, Clone)]
pub struct SnapshotStore {
    root: PathBuf,
    offset: FixedOffset,
}

impl SnapshotStore {
    pub fn new(root: impl Into<PathBuf>, offset: FixedOffset) -> Self {
        Self {
            root: root.into(),
            offset,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Current wall-clock time in the configured zone.
    pub fn now(&self) -> DateTime<FixedOffset> {
        Utc::now().with_timezone(&self.offset)
    }

    pub fn day_folder(now: &DateTime<FixedOffset>) -> String {
        now.format("%Y-%m-%d").to_string()
    }

    pub fn snapshot_id(now: &DateTime<FixedOffset>) -> String {
        now.format("%H-%M").to_string()
    }

    fn txt_dir(&self, day: &str) -> PathBuf {
        self.root.join(day).join("txt")
    }

    /// Snapshot files for `day`, oldest first.
    pub fn list(&self, day: &str) -> Result<Vec<PathBuf>> {
        let dir = self.txt_dir(day);
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut files: Vec<PathBuf> = fs::read_dir(&dir)
            .with_context(|| format!("listing {}", dir.display()))?
            .flatten()
            .map(|e| e.path())
            .filter(|p| p.extension().and_then(|s| s.to_str()) == Some("txt"))
            .collect();
        files.sort();
        Ok(files)
    }

    /// True when at most one snapshot exists for `day` (the one this run wrote).
    pub fn is_first_of_day(&self, day: &str) -> Result<bool> {
        Ok(self.list(day)?.len() <= 1)
    }

    /// Parse every snapshot of `day`, oldest first. Unparseable lines are
    /// logged by the parser and skipped.
    pub fn read_day(&self, day: &str) -> Result<Vec<ParsedSnapshot>> {
        let mut out = Vec::new();
        for path in self.list(day)? {
            let id = path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or_default()
                .to_string();
            let text = fs::read_to_string(&path)
                .with_context(|| format!("reading snapshot {}", path.display()))?;
            let parsed = parse_snapshot(&id, &text);
            if !parsed.errors.is_empty() {
                tracing::warn!(
                    target: "snapshot",
                    file = %path.display(),
                    skipped = parsed.errors.len(),
                    "snapshot had unparseable lines"
                );
            }
            out.push(parsed.snapshot);
        }
        Ok(out)
    }

    /// Persist one crawl round as `<day>/txt/<HH-MM>.txt`. Returns the path
    /// and the snapshot id.
    pub fn write(
        &self,
        now: &DateTime<FixedOffset>,
        results: &SourceTitles,
        names: &OrderedMap<String>,
        failed: &[String],
    ) -> Result<(PathBuf, String)> {
        let day = Self::day_folder(now);
        let id = Self::snapshot_id(now);
        let dir = self.txt_dir(&day);
        fs::create_dir_all(&dir).with_context(|| format!("creating {}", dir.display()))?;
        let path = dir.join(format!("{id}.txt"));
        fs::write(&path, render_snapshot(results, names, failed))
            .with_context(|| format!("writing snapshot {}", path.display()))?;
        Ok((path, id))
    }

    /// Path for a rendered HTML report, creating the directory.
    pub fn html_path(&self, day: &str, name: &str) -> Result<PathBuf> {
        let dir = self.root.join(day).join("html");
        fs::create_dir_all(&dir).with_context(|| format!("creating {}", dir.display()))?;
        Ok(dir.join(format!("{name}.html")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::types::{TitleMap, TitleObservation};
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> DateTime<FixedOffset> {
        let tz = FixedOffset::east_opt(8 * 3600).unwrap();
        tz.with_ymd_and_hms(2025, 10, 1, h, m, 0).unwrap()
    }

    fn one(title: &str, rank: u32) -> SourceTitles {
        let mut t = TitleMap::new();
        t.insert(title, TitleObservation::ranked(rank));
        let mut r = SourceTitles::new();
        r.insert("a", t);
        r
    }

    #[test]
    fn missing_day_is_empty_not_error() {
        let tmp = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(tmp.path(), FixedOffset::east_opt(0).unwrap());
        assert!(store.read_day("2000-01-01").unwrap().is_empty());
        assert!(store.is_first_of_day("2000-01-01").unwrap());
    }

    #[test]
    fn write_then_read_in_order() {
        let tmp = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(tmp.path(), FixedOffset::east_opt(8 * 3600).unwrap());
        let names = OrderedMap::new();
        store.write(&at(9, 5), &one("late", 2), &names, &[]).unwrap();
        store.write(&at(8, 30), &one("early", 1), &names, &[]).unwrap();

        let day = SnapshotStore::day_folder(&at(8, 30));
        assert_eq!(day, "2025-10-01");
        assert!(!store.is_first_of_day(&day).unwrap());

        let snaps = store.read_day(&day).unwrap();
        let ids: Vec<_> = snaps.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["08-30", "09-05"]);
        assert!(snaps[0].titles.get("a").unwrap().contains_key("early"));
    }
}
