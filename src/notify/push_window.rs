// src/notify/push_window.rs
//! Time-of-day gate for pushes, with an optional once-per-day limit kept
//! on disk as `<output>/.push_records/push_record_YYYYMMDD.json`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PushWindowSettings {
    pub enabled: bool,
    pub start: String,
    pub end: String,
    pub once_per_day: bool,
    pub record_retention_days: u32,
}

impl Default for PushWindowSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            start: "20:00".to_string(),
            end: "22:00".to_string(),
            once_per_day: true,
            record_retention_days: 7,
        }
    }
}

/// `"8:5"` → `"08:05"`.
pub fn normalize_time(s: &str) -> Result<String, ConfigError> {
    NaiveTime::parse_from_str(s.trim(), "%H:%M")
        .map(|t| t.format("%H:%M").to_string())
        .map_err(|_| ConfigError::BadWindowTime(s.to_string()))
}

/// Inclusive on both ends; all three are normalised `HH:MM`.
pub fn in_window(now: &str, start: &str, end: &str) -> bool {
    start <= now && now <= end
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushDecision {
    Allowed,
    OutsideWindow,
    AlreadyPushed,
}

#[derive(Debug, Serialize, Deserialize)]
struct PushRecord {
    pushed: bool,
    push_time: String,
    report_type: String,
}

#[derive(Debug, Clone)]
pub struct PushGate {
    enabled: bool,
    start: String,
    end: String,
    once_per_day: bool,
    retention_days: u32,
    dir: PathBuf,
}

impl PushGate {
    pub fn new(settings: &PushWindowSettings, output_dir: &Path) -> Result<Self, ConfigError> {
        Ok(Self {
            enabled: settings.enabled,
            start: normalize_time(&settings.start)?,
            end: normalize_time(&settings.end)?,
            once_per_day: settings.once_per_day,
            retention_days: settings.record_retention_days,
            dir: output_dir.join(".push_records"),
        })
    }

    /// A gate that lets everything through.
    pub fn disabled(output_dir: &Path) -> Self {
        Self {
            enabled: false,
            start: "00:00".to_string(),
            end: "23:59".to_string(),
            once_per_day: false,
            retention_days: 0,
            dir: output_dir.join(".push_records"),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn limits_daily(&self) -> bool {
        self.enabled && self.once_per_day
    }

    pub fn record_path(&self, now: &DateTime<FixedOffset>) -> PathBuf {
        self.dir
            .join(format!("push_record_{}.json", now.format("%Y%m%d")))
    }

    /// Does not touch the record; call [`PushGate::record_push`] after a
    /// successful delivery.
    pub fn check(&self, now: &DateTime<FixedOffset>) -> PushDecision {
        if !self.enabled {
            return PushDecision::Allowed;
        }
        let hm = now.format("%H:%M").to_string();
        if !in_window(&hm, &self.start, &self.end) {
            tracing::info!(target: "notify", now = %hm, start = %self.start, end = %self.end, "outside push window");
            return PushDecision::OutsideWindow;
        }
        if self.once_per_day && self.has_pushed_today(now) {
            tracing::info!(target: "notify", "already pushed today");
            return PushDecision::AlreadyPushed;
        }
        PushDecision::Allowed
    }

    pub fn has_pushed_today(&self, now: &DateTime<FixedOffset>) -> bool {
        let Ok(s) = fs::read_to_string(self.record_path(now)) else {
            return false;
        };
        serde_json::from_str::<PushRecord>(&s)
            .map(|r| r.pushed)
            .unwrap_or(false)
    }

    /// No-op unless the once-per-day limit is active.
    pub fn record_push(&self, now: &DateTime<FixedOffset>, report_type: &str) -> Result<()> {
        if !self.limits_daily() {
            return Ok(());
        }
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("creating {}", self.dir.display()))?;
        let record = PushRecord {
            pushed: true,
            push_time: now.format("%Y-%m-%d %H:%M:%S").to_string(),
            report_type: report_type.to_string(),
        };
        let path = self.record_path(now);
        fs::write(&path, serde_json::to_vec_pretty(&record)?)
            .with_context(|| format!("writing push record {}", path.display()))?;
        Ok(())
    }

    /// Remove records older than the retention period. Returns how many
    /// files were deleted.
    pub fn cleanup(&self, now: &DateTime<FixedOffset>) -> Result<usize> {
        let Ok(entries) = fs::read_dir(&self.dir) else {
            return Ok(0);
        };
        let today = now.date_naive();
        let mut removed = 0;
        for entry in entries.flatten() {
            let path = entry.path();
            let Some(date) = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| s.strip_prefix("push_record_"))
                .and_then(|d| NaiveDate::parse_from_str(d, "%Y%m%d").ok())
            else {
                continue;
            };
            if (today - date).num_days() > i64::from(self.retention_days) {
                fs::remove_file(&path)
                    .with_context(|| format!("removing {}", path.display()))?;
                removed += 1;
            }
        }
        Ok(removed)
    }
}
