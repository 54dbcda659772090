// src/config/mod.rs
//! Application configuration: one TOML file plus environment overrides.

mod env;

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use chrono::FixedOffset;
use serde::{Deserialize, Serialize};

use crate::analyze::WeightConfig;
use crate::error::ConfigError;
use crate::ingest::DEFAULT_API_BASE;
use crate::mode::ReportMode;
use crate::notify::PushWindowSettings;
use crate::render::{Channel, DEFAULT_FEISHU_SEPARATOR};

pub use env::{apply_env_overrides, apply_overrides_from};

const ENV_PATH: &str = "CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "config/config.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSection {
    pub timezone_offset_hours: i32,
    pub output_dir: PathBuf,
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            timezone_offset_hours: 8,
            output_dir: PathBuf::from("output"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlerSection {
    pub enabled: bool,
    pub request_interval_ms: u64,
    pub api_base: String,
    pub use_proxy: bool,
    pub proxy_url: Option<String>,
}

impl Default for CrawlerSection {
    fn default() -> Self {
        Self {
            enabled: true,
            request_interval_ms: 1000,
            api_base: DEFAULT_API_BASE.to_string(),
            use_proxy: false,
            proxy_url: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportSection {
    pub mode: ReportMode,
    pub rank_threshold: u32,
}

impl Default for ReportSection {
    fn default() -> Self {
        Self {
            mode: ReportMode::Daily,
            rank_threshold: 5,
        }
    }
}

/// A monitored source; its id is also the ledger allow-list entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Platform {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// Credentials and endpoints; a channel is active when its fields are set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelSettings {
    pub feishu_webhook_url: Option<String>,
    pub dingtalk_webhook_url: Option<String>,
    pub wework_webhook_url: Option<String>,
    pub telegram_bot_token: Option<String>,
    pub telegram_chat_id: Option<String>,
    pub email_from: Option<String>,
    pub email_password: Option<String>,
    pub email_to: Option<String>,
    pub email_smtp_server: Option<String>,
    pub email_smtp_port: Option<u16>,
    pub ntfy_server_url: Option<String>,
    pub ntfy_topic: Option<String>,
    pub ntfy_token: Option<String>,
}

impl ChannelSettings {
    /// Blank strings count as unset.
    fn drop_blanks(&mut self) {
        for f in [
            &mut self.feishu_webhook_url,
            &mut self.dingtalk_webhook_url,
            &mut self.wework_webhook_url,
            &mut self.telegram_bot_token,
            &mut self.telegram_chat_id,
            &mut self.email_from,
            &mut self.email_password,
            &mut self.email_to,
            &mut self.email_smtp_server,
            &mut self.ntfy_server_url,
            &mut self.ntfy_topic,
            &mut self.ntfy_token,
        ] {
            if f.as_deref().is_some_and(|s| s.trim().is_empty()) {
                *f = None;
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationSettings {
    pub enabled: bool,
    pub batch_send_interval_secs: f64,
    pub message_batch_size: usize,
    pub dingtalk_batch_size: usize,
    pub feishu_batch_size: usize,
    pub ntfy_batch_size: usize,
    pub feishu_separator: String,
    pub push_window: PushWindowSettings,
    pub channels: ChannelSettings,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            batch_send_interval_secs: 1.0,
            message_batch_size: Channel::Telegram.default_max_bytes(),
            dingtalk_batch_size: Channel::DingTalk.default_max_bytes(),
            feishu_batch_size: Channel::Feishu.default_max_bytes(),
            ntfy_batch_size: Channel::Ntfy.default_max_bytes(),
            feishu_separator: DEFAULT_FEISHU_SEPARATOR.to_string(),
            push_window: PushWindowSettings::default(),
            channels: ChannelSettings::default(),
        }
    }
}

impl NotificationSettings {
    pub fn max_bytes(&self, channel: Channel) -> usize {
        match channel {
            Channel::Feishu => self.feishu_batch_size,
            Channel::DingTalk => self.dingtalk_batch_size,
            Channel::Ntfy => self.ntfy_batch_size,
            Channel::WeWork | Channel::Telegram | Channel::Email => self.message_batch_size,
        }
    }

    pub fn batch_pause(&self) -> Duration {
        Duration::try_from_secs_f64(self.batch_send_interval_secs.max(0.0)).unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub app: AppSection,
    pub crawler: CrawlerSection,
    pub report: ReportSection,
    pub weight: WeightConfig,
    pub platforms: Vec<Platform>,
    pub notification: NotificationSettings,
}

impl AppConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let mut cfg: AppConfig = toml::from_str(s).context("parsing config toml")?;
        cfg.normalize()?;
        Ok(cfg)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        Self::from_toml_str(&content).with_context(|| format!("in {}", path.display()))
    }

    /// `$CONFIG_PATH` (must exist), else `config/config.toml`, else
    /// defaults. Environment overrides are applied last.
    pub fn load_default() -> Result<Self> {
        let mut cfg = match std::env::var(ENV_PATH) {
            Ok(p) if !p.trim().is_empty() => {
                let pb = PathBuf::from(p);
                if !pb.exists() {
                    return Err(anyhow!("{ENV_PATH} points to non-existent path {}", pb.display()));
                }
                Self::load_from(&pb)?
            }
            _ => {
                let pb = PathBuf::from(DEFAULT_CONFIG_PATH);
                if pb.exists() {
                    Self::load_from(&pb)?
                } else {
                    tracing::info!(target: "config", "no config file, using defaults");
                    Self::default()
                }
            }
        };
        apply_env_overrides(&mut cfg)?;
        Ok(cfg)
    }

    fn normalize(&mut self) -> Result<(), ConfigError> {
        let interval = self.notification.batch_send_interval_secs;
        if !interval.is_finite() || Duration::try_from_secs_f64(interval.max(0.0)).is_err() {
            return Err(ConfigError::BadBatchInterval(interval));
        }
        self.weight = self.weight.sanitized();
        self.notification.channels.drop_blanks();
        self.platforms.retain(|p| !p.id.trim().is_empty());
        if self
            .crawler
            .proxy_url
            .as_deref()
            .is_some_and(|s| s.trim().is_empty())
        {
            self.crawler.proxy_url = None;
        }
        Ok(())
    }

    pub fn offset(&self) -> Result<FixedOffset> {
        FixedOffset::east_opt(self.app.timezone_offset_hours * 3600)
            .ok_or_else(|| anyhow!("timezone offset {}h out of range", self.app.timezone_offset_hours))
    }

    /// Allow-list for the ledger; `None` when no platforms are configured.
    pub fn platform_ids(&self) -> Option<Vec<String>> {
        if self.platforms.is_empty() {
            None
        } else {
            Some(self.platforms.iter().map(|p| p.id.clone()).collect())
        }
    }

    pub fn proxy(&self) -> Option<&str> {
        if self.crawler.use_proxy {
            self.crawler.proxy_url.as_deref()
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_sections_missing() {
        let cfg = AppConfig::from_toml_str("").unwrap();
        assert_eq!(cfg, AppConfig::default());
        assert_eq!(cfg.report.rank_threshold, 5);
        assert_eq!(cfg.notification.max_bytes(Channel::Ntfy), 3800);
        assert_eq!(cfg.notification.max_bytes(Channel::WeWork), 4000);
        assert_eq!(cfg.offset().unwrap().local_minus_utc(), 8 * 3600);
        assert!(cfg.platform_ids().is_none());
    }

    #[test]
    fn full_document() {
        let cfg = AppConfig::from_toml_str(
            r#"
            [app]
            timezone_offset_hours = 0
            output_dir = "out"

            [crawler]
            request_interval_ms = 200
            use_proxy = true
            proxy_url = "http://127.0.0.1:7890"

            [report]
            mode = "incremental"
            rank_threshold = 3

            [weight]
            rank_weight = -1.0
            frequency_weight = 0.5
            hotness_weight = 0.5

            [[platforms]]
            id = "zhihu"
            name = "Zhihu"

            [[platforms]]
            id = "weibo"

            [notification]
            batch_send_interval_secs = 0.5
            feishu_batch_size = 1000

            [notification.push_window]
            enabled = true
            start = "08:00"
            end = "22:00"

            [notification.channels]
            feishu_webhook_url = "https://hook/f"
            dingtalk_webhook_url = ""
            email_smtp_port = 465
            "#,
        )
        .unwrap();
        assert_eq!(cfg.report.mode, ReportMode::Incremental);
        assert_eq!(cfg.weight.rank_weight, 0.0);
        assert_eq!(cfg.platform_ids().unwrap(), vec!["zhihu".to_string(), "weibo".to_string()]);
        assert_eq!(cfg.platforms[1].name, None);
        assert_eq!(cfg.proxy(), Some("http://127.0.0.1:7890"));
        assert_eq!(cfg.notification.max_bytes(Channel::Feishu), 1000);
        assert_eq!(cfg.notification.batch_pause(), Duration::from_millis(500));
        assert!(cfg.notification.push_window.enabled);
        assert_eq!(cfg.notification.channels.feishu_webhook_url.as_deref(), Some("https://hook/f"));
        assert_eq!(cfg.notification.channels.dingtalk_webhook_url, None);
        assert_eq!(cfg.notification.channels.email_smtp_port, Some(465));
    }

    #[test]
    fn non_finite_batch_interval_is_rejected() {
        for bad in ["inf", "+inf", "nan", "1e300"] {
            let err = AppConfig::from_toml_str(&format!("[notification]\nbatch_send_interval_secs = {bad}"))
                .unwrap_err();
            assert!(
                matches!(err.downcast_ref::<ConfigError>(), Some(ConfigError::BadBatchInterval(_))),
                "{bad}: {err:#}"
            );
        }
        let cfg = AppConfig::from_toml_str("[notification]\nbatch_send_interval_secs = -2.0").unwrap();
        assert_eq!(cfg.notification.batch_pause(), Duration::ZERO);
    }

    #[test]
    fn unknown_mode_is_an_error() {
        assert!(AppConfig::from_toml_str("[report]\nmode = \"weekly\"").is_err());
    }
}
