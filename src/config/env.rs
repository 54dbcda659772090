// src/config/env.rs
//! Environment overrides. A variable only counts when non-empty.

use anyhow::{Context, Result};

use super::AppConfig;

fn flag(v: &str) -> bool {
    matches!(v.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes" | "on")
}

/// Apply overrides from the process environment.
pub fn apply_env_overrides(cfg: &mut AppConfig) -> Result<()> {
    apply_overrides_from(cfg, |k| std::env::var(k).ok())
}

/// Apply overrides from any lookup (tests pass a map).
pub fn apply_overrides_from<F>(cfg: &mut AppConfig, get: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    let var = |k: &str| get(k).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

    if let Some(v) = var("REPORT_MODE") {
        cfg.report.mode = v.parse()?;
    }
    if let Some(v) = var("ENABLE_CRAWLER") {
        cfg.crawler.enabled = flag(&v);
    }
    if let Some(v) = var("ENABLE_NOTIFICATION") {
        cfg.notification.enabled = flag(&v);
    }

    let ch = &mut cfg.notification.channels;
    for (key, slot) in [
        ("FEISHU_WEBHOOK_URL", &mut ch.feishu_webhook_url),
        ("DINGTALK_WEBHOOK_URL", &mut ch.dingtalk_webhook_url),
        ("WEWORK_WEBHOOK_URL", &mut ch.wework_webhook_url),
        ("TELEGRAM_BOT_TOKEN", &mut ch.telegram_bot_token),
        ("TELEGRAM_CHAT_ID", &mut ch.telegram_chat_id),
        ("EMAIL_FROM", &mut ch.email_from),
        ("EMAIL_PASSWORD", &mut ch.email_password),
        ("EMAIL_TO", &mut ch.email_to),
        ("EMAIL_SMTP_SERVER", &mut ch.email_smtp_server),
        ("NTFY_SERVER_URL", &mut ch.ntfy_server_url),
        ("NTFY_TOPIC", &mut ch.ntfy_topic),
        ("NTFY_TOKEN", &mut ch.ntfy_token),
    ] {
        if let Some(v) = var(key) {
            *slot = Some(v);
        }
    }
    if let Some(v) = var("EMAIL_SMTP_PORT") {
        ch.email_smtp_port = Some(
            v.parse()
                .with_context(|| format!("EMAIL_SMTP_PORT {v:?} is not a port"))?,
        );
    }

    let pw = &mut cfg.notification.push_window;
    if let Some(v) = var("PUSH_WINDOW_ENABLED") {
        pw.enabled = flag(&v);
    }
    if let Some(v) = var("PUSH_WINDOW_START") {
        pw.start = v;
    }
    if let Some(v) = var("PUSH_WINDOW_END") {
        pw.end = v;
    }
    if let Some(v) = var("PUSH_WINDOW_ONCE_PER_DAY") {
        pw.once_per_day = flag(&v);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mode::ReportMode;
    use std::collections::HashMap;

    fn with(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let m: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| m.get(k).cloned()
    }

    #[test]
    fn non_empty_values_win() {
        let mut cfg = AppConfig::default();
        cfg.notification.channels.ntfy_topic = Some("from-file".into());
        apply_overrides_from(
            &mut cfg,
            with(&[
                ("REPORT_MODE", "current"),
                ("ENABLE_CRAWLER", "false"),
                ("NTFY_TOPIC", "  "),
                ("FEISHU_WEBHOOK_URL", "https://hook"),
                ("EMAIL_SMTP_PORT", "465"),
                ("PUSH_WINDOW_ENABLED", "TRUE"),
                ("PUSH_WINDOW_START", "7:30"),
            ]),
        )
        .unwrap();
        assert_eq!(cfg.report.mode, ReportMode::Current);
        assert!(!cfg.crawler.enabled);
        assert_eq!(cfg.notification.channels.ntfy_topic.as_deref(), Some("from-file"));
        assert_eq!(cfg.notification.channels.feishu_webhook_url.as_deref(), Some("https://hook"));
        assert_eq!(cfg.notification.channels.email_smtp_port, Some(465));
        assert!(cfg.notification.push_window.enabled);
        assert_eq!(cfg.notification.push_window.start, "7:30");
    }

    #[test]
    fn bad_values_are_errors() {
        let mut cfg = AppConfig::default();
        assert!(apply_overrides_from(&mut cfg, with(&[("REPORT_MODE", "weekly")])).is_err());
        assert!(apply_overrides_from(&mut cfg, with(&[("EMAIL_SMTP_PORT", "smtp")])).is_err());
    }
}
