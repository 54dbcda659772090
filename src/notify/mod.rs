// src/notify/mod.rs
//! Delivery side: every configured channel gets the same report, split
//! and rendered its own way.

pub mod email;
pub mod ntfy;
pub mod push_window;
pub mod webhook;

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use metrics::{counter, describe_counter};
use once_cell::sync::OnceCell;

use crate::batch;
use crate::config::NotificationSettings;
use crate::render::{Channel, ChannelProfile, RenderContext};
use crate::report::ReportData;

pub use email::{EmailNotifier, EmailSettings, SmtpTarget};
pub use ntfy::NtfyTransport;
pub use push_window::{PushDecision, PushGate, PushWindowSettings};
pub use webhook::WebhookTransport;

fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("notify_batches_total", "Payloads accepted, per channel.");
        describe_counter!("notify_failures_total", "Payloads that failed, per channel.");
    });
}

/// One report on its way out.
#[derive(Debug, Clone, Copy)]
pub struct Outgoing<'a> {
    pub report: &'a ReportData,
    pub ctx: &'a RenderContext,
    /// Summary report (whole ledger) rather than a realtime one.
    pub is_summary: bool,
}

impl Outgoing<'_> {
    pub fn report_type(&self) -> &'static str {
        crate::html::report_heading(self.ctx.mode, self.is_summary)
    }
}

#[async_trait]
pub trait Notifier: Send + Sync {
    fn channel(&self) -> Channel;
    async fn deliver(&self, out: &Outgoing<'_>) -> Result<()>;
}

/// Posts one already-rendered payload.
#[async_trait]
pub trait BatchTransport: Send + Sync {
    fn channel(&self) -> Channel;

    /// `index` is 1-based in reading order.
    async fn post(&self, text: &str, index: usize, total: usize, out: &Outgoing<'_>) -> Result<()>;

    /// Push the last batch first.
    fn newest_first(&self) -> bool {
        false
    }

    /// Keep going after a failed batch; delivery counts as done if any
    /// batch went through.
    fn partial_success(&self) -> bool {
        false
    }

    fn pause(&self, configured: Duration) -> Duration {
        configured
    }
}

/// Splits the report with the channel's profile and hands each batch to
/// its transport.
pub struct BatchedNotifier {
    transport: Box<dyn BatchTransport>,
    profile: ChannelProfile,
    pause: Duration,
}

impl BatchedNotifier {
    pub fn new(transport: Box<dyn BatchTransport>, profile: ChannelProfile, pause: Duration) -> Self {
        Self {
            transport,
            profile,
            pause,
        }
    }
}

#[async_trait]
impl Notifier for BatchedNotifier {
    fn channel(&self) -> Channel {
        self.transport.channel()
    }

    async fn deliver(&self, out: &Outgoing<'_>) -> Result<()> {
        ensure_metrics_described();
        let channel = self.transport.channel();
        let batches = batch::split(out.report, &self.profile, out.ctx);
        let total = batches.len();
        let order: Vec<usize> = if self.transport.newest_first() {
            (0..total).rev().collect()
        } else {
            (0..total).collect()
        };
        let pause = self.transport.pause(self.pause);

        let mut sent = 0usize;
        let mut last_err = None;
        for (n, &i) in order.iter().enumerate() {
            let b = &batches[i];
            match self.transport.post(&b.text, i + 1, total, out).await {
                Ok(()) => {
                    sent += 1;
                    counter!("notify_batches_total", "channel" => channel.as_str()).increment(1);
                    tracing::info!(
                        target: "notify",
                        channel = %channel,
                        batch = i + 1,
                        total,
                        bytes = b.len(),
                        "batch sent"
                    );
                }
                Err(e) => {
                    counter!("notify_failures_total", "channel" => channel.as_str()).increment(1);
                    tracing::warn!(target: "notify", channel = %channel, batch = i + 1, total, error = ?e, "batch failed");
                    if !self.transport.partial_success() {
                        return Err(e);
                    }
                    last_err = Some(e);
                }
            }
            if n + 1 < total && !pause.is_zero() {
                tokio::time::sleep(pause).await;
            }
        }

        match last_err {
            Some(e) if sent == 0 => Err(e),
            _ => Ok(()),
        }
    }
}

/// Per-channel outcome of one fan-out.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    pub results: Vec<(Channel, bool)>,
}

impl DeliveryReport {
    pub fn any_success(&self) -> bool {
        self.results.iter().any(|(_, ok)| *ok)
    }

    pub fn get(&self, channel: Channel) -> Option<bool> {
        self.results
            .iter()
            .find(|(c, _)| *c == channel)
            .map(|(_, ok)| *ok)
    }
}

/// Fans a report out to every configured channel. One channel failing
/// never stops the others.
#[derive(Default)]
pub struct NotifierMux {
    notifiers: Vec<Box<dyn Notifier>>,
}

impl NotifierMux {
    pub fn new(notifiers: Vec<Box<dyn Notifier>>) -> Self {
        Self { notifiers }
    }

    /// Every channel whose credentials are present in `settings`.
    pub fn from_settings(settings: &NotificationSettings, proxy: Option<&str>) -> Result<Self> {
        let c = &settings.channels;
        let client = webhook::http_client(proxy)?;
        let pause = settings.batch_pause();
        let profile = |ch: Channel| {
            ChannelProfile::for_channel(ch, Some(settings.max_bytes(ch)), &settings.feishu_separator)
        };
        let mut out: Vec<Box<dyn Notifier>> = Vec::new();

        let mut push = |t: Box<dyn BatchTransport>| {
            let ch = t.channel();
            out.push(Box::new(BatchedNotifier::new(t, profile(ch), pause)));
        };
        if let Some(url) = c.feishu_webhook_url.as_deref() {
            push(Box::new(WebhookTransport::feishu(url, client.clone())));
        }
        if let Some(url) = c.dingtalk_webhook_url.as_deref() {
            push(Box::new(WebhookTransport::dingtalk(url, client.clone())));
        }
        if let Some(url) = c.wework_webhook_url.as_deref() {
            push(Box::new(WebhookTransport::wework(url, client.clone())));
        }
        if let (Some(token), Some(chat)) = (c.telegram_bot_token.as_deref(), c.telegram_chat_id.as_deref()) {
            push(Box::new(WebhookTransport::telegram(token, chat, client.clone())));
        }
        if let Some(topic) = c.ntfy_topic.as_deref() {
            push(Box::new(NtfyTransport::new(
                c.ntfy_server_url.as_deref().unwrap_or(ntfy::DEFAULT_SERVER),
                topic,
                c.ntfy_token.clone(),
                client.clone(),
            )));
        }
        if let Some(email) = EmailSettings::from_channels(c) {
            out.push(Box::new(EmailNotifier::new(&email)?));
        }

        Ok(Self::new(out))
    }

    pub fn is_empty(&self) -> bool {
        self.notifiers.is_empty()
    }

    pub fn channels(&self) -> Vec<Channel> {
        self.notifiers.iter().map(|n| n.channel()).collect()
    }

    pub async fn notify(&self, out: &Outgoing<'_>) -> DeliveryReport {
        let mut report = DeliveryReport::default();
        for n in &self.notifiers {
            let ok = match n.deliver(out).await {
                Ok(()) => {
                    tracing::info!(target: "notify", channel = %n.channel(), report = out.report_type(), "delivered");
                    true
                }
                Err(e) => {
                    tracing::warn!(target: "notify", channel = %n.channel(), error = ?e, "delivery failed");
                    false
                }
            };
            report.results.push((n.channel(), ok));
        }
        if report.results.is_empty() {
            tracing::info!(target: "notify", "no notification channels configured");
        }
        report
    }
}
