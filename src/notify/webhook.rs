// src/notify/webhook.rs
//! JSON webhooks: feishu, dingtalk, wework and the Telegram Bot API.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use super::{BatchTransport, Outgoing};
use crate::error::DeliveryError;
use crate::render::Channel;

pub const TELEGRAM_API: &str = "https://api.telegram.org";

/// Shared client for outbound posts. Only the configured proxy is used;
/// `*_PROXY` environment variables are ignored.
pub fn http_client(proxy: Option<&str>) -> Result<Client> {
    let builder = Client::builder().timeout(Duration::from_secs(30));
    let builder = match proxy {
        Some(p) => builder.proxy(reqwest::Proxy::all(p).context("invalid proxy url")?),
        None => builder.no_proxy(),
    };
    builder.build().context("building http client")
}

#[derive(Debug, Clone)]
enum Kind {
    Feishu,
    DingTalk,
    WeWork,
    Telegram { chat_id: String },
}

#[derive(Debug, Clone)]
pub struct WebhookTransport {
    kind: Kind,
    url: String,
    client: Client,
}

impl WebhookTransport {
    pub fn feishu(url: &str, client: Client) -> Self {
        Self::new(Kind::Feishu, url.to_string(), client)
    }

    pub fn dingtalk(url: &str, client: Client) -> Self {
        Self::new(Kind::DingTalk, url.to_string(), client)
    }

    pub fn wework(url: &str, client: Client) -> Self {
        Self::new(Kind::WeWork, url.to_string(), client)
    }

    pub fn telegram(token: &str, chat_id: &str, client: Client) -> Self {
        Self::telegram_at(TELEGRAM_API, token, chat_id, client)
    }

    /// Same as [`WebhookTransport::telegram`] against another Bot API host.
    pub fn telegram_at(api_base: &str, token: &str, chat_id: &str, client: Client) -> Self {
        let url = format!("{}/bot{token}/sendMessage", api_base.trim_end_matches('/'));
        Self::new(
            Kind::Telegram {
                chat_id: chat_id.to_string(),
            },
            url,
            client,
        )
    }

    fn new(kind: Kind, url: String, client: Client) -> Self {
        Self { kind, url, client }
    }

    fn payload(&self, text: &str, out: &Outgoing<'_>) -> Value {
        match &self.kind {
            Kind::Feishu => json!({
                "msg_type": "text",
                "content": {
                    "total_titles": out.ctx.total_titles,
                    "timestamp": out.ctx.timestamp(),
                    "report_type": out.report_type(),
                    "text": text,
                }
            }),
            Kind::DingTalk => json!({
                "msgtype": "markdown",
                "markdown": {
                    "title": format!("Trend Digest - {}", out.report_type()),
                    "text": text,
                }
            }),
            Kind::WeWork => json!({
                "msgtype": "markdown",
                "markdown": { "content": text }
            }),
            Kind::Telegram { chat_id } => json!({
                "chat_id": chat_id,
                "text": text,
                "parse_mode": "HTML",
                "disable_web_page_preview": true,
            }),
        }
    }

    /// The body of an HTTP 200 still has to say yes.
    fn accepted(&self, body: &Value) -> std::result::Result<(), String> {
        let ok = match self.kind {
            Kind::Feishu => {
                body.get("StatusCode").and_then(Value::as_i64) == Some(0)
                    || body.get("code").and_then(Value::as_i64) == Some(0)
            }
            Kind::DingTalk | Kind::WeWork => body.get("errcode").and_then(Value::as_i64) == Some(0),
            Kind::Telegram { .. } => body.get("ok").and_then(Value::as_bool) == Some(true),
        };
        if ok {
            return Ok(());
        }
        let msg = ["msg", "errmsg", "description", "StatusMessage"]
            .iter()
            .find_map(|k| body.get(*k).and_then(Value::as_str))
            .map(str::to_string)
            .unwrap_or_else(|| body.to_string());
        Err(msg)
    }
}

#[async_trait]
impl BatchTransport for WebhookTransport {
    fn channel(&self) -> Channel {
        match self.kind {
            Kind::Feishu => Channel::Feishu,
            Kind::DingTalk => Channel::DingTalk,
            Kind::WeWork => Channel::WeWork,
            Kind::Telegram { .. } => Channel::Telegram,
        }
    }

    async fn post(&self, text: &str, index: usize, total: usize, out: &Outgoing<'_>) -> Result<()> {
        let channel = self.channel().as_str();
        let rsp = self
            .client
            .post(&self.url)
            .json(&self.payload(text, out))
            .send()
            .await
            .with_context(|| format!("{channel} post"))?;

        let status = rsp.status();
        if status != reqwest::StatusCode::OK {
            return Err(DeliveryError::Status {
                channel,
                index,
                total,
                status: status.as_u16(),
            }
            .into());
        }
        let body: Value = rsp.json().await.with_context(|| format!("{channel} response body"))?;
        self.accepted(&body).map_err(|message| {
            DeliveryError::Rejected {
                channel,
                index,
                total,
                message,
            }
            .into()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mode::ReportMode;
    use crate::render::RenderContext;
    use crate::report::ReportData;
    use chrono::{FixedOffset, TimeZone};

    fn t(kind: Kind) -> WebhookTransport {
        WebhookTransport::new(kind, "http://localhost/hook".into(), Client::new())
    }

    #[test]
    fn payload_shapes() {
        let r = ReportData::default();
        let now = FixedOffset::east_opt(8 * 3600).unwrap().with_ymd_and_hms(2025, 10, 1, 9, 30, 0).unwrap();
        let ctx = RenderContext::new(now, ReportMode::Current, &r);
        let out = Outgoing { report: &r, ctx: &ctx, is_summary: false };

        let p = t(Kind::Feishu).payload("hi", &out);
        assert_eq!(p["msg_type"], "text");
        assert_eq!(p["content"]["text"], "hi");
        assert_eq!(p["content"]["report_type"], "Realtime Current Ranking");
        assert_eq!(p["content"]["timestamp"], "2025-10-01 09:30:00");

        let p = t(Kind::WeWork).payload("hi", &out);
        assert_eq!(p["markdown"]["content"], "hi");

        let p = t(Kind::Telegram { chat_id: "42".into() }).payload("hi", &out);
        assert_eq!(p["parse_mode"], "HTML");
        assert_eq!(p["chat_id"], "42");
    }

    #[test]
    fn acceptance_per_channel() {
        assert!(t(Kind::Feishu).accepted(&json!({"code": 0})).is_ok());
        assert!(t(Kind::Feishu).accepted(&json!({"StatusCode": 0})).is_ok());
        assert_eq!(
            t(Kind::DingTalk).accepted(&json!({"errcode": 310000, "errmsg": "keywords not in content"})),
            Err("keywords not in content".to_string())
        );
        assert!(t(Kind::Telegram { chat_id: "1".into() }).accepted(&json!({"ok": true})).is_ok());
        assert!(t(Kind::Telegram { chat_id: "1".into() }).accepted(&json!({"ok": false})).is_err());
    }

    #[test]
    fn telegram_url_carries_token() {
        let w = WebhookTransport::telegram_at("http://127.0.0.1:9/", "T0K", "1", Client::new());
        assert_eq!(w.url, "http://127.0.0.1:9/botT0K/sendMessage");
        assert_eq!(w.channel(), Channel::Telegram);
    }
}
