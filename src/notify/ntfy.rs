// src/notify/ntfy.rs
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};

use super::{BatchTransport, Outgoing};
use crate::error::DeliveryError;
use crate::render::Channel;

pub const DEFAULT_SERVER: &str = "https://ntfy.sh";

/// Plain-text markdown posts to `<server>/<topic>`.
#[derive(Debug, Clone)]
pub struct NtfyTransport {
    url: String,
    token: Option<String>,
    public_server: bool,
    rate_limit_backoff: Duration,
    client: Client,
}

impl NtfyTransport {
    pub fn new(server: &str, topic: &str, token: Option<String>, client: Client) -> Self {
        let base = server.trim_end_matches('/');
        let base = if base.starts_with("http://") || base.starts_with("https://") {
            base.to_string()
        } else {
            format!("https://{base}")
        };
        Self {
            url: format!("{base}/{topic}"),
            token: token.filter(|t| !t.is_empty()),
            public_server: server.contains("ntfy.sh"),
            rate_limit_backoff: Duration::from_secs(10),
            client,
        }
    }

    pub fn with_rate_limit_backoff(mut self, d: Duration) -> Self {
        self.rate_limit_backoff = d;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn send(&self, text: &str, title: &str) -> Result<StatusCode> {
        let mut req = self
            .client
            .post(&self.url)
            .header("Content-Type", "text/plain; charset=utf-8")
            .header("Markdown", "yes")
            .header("Title", title)
            .header("Priority", "default")
            .header("Tags", "news")
            .body(text.to_string());
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }
        let rsp = req.send().await.context("ntfy post")?;
        Ok(rsp.status())
    }
}

#[async_trait]
impl BatchTransport for NtfyTransport {
    fn channel(&self) -> Channel {
        Channel::Ntfy
    }

    async fn post(&self, text: &str, index: usize, total: usize, out: &Outgoing<'_>) -> Result<()> {
        let title = if total > 1 {
            format!("{} ({index}/{total})", out.report_type())
        } else {
            out.report_type().to_string()
        };

        let mut status = self.send(text, &title).await?;
        if status == StatusCode::TOO_MANY_REQUESTS {
            tracing::warn!(target: "notify", batch = index, total, "ntfy rate limited, retrying once");
            tokio::time::sleep(self.rate_limit_backoff).await;
            status = self.send(text, &title).await?;
        }
        match status {
            StatusCode::OK => Ok(()),
            StatusCode::PAYLOAD_TOO_LARGE => Err(DeliveryError::Rejected {
                channel: "ntfy",
                index,
                total,
                message: format!("payload too large ({} bytes)", text.len()),
            }
            .into()),
            s => Err(DeliveryError::Status {
                channel: "ntfy",
                index,
                total,
                status: s.as_u16(),
            }
            .into()),
        }
    }

    /// Clients list newest first, so the last batch goes out first.
    fn newest_first(&self) -> bool {
        true
    }

    fn partial_success(&self) -> bool {
        true
    }

    fn pause(&self, _configured: Duration) -> Duration {
        if self.public_server {
            Duration::from_secs(2)
        } else {
            Duration::from_secs(1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_and_pause_follow_server() {
        let t = NtfyTransport::new("ntfy.sh/", "news", Some(String::new()), Client::new());
        assert_eq!(t.url(), "https://ntfy.sh/news");
        assert!(t.token.is_none());
        assert_eq!(t.pause(Duration::ZERO), Duration::from_secs(2));

        let t = NtfyTransport::new("http://10.0.0.2:8080", "news", Some("tk".into()), Client::new());
        assert_eq!(t.url(), "http://10.0.0.2:8080/news");
        assert_eq!(t.pause(Duration::from_secs(9)), Duration::from_secs(1));
        assert!(t.newest_first());
    }
}
