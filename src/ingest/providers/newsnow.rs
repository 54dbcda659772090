// src/ingest/providers/newsnow.rs
use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use rand::Rng;
use serde::Deserialize;

use crate::ingest::types::SourceProvider;
use crate::snapshot::{clean_title, TitleMap, TitleObservation};

pub const DEFAULT_API_BASE: &str = "https://newsnow.busiyi.world/api/s";

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

#[derive(Debug, Deserialize)]
struct ApiResponse {
    status: Option<String>,
    #[serde(default)]
    items: Vec<ApiItem>,
}

#[derive(Debug, Deserialize)]
struct ApiItem {
    title: String,
    #[serde(default)]
    url: Option<String>,
    #[serde(rename = "mobileUrl", default)]
    mobile_url: Option<String>,
    #[serde(default)]
    extra: Option<Extra>,
}

#[derive(Debug, Deserialize)]
struct Extra {
    #[serde(default)]
    hover: Option<String>,
}

/// Decode one `?id=..&latest` response body. Only `success` and `cache`
/// are usable; a title listed twice collects both ranks.
pub fn decode_items(body: &str) -> Result<TitleMap> {
    let resp: ApiResponse = serde_json::from_str(body).context("parsing feed json")?;
    match resp.status.as_deref() {
        Some("success") | Some("cache") => {}
        other => bail!("abnormal response status: {}", other.unwrap_or("unknown")),
    }

    let mut out = TitleMap::new();
    for (i, item) in resp.items.into_iter().enumerate() {
        let rank = i as u32 + 1;
        if clean_title(&item.title).is_empty() {
            continue;
        }
        let summary = item.extra.and_then(|e| e.hover).unwrap_or_default();
        if let Some(seen) = out.get_mut(&item.title) {
            seen.ranks.push(rank);
            if seen.summary.is_none() && !summary.is_empty() {
                seen.summary = Some(summary);
            }
            continue;
        }
        let obs = TitleObservation::ranked(rank)
            .with_url(item.url.unwrap_or_default())
            .with_mobile_url(item.mobile_url.unwrap_or_default())
            .with_summary(summary);
        out.insert(item.title, obs);
    }
    Ok(out)
}

/// Retries after the first attempt, with a jittered back-off.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub min_wait: Duration,
    pub max_wait: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            min_wait: Duration::from_secs(3),
            max_wait: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            min_wait: Duration::ZERO,
            max_wait: Duration::ZERO,
        }
    }

    /// Wait before retry number `retry` (1-based): uniform in
    /// `[min, max]`, plus 1–2 s for every retry after the first.
    pub fn backoff(&self, retry: u32) -> Duration {
        let mut rng = rand::rng();
        let base = if self.max_wait > self.min_wait {
            rng.random_range(self.min_wait..=self.max_wait)
        } else {
            self.min_wait
        };
        let extra: Duration = (1..retry)
            .map(|_| Duration::from_secs_f64(rng.random_range(1.0..=2.0)))
            .sum();
        base + extra
    }
}

enum Mode {
    Fixture(String),
    Http { client: reqwest::Client, url: String },
}

/// newsnow-style aggregator endpoint, one instance per source id.
pub struct NewsNowProvider {
    id: String,
    name: String,
    mode: Mode,
    retry: RetryPolicy,
}

impl NewsNowProvider {
    pub fn new(
        api_base: &str,
        id: impl Into<String>,
        name: Option<&str>,
        proxy: Option<&str>,
    ) -> Result<Self> {
        let id = id.into();
        let builder = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .user_agent(USER_AGENT);
        let builder = match proxy {
            Some(p) => builder.proxy(reqwest::Proxy::all(p).context("invalid proxy url")?),
            None => builder.no_proxy(),
        };
        let client = builder.build().context("building http client")?;
        let url = format!("{}?id={}&latest", api_base.trim_end_matches('/'), id);
        Ok(Self::with_mode(id, name, Mode::Http { client, url }))
    }

    /// Serves a fixed body; no retries.
    pub fn from_fixture(id: &str, name: Option<&str>, body: &str) -> Self {
        Self::with_mode(id.to_string(), name, Mode::Fixture(body.to_string()))
            .with_retry(RetryPolicy::none())
    }

    fn with_mode(id: String, name: Option<&str>, mode: Mode) -> Self {
        let name = name
            .filter(|n| !n.trim().is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| id.clone());
        Self {
            id,
            name,
            mode,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    async fn fetch_once(&self) -> Result<TitleMap> {
        match &self.mode {
            Mode::Fixture(body) => decode_items(body),
            Mode::Http { client, url } => {
                let body = client
                    .get(url)
                    .header("Accept", "application/json, text/plain, */*")
                    .header("Cache-Control", "no-cache")
                    .send()
                    .await
                    .with_context(|| format!("GET {url}"))?
                    .error_for_status()?
                    .text()
                    .await?;
                decode_items(&body)
            }
        }
    }
}

#[async_trait]
impl SourceProvider for NewsNowProvider {
    async fn fetch_latest(&self) -> Result<TitleMap> {
        let mut retries = 0;
        loop {
            match self.fetch_once().await {
                Ok(titles) => return Ok(titles),
                Err(e) if retries < self.retry.max_retries => {
                    retries += 1;
                    let wait = self.retry.backoff(retries);
                    tracing::warn!(
                        target: "ingest",
                        source = %self.id,
                        error = %e,
                        wait_ms = wait.as_millis() as u64,
                        "fetch failed, retrying"
                    );
                    tokio::time::sleep(wait).await;
                }
                Err(e) => return Err(e.context(format!("fetching {}", self.id))),
            }
        }
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_titles_collect_ranks_and_first_summary() {
        let body = r#"{"status":"cache","items":[
            {"title":"x","url":"https://a/x","mobileUrl":""},
            {"title":"y","extra":{"hover":"about y"}},
            {"title":"x","extra":{"hover":"late"}}
        ]}"#;
        let m = decode_items(body).unwrap();
        assert_eq!(m.keys().collect::<Vec<_>>(), vec!["x", "y"]);
        let x = m.get("x").unwrap();
        assert_eq!(x.ranks, vec![1, 3]);
        assert_eq!(x.url.as_deref(), Some("https://a/x"));
        assert_eq!(x.mobile_url, None);
        assert_eq!(x.summary.as_deref(), Some("late"));
        assert_eq!(m.get("y").unwrap().summary.as_deref(), Some("about y"));
    }

    #[test]
    fn blank_titles_are_skipped_without_shifting_ranks() {
        let body = r#"{"status":"success","items":[
            {"title":"  
 "},
            {"title":"real"}
        ]}"#;
        let m = decode_items(body).unwrap();
        assert_eq!(m.len(), 1);
        assert_eq!(m.get("real").unwrap().ranks, vec![2]);
    }

    #[test]
    fn bad_status_and_bad_json_are_errors() {
        assert!(decode_items(r#"{"status":"error"}"#).is_err());
        assert!(decode_items(r#"{"items":[]}"#).is_err());
        assert!(decode_items("<html>").is_err());
    }

    #[test]
    fn backoff_grows_per_retry() {
        let p = RetryPolicy::default();
        for _ in 0..50 {
            let first = p.backoff(1);
            assert!(first >= Duration::from_secs(3) && first <= Duration::from_secs(5));
            let second = p.backoff(2);
            assert!(second >= Duration::from_secs(4) && second <= Duration::from_secs(7));
        }
        assert_eq!(RetryPolicy::none().backoff(1), Duration::ZERO);
    }

    #[test]
    fn name_falls_back_to_id() {
        let p = NewsNowProvider::from_fixture("zhihu", Some("  "), "{}");
        assert_eq!(p.name(), "zhihu");
    }
}
