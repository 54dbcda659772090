// src/api.rs
//! Read-only HTTP surface for `serve`: health, a batch preview per
//! channel, and `/metrics`.

use std::sync::Arc;

use anyhow::Result;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::analyze::HotReloadKeywords;
use crate::batch::Batch;
use crate::config::AppConfig;
use crate::metrics::Metrics;
use crate::mode::ReportMode;
use crate::pipeline::preview_batches;
use crate::render::Channel;
use crate::snapshot::SnapshotStore;

#[derive(Clone)]
pub struct AppState {
    cfg: Arc<AppConfig>,
    store: Arc<SnapshotStore>,
    keywords: Arc<HotReloadKeywords>,
}

impl AppState {
    pub fn new(cfg: AppConfig, keywords: HotReloadKeywords) -> Result<Self> {
        let store = SnapshotStore::new(&cfg.app.output_dir, cfg.offset()?);
        Ok(Self {
            cfg: Arc::new(cfg),
            store: Arc::new(store),
            keywords: Arc::new(keywords),
        })
    }

    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }
}

pub fn router(state: AppState, metrics: Option<&Metrics>) -> Router {
    let app = Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/report", get(report))
        .with_state(state);
    match metrics {
        Some(m) => app.merge(m.router()),
        None => app,
    }
}

#[derive(Debug, Deserialize)]
struct ReportQuery {
    mode: Option<String>,
    channel: Option<String>,
}

#[derive(Debug, Serialize)]
struct ReportPreview {
    mode: ReportMode,
    channel: Channel,
    batches: Vec<Batch>,
}

async fn report(
    State(state): State<AppState>,
    Query(q): Query<ReportQuery>,
) -> Result<Json<ReportPreview>, (StatusCode, String)> {
    let bad = |e: String| (StatusCode::BAD_REQUEST, e);
    let mode = match q.mode.as_deref() {
        Some(m) => m.parse::<ReportMode>().map_err(|e| bad(e.to_string()))?,
        None => state.cfg.report.mode,
    };
    let channel = match q.channel.as_deref() {
        Some(c) => c.parse::<Channel>().map_err(bad)?,
        None => Channel::Ntfy,
    };

    let rules = state.keywords.current();
    let now = state.store.now();
    let batches = preview_batches(&state.store, &state.cfg, &rules, now, mode, channel).map_err(|e| {
        tracing::warn!(target: "api", error = ?e, "preview failed");
        (StatusCode::INTERNAL_SERVER_ERROR, format!("{e:#}"))
    })?;
    Ok(Json(ReportPreview {
        mode,
        channel,
        batches,
    }))
}
