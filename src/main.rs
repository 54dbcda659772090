//! trend-digest: crawl ranked-title feeds, fold the day and push digests.
//!
//! `run` does one crawl round and report, `report` previews the batches a
//! channel would get from what is stored, `serve` exposes the same preview
//! over HTTP together with `/metrics`.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use trend_digest::analyze::{load_keywords, HotReloadKeywords};
use trend_digest::api::{self, AppState};
use trend_digest::config::AppConfig;
use trend_digest::metrics::Metrics;
use trend_digest::mode::ReportMode;
use trend_digest::pipeline::{preview_batches, Pipeline};
use trend_digest::render::Channel;
use trend_digest::snapshot::SnapshotStore;

#[derive(Parser, Debug)]
#[command(name = "trend-digest", about = "Trending-title ledger and digest pusher")]
struct Cli {
    /// Config file; falls back to CONFIG_PATH, then config/config.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Keyword rules; falls back to FREQUENCY_WORDS_PATH, then config/frequency_words.txt
    #[arg(long, global = true)]
    keywords: Option<PathBuf>,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Crawl once, store the snapshot, report and push (default)
    Run,
    /// Print the batches a channel would receive for today's snapshots
    Report {
        #[arg(long)]
        mode: Option<ReportMode>,
        #[arg(long, default_value = "ntfy")]
        channel: Channel,
    },
    /// HTTP preview surface
    Serve {
        #[arg(long, default_value = "127.0.0.1:8080")]
        addr: String,
    },
}

/// `RUST_LOG` filter (default `trend_digest=info,warn`); `LOG_FORMAT=json`
/// switches to JSON lines.
fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("trend_digest=info,warn"));
    let json = std::env::var("LOG_FORMAT")
        .ok()
        .is_some_and(|v| v.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer().compact()).init();
    }
}

fn load_config(path: Option<&PathBuf>) -> Result<AppConfig> {
    match path {
        Some(p) => {
            let mut cfg = AppConfig::load_from(p)?;
            trend_digest::config::apply_env_overrides(&mut cfg)?;
            Ok(cfg)
        }
        None => AppConfig::load_default(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    init_tracing();

    let cli = Cli::parse();
    let cfg = load_config(cli.config.as_ref())?;
    let keywords = cli.keywords.as_deref();

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => {
            let pipeline = Pipeline::from_config(cfg, keywords)?;
            let outcome = pipeline.run().await?;
            tracing::info!(
                snapshot = ?outcome.snapshot_id,
                html = outcome.html.len(),
                skipped = ?outcome.skipped,
                delivered = ?outcome.delivery.as_ref().map(|d| &d.results),
                "run finished"
            );
        }
        Command::Report { mode, channel } => {
            let rules = load_keywords(keywords)?;
            let store = SnapshotStore::new(&cfg.app.output_dir, cfg.offset()?);
            let mode = mode.unwrap_or(cfg.report.mode);
            let batches = preview_batches(&store, &cfg, &rules, store.now(), mode, channel)?;
            let total = batches.len();
            for (i, b) in batches.iter().enumerate() {
                println!("----- batch {}/{} ({} bytes{}) -----", i + 1, total, b.len(), if b.oversized { ", oversized" } else { "" });
                println!("{}", b.text);
            }
        }
        Command::Serve { addr } => {
            let metrics = Metrics::init()?;
            let state = AppState::new(cfg, HotReloadKeywords::new(keywords))?;
            let app = api::router(state, Some(&metrics));
            let listener = tokio::net::TcpListener::bind(&addr)
                .await
                .with_context(|| format!("binding {addr}"))?;
            tracing::info!(%addr, "serving");
            axum::serve(listener, app).await.context("http server")?;
        }
    }
    Ok(())
}
