// src/html.rs
//! Standalone HTML report: written next to the snapshots and used as the
//! e-mail body.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use crate::mode::ReportMode;
use crate::render::{ChannelRenderer, HtmlRenderer, LineOptions, RenderContext, Section};
use crate::report::ReportData;
use crate::snapshot::SnapshotStore;

const STYLE: &str = r#"
body { font-family: -apple-system, "Segoe UI", Roboto, sans-serif; background: #f3f4f6; color: #111827; margin: 0; }
.container { max-width: 760px; margin: 24px auto; background: #fff; border-radius: 12px; padding: 24px 32px; }
h1 { margin: 0 0 4px; font-size: 24px; }
.subtitle { color: #6b7280; margin-bottom: 20px; }
.stats-grid { display: flex; gap: 12px; margin-bottom: 24px; }
.stat-item { flex: 1; background: #f9fafb; border-radius: 8px; padding: 12px; text-align: center; }
.stat-value { display: block; font-size: 22px; font-weight: 700; }
.stat-label { color: #6b7280; font-size: 12px; }
.word-header { font-size: 16px; margin: 20px 0 8px; }
.count.hot { color: #ef4444; } .count.warm { color: #f59e0b; }
.news-list div, .news-list li { margin: 6px 0; line-height: 1.5; }
.news-link { color: #2563eb; text-decoration: none; }
.new-title { background: #fef9c3; border-radius: 4px; padding: 2px 4px; }
.failed-id { color: #ef4444; }
.updated { color: #9ca3af; font-size: 12px; margin-top: 24px; }
"#;

/// Report type shown in titles, subjects and webhook payloads.
pub fn report_heading(mode: ReportMode, is_summary: bool) -> &'static str {
    if is_summary {
        return mode.report_title();
    }
    match mode {
        ReportMode::Incremental => "Realtime Incremental",
        ReportMode::Current => "Realtime Current Ranking",
        ReportMode::Daily => "Realtime Analysis",
    }
}

pub fn render_html_report(report: &ReportData, ctx: &RenderContext, is_summary: bool) -> String {
    let r = HtmlRenderer;
    let heading = report_heading(ctx.mode, is_summary);
    let mut out = String::with_capacity(8 * 1024);

    let _ = write!(
        out,
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"UTF-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n\
         <title>Trend Digest - {heading}</title>\n<style>{STYLE}</style>\n</head>\n<body>\n\
         <div class=\"container\">\n<h1>{heading}</h1>\n<div class=\"subtitle\">{}</div>\n",
        ctx.now.format("%Y-%m-%d %H:%M")
    );

    let _ = write!(
        out,
        "<div class=\"stats-grid\">\n\
         <div class=\"stat-item\"><span class=\"stat-value\">{}</span><span class=\"stat-label\">Total News</span></div>\n\
         <div class=\"stat-item\"><span class=\"stat-value\">{}</span><span class=\"stat-label\">Keyword Groups</span></div>\n\
         <div class=\"stat-item\"><span class=\"stat-value\">{}</span><span class=\"stat-label\">New</span></div>\n\
         </div>\n",
        ctx.total_titles,
        report.stats.len(),
        report.novelty_total()
    );

    if report.is_empty() {
        out.push_str(&r.empty_notice(ctx.mode));
    }

    if !report.stats.is_empty() {
        out.push_str(&r.header_for(Section::Stats));
        let total = report.stats.len();
        for (i, stat) in report.stats.iter().enumerate() {
            out.push_str(&r.header_for(Section::Group {
                index: i + 1,
                total,
                word: &stat.word,
                count: stat.count,
            }));
            out.push_str("<ol class=\"news-list\">\n");
            for t in &stat.titles {
                let _ = writeln!(out, "<li>{}</li>", r.render_title(t, LineOptions::STATS));
            }
            out.push_str("</ol>\n");
        }
    }

    if !report.novelty.is_empty() {
        out.push_str(&r.header_for(Section::Novelty {
            total: report.novelty_total(),
        }));
        for section in &report.novelty {
            out.push_str(&r.header_for(Section::Source {
                name: &section.source_name,
                count: section.titles.len(),
            }));
            out.push_str("<ol class=\"news-list\">\n");
            for t in &section.titles {
                let _ = writeln!(out, "<li>{}</li>", r.render_title(t, LineOptions::NOVELTY));
            }
            out.push_str("</ol>\n");
        }
    }

    if !report.failed_sources.is_empty() {
        out.push_str(&r.header_for(Section::Failed));
        for id in &report.failed_sources {
            out.push_str(&r.failed_line(id));
        }
    }

    out.push_str(&r.footer(ctx));
    out.push_str("\n</div>\n</body>\n</html>\n");
    out
}

/// Plain-text fallback for the e-mail body.
pub fn render_plain_text(report: &ReportData, ctx: &RenderContext, is_summary: bool) -> String {
    let mut out = format!(
        "{}\n{}\n\n",
        report_heading(ctx.mode, is_summary),
        ctx.timestamp()
    );
    for stat in &report.stats {
        let _ = writeln!(out, "{} ({} items)", stat.word, stat.count);
        for (i, t) in stat.titles.iter().enumerate() {
            let _ = writeln!(out, "  {}. [{}] {}", i + 1, t.source_name, t.title);
        }
        out.push('\n');
    }
    for section in &report.novelty {
        let _ = writeln!(out, "New from {}:", section.source_name);
        for t in &section.titles {
            let _ = writeln!(out, "  - {}", t.title);
        }
    }
    if !report.failed_sources.is_empty() {
        let _ = writeln!(out, "\nFailed: {}", report.failed_sources.join(", "));
    }
    out
}

/// File name under `<day>/html/`: `HH-MM` for real-time runs, a fixed
/// name per mode for summaries.
pub fn report_file_name(mode: ReportMode, is_summary: bool, snapshot_id: &str) -> String {
    if !is_summary {
        return snapshot_id.to_string();
    }
    match mode {
        ReportMode::Current => "current_summary".to_string(),
        ReportMode::Incremental | ReportMode::Daily => "daily_summary".to_string(),
    }
}

/// Render and write the page; returns its path.
pub fn write_html_report(
    store: &SnapshotStore,
    day: &str,
    file_name: &str,
    report: &ReportData,
    ctx: &RenderContext,
    is_summary: bool,
) -> Result<PathBuf> {
    let path = store.html_path(day, file_name)?;
    write_page(&path, &render_html_report(report, ctx, is_summary))?;
    tracing::info!(target: "html", path = %path.display(), "html report written");
    Ok(path)
}

fn write_page(path: &Path, html: &str) -> Result<()> {
    fs::write(path, html).with_context(|| format!("writing html report {}", path.display()))
}

/// E-mail subject.
pub fn subject_line(mode: ReportMode, is_summary: bool, ctx: &RenderContext) -> String {
    format!(
        "Trend Digest {} - {}",
        report_heading(mode, is_summary),
        ctx.now.format("%m-%d %H:%M")
    )
}
