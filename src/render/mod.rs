// src/render/mod.rs
//! Per-channel markup.
//!
//! Every destination implements [`ChannelRenderer`]; the batch formatter
//! only ever talks to the trait, so adding a channel means adding one impl.

pub mod channels;
pub mod display;
pub mod html;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::analyze::ScoredTitle;
use crate::mode::ReportMode;
use crate::report::ReportData;

pub use channels::{DingTalkRenderer, FeishuRenderer, NtfyRenderer, TelegramRenderer, WeWorkRenderer};
pub use display::{format_rank_display, format_time_display};
pub use html::HtmlRenderer;

pub const DEFAULT_FEISHU_SEPARATOR: &str = "━━━━━━━━━━━━━━━━━━━";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Feishu,
    DingTalk,
    WeWork,
    Telegram,
    Ntfy,
    Email,
}

impl Channel {
    pub const ALL: [Channel; 6] = [
        Channel::Feishu,
        Channel::DingTalk,
        Channel::WeWork,
        Channel::Telegram,
        Channel::Ntfy,
        Channel::Email,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Channel::Feishu => "feishu",
            Channel::DingTalk => "dingtalk",
            Channel::WeWork => "wework",
            Channel::Telegram => "telegram",
            Channel::Ntfy => "ntfy",
            Channel::Email => "email",
        }
    }

    /// Payload limit in bytes when the configuration doesn't override it.
    pub fn default_max_bytes(self) -> usize {
        match self {
            Channel::DingTalk => 20_000,
            Channel::Feishu => 29_000,
            Channel::Ntfy => 3_800,
            _ => 4_000,
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Channel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Channel::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown channel {s:?}"))
    }
}

/// Values shared by every header/footer of one report.
#[derive(Debug, Clone)]
pub struct RenderContext {
    pub now: DateTime<FixedOffset>,
    pub mode: ReportMode,
    /// Titles across all stats (the "Total News" figure).
    pub total_titles: usize,
}

impl RenderContext {
    pub fn new(now: DateTime<FixedOffset>, mode: ReportMode, report: &ReportData) -> Self {
        Self {
            now,
            mode,
            total_titles: report.stats.iter().map(|s| s.titles.len()).sum(),
        }
    }

    pub fn timestamp(&self) -> String {
        self.now.format("%Y-%m-%d %H:%M:%S").to_string()
    }
}

/// Structural headers the formatter asks for.
#[derive(Debug, Clone, Copy)]
pub enum Section<'a> {
    Stats,
    /// 1-based `index` out of `total` groups.
    Group {
        index: usize,
        total: usize,
        word: &'a str,
        count: usize,
    },
    Novelty { total: usize },
    Source { name: &'a str, count: usize },
    Failed,
}

/// How a single title line is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineOptions {
    pub show_source: bool,
    pub mark_new: bool,
}

impl LineOptions {
    /// Stats rows: source tag and 🆕 marker.
    pub const STATS: LineOptions = LineOptions {
        show_source: true,
        mark_new: true,
    };
    /// Novelty rows sit under their source header and are all new anyway.
    pub const NOVELTY: LineOptions = LineOptions {
        show_source: false,
        mark_new: false,
    };
}

fn group_icon(count: usize) -> &'static str {
    if count >= 10 {
        "🔥"
    } else if count >= 5 {
        "📈"
    } else {
        "📌"
    }
}

/// Section headers in the common markdown flavour; `lead` opens the
/// novelty and failed sections.
pub(crate) fn markdown_header(section: Section<'_>, lead: &str) -> String {
    match section {
        Section::Stats => "📊 **Trending Keywords Stats**\n\n".to_string(),
        Section::Group {
            index,
            total,
            word,
            count,
        } => {
            let icon = group_icon(count);
            if count >= 5 {
                format!("{icon} [{index}/{total}] **{word}** : **{count}** items\n\n")
            } else {
                format!("{icon} [{index}/{total}] **{word}** : {count} items\n\n")
            }
        }
        Section::Novelty { total } => {
            format!("{lead}🆕 **New Trending News** (Total {total} items)\n\n")
        }
        Section::Source { name, count } => format!("**{name}** ({count} items):\n\n"),
        Section::Failed => format!("{lead}⚠️ **Platforms Failed to Fetch:**\n\n"),
    }
}

pub(crate) fn empty_notice_text(mode: ReportMode) -> &'static str {
    match mode {
        ReportMode::Incremental => "No new matching trending keywords in incremental mode",
        ReportMode::Current => "No matching trending keywords in current ranking mode",
        ReportMode::Daily => "No matching trending keywords",
    }
}

/// Markup for one destination.
///
/// The defaults produce the common markdown flavour (`**bold**`,
/// `[title](url)`); channels override only what differs.
pub trait ChannelRenderer: Send + Sync {
    fn channel(&self) -> Channel;

    fn header(&self, ctx: &RenderContext) -> String {
        format!("**Total News:** {}\n\n", ctx.total_titles)
    }

    fn footer(&self, ctx: &RenderContext) -> String {
        format!("\n\n> Updated: {}", ctx.timestamp())
    }

    /// Break placed between groups and before the novelty/failed sections.
    fn separator(&self) -> String {
        "\n\n".to_string()
    }

    fn header_for(&self, section: Section<'_>) -> String {
        markdown_header(section, &self.separator())
    }

    fn failed_line(&self, id: &str) -> String {
        format!("  • {id}\n")
    }

    fn empty_notice(&self, mode: ReportMode) -> String {
        format!("📭 {}\n\n", empty_notice_text(mode))
    }

    /// Markers wrapped around a hot rank (`min rank <= threshold`).
    fn emphasis(&self) -> (&'static str, &'static str) {
        ("**", "**")
    }

    fn link_title(&self, title: &str, link: Option<&str>) -> String {
        match link {
            Some(url) => format!("[{title}]({url})"),
            None => title.to_string(),
        }
    }

    fn source_tag(&self, name: &str) -> String {
        format!("[{name}]")
    }

    fn time_suffix(&self, time: &str) -> String {
        format!(" - {time}")
    }

    fn count_suffix(&self, count: u32) -> String {
        format!(" ({count} times)")
    }

    /// One title, without the `  N. ` list prefix.
    fn render_title(&self, t: &ScoredTitle, opts: LineOptions) -> String {
        let mut out = String::new();
        if opts.show_source {
            out.push_str(&self.source_tag(&t.source_name));
            out.push(' ');
        }
        if opts.mark_new && t.is_new {
            out.push_str("🆕 ");
        }
        out.push_str(&self.link_title(&crate::snapshot::clean_title(&t.title), t.link()));

        let rank = format_rank_display(&t.ranks, t.rank_threshold, self.emphasis());
        if !rank.is_empty() {
            out.push(' ');
            out.push_str(&rank);
        }
        let time = format_time_display(&t.first_time, &t.last_time);
        if !time.is_empty() {
            out.push_str(&self.time_suffix(&time));
        }
        if t.count > 1 {
            out.push_str(&self.count_suffix(t.count));
        }
        out
    }

    fn batch_label(&self, index: usize, total: usize) -> String {
        format!("**[Batch {index}/{total}]**\n\n")
    }

    /// Label a payload of a multi-batch report. Prepends by default.
    fn apply_batch_label(&self, text: &str, index: usize, total: usize) -> String {
        format!("{}{text}", self.batch_label(index, total))
    }

    /// Upper bound of the bytes `apply_batch_label` may add to any batch
    /// of a `total`-batch report.
    fn batch_label_reserve(&self, total: usize) -> usize {
        self.batch_label(total, total).len() + 1
    }
}

/// A renderer plus the byte budget of its payloads.
#[derive(Clone)]
pub struct ChannelProfile {
    pub renderer: Arc<dyn ChannelRenderer>,
    pub max_bytes: usize,
}

impl fmt::Debug for ChannelProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelProfile")
            .field("channel", &self.renderer.channel())
            .field("max_bytes", &self.max_bytes)
            .finish()
    }
}

impl ChannelProfile {
    pub fn new(renderer: Arc<dyn ChannelRenderer>, max_bytes: usize) -> Self {
        Self { renderer, max_bytes }
    }

    /// Built-in renderer for `channel` with an optional size override.
    pub fn for_channel(channel: Channel, max_bytes: Option<usize>, feishu_separator: &str) -> Self {
        let renderer: Arc<dyn ChannelRenderer> = match channel {
            Channel::Feishu => Arc::new(FeishuRenderer::new(feishu_separator)),
            Channel::DingTalk => Arc::new(DingTalkRenderer),
            Channel::WeWork => Arc::new(WeWorkRenderer),
            Channel::Email => Arc::new(HtmlRenderer),
            Channel::Telegram => Arc::new(TelegramRenderer),
            Channel::Ntfy => Arc::new(NtfyRenderer),
        };
        Self {
            renderer,
            max_bytes: max_bytes.unwrap_or_else(|| channel.default_max_bytes()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_names_round_trip_and_limits() {
        for c in Channel::ALL {
            assert_eq!(c.as_str().parse::<Channel>().unwrap(), c);
        }
        assert_eq!("DingTalk".parse::<Channel>().unwrap(), Channel::DingTalk);
        assert!("slack".parse::<Channel>().is_err());
        assert_eq!(Channel::Ntfy.default_max_bytes(), 3800);
        assert_eq!(Channel::Telegram.default_max_bytes(), 4000);
    }

    #[test]
    fn profile_override_wins() {
        let p = ChannelProfile::for_channel(Channel::Feishu, Some(1000), "---");
        assert_eq!(p.max_bytes, 1000);
        let p = ChannelProfile::for_channel(Channel::Feishu, None, "---");
        assert_eq!(p.max_bytes, 29_000);
        assert_eq!(p.renderer.channel(), Channel::Feishu);
    }

    #[test]
    fn group_icons_follow_count() {
        assert_eq!(group_icon(12), "🔥");
        assert_eq!(group_icon(5), "📈");
        assert_eq!(group_icon(4), "📌");
    }
}
