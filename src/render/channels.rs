//! Webhook chat channels.

use super::{group_icon, markdown_header, Channel, ChannelRenderer, RenderContext, Section};

/// Feishu card text: grey/red `<font>` accents and a configurable rule line.
#[derive(Debug, Clone)]
pub struct FeishuRenderer {
    separator: String,
}

impl FeishuRenderer {
    pub fn new(separator: impl Into<String>) -> Self {
        Self {
            separator: separator.into(),
        }
    }
}

impl ChannelRenderer for FeishuRenderer {
    fn channel(&self) -> Channel {
        Channel::Feishu
    }

    fn header(&self, _ctx: &RenderContext) -> String {
        String::new()
    }

    fn footer(&self, ctx: &RenderContext) -> String {
        format!("\n\n<font color='grey'>Updated: {}</font>", ctx.timestamp())
    }

    fn separator(&self) -> String {
        format!("\n{}\n\n", self.separator)
    }

    fn header_for(&self, section: Section<'_>) -> String {
        match section {
            Section::Group {
                index,
                total,
                word,
                count,
            } => {
                let seq = format!("<font color='grey'>[{index}/{total}]</font>");
                let n = match count {
                    c if c >= 10 => format!("<font color='red'>{c}</font>"),
                    c if c >= 5 => format!("<font color='orange'>{c}</font>"),
                    c => c.to_string(),
                };
                format!("{} {seq} **{word}** : {n} items\n\n", group_icon(count))
            }
            other => markdown_header(other, &self.separator()),
        }
    }

    fn failed_line(&self, id: &str) -> String {
        format!("  • <font color='red'>{id}</font>\n")
    }

    fn emphasis(&self) -> (&'static str, &'static str) {
        ("<font color='red'>**", "**</font>")
    }

    fn source_tag(&self, name: &str) -> String {
        format!("<font color='grey'>[{name}]</font>")
    }

    fn time_suffix(&self, time: &str) -> String {
        format!(" <font color='grey'>- {time}</font>")
    }

    fn count_suffix(&self, count: u32) -> String {
        format!(" <font color='green'>({count} times)</font>")
    }

    /// Placed right after the stats header when there is one.
    fn apply_batch_label(&self, text: &str, index: usize, total: usize) -> String {
        let label = self.batch_label(index, total);
        let stats = "📊 **Trending Keywords Stats**\n\n";
        if text.contains(stats) {
            text.replacen(stats, &format!("📊 **Trending Keywords Stats** {label}"), 1)
        } else {
            format!("{label}{text}")
        }
    }
}

/// DingTalk markdown: a metadata header and `---` rules.
#[derive(Debug, Clone, Copy, Default)]
pub struct DingTalkRenderer;

impl ChannelRenderer for DingTalkRenderer {
    fn channel(&self) -> Channel {
        Channel::DingTalk
    }

    fn header(&self, ctx: &RenderContext) -> String {
        format!(
            "**Total News:** {}\n\n**Time:** {}\n\n**Type:** Trending Analysis Report\n\n---\n\n",
            ctx.total_titles,
            ctx.timestamp()
        )
    }

    fn separator(&self) -> String {
        "\n---\n\n".to_string()
    }

    fn failed_line(&self, id: &str) -> String {
        format!("  • **{id}**\n")
    }

    fn apply_batch_label(&self, text: &str, index: usize, total: usize) -> String {
        let label = self.batch_label(index, total);
        let stats = "📊 **Trending Keywords Stats**\n\n";
        if text.contains(stats) {
            text.replacen(stats, &format!("📊 **Trending Keywords Stats** {label}"), 1)
        } else {
            format!("{label}{text}")
        }
    }
}

/// WeCom (WeWork) group robot markdown.
#[derive(Debug, Clone, Copy, Default)]
pub struct WeWorkRenderer;

impl ChannelRenderer for WeWorkRenderer {
    fn channel(&self) -> Channel {
        Channel::WeWork
    }

    fn header(&self, ctx: &RenderContext) -> String {
        format!("**Total News:** {}\n\n\n\n", ctx.total_titles)
    }

    fn footer(&self, ctx: &RenderContext) -> String {
        format!("\n\n\n> Updated: {}", ctx.timestamp())
    }

    fn separator(&self) -> String {
        "\n\n\n\n".to_string()
    }
}

/// Telegram Bot API with `parse_mode = HTML`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TelegramRenderer;

impl ChannelRenderer for TelegramRenderer {
    fn channel(&self) -> Channel {
        Channel::Telegram
    }

    fn header(&self, ctx: &RenderContext) -> String {
        format!("Total News: {}\n\n", ctx.total_titles)
    }

    fn footer(&self, ctx: &RenderContext) -> String {
        format!("\n\nUpdated: {}", ctx.timestamp())
    }

    fn header_for(&self, section: Section<'_>) -> String {
        match section {
            Section::Stats => "📊 Trending Keywords Stats\n\n".to_string(),
            Section::Group {
                index,
                total,
                word,
                count,
            } => format!(
                "{} [{index}/{total}] {} : {count} items\n\n",
                group_icon(count),
                html_escape::encode_text(word)
            ),
            Section::Novelty { total } => format!(
                "{}🆕 New Trending News (Total {total} items)\n\n",
                self.separator()
            ),
            Section::Source { name, count } => {
                format!("{} ({count} items):\n\n", html_escape::encode_text(name))
            }
            Section::Failed => format!("{}⚠️ Platforms Failed to Fetch:\n\n", self.separator()),
        }
    }

    fn failed_line(&self, id: &str) -> String {
        format!("  • {}\n", html_escape::encode_text(id))
    }

    fn emphasis(&self) -> (&'static str, &'static str) {
        ("<b>", "</b>")
    }

    fn source_tag(&self, name: &str) -> String {
        format!("[{}]", html_escape::encode_text(name))
    }

    fn link_title(&self, title: &str, link: Option<&str>) -> String {
        match link {
            Some(url) => format!(
                "<a href=\"{}\">{}</a>",
                html_escape::encode_double_quoted_attribute(url),
                html_escape::encode_text(title)
            ),
            None => html_escape::encode_text(title).into_owned(),
        }
    }

    fn time_suffix(&self, time: &str) -> String {
        format!(" <code>- {time}</code>")
    }

    fn count_suffix(&self, count: u32) -> String {
        format!(" <code>({count} times)</code>")
    }

    fn batch_label(&self, index: usize, total: usize) -> String {
        format!("<b>[Batch {index}/{total}]</b>\n\n")
    }
}

/// ntfy markdown messages.
#[derive(Debug, Clone, Copy, Default)]
pub struct NtfyRenderer;

impl ChannelRenderer for NtfyRenderer {
    fn channel(&self) -> Channel {
        Channel::Ntfy
    }

    fn time_suffix(&self, time: &str) -> String {
        format!(" `- {time}`")
    }

    fn count_suffix(&self, count: u32) -> String {
        format!(" `({count} times)`")
    }
}
