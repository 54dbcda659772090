//! HTML fragments, used by the report page and the e-mail body.

use html_escape::{encode_double_quoted_attribute, encode_text};

use super::{
    empty_notice_text, format_rank_display, format_time_display, group_icon, Channel,
    ChannelRenderer, LineOptions, RenderContext, Section,
};
use crate::analyze::ScoredTitle;
use crate::mode::ReportMode;
use crate::snapshot::clean_title;

#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlRenderer;

impl ChannelRenderer for HtmlRenderer {
    fn channel(&self) -> Channel {
        Channel::Email
    }

    fn header(&self, ctx: &RenderContext) -> String {
        format!(
            "<div class=\"summary\">Total News: <strong>{}</strong></div>\n",
            ctx.total_titles
        )
    }

    fn footer(&self, ctx: &RenderContext) -> String {
        format!("\n<div class=\"updated\">Updated: {}</div>", ctx.timestamp())
    }

    fn separator(&self) -> String {
        "\n<hr>\n".to_string()
    }

    fn header_for(&self, section: Section<'_>) -> String {
        match section {
            Section::Stats => "<h2>📊 Trending Keywords Stats</h2>\n".to_string(),
            Section::Group {
                index,
                total,
                word,
                count,
            } => {
                let class = match count {
                    c if c >= 10 => "hot",
                    c if c >= 5 => "warm",
                    _ => "normal",
                };
                format!(
                    "<h3 class=\"word-header\">{} <span class=\"seq\">[{index}/{total}]</span> {} <span class=\"count {class}\">{count} items</span></h3>\n",
                    group_icon(count),
                    encode_text(word)
                )
            }
            Section::Novelty { total } => format!(
                "{}<h2>🆕 New Trending News <span class=\"count\">(Total {total} items)</span></h2>\n",
                self.separator()
            ),
            Section::Source { name, count } => {
                format!("<h3>{} ({count} items)</h3>\n", encode_text(name))
            }
            Section::Failed => format!(
                "{}<h2 class=\"failed\">⚠️ Platforms Failed to Fetch</h2>\n",
                self.separator()
            ),
        }
    }

    fn failed_line(&self, id: &str) -> String {
        format!("<div class=\"failed-id\">{}</div>\n", encode_text(id))
    }

    fn empty_notice(&self, mode: ReportMode) -> String {
        format!("<div class=\"empty\">📭 {}</div>\n", empty_notice_text(mode))
    }

    fn emphasis(&self) -> (&'static str, &'static str) {
        ("<font color='red'><strong>", "</strong></font>")
    }

    fn render_title(&self, t: &ScoredTitle, opts: LineOptions) -> String {
        let title = clean_title(&t.title);
        let title = encode_text(&title);
        let mut out = String::new();
        if opts.show_source {
            out.push_str(&format!("[{}] ", encode_text(&t.source_name)));
        }
        match t.link() {
            Some(url) => out.push_str(&format!(
                "<a href=\"{}\" target=\"_blank\" class=\"news-link\">{title}</a>",
                encode_double_quoted_attribute(url)
            )),
            None => out.push_str(&format!("<span class=\"no-link\">{title}</span>")),
        }

        let rank = format_rank_display(&t.ranks, t.rank_threshold, self.emphasis());
        if !rank.is_empty() {
            out.push(' ');
            out.push_str(&rank);
        }
        let time = format_time_display(&t.first_time, &t.last_time);
        if !time.is_empty() {
            out.push_str(&format!(" <font color='grey'>- {}</font>", encode_text(&time)));
        }
        if t.count > 1 {
            out.push_str(&format!(" <font color='green'>({} times)</font>", t.count));
        }
        if opts.mark_new && t.is_new {
            out = format!("<div class='new-title'>🆕 {out}</div>");
        }
        out
    }

    fn batch_label(&self, index: usize, total: usize) -> String {
        format!("<div class=\"batch\">[Batch {index}/{total}]</div>\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn title(url: Option<&str>) -> ScoredTitle {
        ScoredTitle {
            title: "A & B <script>".into(),
            source_id: "s".into(),
            source_name: "S<1>".into(),
            first_time: "08-00".into(),
            last_time: "08-00".into(),
            count: 1,
            ranks: vec![8],
            rank_threshold: 5,
            url: url.map(str::to_string),
            mobile_url: None,
            summary: None,
            weight: 0.0,
            is_new: true,
        }
    }

    #[test]
    fn escapes_everything_user_supplied() {
        let line = HtmlRenderer.render_title(&title(Some("https://x/?a=\"1\"")), LineOptions::STATS);
        assert!(line.starts_with("<div class='new-title'>🆕 [S&lt;1&gt;] "));
        assert!(line.contains("href=\"https://x/?a=&quot;1&quot;\""));
        assert!(line.contains(">A &amp; B &lt;script&gt;</a>"));
        assert!(line.contains(" [8] <font color='grey'>- 08:00</font>"));
        assert!(!line.contains("times"));
    }

    #[test]
    fn unlinked_title_is_a_span() {
        let line = HtmlRenderer.render_title(&title(None), LineOptions::NOVELTY);
        assert!(line.starts_with("<span class=\"no-link\">"));
        assert!(!line.contains("new-title"));
    }
}
