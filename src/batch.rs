// src/batch.rs
//! # Batch formatter
//! Packs a `ReportData` into channel payloads that each stay within the
//! channel's byte budget (UTF-8 bytes, footer included).
//!
//! Layout of the packed stream:
//!
//! ```text
//! stats header
//!   [group header + line 1]   atomic
//!   line 2 .. line n          one by one
//!   separator                 dropped if it doesn't fit
//! novelty header
//!   [source header + line 1]  atomic
//!   line 2 .. line n
//! failed header
//!   one line per failed source
//! ```
//!
//! When a piece doesn't fit, the current batch is closed and the next one
//! opens with the channel header, the section headers the piece belongs
//! under, and the piece itself. A piece too large even for an empty batch
//! is emitted on its own and flagged `oversized`.
//!
//! Payloads of a multi-batch report get a `[Batch i/n]` label. The budget
//! keeps room for the widest label of the final count, so the report is
//! packed again whenever a pass ends with a count that needs more digits
//! than the room it was packed with.

use metrics::counter;
use serde::Serialize;
use tracing::{debug, warn};

use crate::render::{ChannelProfile, ChannelRenderer, LineOptions, RenderContext, Section};
use crate::report::ReportData;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Batch {
    pub text: String,
    /// A single unit larger than the budget; sent as-is rather than dropped.
    pub oversized: bool,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

struct Packer {
    header: String,
    footer: String,
    budget: usize,
    current: String,
    has_content: bool,
    oversized: bool,
    out: Vec<Batch>,
    /// Byte size of every unit that overflowed an empty batch.
    overflows: Vec<usize>,
}

impl Packer {
    fn new(header: String, footer: String, budget: usize) -> Self {
        Self {
            current: header.clone(),
            header,
            footer,
            budget,
            has_content: false,
            oversized: false,
            out: Vec::new(),
            overflows: Vec::new(),
        }
    }

    fn fits_with(&self, prefix: &str, unit: &str) -> bool {
        prefix.len() + unit.len() + self.footer.len() <= self.budget
    }

    /// Append `unit`; if it doesn't fit, start a new batch with `context`
    /// (the section headers `unit` sits under) ahead of it.
    fn push(&mut self, unit: &str, context: &str) {
        if self.fits_with(&self.current, unit) {
            self.current.push_str(unit);
            self.has_content = true;
            return;
        }
        if self.has_content {
            self.close();
        }

        let seeded = format!("{}{context}", self.header);
        self.current = if self.fits_with(&seeded, unit) {
            seeded + unit
        } else {
            let bare = format!("{}{unit}", self.header);
            if bare.len() + self.footer.len() > self.budget {
                self.oversized = true;
                self.overflows.push(bare.len() + self.footer.len());
            }
            bare
        };
        self.has_content = true;
    }

    /// Optional decoration (separators): appended only when it fits.
    fn push_if_fits(&mut self, unit: &str) {
        if self.fits_with(&self.current, unit) {
            self.current.push_str(unit);
        }
    }

    fn close(&mut self) {
        let mut text = std::mem::replace(&mut self.current, self.header.clone());
        text.push_str(&self.footer);
        self.out.push(Batch {
            text,
            oversized: self.oversized,
        });
        self.oversized = false;
        self.has_content = false;
    }

    fn finish(mut self) -> (Vec<Batch>, Vec<usize>) {
        if self.has_content {
            self.close();
        }
        (self.out, self.overflows)
    }
}

/// Numbered list lines; stats rows are spaced by a blank line.
fn lines<'t>(
    r: &'t dyn ChannelRenderer,
    titles: &'t [crate::analyze::ScoredTitle],
    opts: LineOptions,
    spaced: bool,
) -> impl Iterator<Item = String> + 't {
    let n = titles.len();
    titles.iter().enumerate().map(move |(j, t)| {
        let mut line = format!("  {}. {}\n", j + 1, r.render_title(t, opts));
        if spaced && j + 1 < n {
            line.push('\n');
        }
        line
    })
}

/// Split `report` into payloads for `profile`.
///
/// Every batch is at most `profile.max_bytes` long unless it is flagged
/// `oversized`. An empty report yields exactly one batch holding the
/// mode's "nothing matched" notice.
pub fn split(report: &ReportData, profile: &ChannelProfile, ctx: &RenderContext) -> Vec<Batch> {
    let r: &dyn ChannelRenderer = profile.renderer.as_ref();
    let channel = r.channel().as_str();
    let header = r.header(ctx);
    let footer = r.footer(ctx);

    if report.is_empty() {
        let text = format!("{header}{}{footer}", r.empty_notice(ctx.mode));
        let oversized = text.len() > profile.max_bytes;
        return vec![Batch { text, oversized }];
    }

    // A lone batch carries no label, so the first pass reserves nothing.
    let mut reserve = 0;
    let (mut batches, overflows) = loop {
        let budget = profile.max_bytes.saturating_sub(reserve);
        let (batches, overflows) = pack(report, r, &header, &footer, budget);
        let n = batches.len();
        let needed = if n > 1 { r.batch_label_reserve(n) } else { 0 };
        if needed <= reserve {
            break (batches, overflows);
        }
        debug!(target: "batch", channel, batches = n, reserve = needed, "repacking for wider batch labels");
        reserve = needed;
    };

    for bytes in overflows {
        counter!("batch_oversized_total").increment(1);
        warn!(
            target: "batch",
            channel,
            bytes,
            budget = profile.max_bytes.saturating_sub(reserve),
            "unit exceeds payload budget, sending oversized batch"
        );
    }

    let n = batches.len();
    if n > 1 {
        for (i, b) in batches.iter_mut().enumerate() {
            b.text = r.apply_batch_label(&b.text, i + 1, n);
        }
    }

    debug!(
        target: "batch",
        channel,
        batches = n,
        bytes = batches.iter().map(Batch::len).sum::<usize>(),
        max_bytes = profile.max_bytes,
        "report split"
    );
    batches
}

/// One packing pass under `budget`; returns the unlabelled batches and the
/// sizes of units that overflowed.
fn pack(
    report: &ReportData,
    r: &dyn ChannelRenderer,
    header: &str,
    footer: &str,
    budget: usize,
) -> (Vec<Batch>, Vec<usize>) {
    let mut p = Packer::new(header.to_string(), footer.to_string(), budget);

    if !report.stats.is_empty() {
        let stats_header = r.header_for(Section::Stats);
        p.push(&stats_header, "");

        let total = report.stats.len();
        for (i, stat) in report.stats.iter().enumerate() {
            let group_header = r.header_for(Section::Group {
                index: i + 1,
                total,
                word: &stat.word,
                count: stat.count,
            });
            let mut rows = lines(r, &stat.titles, LineOptions::STATS, true);
            let first = rows.next().unwrap_or_default();
            p.push(&format!("{group_header}{first}"), &stats_header);

            let context = format!("{stats_header}{group_header}");
            for row in rows {
                p.push(&row, &context);
            }
            if i + 1 < total {
                p.push_if_fits(&r.separator());
            }
        }
    }

    if !report.novelty.is_empty() {
        let novelty_header = r.header_for(Section::Novelty {
            total: report.novelty_total(),
        });
        p.push(&novelty_header, "");

        for section in &report.novelty {
            let source_header = r.header_for(Section::Source {
                name: &section.source_name,
                count: section.titles.len(),
            });
            let mut rows = lines(r, &section.titles, LineOptions::NOVELTY, false);
            let first = rows.next().unwrap_or_default();
            p.push(&format!("{source_header}{first}"), &novelty_header);

            let context = format!("{novelty_header}{source_header}");
            for row in rows {
                p.push(&row, &context);
            }
            p.push_if_fits("\n");
        }
    }

    if !report.failed_sources.is_empty() {
        let failed_header = r.header_for(Section::Failed);
        p.push(&failed_header, "");
        for id in &report.failed_sources {
            p.push(&r.failed_line(id), &failed_header);
        }
    }

    p.finish()
}
