// src/snapshot/writer.rs
//! Encoder for the persisted snapshot text; the inverse of `parser`.

use std::fmt::Write as _;

use once_cell::sync::OnceCell;
use regex::Regex;

use super::parser::FAILED_SENTINEL;
use super::types::SourceTitles;
use crate::ordered::OrderedMap;

/// Collapse every whitespace run (newlines included) to one space and trim.
pub fn clean_title(title: &str) -> String {
    static RE_WS: OnceCell<Regex> = OnceCell::new();
    let re = RE_WS.get_or_init(|| Regex::new(r"\s+").expect("static regex"));
    re.replace_all(title, " ").trim().to_string()
}

/// Render one crawl round in the persisted snapshot layout.
pub fn render_snapshot(
    results: &SourceTitles,
    names: &OrderedMap<String>,
    failed: &[String],
) -> String {
    let mut out = String::new();

    for (source_id, titles) in results.iter() {
        match names.get(source_id) {
            Some(name) if name != source_id => {
                let _ = writeln!(out, "{source_id} | {name}");
            }
            _ => {
                let _ = writeln!(out, "{source_id}");
            }
        }

        let mut rows: Vec<(u32, String, &super::TitleObservation)> = titles
            .iter()
            .map(|(title, obs)| (obs.ranks.first().copied().unwrap_or(1), clean_title(title), obs))
            .filter(|(_, title, _)| !title.is_empty())
            .collect();
        rows.sort_by_key(|(rank, _, _)| *rank);

        for (rank, title, obs) in rows {
            let _ = write!(out, "{rank}. {title}");
            if let Some(url) = &obs.url {
                let _ = write!(out, " [URL:{url}]");
            }
            if let Some(mobile) = &obs.mobile_url {
                let _ = write!(out, " [MOBILE:{mobile}]");
            }
            if let Some(summary) = &obs.summary {
                let one_line = summary.replace('\n', " ").replace('\r', "");
                let _ = write!(out, " [SUMMARY:{one_line}]");
            }
            out.push('\n');
        }
        out.push('\n');
    }

    if !failed.is_empty() {
        let _ = writeln!(out, "{FAILED_SENTINEL}");
        for id in failed {
            let _ = writeln!(out, "{id}");
        }
    }

    out
}
