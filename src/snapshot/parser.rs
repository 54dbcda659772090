// src/snapshot/parser.rs
//! Decoder for the persisted snapshot text.
//!
//! Layout (UTF-8, blocks separated by a blank line):
//!
//! ```text
//! weibo | Weibo Hot Search
//! 1. Some title [URL:https://a] [MOBILE:https://m.a] [SUMMARY:hover text]
//! 2. Another title
//!
//! ==== Following IDs Failed ====
//! zhihu
//! ```
//!
//! Recovery is line-scoped: a bad line is skipped and reported, the rest of
//! the snapshot stays usable.

use metrics::counter;

use super::types::{non_empty, ParsedSnapshot, TitleObservation};
use super::writer::clean_title;
use crate::error::ParseError;

/// Sentinel line heading the failed-sources footer block.
pub const FAILED_SENTINEL: &str = "==== Following IDs Failed ====";

const TAG_URL: &str = " [URL:";
const TAG_MOBILE: &str = " [MOBILE:";
const TAG_SUMMARY: &str = " [SUMMARY:";

/// Result of decoding one snapshot: the usable content plus skipped lines.
#[derive(Debug, Clone, Default)]
pub struct ParseOutcome {
    pub snapshot: ParsedSnapshot,
    pub errors: Vec<ParseError>,
}

/// Decode one snapshot. `id` is the snapshot identifier (file stem).
pub fn parse_snapshot(id: &str, text: &str) -> ParseOutcome {
    let mut out = ParseOutcome {
        snapshot: ParsedSnapshot::new(id),
        errors: Vec::new(),
    };

    for block in blocks(text) {
        if block.iter().any(|(_, l)| *l == FAILED_SENTINEL) {
            parse_failed_block(&block, &mut out.snapshot);
            continue;
        }
        if block.len() < 2 {
            tracing::debug!(target: "snapshot", snapshot = id, line = block[0].0, "skipping block without titles");
            continue;
        }
        parse_source_block(&block, &mut out);
    }

    if !out.errors.is_empty() {
        counter!("snapshot_parse_errors_total").increment(out.errors.len() as u64);
    }
    out
}

/// Group non-blank lines into blocks, remembering 1-based line numbers.
fn blocks(text: &str) -> Vec<Vec<(usize, &str)>> {
    let mut all = Vec::new();
    let mut cur: Vec<(usize, &str)> = Vec::new();
    for (i, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() {
            if !cur.is_empty() {
                all.push(std::mem::take(&mut cur));
            }
        } else {
            cur.push((i + 1, line));
        }
    }
    if !cur.is_empty() {
        all.push(cur);
    }
    all
}

fn parse_failed_block(block: &[(usize, &str)], snap: &mut ParsedSnapshot) {
    let mut after_sentinel = false;
    for (_, line) in block {
        if *line == FAILED_SENTINEL {
            after_sentinel = true;
            continue;
        }
        if after_sentinel && !snap.failed.iter().any(|f| f == line) {
            snap.failed.push((*line).to_string());
        }
    }
}

fn parse_source_block(block: &[(usize, &str)], out: &mut ParseOutcome) {
    let (header_no, header) = block[0];
    let (source_id, name) = match header.split_once(" | ") {
        Some((id, name)) => (id.trim(), name.trim()),
        None => (header, header),
    };
    if source_id.is_empty() {
        tracing::warn!(target: "snapshot", snapshot = %out.snapshot.id, line = header_no, "empty block header");
        out.errors.push(ParseError::EmptyHeader { line: header_no });
        return;
    }

    let snap = &mut out.snapshot;
    snap.names.insert(source_id, name.to_string());
    let titles = snap
        .titles
        .entry_or_insert_with(source_id, Default::default);

    for &(line_no, line) in &block[1..] {
        match parse_title_line(line_no, line) {
            Ok((title, obs)) => {
                if titles.contains_key(&title) {
                    tracing::debug!(target: "snapshot", source = source_id, %title, "duplicate title in block, keeping first");
                    continue;
                }
                titles.insert(title, obs);
            }
            Err(e) => {
                tracing::warn!(target: "snapshot", snapshot = %snap.id, source = source_id, error = %e, "skipping unparseable line");
                out.errors.push(e);
            }
        }
    }
}

/// Decode `"<rank>. <title> [URL:..] [MOBILE:..] [SUMMARY:..]"`.
pub fn parse_title_line(
    line_no: usize,
    line: &str,
) -> Result<(String, TitleObservation), ParseError> {
    let mut rest = line.trim();
    let mut rank: Option<u32> = None;

    if let Some((prefix, tail)) = rest.split_once(". ") {
        if !prefix.is_empty() && prefix.bytes().all(|b| b.is_ascii_digit()) {
            let r = prefix.parse::<u32>().map_err(|_| ParseError::BadRank {
                line: line_no,
                rank: prefix.to_string(),
            })?;
            rank = Some(r);
            rest = tail;
        }
    }

    let (title_part, url, mobile_url, summary) = strip_tags(rest);
    let title = clean_title(title_part);
    if title.is_empty() {
        return Err(ParseError::EmptyTitle {
            line: line_no,
            text: line.to_string(),
        });
    }

    Ok((
        title,
        TitleObservation {
            ranks: vec![rank.unwrap_or(1)],
            url: non_empty(url),
            mobile_url: non_empty(mobile_url),
            summary: non_empty(summary),
        },
    ))
}

/// Peel tags off the right end, rightmost marker first, each tag at most once.
/// A tag without a closing `]` is still cut from the title but yields "".
fn strip_tags(s: &str) -> (&str, String, String, String) {
    let mut rest = s;
    let mut found: [Option<String>; 3] = [None, None, None];
    let markers = [TAG_URL, TAG_MOBILE, TAG_SUMMARY];

    loop {
        let rightmost = markers
            .iter()
            .enumerate()
            .filter(|(i, _)| found[*i].is_none())
            .filter_map(|(i, m)| rest.rfind(m).map(|pos| (i, pos, m.len())))
            .max_by_key(|&(_, pos, _)| pos);

        let Some((i, pos, marker_len)) = rightmost else {
            break;
        };
        let tail = &rest[pos + marker_len..];
        let value = tail.strip_suffix(']').unwrap_or("");
        found[i] = Some(value.to_string());
        rest = &rest[..pos];
    }

    let [url, mobile, summary] = found;
    (
        rest,
        url.unwrap_or_default(),
        mobile.unwrap_or_default(),
        summary.unwrap_or_default(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_header_titles_and_tags() {
        let text = "weibo | Weibo\n\
                    1. First [URL:https://a] [MOBILE:https://m.a] [SUMMARY:hover]\n\
                    2. Second\n\
                    \n\
                    zhihu\n\
                    3. Third [URL:https://z]\n";
        let out = parse_snapshot("09-30", text);
        assert!(out.errors.is_empty());
        let s = &out.snapshot;
        assert_eq!(s.names.get("weibo").map(String::as_str), Some("Weibo"));
        assert_eq!(s.names.get("zhihu").map(String::as_str), Some("zhihu"));

        let first = s.titles.get("weibo").unwrap().get("First").unwrap();
        assert_eq!(first.ranks, vec![1]);
        assert_eq!(first.url.as_deref(), Some("https://a"));
        assert_eq!(first.mobile_url.as_deref(), Some("https://m.a"));
        assert_eq!(first.summary.as_deref(), Some("hover"));

        let third = s.titles.get("zhihu").unwrap().get("Third").unwrap();
        assert_eq!(third.ranks, vec![3]);
        assert_eq!(third.mobile_url, None);
    }

    #[test]
    fn failed_footer_is_not_a_source() {
        let text = "a\n1. x\n\n==== Following IDs Failed ====\nb\nc\n";
        let out = parse_snapshot("10-00", text);
        assert_eq!(out.snapshot.failed, vec!["b", "c"]);
        assert!(!out.snapshot.titles.contains_key(FAILED_SENTINEL));
        assert_eq!(out.snapshot.titles.len(), 1);
    }

    #[test]
    fn title_quoting_the_footer_stays_a_title() {
        let text = "a\n1. Why ==== Following IDs Failed ==== trends\n2. next\n\n==== Following IDs Failed ====\nb\n";
        let out = parse_snapshot("10-00", text);
        let titles = out.snapshot.titles.get("a").unwrap();
        assert_eq!(
            titles.keys().collect::<Vec<_>>(),
            vec!["Why ==== Following IDs Failed ==== trends", "next"]
        );
        assert_eq!(out.snapshot.failed, vec!["b"]);
    }

    #[test]
    fn bad_line_is_skipped_rest_kept() {
        let text = "a\n1. ok\n2.  [URL:https://only-a-tag]\n99999999999. big\n3. also ok\n";
        let out = parse_snapshot("10-00", text);
        let titles = out.snapshot.titles.get("a").unwrap();
        assert_eq!(titles.keys().collect::<Vec<_>>(), vec!["ok", "also ok"]);
        assert_eq!(out.errors.len(), 2);
        assert_eq!(out.errors[0].line(), 3);
        assert!(matches!(out.errors[1], ParseError::BadRank { line: 4, .. }));
    }

    #[test]
    fn unranked_line_defaults_to_rank_one() {
        let (title, obs) = parse_title_line(1, "v2. release notes").unwrap();
        assert_eq!(title, "v2. release notes");
        assert_eq!(obs.ranks, vec![1]);
    }

    #[test]
    fn unterminated_tag_is_cut_with_empty_value() {
        let (title, obs) = parse_title_line(1, "4. Title [URL:https://x").unwrap();
        assert_eq!(title, "Title");
        assert_eq!(obs.url, None);
    }

    #[test]
    fn duplicate_title_in_block_keeps_first() {
        let text = "a\n1. same [URL:https://first]\n5. same [URL:https://second]\n";
        let out = parse_snapshot("10-00", text);
        let obs = out.snapshot.titles.get("a").unwrap().get("same").unwrap();
        assert_eq!(obs.ranks, vec![1]);
        assert_eq!(obs.url.as_deref(), Some("https://first"));
    }
}
