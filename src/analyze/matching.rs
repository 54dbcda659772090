//! Title → keyword group assignment.
//!
//! Filter words win over everything; otherwise groups are tried in the
//! configured order and the first match takes the title. With no groups
//! configured every title lands in a single catch-all group and filter
//! words are ignored.

use super::keywords::{KeywordRules, WordGroup};

pub const CATCH_ALL_KEY: &str = "All News";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupMatch {
    /// No groups configured.
    CatchAll,
    /// Index into `KeywordRules::groups`.
    Group(usize),
}

pub fn match_group(title: &str, rules: &KeywordRules) -> Option<GroupMatch> {
    if rules.groups.is_empty() {
        return Some(GroupMatch::CatchAll);
    }
    let lower = title.to_lowercase();
    if rules.filter_words.iter().any(|f| contains_ci(&lower, f)) {
        return None;
    }
    rules
        .groups
        .iter()
        .position(|g| group_accepts(&lower, g))
        .map(GroupMatch::Group)
}

pub fn matches(title: &str, rules: &KeywordRules) -> bool {
    match_group(title, rules).is_some()
}

fn group_accepts(lower_title: &str, g: &WordGroup) -> bool {
    let required_ok = g.required.iter().all(|w| contains_ci(lower_title, w));
    let normal_ok = g.normal.is_empty() || g.normal.iter().any(|w| contains_ci(lower_title, w));
    required_ok && normal_ok
}

fn contains_ci(lower_title: &str, word: &str) -> bool {
    lower_title.contains(&word.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyze::keywords::parse_keywords;

    #[test]
    fn filter_beats_required() {
        let rules = parse_keywords("+breaking\n!ad\n");
        assert_eq!(
            match_group("Breaking news today", &rules),
            Some(GroupMatch::Group(0))
        );
        assert_eq!(match_group("Breaking ad campaign", &rules), None);
        assert_eq!(match_group("Old news", &rules), None);
    }

    #[test]
    fn first_group_wins() {
        let rules = parse_keywords("apple\n\napple\niphone\n");
        assert_eq!(match_group("New iPhone from Apple", &rules), Some(GroupMatch::Group(0)));
        assert_eq!(match_group("iphone leak", &rules), Some(GroupMatch::Group(1)));
    }

    #[test]
    fn required_and_normal_both_needed() {
        let rules = parse_keywords("+tesla\nrecall\nearnings\n");
        assert!(matches("Tesla earnings beat", &rules));
        assert!(!matches("Tesla opens factory", &rules));
        assert!(!matches("Ford recall", &rules));
    }

    #[test]
    fn no_groups_matches_everything_even_filtered() {
        let rules = parse_keywords("!ad\n");
        assert_eq!(match_group("ad break", &rules), Some(GroupMatch::CatchAll));
    }
}
