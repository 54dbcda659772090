// src/analyze/mod.rs
//! Weighting and keyword-group matching: turns a mode selection into ordered `Stat`s.

pub mod keywords;
pub mod matching;
pub mod stats;
pub mod weights;

pub use keywords::{load_keywords, parse_keywords, HotReloadKeywords, KeywordRules, WordGroup};
pub use matching::{match_group, matches, GroupMatch, CATCH_ALL_KEY};
pub use stats::{compute_stats, Candidate, ScoredTitle, Stat};
pub use weights::{weight, WeightConfig};
