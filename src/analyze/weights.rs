//! Title weighting used to order titles inside a keyword group.
//!
//! ```text
//! rank_score      = mean(11 - min(r, 10))           over ranks
//! frequency_score = min(count, 10) * 10
//! hotness_score   = |{r <= threshold}| / |ranks| * 100
//! weight          = rank_score * W_rank + frequency_score * W_freq + hotness_score * W_hot
//! ```
//!
//! A title with no ranks weighs 0.

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeightConfig {
    pub rank_weight: f64,
    pub frequency_weight: f64,
    pub hotness_weight: f64,
}

impl Default for WeightConfig {
    fn default() -> Self {
        Self {
            rank_weight: 0.6,
            frequency_weight: 0.3,
            hotness_weight: 0.1,
        }
    }
}

impl WeightConfig {
    /// Negative (or NaN) factors are clamped to 0.
    pub fn sanitized(self) -> Self {
        let clamp = |v: f64| if v.is_finite() && v > 0.0 { v } else { 0.0 };
        Self {
            rank_weight: clamp(self.rank_weight),
            frequency_weight: clamp(self.frequency_weight),
            hotness_weight: clamp(self.hotness_weight),
        }
    }
}

/// The three partial scores, before the configured factors are applied.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct WeightParts {
    pub rank_score: f64,
    pub frequency_score: f64,
    pub hotness_score: f64,
}

pub fn weight_parts(ranks: &[u32], count: u32, rank_threshold: u32) -> WeightParts {
    if ranks.is_empty() {
        return WeightParts::default();
    }
    let n = ranks.len() as f64;
    let rank_sum: u32 = ranks.iter().map(|&r| 11 - r.min(10)).sum();
    let hot = ranks.iter().filter(|&&r| r <= rank_threshold).count() as f64;
    WeightParts {
        rank_score: rank_sum as f64 / n,
        frequency_score: (count.min(10) * 10) as f64,
        hotness_score: hot / n * 100.0,
    }
}

pub fn weight(ranks: &[u32], count: u32, rank_threshold: u32, cfg: &WeightConfig) -> f64 {
    let p = weight_parts(ranks, count, rank_threshold);
    p.rank_score * cfg.rank_weight
        + p.frequency_score * cfg.frequency_weight
        + p.hotness_score * cfg.hotness_weight
}
