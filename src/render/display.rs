//! Small display helpers shared by every renderer.

use std::collections::BTreeSet;

/// Snapshot ids are `HH-MM`; show them as `HH:MM`.
fn clock(id: &str) -> String {
    id.replace('-', ":")
}

/// `""` when unseen, `HH:MM` when first and last agree, else `[first ~ last]`.
pub fn format_time_display(first: &str, last: &str) -> String {
    if first.is_empty() {
        return String::new();
    }
    let first = clock(first);
    let last = clock(last);
    if last.is_empty() || first == last {
        first
    } else {
        format!("[{first} ~ {last}]")
    }
}

/// `[min]` or `[min - max]` over the distinct ranks, wrapped in `emphasis`
/// when the best rank is within `threshold`.
pub fn format_rank_display(ranks: &[u32], threshold: u32, emphasis: (&str, &str)) -> String {
    let distinct: BTreeSet<u32> = ranks.iter().copied().collect();
    let (Some(&min), Some(&max)) = (distinct.first(), distinct.last()) else {
        return String::new();
    };
    let body = if min == max {
        format!("[{min}]")
    } else {
        format!("[{min} - {max}]")
    };
    if min <= threshold {
        format!("{}{body}{}", emphasis.0, emphasis.1)
    } else {
        body
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_display_cases() {
        assert_eq!(format_time_display("", "09-00"), "");
        assert_eq!(format_time_display("08-00", "08-00"), "08:00");
        assert_eq!(format_time_display("08-00", ""), "08:00");
        assert_eq!(format_time_display("08-00", "10-30"), "[08:00 ~ 10:30]");
    }

    #[test]
    fn rank_display_cases() {
        let em = ("**", "**");
        assert_eq!(format_rank_display(&[], 5, em), "");
        assert_eq!(format_rank_display(&[3, 3], 5, em), "**[3]**");
        assert_eq!(format_rank_display(&[9, 2, 4], 5, em), "**[2 - 9]**");
        assert_eq!(format_rank_display(&[7, 12], 5, em), "[7 - 12]");
    }
}
