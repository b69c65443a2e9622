use std::fmt::Display;
use std::time::Duration;

pub fn format_duration(secs: u64) -> String {
    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    let seconds = secs % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}

pub fn format_std_duration(duration: Duration) -> String {
    format_duration(duration.as_secs())
}

/// `8 CPU` for a single value, `2-16 CPU` for a spread
pub fn format_range<T: PartialOrd + Copy + Display>(values: &[T], suffix: &str) -> String {
    let mut iter = values.iter().copied();
    let Some(first) = iter.next() else {
        return "N/A".to_string();
    };
    let (min, max) = iter.fold((first, first), |(lo, hi), v| {
        (if v < lo { v } else { lo }, if v > hi { v } else { hi })
    });
    if min == max {
        format!("{}{}", min, suffix)
    } else {
        format!("{}-{}{}", min, max, suffix)
    }
}

/// `$0.47/hr` or `$0.10-$0.94/hr`
pub fn format_price_range(prices: &[f64]) -> String {
    if prices.is_empty() {
        return "N/A".to_string();
    }
    let min = prices.iter().copied().fold(f64::INFINITY, f64::min);
    let max = prices.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if min == max {
        format!("${:.2}/hr", min)
    } else {
        format!("${:.2}-${:.2}/hr", min, max)
    }
}
