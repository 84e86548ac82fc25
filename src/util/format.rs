//! Number formatting utilities.

use std::time::Duration;

/// Format a cost in USD for terminal output.
#[must_use]
pub fn format_cost(value: f64) -> String {
    if value > 0.0 && value < 0.01 {
        format!("${value:.4}")
    } else {
        format!("${value:.2}")
    }
}

/// Format a cost for the ledger: plain number, four decimal places.
#[must_use]
pub fn format_ledger_cost(value: f64) -> String {
    format!("{value:.4}")
}

/// Format an elapsed duration in seconds with one decimal place.
#[must_use]
pub fn format_duration_secs(elapsed: Duration) -> String {
    format!("{:.1}", elapsed.as_secs_f64())
}

/// Format a token count compactly (`950`, `1.2K`, `3.4M`).
#[must_use]
pub fn format_tokens(value: u64) -> String {
    fn format_compact(value: u64, divisor: u64, suffix: &str) -> String {
        let major = value / divisor;
        let minor = (value % divisor) / (divisor / 10);
        format!("{major}.{minor}{suffix}")
    }

    if value >= 1_000_000 {
        format_compact(value, 1_000_000, "M")
    } else if value >= 1_000 {
        format_compact(value, 1_000, "K")
    } else {
        value.to_string()
    }
}
