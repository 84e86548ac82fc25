//! Time formatting utilities.

use chrono::{DateTime, Utc};

/// Format a countdown to a future time, relative to `now`.
#[must_use]
pub fn format_countdown(target: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let duration = target.signed_duration_since(now);

    if duration.num_seconds() <= 0 {
        return "now".to_string();
    }

    let hours = duration.num_hours();
    let minutes = duration.num_minutes() % 60;

    if hours > 24 {
        let days = hours / 24;
        format!("in {days} day{}", if days == 1 { "" } else { "s" })
    } else if hours > 0 {
        format!("in {hours}h {minutes}m")
    } else if minutes > 0 {
        format!("in {minutes}m")
    } else {
        let seconds = duration.num_seconds();
        format!("in {seconds}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn countdown_past_is_now() {
        let now = Utc::now();
        assert_eq!(format_countdown(now - Duration::seconds(5), now), "now");
    }

    #[test]
    fn countdown_minutes() {
        let now = Utc::now();
        assert_eq!(format_countdown(now + Duration::minutes(55), now), "in 55m");
    }

    #[test]
    fn countdown_hours() {
        let now = Utc::now();
        let target = now + Duration::minutes(90);
        assert_eq!(format_countdown(target, now), "in 1h 30m");
    }
}
