//! Human-readable durations for script comments

/// Format a duration as `1 days 2 hours 3 mins 4 secs`, omitting zero parts
pub fn format_duration(minutes: u64, seconds: u64) -> String {
    let total = minutes.saturating_mul(60).saturating_add(seconds);
    let (days, hours, mins, secs) = (
        total / 86_400,
        total / 3_600 % 24,
        total / 60 % 60,
        total % 60,
    );

    let parts: Vec<String> = [(days, "days"), (hours, "hours"), (mins, "mins"), (secs, "secs")]
        .into_iter()
        .filter(|(value, _)| *value > 0)
        .map(|(value, unit)| format!("{} {}", value, unit))
        .collect();

    if parts.is_empty() {
        "immediately".to_string()
    } else {
        parts.join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0, 0), "immediately");
        assert_eq!(format_duration(0, 59), "59 secs");
        assert_eq!(format_duration(45, 0), "45 mins");
        assert_eq!(format_duration(90, 75), "1 hours 31 mins 15 secs");
        assert_eq!(format_duration(24 * 60 + 1, 0), "1 days 1 mins");
    }
}
