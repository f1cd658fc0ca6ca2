//! Position and duration display formatting
//!
//! Pure conversions between seconds and the strings shown next to the
//! playback scrubber and in episode lists.

/// Split whole seconds into (hours, minutes, seconds)
fn split_seconds(seconds: f64) -> (u64, u64, u64) {
    let total = seconds.floor() as u64;
    (total / 3600, (total % 3600) / 60, total % 60)
}

/// Format seconds as `M:SS`, or `H:MM:SS` when there are hours
///
/// Non-finite or negative input formats as `"0:00"`. Hours are never
/// padded; minutes and seconds are always two digits.
///
/// # Example
///
/// ```rust
/// use wavecast_core::format::format_duration;
///
/// assert_eq!(format_duration(65.0, false), "1:05");
/// assert_eq!(format_duration(3665.0, false), "1:01:05");
/// assert_eq!(format_duration(65.0, true), "0:01:05");
/// ```
pub fn format_duration(seconds: f64, always_show_hours: bool) -> String {
    if !seconds.is_finite() || seconds < 0.0 {
        return "0:00".to_string();
    }

    let (hours, minutes, secs) = split_seconds(seconds);

    if hours > 0 || always_show_hours {
        format!("{hours}:{minutes:02}:{secs:02}")
    } else {
        format!("{minutes}:{secs:02}")
    }
}

/// Parse `MM:SS` or `HH:MM:SS` into whole seconds
///
/// Any other shape, including non-numeric parts, parses as `0`.
pub fn parse_duration(duration: &str) -> u64 {
    let parts: Option<Vec<u64>> = duration
        .split(':')
        .map(|part| part.trim().parse::<u64>().ok())
        .collect();

    match parts.as_deref() {
        Some(&[minutes, seconds]) => minutes.saturating_mul(60).saturating_add(seconds),
        Some(&[hours, minutes, seconds]) => hours
            .saturating_mul(3600)
            .saturating_add(minutes.saturating_mul(60))
            .saturating_add(seconds),
        _ => 0,
    }
}

/// Format seconds with units, e.g. `"1h 30m"`, `"45m 10s"`, `"0s"`
///
/// Only nonzero components are emitted; zero overall formats as `"0s"`.
pub fn format_duration_with_units(seconds: f64) -> String {
    if !seconds.is_finite() || seconds < 0.0 {
        return "0s".to_string();
    }

    let (hours, minutes, secs) = split_seconds(seconds);
    let mut parts = Vec::with_capacity(3);

    if hours > 0 {
        parts.push(format!("{hours}h"));
    }
    if minutes > 0 {
        parts.push(format!("{minutes}m"));
    }
    if secs > 0 || parts.is_empty() {
        parts.push(format!("{secs}s"));
    }

    parts.join(" ")
}
