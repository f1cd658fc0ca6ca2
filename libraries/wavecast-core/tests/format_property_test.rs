//! Property-based tests for duration formatting
//!
//! Uses proptest to verify the formatting invariants across many inputs.

use proptest::prelude::*;
use wavecast_core::format::{format_duration, format_duration_with_units, parse_duration};

proptest! {
    /// Property: parse(format(s)) recovers whole seconds
    #[test]
    fn format_then_parse_recovers_whole_seconds(seconds in 0u64..1_000_000) {
        let formatted = format_duration(seconds as f64, false);
        prop_assert_eq!(parse_duration(&formatted), seconds);

        let with_hours = format_duration(seconds as f64, true);
        prop_assert_eq!(parse_duration(&with_hours), seconds);
    }

    /// Property: fractional seconds are floored, never rounded
    #[test]
    fn fractional_seconds_are_floored(whole in 0u64..100_000, fraction in 0.0f64..0.999) {
        let formatted = format_duration(whole as f64 + fraction, false);
        prop_assert_eq!(parse_duration(&formatted), whole);
    }

    /// Property: negative input always formats as zero
    #[test]
    fn negative_input_is_zero(seconds in -1_000_000.0f64..-0.0001) {
        prop_assert_eq!(format_duration(seconds, false), "0:00");
        prop_assert_eq!(format_duration_with_units(seconds), "0s");
    }

    /// Property: hours only appear once an hour has elapsed
    #[test]
    fn hours_shown_only_when_needed(seconds in 0u64..3600) {
        let formatted = format_duration(seconds as f64, false);
        prop_assert_eq!(formatted.matches(':').count(), 1);
    }

    /// Property: unit format never contains a zero component except "0s"
    #[test]
    fn units_omit_zero_components(seconds in 1u64..1_000_000) {
        let formatted = format_duration_with_units(seconds as f64);
        for part in formatted.split(' ') {
            prop_assert!(!part.starts_with('0'), "zero component in {}", formatted);
        }
    }
}
