//! Time display helpers

/// Format seconds as `m:ss`
///
/// Non-finite and negative input renders as `0:00`. Minutes are not wrapped
/// into hours.
pub fn format_time(seconds: f64) -> String {
    if !seconds.is_finite() || seconds <= 0.0 {
        return "0:00".to_string();
    }
    let total = seconds.floor() as u64;
    format!("{}:{:02}", total / 60, total % 60)
}

/// Slider fill percentage for `value` out of `max`
///
/// Returns 0 for unknown or zero `max` and for non-finite input; clamps to
/// [0, 100].
pub fn progress_percent(value: f64, max: f64) -> f64 {
    if !value.is_finite() || !max.is_finite() || max <= 0.0 {
        return 0.0;
    }
    (value / max * 100.0).clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_minutes_and_padded_seconds() {
        assert_eq!(format_time(0.0), "0:00");
        assert_eq!(format_time(5.9), "0:05");
        assert_eq!(format_time(65.0), "1:05");
        assert_eq!(format_time(180.0), "3:00");
        assert_eq!(format_time(3725.0), "62:05");
    }

    #[test]
    fn unusable_times_render_as_zero() {
        assert_eq!(format_time(f64::NAN), "0:00");
        assert_eq!(format_time(f64::INFINITY), "0:00");
        assert_eq!(format_time(-4.0), "0:00");
    }

    #[test]
    fn progress_percent_handles_unknown_duration() {
        assert_eq!(progress_percent(45.0, 180.0), 25.0);
        assert_eq!(progress_percent(10.0, 0.0), 0.0);
        assert_eq!(progress_percent(10.0, f64::NAN), 0.0);
        assert_eq!(progress_percent(f64::INFINITY, 100.0), 0.0);
        assert_eq!(progress_percent(250.0, 200.0), 100.0);
    }
}
