//! Media time helpers
//!
//! Media time is carried as `f64` seconds throughout the engine. Clock ticks
//! are discrete and accumulate floating error, so comparisons against cue
//! boundaries and task targets go through the epsilon-tolerant helpers here
//! rather than raw `==`/`<`.
//!
//! The helpers are complementary: for any `a`, `b` and `epsilon`, exactly one
//! of [`before`] and [`at_or_after`] holds. A value within `epsilon` below a
//! boundary counts as having reached it.

/// Default comparison tolerance (seconds)
pub const DEFAULT_EPSILON: f64 = 0.001;

/// `a` and `b` are within `epsilon` of each other
pub fn approx_eq(a: f64, b: f64, epsilon: f64) -> bool {
    (a - b).abs() <= epsilon
}

/// `a` lies strictly before `b`, beyond tolerance
pub fn before(a: f64, b: f64, epsilon: f64) -> bool {
    a < b - epsilon
}

/// `a` has reached `b` (tolerance applied on the early side)
pub fn at_or_after(a: f64, b: f64, epsilon: f64) -> bool {
    !before(a, b, epsilon)
}

/// Half-open interval membership `[start, end)` with tolerance
///
/// # Examples
///
/// ```
/// use lingo_common::time::{in_window, DEFAULT_EPSILON};
///
/// assert!(in_window(10.0, 10.0, 15.0, DEFAULT_EPSILON));
/// assert!(in_window(14.9, 10.0, 15.0, DEFAULT_EPSILON));
/// assert!(!in_window(15.0, 10.0, 15.0, DEFAULT_EPSILON));
/// ```
pub fn in_window(t: f64, start: f64, end: f64, epsilon: f64) -> bool {
    at_or_after(t, start, epsilon) && before(t, end, epsilon)
}

/// Format media seconds as `M:SS.mmm` (or `H:MM:SS.mmm` past one hour)
///
/// Used in log lines only. Non-finite values render as `--:--`.
///
/// # Examples
///
/// ```
/// use lingo_common::time::format_media_time;
///
/// assert_eq!(format_media_time(0.0), "0:00.000");
/// assert_eq!(format_media_time(75.25), "1:15.250");
/// assert_eq!(format_media_time(3725.5), "1:02:05.500");
/// assert_eq!(format_media_time(-1.5), "-0:01.500");
/// ```
pub fn format_media_time(seconds: f64) -> String {
    if !seconds.is_finite() {
        return "--:--".to_string();
    }

    let sign = if seconds < 0.0 { "-" } else { "" };
    let total_ms = (seconds.abs() * 1000.0).round() as u64;
    let ms = total_ms % 1000;
    let total_secs = total_ms / 1000;
    let secs = total_secs % 60;
    let mins = (total_secs / 60) % 60;
    let hours = total_secs / 3600;

    if hours > 0 {
        format!("{}{}:{:02}:{:02}.{:03}", sign, hours, mins, secs, ms)
    } else {
        format!("{}{}:{:02}.{:03}", sign, mins, secs, ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_before_and_at_or_after_are_complementary() {
        let samples = [9.0, 9.9985, 9.9995, 10.0, 10.0005, 10.5];
        for &a in &samples {
            assert_ne!(
                before(a, 10.0, DEFAULT_EPSILON),
                at_or_after(a, 10.0, DEFAULT_EPSILON),
                "exactly one must hold for {}",
                a
            );
        }
    }

    #[test]
    fn test_within_epsilon_counts_as_reached() {
        assert!(at_or_after(14.9995, 15.0, DEFAULT_EPSILON));
        assert!(before(14.998, 15.0, DEFAULT_EPSILON));
    }

    #[test]
    fn test_approx_eq() {
        assert!(approx_eq(1.0, 1.0005, DEFAULT_EPSILON));
        assert!(!approx_eq(1.0, 1.01, DEFAULT_EPSILON));
    }

    #[test]
    fn test_in_window_half_open() {
        assert!(in_window(10.0, 10.0, 15.0, DEFAULT_EPSILON));
        assert!(in_window(12.5, 10.0, 15.0, DEFAULT_EPSILON));
        assert!(!in_window(15.0, 10.0, 15.0, DEFAULT_EPSILON));
        assert!(!in_window(9.5, 10.0, 15.0, DEFAULT_EPSILON));
    }

    #[test]
    fn test_format_media_time_non_finite() {
        assert_eq!(format_media_time(f64::NAN), "--:--");
        assert_eq!(format_media_time(f64::INFINITY), "--:--");
    }
}
