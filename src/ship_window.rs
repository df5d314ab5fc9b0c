//! Ship-window validation.
//!
//! Pure date-range checks: a candidate `(start, end)` pair is valid iff it
//! sits inside every named window supplied. No windows means no validation
//! applies (the default/uncategorized group).

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Bounds of a named delivery window as loaded from the catalog. Bounds are
/// optional at the data level; a window supplied for validation without
/// configured bounds is a hard failure, not a skip.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WindowBounds {
    pub name: String,
    pub starts_at: Option<NaiveDate>,
    pub ends_at: Option<NaiveDate>,
}

/// First offending window and a human-readable reason.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("window \"{window}\": {reason}")]
pub struct WindowViolation {
    pub window: String,
    pub reason: String,
}

/// Validates a candidate date range against zero or more named windows.
///
/// Valid iff for every window, `window.start <= start` and
/// `end <= window.end`. Returns the first violation encountered.
pub fn validate_ship_window(
    start: NaiveDate,
    end: NaiveDate,
    windows: &[WindowBounds],
) -> Result<(), WindowViolation> {
    for window in windows {
        let (window_start, window_end) = match (window.starts_at, window.ends_at) {
            (Some(s), Some(e)) => (s, e),
            _ => {
                return Err(WindowViolation {
                    window: window.name.clone(),
                    reason: "window has no configured start/end dates".to_string(),
                })
            }
        };
        if start < window_start {
            return Err(WindowViolation {
                window: window.name.clone(),
                reason: format!(
                    "ship start {} is before the window opens on {}",
                    start, window_start
                ),
            });
        }
        if end > window_end {
            return Err(WindowViolation {
                window: window.name.clone(),
                reason: format!(
                    "ship end {} is after the window closes on {}",
                    end, window_end
                ),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn window(name: &str, start: Option<NaiveDate>, end: Option<NaiveDate>) -> WindowBounds {
        WindowBounds {
            name: name.to_string(),
            starts_at: start,
            ends_at: end,
        }
    }

    #[test]
    fn no_windows_is_always_valid() {
        assert!(validate_ship_window(date(2026, 1, 1), date(2026, 1, 31), &[]).is_ok());
    }

    #[test]
    fn range_inside_window_is_valid() {
        let w = window("Spring", Some(date(2026, 1, 1)), Some(date(2026, 3, 31)));
        assert!(validate_ship_window(date(2026, 1, 15), date(2026, 2, 15), &[w]).is_ok());
    }

    #[test]
    fn range_matching_bounds_exactly_is_valid() {
        let w = window("Spring", Some(date(2026, 1, 1)), Some(date(2026, 3, 31)));
        assert!(validate_ship_window(date(2026, 1, 1), date(2026, 3, 31), &[w]).is_ok());
    }

    #[test]
    fn start_before_window_is_rejected_with_reason() {
        let w = window("Spring", Some(date(2026, 1, 1)), Some(date(2026, 3, 31)));
        let violation =
            validate_ship_window(date(2025, 12, 15), date(2026, 2, 1), &[w]).unwrap_err();
        assert_eq!(violation.window, "Spring");
        assert!(violation.reason.contains("before the window opens"));
    }

    #[test]
    fn end_after_window_is_rejected_with_reason() {
        let w = window("Spring", Some(date(2026, 1, 1)), Some(date(2026, 3, 31)));
        let violation =
            validate_ship_window(date(2026, 2, 1), date(2026, 4, 15), &[w]).unwrap_err();
        assert_eq!(violation.window, "Spring");
        assert!(violation.reason.contains("after the window closes"));
    }

    #[test]
    fn first_offending_window_wins() {
        let ok = window("Wide", Some(date(2025, 1, 1)), Some(date(2027, 1, 1)));
        let bad = window("Narrow", Some(date(2026, 2, 1)), Some(date(2026, 2, 28)));
        let violation =
            validate_ship_window(date(2026, 1, 15), date(2026, 2, 15), &[ok, bad]).unwrap_err();
        assert_eq!(violation.window, "Narrow");
    }

    #[test]
    fn missing_bounds_is_a_hard_failure_not_a_skip() {
        let w = window("Unconfigured", None, None);
        let violation =
            validate_ship_window(date(2026, 1, 1), date(2026, 1, 31), &[w]).unwrap_err();
        assert_eq!(violation.window, "Unconfigured");
        assert!(violation.reason.contains("no configured start/end"));
    }

    #[test]
    fn partially_missing_bounds_also_fails() {
        let w = window("HalfOpen", Some(date(2026, 1, 1)), None);
        assert!(validate_ship_window(date(2026, 1, 1), date(2026, 1, 31), &[w]).is_err());
    }
}
