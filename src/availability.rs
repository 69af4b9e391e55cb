use std::fmt;

use chrono::Weekday;

use crate::model::{AvailabilityWindow, DayAvailability};
use crate::time::Interval;

/// Outcome of checking a proposed interval against a cleaner's week.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Availability {
    Available,
    Unavailable { reason: String },
}

impl Availability {
    pub fn is_available(&self) -> bool {
        matches!(self, Availability::Available)
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            Availability::Available => None,
            Availability::Unavailable { reason } => Some(reason),
        }
    }

    fn unavailable(reason: String) -> Self {
        Availability::Unavailable { reason }
    }
}

impl fmt::Display for Availability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Availability::Available => f.write_str("available"),
            Availability::Unavailable { reason } => write!(f, "unavailable: {}", reason),
        }
    }
}

/// Check `proposed` against the window configured for `weekday`. `window`
/// is whatever is stored for that day, `None` when nothing is.
pub fn check(
    weekday: Weekday,
    window: Option<&AvailabilityWindow>,
    proposed: &Interval,
) -> Availability {
    let window = match window {
        Some(window) => window,
        None => {
            return Availability::unavailable(format!(
                "No availability configured for {}.",
                weekday
            ))
        }
    };

    match window.day {
        DayAvailability::Off => {
            Availability::unavailable(format!("Marked as unavailable on {}.", weekday))
        }
        DayAvailability::Hours(hours) if !proposed.within(&hours) => {
            Availability::unavailable(format!(
                "{} is outside the configured window {} on {}.",
                proposed, hours, weekday
            ))
        }
        DayAvailability::Hours(_) => Availability::Available,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn interval(start: &str, end: &str) -> Interval {
        Interval::new(start.parse().unwrap(), end.parse().unwrap()).unwrap()
    }

    fn monday(day: DayAvailability) -> AvailabilityWindow {
        AvailabilityWindow {
            cleaner_id: 1,
            weekday: Weekday::Mon,
            day,
        }
    }

    #[test]
    fn test_inside_window() {
        let window = monday(DayAvailability::Hours(interval("09:00", "17:00")));
        let result = check(Weekday::Mon, Some(&window), &interval("10:00", "12:00"));
        assert!(result.is_available());
        assert_eq!(result.reason(), None);
    }

    #[test]
    fn test_exact_bounds_are_available() {
        let window = monday(DayAvailability::Hours(interval("09:00", "17:00")));
        assert!(check(Weekday::Mon, Some(&window), &interval("09:00", "17:00")).is_available());
    }

    #[test]
    fn test_starts_before_window() {
        let window = monday(DayAvailability::Hours(interval("09:00", "17:00")));
        let result = check(Weekday::Mon, Some(&window), &interval("08:00", "09:30"));
        assert!(!result.is_available());
        assert!(result.reason().unwrap().contains("09:00-17:00"));
    }

    #[test]
    fn test_window_ending_at_midnight() {
        let window = monday(DayAvailability::Hours(interval("18:00", "24:00")));
        assert!(check(Weekday::Mon, Some(&window), &interval("22:00", "24:00")).is_available());
        let early = check(Weekday::Mon, Some(&window), &interval("17:00", "19:00"));
        assert!(early.reason().unwrap().contains("18:00-24:00"));
    }

    #[test]
    fn test_day_off() {
        let window = monday(DayAvailability::Off);
        let result = check(Weekday::Mon, Some(&window), &interval("10:00", "11:00"));
        assert_eq!(result.reason(), Some("Marked as unavailable on Mon."));
    }

    #[test]
    fn test_no_configuration() {
        let result = check(Weekday::Sun, None, &interval("10:00", "11:00"));
        assert_eq!(result.reason(), Some("No availability configured for Sun."));
        assert_eq!(result.to_string(), "unavailable: No availability configured for Sun.");
    }
}
