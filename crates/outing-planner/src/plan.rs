//! Value types shared across the planner: weekday labels, booking codes,
//! dinner windows, showings and the final plan.

use std::fmt;

use chrono::{NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

/// A weekday label as it appears in a calendar header cell.
///
/// Labels are opaque identifiers: whatever text a calendar uses is compared
/// verbatim (after trimming) across sources. No fixed day enumeration is
/// assumed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Weekday(String);

impl Weekday {
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into().trim().to_string())
    }

    pub fn label(&self) -> &str {
        &self.0
    }

    /// The three-letter lowercase prefix the restaurant backend uses in its
    /// slot codes. Labels that do not start with three ASCII letters cannot
    /// form a code.
    pub fn code_prefix(&self) -> Option<String> {
        let prefix: String = self.0.chars().take(3).collect();
        if prefix.len() == 3 && prefix.chars().all(|c| c.is_ascii_alphabetic()) {
            Some(prefix.to_ascii_lowercase())
        } else {
            None
        }
    }
}

impl fmt::Display for Weekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Compact day+hour slot encoding used by the restaurant backend,
/// e.g. `sat21` for a Saturday table at 21:00.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BookingCode {
    day_prefix: String,
    hour: u8,
}

impl BookingCode {
    /// Build a code for a weekday and an hour of day. None when the label
    /// cannot form a prefix or the hour is out of range.
    pub fn new(day: &Weekday, hour: u8) -> Option<Self> {
        if hour > 23 {
            return None;
        }
        day.code_prefix().map(|day_prefix| Self { day_prefix, hour })
    }

    /// Parse the backend encoding `<3-letter-day><2-digit-hour>`.
    pub fn parse(value: &str) -> Option<Self> {
        if value.len() != 5 || !value.is_ascii() {
            return None;
        }
        let (day_part, hour_part) = value.split_at(3);
        if !day_part.chars().all(|c| c.is_ascii_lowercase()) {
            return None;
        }
        if !hour_part.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        let hour: u8 = hour_part.parse().ok()?;
        if hour > 23 {
            return None;
        }
        Some(Self {
            day_prefix: day_part.to_string(),
            hour,
        })
    }

    pub fn encode(&self) -> String {
        format!("{}{:02}", self.day_prefix, self.hour)
    }

    pub fn hour(&self) -> u8 {
        self.hour
    }

    pub fn matches_day(&self, day: &Weekday) -> bool {
        day.code_prefix().is_some_and(|prefix| prefix == self.day_prefix)
    }
}

/// A one-hour dinner window starting on the hour, rendered `21:00-22:00`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct DinnerWindow {
    start_hour: u8,
}

impl DinnerWindow {
    pub fn new(start_hour: u8) -> Option<Self> {
        (start_hour <= 23).then_some(Self { start_hour })
    }

    pub fn start_hour(&self) -> u8 {
        self.start_hour
    }
}

impl From<&BookingCode> for DinnerWindow {
    fn from(code: &BookingCode) -> Self {
        // A parsed code's hour is already in range.
        Self {
            start_hour: code.hour(),
        }
    }
}

impl fmt::Display for DinnerWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02}:00-{:02}:00",
            self.start_hour,
            self.start_hour + 1
        )
    }
}

/// One bookable screening: a movie with a start time on a given day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Showing {
    pub day: Weekday,
    pub movie_title: String,
    pub start: NaiveTime,
}

impl Showing {
    pub fn start_hour(&self) -> u8 {
        self.start.hour() as u8
    }
}

/// A complete day/movie/dinner recommendation for the whole group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    pub day: Weekday,
    pub movie_title: String,
    pub movie_start: NaiveTime,
    pub dinner_window: DinnerWindow,
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "On {}, \"{}\" begins at {}, and there is a free table to book between {}",
            self.day,
            self.movie_title,
            self.movie_start.format("%H:%M"),
            self.dinner_window
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weekday_trims_label() {
        assert_eq!(Weekday::new("  Friday \n").label(), "Friday");
    }

    #[test]
    fn test_code_prefix() {
        assert_eq!(Weekday::new("Saturday").code_prefix().as_deref(), Some("sat"));
        assert_eq!(Weekday::new("fri").code_prefix().as_deref(), Some("fri"));
        // Too short or not ASCII letters
        assert_eq!(Weekday::new("So").code_prefix(), None);
        assert_eq!(Weekday::new("Måndag").code_prefix(), None);
        assert_eq!(Weekday::new("1st").code_prefix(), None);
    }

    #[test]
    fn test_booking_code_roundtrip() {
        for label in ["Friday", "Saturday", "Sunday", "Tuesday"] {
            let day = Weekday::new(label);
            for hour in 0..=23 {
                let code = BookingCode::new(&day, hour).unwrap();
                let reparsed = BookingCode::parse(&code.encode()).unwrap();
                assert_eq!(reparsed, code);
                assert_eq!(reparsed.hour(), hour);
                assert!(reparsed.matches_day(&day));
            }
        }
    }

    #[test]
    fn test_booking_code_parse_rejects_malformed() {
        for value in ["", "sat", "sat2", "sat211", "SAT21", "sa121", "satxx", "sat24"] {
            assert_eq!(BookingCode::parse(value), None, "{value:?} should not parse");
        }
    }

    #[test]
    fn test_booking_code_rejects_out_of_range_hour() {
        let day = Weekday::new("Friday");
        assert_eq!(BookingCode::new(&day, 24), None);
    }

    #[test]
    fn test_dinner_window_display() {
        assert_eq!(DinnerWindow::new(21).unwrap().to_string(), "21:00-22:00");
        assert_eq!(DinnerWindow::new(9).unwrap().to_string(), "09:00-10:00");
        assert_eq!(DinnerWindow::new(24), None);
    }

    #[test]
    fn test_plan_display() {
        let plan = Plan {
            day: Weekday::new("Saturday"),
            movie_title: "Keeping up with the Joneses".to_string(),
            movie_start: NaiveTime::from_hms_opt(19, 0, 0).unwrap(),
            dinner_window: DinnerWindow::new(21).unwrap(),
        };
        assert_eq!(
            plan.to_string(),
            "On Saturday, \"Keeping up with the Joneses\" begins at 19:00, \
             and there is a free table to book between 21:00-22:00"
        );
    }
}
