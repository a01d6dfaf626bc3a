//! Weekly schedule model: weekdays, times of day and per-day windows

use crate::error::EngineError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

/// Minutes in a day; valid times of day are strictly below this.
pub const MINUTES_PER_DAY: u16 = 1440;

/// Day of the week, indexed from Sunday
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Weekday {
    Sunday,
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
}

impl Weekday {
    pub const ALL: [Weekday; 7] = [
        Weekday::Sunday,
        Weekday::Monday,
        Weekday::Tuesday,
        Weekday::Wednesday,
        Weekday::Thursday,
        Weekday::Friday,
        Weekday::Saturday,
    ];

    /// Days since Sunday (Sunday = 0)
    #[must_use]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Weekday for an index counted from Sunday; wraps every seven days
    #[must_use]
    pub fn from_index(index: usize) -> Self {
        Self::ALL[index % 7]
    }

    /// The weekday `days` after this one
    #[must_use]
    pub fn plus_days(self, days: usize) -> Self {
        Self::from_index(self.index() + days)
    }
}

impl From<chrono::Weekday> for Weekday {
    fn from(value: chrono::Weekday) -> Self {
        Self::from_index(value.num_days_from_sunday() as usize)
    }
}

impl fmt::Display for Weekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Weekday::Sunday => "Sunday",
            Weekday::Monday => "Monday",
            Weekday::Tuesday => "Tuesday",
            Weekday::Wednesday => "Wednesday",
            Weekday::Thursday => "Thursday",
            Weekday::Friday => "Friday",
            Weekday::Saturday => "Saturday",
        };
        f.write_str(name)
    }
}

/// Minutes since midnight, always below 1440
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TimeOfDay(u16);

impl TimeOfDay {
    pub const MIDNIGHT: TimeOfDay = TimeOfDay(0);
    pub const LAST_MINUTE: TimeOfDay = TimeOfDay(MINUTES_PER_DAY - 1);

    /// Create a time from minutes since midnight
    pub fn from_minutes(minutes: u32) -> Result<Self, EngineError> {
        if minutes >= u32::from(MINUTES_PER_DAY) {
            return Err(EngineError::validation(format!(
                "time of day must be below {MINUTES_PER_DAY} minutes, got {minutes}"
            )));
        }
        // Bounded by the check above.
        Ok(Self(minutes as u16))
    }

    /// Create a time from a 24-hour clock reading
    pub fn from_hm(hour: u32, minute: u32) -> Result<Self, EngineError> {
        if hour > 23 || minute > 59 {
            return Err(EngineError::validation(format!(
                "invalid clock time {hour:02}:{minute:02}"
            )));
        }
        Self::from_minutes(hour * 60 + minute)
    }

    #[must_use]
    pub fn minutes(self) -> u32 {
        u32::from(self.0)
    }

    #[must_use]
    pub fn hour(self) -> u32 {
        self.minutes() / 60
    }

    #[must_use]
    pub fn minute(self) -> u32 {
        self.minutes() % 60
    }
}

impl FromStr for TimeOfDay {
    type Err = EngineError;

    /// Parses a 24-hour `HH:MM` reading such as `"09:00"` or `"17:30"`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (hour, minute) = s
            .trim()
            .split_once(':')
            .ok_or_else(|| EngineError::validation(format!("expected HH:MM, got '{s}'")))?;
        let hour: u32 = hour
            .parse()
            .map_err(|_| EngineError::validation(format!("invalid hour in '{s}'")))?;
        let minute: u32 = minute
            .parse()
            .map_err(|_| EngineError::validation(format!("invalid minute in '{s}'")))?;
        Self::from_hm(hour, minute)
    }
}

impl TryFrom<String> for TimeOfDay {
    type Error = EngineError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TimeOfDay> for String {
    fn from(value: TimeOfDay) -> Self {
        value.to_string()
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}

/// One day's availability.
///
/// A window whose start equals its end carries no availability. A window
/// ending before it starts does not wrap past midnight and is also inactive.
/// All-day availability is spelled `00:00`-`23:59`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DayWindow {
    pub start: TimeOfDay,
    pub end: TimeOfDay,
}

impl DayWindow {
    pub const INACTIVE: DayWindow = DayWindow {
        start: TimeOfDay::MIDNIGHT,
        end: TimeOfDay::MIDNIGHT,
    };

    pub const ALL_DAY: DayWindow = DayWindow {
        start: TimeOfDay::MIDNIGHT,
        end: TimeOfDay::LAST_MINUTE,
    };

    #[must_use]
    pub fn new(start: TimeOfDay, end: TimeOfDay) -> Self {
        Self { start, end }
    }

    /// Parse a window from two `HH:MM` readings
    pub fn parse(start: &str, end: &str) -> Result<Self, EngineError> {
        Ok(Self::new(start.parse()?, end.parse()?))
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.start < self.end
    }

    /// Inclusive on both ends
    #[must_use]
    pub fn contains(&self, minute_of_day: u32) -> bool {
        self.is_active()
            && self.start.minutes() <= minute_of_day
            && minute_of_day <= self.end.minutes()
    }
}

/// Recurring weekly schedule with exactly one window per weekday
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    try_from = "BTreeMap<Weekday, DayWindow>",
    into = "BTreeMap<Weekday, DayWindow>"
)]
pub struct WeeklySchedule {
    days: [DayWindow; 7],
}

impl WeeklySchedule {
    /// Build a schedule from a per-day map; every weekday must be present
    pub fn from_map(days: &HashMap<Weekday, DayWindow>) -> Result<Self, EngineError> {
        Self::from_lookup(|day| days.get(&day).copied())
    }

    /// Same window on all seven days
    #[must_use]
    pub fn every_day(window: DayWindow) -> Self {
        Self { days: [window; 7] }
    }

    /// No availability on any day
    #[must_use]
    pub fn inactive() -> Self {
        Self::every_day(DayWindow::INACTIVE)
    }

    #[must_use]
    pub fn window(&self, day: Weekday) -> DayWindow {
        self.days[day.index()]
    }

    /// Replace one day's window
    #[must_use]
    pub fn with_window(mut self, day: Weekday, window: DayWindow) -> Self {
        self.days[day.index()] = window;
        self
    }

    /// Days in Sunday-first order paired with their windows
    pub fn iter(&self) -> impl Iterator<Item = (Weekday, DayWindow)> + '_ {
        Weekday::ALL.iter().map(|&day| (day, self.window(day)))
    }

    fn from_lookup(lookup: impl Fn(Weekday) -> Option<DayWindow>) -> Result<Self, EngineError> {
        let mut days = [DayWindow::INACTIVE; 7];
        let mut missing = Vec::new();
        for day in Weekday::ALL {
            match lookup(day) {
                Some(window) => days[day.index()] = window,
                None => missing.push(day.to_string()),
            }
        }
        if !missing.is_empty() {
            return Err(EngineError::validation(format!(
                "weekly schedule is missing: {}",
                missing.join(", ")
            )));
        }
        Ok(Self { days })
    }
}

impl TryFrom<BTreeMap<Weekday, DayWindow>> for WeeklySchedule {
    type Error = EngineError;

    fn try_from(value: BTreeMap<Weekday, DayWindow>) -> Result<Self, Self::Error> {
        Self::from_lookup(|day| value.get(&day).copied())
    }
}

impl From<WeeklySchedule> for BTreeMap<Weekday, DayWindow> {
    fn from(value: WeeklySchedule) -> Self {
        value.iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("00:00", 0)]
    #[case("09:00", 540)]
    #[case("17:30", 1050)]
    #[case("23:59", 1439)]
    fn test_parse_time_of_day(#[case] input: &str, #[case] minutes: u32) {
        let time: TimeOfDay = input.parse().unwrap();
        assert_eq!(time.minutes(), minutes);
        assert_eq!(time.to_string(), input);
    }

    #[rstest]
    #[case("24:00")]
    #[case("12:60")]
    #[case("noon")]
    #[case("9")]
    fn test_parse_time_of_day_rejects_garbage(#[case] input: &str) {
        let err = input.parse::<TimeOfDay>().unwrap_err();
        assert!(matches!(err, EngineError::Validation { .. }));
    }

    #[test]
    fn test_time_of_day_range() {
        assert!(TimeOfDay::from_minutes(1439).is_ok());
        assert!(TimeOfDay::from_minutes(1440).is_err());
    }

    #[test]
    fn test_window_activity() {
        assert!(!DayWindow::INACTIVE.is_active());
        assert!(DayWindow::ALL_DAY.is_active());
        // Overnight windows do not wrap
        let overnight = DayWindow::parse("22:00", "02:00").unwrap();
        assert!(!overnight.is_active());
        assert!(!overnight.contains(23 * 60));
    }

    #[test]
    fn test_weekday_from_chrono() {
        assert_eq!(Weekday::from(chrono::Weekday::Sun), Weekday::Sunday);
        assert_eq!(Weekday::from(chrono::Weekday::Tue), Weekday::Tuesday);
        assert_eq!(Weekday::Saturday.plus_days(1), Weekday::Sunday);
    }

    #[test]
    fn test_schedule_missing_day_is_rejected() {
        let mut days: HashMap<Weekday, DayWindow> = Weekday::ALL
            .iter()
            .map(|&day| (day, DayWindow::ALL_DAY))
            .collect();
        assert!(WeeklySchedule::from_map(&days).is_ok());

        days.remove(&Weekday::Wednesday);
        let err = WeeklySchedule::from_map(&days).unwrap_err();
        assert!(err.to_string().contains("Wednesday"));
    }

    #[test]
    fn test_schedule_deserialize_validates() {
        let complete = serde_json::json!({
            "sunday": {"start": "00:00", "end": "00:00"},
            "monday": {"start": "09:00", "end": "17:00"},
            "tuesday": {"start": "09:00", "end": "17:00"},
            "wednesday": {"start": "09:00", "end": "17:00"},
            "thursday": {"start": "09:00", "end": "17:00"},
            "friday": {"start": "09:00", "end": "12:00"},
            "saturday": {"start": "00:00", "end": "00:00"}
        });
        let schedule: WeeklySchedule = serde_json::from_value(complete.clone()).unwrap();
        assert_eq!(
            schedule.window(Weekday::Friday),
            DayWindow::parse("09:00", "12:00").unwrap()
        );

        let mut partial = complete;
        partial.as_object_mut().unwrap().remove("monday");
        assert!(serde_json::from_value::<WeeklySchedule>(partial).is_err());
    }
}
