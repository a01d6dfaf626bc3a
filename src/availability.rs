//! Weekly availability evaluation
//!
//! Pure functions over a [`WeeklySchedule`]. Every function takes the instant
//! to evaluate explicitly; periodic re-evaluation (for example a countdown
//! refreshed every minute) belongs to the caller. Instants are wall-clock
//! readings in the schedule's own local time.

use crate::models::{DayWindow, TimeOfDay, Weekday, WeeklySchedule};
use chrono::{Datelike, Duration, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

/// Days scanned by [`next_available_window`] when no horizon is given
pub const DEFAULT_HORIZON_DAYS: u32 = 7;

/// The next window in which a participant becomes available
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NextWindow {
    pub weekday: Weekday,
    pub window: DayWindow,
    /// Wall-clock instant at which the window opens
    pub starts_at: NaiveDateTime,
}

fn weekday_of(at: &NaiveDateTime) -> Weekday {
    Weekday::from(at.weekday())
}

fn minute_of_day(at: &NaiveDateTime) -> u32 {
    at.hour() * 60 + at.minute()
}

/// Whether the schedule has the participant available at `at`.
///
/// Both window bounds are inclusive at minute resolution.
#[must_use]
pub fn is_available_at(schedule: &WeeklySchedule, at: NaiveDateTime) -> bool {
    schedule
        .window(weekday_of(&at))
        .contains(minute_of_day(&at))
}

/// Minutes left in the current window, or `None` when not available
#[must_use]
pub fn remaining_minutes(schedule: &WeeklySchedule, at: NaiveDateTime) -> Option<u32> {
    let window = schedule.window(weekday_of(&at));
    let minute = minute_of_day(&at);
    window
        .contains(minute)
        .then(|| window.end.minutes() - minute)
}

/// First active window starting at or after `at` within `horizon_days` days.
///
/// A window on the current day whose start has already passed is skipped,
/// even when `at` falls inside it.
#[must_use]
pub fn next_available_window(
    schedule: &WeeklySchedule,
    at: NaiveDateTime,
    horizon_days: u32,
) -> Option<NextWindow> {
    let today = weekday_of(&at);
    let now = minute_of_day(&at);

    // Offsets past one week only repeat weekdays already seen
    (0..horizon_days.min(8)).find_map(|offset| {
        let weekday = today.plus_days(offset as usize);
        let window = schedule.window(weekday);
        if !window.is_active() {
            return None;
        }
        if offset == 0 && window.start.minutes() < now {
            return None;
        }
        let date = at.date() + Duration::days(i64::from(offset));
        let starts_at = date.and_hms_opt(window.start.hour(), window.start.minute(), 0)?;
        Some(NextWindow {
            weekday,
            window,
            starts_at,
        })
    })
}

/// Render minutes since midnight on a 12-hour clock, e.g. `"9:05 AM"`
#[must_use]
pub fn format_clock(minutes: u32) -> String {
    let minutes = minutes % 1440;
    let hour = minutes / 60;
    let suffix = if hour < 12 { "AM" } else { "PM" };
    let display_hour = match hour % 12 {
        0 => 12,
        h => h,
    };
    format!("{display_hour}:{:02} {suffix}", minutes % 60)
}

/// Render a window as `"9:00 AM - 5:00 PM"`, or `"Unavailable"`
#[must_use]
pub fn format_window(window: &DayWindow) -> String {
    if !window.is_active() {
        return "Unavailable".to_string();
    }
    format!(
        "{} - {}",
        format_clock(window.start.minutes()),
        format_clock(window.end.minutes())
    )
}

impl TimeOfDay {
    /// 12-hour clock rendering of this time
    #[must_use]
    pub fn to_clock_string(self) -> String {
        format_clock(self.minutes())
    }
}
