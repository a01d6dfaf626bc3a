//! Data models for the availability engine
//!
//! This module contains the core domain models organized by concern:
//! - Schedule: weekdays, times of day and weekly availability windows
//! - Location: geographic points and catalog members
//! - Roster: participants as delivered by a roster supplier

pub mod location;
pub mod roster;
pub mod schedule;

// Re-export all public types for convenient access
pub use location::{GeoPoint, LocationEntry};
pub use roster::{ParticipantId, RosterEntry};
pub use schedule::{DayWindow, MINUTES_PER_DAY, TimeOfDay, Weekday, WeeklySchedule};
