//! Availability & proximity engine
//!
//! This library decides which participants, each holding a recurring weekly
//! availability calendar and a geographic point, are reachable at a given
//! moment and ranks them by distance from a reference location. The roster is
//! loaded through a cache that tolerates a slow or flaky upstream.

pub mod availability;
pub mod cache;
pub mod config;
pub mod directory;
pub mod error;
pub mod logging;
pub mod models;
pub mod proximity;

// Re-export core types for public API
pub use availability::{
    NextWindow, format_clock, format_window, is_available_at, next_available_window,
    remaining_minutes,
};
pub use cache::{CacheEntry, CachePolicy, CacheStatus, ResilientCache, RetryPolicy};
pub use self::config::EngineConfig;
pub use directory::{AvailabilityDirectory, InMemoryRoster, RosterSupplier};
pub use error::{EngineError, FetchError};
pub use models::{
    DayWindow, GeoPoint, LocationEntry, ParticipantId, RosterEntry, TimeOfDay, Weekday,
    WeeklySchedule,
};
pub use proximity::{Located, RankedResult, distance_km, nearest, within_radius};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Core result type used throughout the library
pub type Result<T> = std::result::Result<T, EngineError>;
