//! Availability directory
//!
//! Answers "who is available near this point at this time" by combining the
//! cached roster, the weekly availability model and proximity ranking.

use crate::Result;
use crate::availability::is_available_at;
use crate::cache::{CachePolicy, CacheStatus, ResilientCache};
use crate::error::EngineError;
use crate::models::{GeoPoint, ParticipantId, RosterEntry, WeeklySchedule};
use crate::proximity::{RankedResult, nearest};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, info};

/// Source of the participant roster
#[async_trait]
pub trait RosterSupplier: Send + Sync {
    /// Load the full roster. May be slow and may fail.
    async fn fetch_roster(&self) -> anyhow::Result<Vec<RosterEntry>>;

    /// Insert or replace an entry. Returns `false` when the roster is owned
    /// by an external store and registration has to happen there.
    fn upsert(&self, _entry: RosterEntry) -> bool {
        false
    }
}

/// Roster kept in process memory
#[derive(Debug, Default)]
pub struct InMemoryRoster {
    entries: RwLock<Vec<RosterEntry>>,
}

impl InMemoryRoster {
    #[must_use]
    pub fn new(entries: Vec<RosterEntry>) -> Self {
        Self {
            entries: RwLock::new(entries),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[async_trait]
impl RosterSupplier for InMemoryRoster {
    async fn fetch_roster(&self) -> anyhow::Result<Vec<RosterEntry>> {
        Ok(self.entries.read().clone())
    }

    fn upsert(&self, entry: RosterEntry) -> bool {
        let mut entries = self.entries.write();
        match entries.iter_mut().find(|existing| existing.id == entry.id) {
            Some(existing) => *existing = entry,
            None => entries.push(entry),
        }
        true
    }
}

/// Directory of participants ranked by availability and distance
pub struct AvailabilityDirectory {
    supplier: Arc<dyn RosterSupplier>,
    roster: ResilientCache<Arc<Vec<RosterEntry>>>,
}

impl AvailabilityDirectory {
    /// Create a directory whose roster comes from `supplier`
    pub fn new(supplier: Arc<dyn RosterSupplier>, policy: CachePolicy) -> Self {
        let source = Arc::clone(&supplier);
        let roster = ResilientCache::new("roster", policy, move || {
            let source = Arc::clone(&source);
            async move { source.fetch_roster().await.map(Arc::new) }
        });
        Self { supplier, roster }
    }

    /// Create a directory backed by an initially empty [`InMemoryRoster`]
    #[must_use]
    pub fn in_memory(policy: CachePolicy) -> Self {
        Self::new(Arc::new(InMemoryRoster::default()), policy)
    }

    /// Register or update a participant.
    ///
    /// The change is picked up by the next roster fetch (expiry, refresh or
    /// invalidate). Externally sourced rosters ignore registration.
    pub fn register(
        &self,
        id: impl Into<ParticipantId>,
        schedule: WeeklySchedule,
        point: GeoPoint,
    ) -> Result<()> {
        self.register_entry(RosterEntry::new(id, schedule, point))
    }

    /// Register a full entry, passthrough fields included
    pub fn register_entry(&self, entry: RosterEntry) -> Result<()> {
        if entry.id.0.trim().is_empty() {
            return Err(EngineError::validation("participant id cannot be empty"));
        }
        let id = entry.id.clone();
        if self.supplier.upsert(entry) {
            debug!("Registered participant {}", id);
        } else {
            debug!("Roster is externally sourced, ignoring registration of {}", id);
        }
        Ok(())
    }

    /// Participants available at `at`, nearest to `point` first
    pub async fn query_available_near(
        &self,
        point: &GeoPoint,
        at: NaiveDateTime,
        max_results: usize,
    ) -> Result<Vec<RankedResult<ParticipantId>>> {
        let ranked = self.query_entries_near(point, at, max_results).await?;
        Ok(ranked
            .into_iter()
            .map(|result| result.map(|entry| entry.id))
            .collect())
    }

    /// Like [`Self::query_available_near`] but returns whole roster entries
    #[tracing::instrument(level = "debug", skip(self, point), fields(point = %point.format_coordinates()))]
    pub async fn query_entries_near(
        &self,
        point: &GeoPoint,
        at: NaiveDateTime,
        max_results: usize,
    ) -> Result<Vec<RankedResult<RosterEntry>>> {
        let roster = self.roster.fetch(false).await?;

        let available = roster
            .iter()
            .filter(|entry| is_available_at(&entry.schedule, at));
        let ranked: Vec<RankedResult<RosterEntry>> = nearest(point, available, max_results)
            .into_iter()
            .map(|result| result.map(Clone::clone))
            .collect();

        debug!(
            "{} of {} participants available near {}",
            ranked.len(),
            roster.len(),
            point.format_coordinates()
        );
        Ok(ranked)
    }

    /// Reload the roster from the supplier
    pub async fn refresh_roster(&self) -> Result<Arc<Vec<RosterEntry>>> {
        let roster = self.roster.refresh().await?;
        info!("Roster refreshed with {} participants", roster.len());
        Ok(roster)
    }

    /// Forget the cached roster
    pub fn invalidate_roster(&self) {
        self.roster.invalidate();
    }

    #[must_use]
    pub fn roster_status(&self) -> CacheStatus {
        self.roster.status()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::RetryPolicy;
    use crate::models::DayWindow;
    use chrono::NaiveDate;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct BrokenSupplier {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl RosterSupplier for BrokenSupplier {
        async fn fetch_roster(&self) -> anyhow::Result<Vec<RosterEntry>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            anyhow::bail!("document store unreachable")
        }
    }

    fn policy() -> CachePolicy {
        CachePolicy {
            max_age: Duration::from_secs(60),
            retry: RetryPolicy {
                attempts: 2,
                base_delay: Duration::from_millis(10),
                attempt_timeout: None,
            },
        }
    }

    fn point(lat: f64, lon: f64) -> GeoPoint {
        GeoPoint::new(lat, lon).unwrap()
    }

    /// 2024-01-02 is a Tuesday
    fn tuesday_at(hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    fn office_hours() -> WeeklySchedule {
        WeeklySchedule::every_day(DayWindow::parse("09:00", "17:00").unwrap())
    }

    #[tokio::test]
    async fn test_inactive_participant_excluded() {
        let roster = InMemoryRoster::new(vec![
            RosterEntry::new("A", office_hours(), point(40.00, -74.00)),
            RosterEntry::new("B", WeeklySchedule::inactive(), point(40.01, -74.01)),
        ]);
        let directory = AvailabilityDirectory::new(Arc::new(roster), policy());

        let results = directory
            .query_available_near(&point(40.00, -74.00), tuesday_at(10), 5)
            .await
            .unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].item, ParticipantId::from("A"));
        assert_eq!(results[0].distance_km, 0.0);
    }

    #[tokio::test]
    async fn test_nobody_available_is_empty_not_error() {
        let roster = InMemoryRoster::new(vec![RosterEntry::new(
            "A",
            office_hours(),
            point(40.0, -74.0),
        )]);
        let directory = AvailabilityDirectory::new(Arc::new(roster), policy());

        let results = directory
            .query_available_near(&point(40.0, -74.0), tuesday_at(20), 5)
            .await
            .unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_failure_propagates() {
        let supplier = Arc::new(BrokenSupplier {
            calls: AtomicUsize::new(0),
        });
        let directory = AvailabilityDirectory::new(supplier.clone(), policy());

        let err = directory
            .query_available_near(&point(0.0, 0.0), tuesday_at(10), 5)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Fetch(_)));
        assert_eq!(supplier.calls.load(Ordering::SeqCst), 2);
        assert_eq!(directory.roster_status(), CacheStatus::Failed);

        let err = directory.refresh_roster().await.unwrap_err();
        assert!(matches!(err, EngineError::Fetch(_)));
    }

    #[tokio::test]
    async fn test_registration_visible_after_refresh() {
        let directory = AvailabilityDirectory::in_memory(policy());
        let here = point(52.52, 13.40);

        assert!(directory
            .query_available_near(&here, tuesday_at(10), 5)
            .await
            .unwrap()
            .is_empty());

        directory.register("C", office_hours(), here).unwrap();
        // Cached roster is still the empty one
        assert!(directory
            .query_available_near(&here, tuesday_at(10), 5)
            .await
            .unwrap()
            .is_empty());

        assert_eq!(directory.refresh_roster().await.unwrap().len(), 1);
        let results = directory
            .query_available_near(&here, tuesday_at(10), 5)
            .await
            .unwrap();
        assert_eq!(results[0].item, ParticipantId::from("C"));
    }

    #[tokio::test]
    async fn test_register_replaces_existing_entry() {
        let roster = Arc::new(InMemoryRoster::default());
        let directory = AvailabilityDirectory::new(roster.clone(), policy());

        directory
            .register("D", WeeklySchedule::inactive(), point(1.0, 1.0))
            .unwrap();
        directory
            .register("D", office_hours(), point(1.0, 1.0))
            .unwrap();
        assert_eq!(roster.len(), 1);

        directory.invalidate_roster();
        let results = directory
            .query_available_near(&point(1.0, 1.0), tuesday_at(12), 5)
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn test_register_rejects_blank_id() {
        let directory = AvailabilityDirectory::in_memory(policy());
        let err = directory
            .register("  ", office_hours(), point(0.0, 0.0))
            .unwrap_err();
        assert!(matches!(err, EngineError::Validation { .. }));
    }

    #[test]
    fn test_external_supplier_ignores_registration() {
        let supplier = Arc::new(BrokenSupplier {
            calls: AtomicUsize::new(0),
        });
        let directory = AvailabilityDirectory::new(supplier.clone(), policy());
        assert!(directory
            .register("E", office_hours(), point(0.0, 0.0))
            .is_ok());
        assert_eq!(supplier.calls.load(Ordering::SeqCst), 0);
    }
}
