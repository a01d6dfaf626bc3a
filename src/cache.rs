//! Single-resource TTL cache over a slow or flaky fetch
//!
//! A [`ResilientCache`] holds at most one value. Reads inside the maximum age
//! are served from memory; otherwise the underlying fetch runs with retries
//! and exponential backoff. Concurrent callers that miss the cache share one
//! in-flight fetch and all observe its outcome. The fetch runs on its own
//! task, so it finishes even if every waiter goes away.
//!
//! A failed fetch is always reported. The previous entry, if any, is kept but
//! never handed out in place of the failure.

use crate::error::FetchError;
use anyhow::anyhow;
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

type FetchFn<T> = dyn Fn() -> BoxFuture<'static, anyhow::Result<T>> + Send + Sync;
type InFlight<T> = Shared<BoxFuture<'static, Result<T, FetchError>>>;

/// How a failing fetch is retried
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub attempts: u32,
    /// Delay before the first retry; doubles for every retry after it
    pub base_delay: Duration,
    /// Upper bound on a single attempt. An attempt that runs over counts as failed.
    pub attempt_timeout: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            base_delay: Duration::from_secs(1),
            attempt_timeout: None,
        }
    }
}

impl RetryPolicy {
    /// Backoff before retry number `retry` (0-based): base, 2*base, 4*base, ...
    #[must_use]
    pub fn delay_before_retry(&self, retry: u32) -> Duration {
        self.base_delay.saturating_mul(2_u32.saturating_pow(retry))
    }
}

/// Freshness and retry settings for a [`ResilientCache`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
    pub max_age: Duration,
    pub retry: RetryPolicy,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            max_age: Duration::from_secs(5 * 60),
            retry: RetryPolicy::default(),
        }
    }
}

/// A successfully fetched value
#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    pub value: T,
    /// Wall-clock time of the fetch, milliseconds since the Unix epoch
    pub fetched_at_epoch_ms: i64,
    fetched_at: Instant,
}

impl<T> CacheEntry<T> {
    fn new(value: T) -> Self {
        Self {
            value,
            fetched_at_epoch_ms: chrono::Utc::now().timestamp_millis(),
            fetched_at: Instant::now(),
        }
    }

    #[must_use]
    pub fn age(&self) -> Duration {
        self.fetched_at.elapsed()
    }
}

/// Observable lifecycle of a cache
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    /// Nothing fetched yet, or invalidated
    Empty,
    /// A fetch is in flight
    Fetching,
    /// Holding a value younger than the maximum age
    Fresh,
    /// Holding a value that has reached the maximum age
    Stale,
    /// The last fetch exhausted its retries
    Failed,
}

struct State<T> {
    entry: Option<CacheEntry<T>>,
    in_flight: Option<InFlight<T>>,
    /// Bumped on invalidate so detached fetches cannot write back
    generation: u64,
    last_failed: bool,
}

/// TTL cache for one logical resource
pub struct ResilientCache<T> {
    name: String,
    fetcher: Arc<FetchFn<T>>,
    policy: CachePolicy,
    state: Arc<Mutex<State<T>>>,
}

impl<T> ResilientCache<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create an empty cache around `fetcher`. `name` labels log output.
    pub fn new<F, Fut>(name: impl Into<String>, policy: CachePolicy, fetcher: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
    {
        Self {
            name: name.into(),
            fetcher: Arc::new(move || fetcher().boxed()),
            policy,
            state: Arc::new(Mutex::new(State {
                entry: None,
                in_flight: None,
                generation: 0,
                last_failed: false,
            })),
        }
    }

    #[must_use]
    pub fn policy(&self) -> &CachePolicy {
        &self.policy
    }

    /// Return the cached value if fresh, otherwise fetch it.
    ///
    /// With `force_refresh` the freshness check is skipped. A caller arriving
    /// while a fetch is already running waits for that fetch instead of
    /// starting another.
    #[tracing::instrument(name = "cache_fetch", level = "debug", skip(self), fields(cache = %self.name))]
    pub async fn fetch(&self, force_refresh: bool) -> Result<T, FetchError> {
        let in_flight = {
            let mut state = self.state.lock();
            if !force_refresh {
                if let Some(entry) = &state.entry {
                    if entry.age() < self.policy.max_age {
                        debug!("Entry found and still fresh");
                        return Ok(entry.value.clone());
                    }
                    debug!("Entry found but expired");
                }
            }
            match state.in_flight.clone() {
                Some(pending) => {
                    debug!("Joining in-flight fetch");
                    pending
                }
                None => {
                    let pending = self.start_fetch(state.generation);
                    state.in_flight = Some(pending.clone());
                    pending
                }
            }
        };
        in_flight.await
    }

    /// Fetch regardless of the cached entry's age
    pub async fn refresh(&self) -> Result<T, FetchError> {
        self.fetch(true).await
    }

    /// Drop the cached entry so the next fetch goes to the source.
    ///
    /// A fetch already in flight is detached: callers waiting on it still get
    /// its result, but it is not stored.
    pub fn invalidate(&self) {
        let mut state = self.state.lock();
        state.entry = None;
        state.in_flight = None;
        state.last_failed = false;
        state.generation = state.generation.wrapping_add(1);
        info!("Invalidated {} cache", self.name);
    }

    #[must_use]
    pub fn status(&self) -> CacheStatus {
        let state = self.state.lock();
        if state.in_flight.is_some() {
            return CacheStatus::Fetching;
        }
        match &state.entry {
            Some(entry) if entry.age() < self.policy.max_age => CacheStatus::Fresh,
            _ if state.last_failed => CacheStatus::Failed,
            Some(_) => CacheStatus::Stale,
            None => CacheStatus::Empty,
        }
    }

    /// When the held entry was fetched, if there is one
    #[must_use]
    pub fn entry_fetched_at_epoch_ms(&self) -> Option<i64> {
        self.state
            .lock()
            .entry
            .as_ref()
            .map(|entry| entry.fetched_at_epoch_ms)
    }

    /// The retry loop runs as its own task and completes even if every
    /// waiter drops its future.
    fn start_fetch(&self, generation: u64) -> InFlight<T> {
        let fetcher = Arc::clone(&self.fetcher);
        let shared_state = Arc::clone(&self.state);
        let retry = self.policy.retry;
        let name = self.name.clone();

        let driver = tokio::spawn(async move {
            let result = fetch_with_retry(&name, fetcher.as_ref(), retry).await;
            {
                let mut state = shared_state.lock();
                if state.generation == generation {
                    state.in_flight = None;
                    match &result {
                        Ok(value) => {
                            state.entry = Some(CacheEntry::new(value.clone()));
                            state.last_failed = false;
                        }
                        Err(_) => state.last_failed = true,
                    }
                } else {
                    debug!("Discarding result of detached {} fetch", name);
                }
            }
            result
        });

        let attempts = retry.attempts.max(1);
        let state = Arc::clone(&self.state);
        async move {
            driver.await.unwrap_or_else(|e| {
                let mut state = state.lock();
                if state.generation == generation {
                    state.in_flight = None;
                    state.last_failed = true;
                }
                Err(FetchError::new(attempts, format!("fetch task failed: {e}")))
            })
        }
        .boxed()
        .shared()
    }
}

async fn fetch_with_retry<T>(
    name: &str,
    fetcher: &FetchFn<T>,
    retry: RetryPolicy,
) -> Result<T, FetchError> {
    let max_attempts = retry.attempts.max(1);
    let started = Instant::now();
    let mut last_error = String::new();

    for attempt in 0..max_attempts {
        if attempt > 0 {
            let backoff = retry.delay_before_retry(attempt - 1);
            debug!("Exponential backoff: waiting {:.1}s", backoff.as_secs_f64());
            tokio::time::sleep(backoff).await;
        }

        debug!("Fetching {} (attempt {}/{})", name, attempt + 1, max_attempts);
        let outcome = match retry.attempt_timeout {
            Some(limit) => tokio::time::timeout(limit, run_attempt(fetcher))
                .await
                .unwrap_or_else(|_| {
                    Err(anyhow!(
                        "attempt timed out after {:.1}s",
                        limit.as_secs_f64()
                    ))
                }),
            None => run_attempt(fetcher).await,
        };

        match outcome {
            Ok(value) => {
                info!(
                    "Fetched {} in {:.3}s (attempt {})",
                    name,
                    started.elapsed().as_secs_f64(),
                    attempt + 1
                );
                return Ok(value);
            }
            Err(e) => {
                warn!("Fetch of {} failed on attempt {}: {:#}", name, attempt + 1, e);
                last_error = format!("{e:#}");
            }
        }
    }

    error!("Fetch of {} failed after {} attempts", name, max_attempts);
    Err(FetchError::new(max_attempts, last_error))
}

/// One call to the fetch function. A panic counts as a failed attempt.
async fn run_attempt<T>(fetcher: &FetchFn<T>) -> anyhow::Result<T> {
    match AssertUnwindSafe(async { fetcher().await }).catch_unwind().await {
        Ok(outcome) => outcome,
        Err(payload) => {
            let reason = payload
                .downcast_ref::<&str>()
                .map(|s| (*s).to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            Err(anyhow!("fetch panicked: {reason}"))
        }
    }
}
