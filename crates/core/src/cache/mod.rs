//! Shared query cache.
//!
//! One `QueryCache` handle is created per session and cloned into every
//! query and mutation. Entries are keyed by [`QueryKey`], stay fresh for their
//! `stale_after` window and are refetched on the next read once stale or
//! invalidated. Concurrent reads of one key share a single request.

use crate::api::ApiError;
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::Instant;

pub mod key;

pub use key::{KeyPattern, QueryFamily, QueryKey};

const DEFAULT_RETRIES: u32 = 1;
const DEFAULT_RETRY_DELAY_MS: u64 = 1000;
const EVENT_CAPACITY: usize = 64;

type CachedValue = Arc<dyn Any + Send + Sync>;
type SharedFetch = Shared<BoxFuture<'static, Result<CachedValue, ApiError>>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryStatus {
    Idle,
    Fetching,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheEvent {
    Invalidated(QueryKey),
    Updated(QueryKey),
}

impl CacheEvent {
    pub fn key(&self) -> &QueryKey {
        match self {
            CacheEvent::Invalidated(k) | CacheEvent::Updated(k) => k,
        }
    }
}

/// Bounded retry with exponential backoff. Non-retryable errors (4xx,
/// validation, decode) fail on the first attempt.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub retries: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: DEFAULT_RETRIES,
            base_delay: Duration::from_millis(DEFAULT_RETRY_DELAY_MS),
        }
    }
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            retries: 0,
            base_delay: Duration::ZERO,
        }
    }

    pub fn from_env() -> Self {
        let mut out = Self::default();
        if let Some(n) = std::env::var("RECODASH_RETRIES")
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
        {
            out.retries = n;
        }
        out
    }

    async fn run<T, F, Fut>(&self, key: &QueryKey, fetcher: &F) -> Result<T, ApiError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match fetcher().await {
                Ok(v) => return Ok(v),
                Err(err) => {
                    if !err.is_retryable() || attempt > self.retries {
                        return Err(err);
                    }
                    let backoff = self.base_delay * (1u32 << (attempt - 1).min(16));
                    tracing::warn!(attempt, ?backoff, %key, error = %err, "query fetch failed; retrying");
                    tokio::time::sleep(backoff).await;
                }
            }
        }
    }
}

struct CacheEntry {
    data: Option<CachedValue>,
    error: Option<ApiError>,
    fetched_at: Option<Instant>,
    stale_after: Duration,
    status: EntryStatus,
    invalidated: bool,
    // Bumped by every invalidation or direct write; a response only lands if
    // the generation it started under is still current.
    generation: u64,
}

impl CacheEntry {
    fn new(stale_after: Duration) -> Self {
        Self {
            data: None,
            error: None,
            fetched_at: None,
            stale_after,
            status: EntryStatus::Idle,
            invalidated: false,
            generation: 0,
        }
    }

    fn is_stale(&self, now: Instant) -> bool {
        if self.invalidated {
            return true;
        }
        match self.fetched_at {
            Some(t) => now.duration_since(t) >= self.stale_after,
            None => true,
        }
    }
}

/// Read-only view of an entry for diagnostics and tests.
#[derive(Debug, Clone, PartialEq)]
pub struct EntrySnapshot {
    pub key: QueryKey,
    pub status: EntryStatus,
    pub fetched_at: Option<Instant>,
    pub stale_after: Duration,
    pub is_stale: bool,
    pub has_data: bool,
    pub error: Option<ApiError>,
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<QueryKey, CacheEntry>,
    in_flight: HashMap<QueryKey, (u64, SharedFetch)>,
}

#[derive(Clone)]
pub struct QueryCache {
    state: Arc<Mutex<CacheState>>,
    events: broadcast::Sender<CacheEvent>,
    retry: RetryPolicy,
}

impl std::fmt::Debug for QueryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("QueryCache")
            .field("entries", &state.entries.len())
            .field("in_flight", &state.in_flight.len())
            .field("retry", &self.retry)
            .finish()
    }
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new(RetryPolicy::default())
    }
}

impl QueryCache {
    pub fn new(retry: RetryPolicy) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            state: Arc::new(Mutex::new(CacheState::default())),
            events,
            retry,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CacheEvent> {
        self.events.subscribe()
    }

    /// Returns fresh cached data, joins an in-flight request for the same key,
    /// or starts a new one.
    pub async fn fetch<T, F, Fut>(
        &self,
        key: QueryKey,
        stale_after: Duration,
        fetcher: F,
    ) -> Result<Arc<T>, ApiError>
    where
        T: Send + Sync + 'static,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
    {
        let pending = {
            let mut state = self.state.lock();
            let now = Instant::now();

            if let Some(entry) = state.entries.get(&key) {
                if entry.status == EntryStatus::Success && !entry.is_stale(now) {
                    if let Some(data) = &entry.data {
                        tracing::debug!(%key, "query cache hit");
                        return downcast(&key, data.clone());
                    }
                }
            }

            match state.in_flight.get(&key) {
                Some((_, shared)) => {
                    tracing::debug!(%key, "joining in-flight query");
                    shared.clone()
                }
                None => {
                    let entry = state
                        .entries
                        .entry(key.clone())
                        .or_insert_with(|| CacheEntry::new(stale_after));
                    entry.status = EntryStatus::Fetching;
                    entry.stale_after = stale_after;
                    let generation = entry.generation;

                    tracing::debug!(%key, generation, "query cache miss; fetching");
                    let shared = self.start_fetch(key.clone(), generation, fetcher);
                    state
                        .in_flight
                        .insert(key.clone(), (generation, shared.clone()));
                    shared
                }
            }
        };

        let value = pending.await?;
        downcast(&key, value)
    }

    fn start_fetch<T, F, Fut>(&self, key: QueryKey, generation: u64, fetcher: F) -> SharedFetch
    where
        T: Send + Sync + 'static,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
    {
        // The in-flight map owns this future, so it must not keep the cache alive.
        let state = Arc::downgrade(&self.state);
        let events = self.events.clone();
        let retry = self.retry;

        async move {
            let result = retry
                .run(&key, &fetcher)
                .await
                .map(|v| Arc::new(v) as CachedValue);
            complete(&state, &events, &key, generation, &result);
            result
        }
        .boxed()
        .shared()
    }

    /// Data currently held for `key`, fresh or not.
    pub fn get_query_data<T: Send + Sync + 'static>(&self, key: &QueryKey) -> Option<Arc<T>> {
        let data = self.state.lock().entries.get(key)?.data.clone()?;
        data.downcast::<T>().ok()
    }

    /// Writes `value` as fresh data. Any request still in flight for the key
    /// is superseded.
    pub fn set_query_data<T: Send + Sync + 'static>(
        &self,
        key: QueryKey,
        value: T,
        stale_after: Duration,
    ) {
        {
            let mut state = self.state.lock();
            write_locked(&mut state, &key, Arc::new(value), stale_after);
        }
        let _ = self.events.send(CacheEvent::Updated(key));
    }

    pub fn invalidate(&self, pattern: KeyPattern) {
        self.invalidate_many(&[pattern]);
    }

    /// Marks every entry matching any pattern as stale in one step, so no
    /// reader can observe some of them refreshed and others not.
    pub fn invalidate_many(&self, patterns: &[KeyPattern]) {
        let keys = {
            let mut state = self.state.lock();
            invalidate_locked(&mut state, patterns)
        };
        self.announce_invalidated(keys);
    }

    /// Direct write plus invalidation under a single lock acquisition.
    pub fn set_and_invalidate<T: Send + Sync + 'static>(
        &self,
        key: QueryKey,
        value: T,
        stale_after: Duration,
        patterns: &[KeyPattern],
    ) {
        let keys = {
            let mut state = self.state.lock();
            write_locked(&mut state, &key, Arc::new(value), stale_after);
            invalidate_locked(&mut state, patterns)
        };
        let _ = self.events.send(CacheEvent::Updated(key));
        self.announce_invalidated(keys);
    }

    fn announce_invalidated(&self, keys: Vec<QueryKey>) {
        for key in keys {
            tracing::debug!(%key, "query invalidated");
            // No receivers is fine.
            let _ = self.events.send(CacheEvent::Invalidated(key));
        }
    }

    pub fn snapshot(&self, key: &QueryKey) -> Option<EntrySnapshot> {
        let state = self.state.lock();
        let entry = state.entries.get(key)?;
        Some(EntrySnapshot {
            key: key.clone(),
            status: entry.status,
            fetched_at: entry.fetched_at,
            stale_after: entry.stale_after,
            is_stale: entry.is_stale(Instant::now()),
            has_data: entry.data.is_some(),
            error: entry.error.clone(),
        })
    }

    /// Drops entries not refreshed within `max_age`. Entries with a request
    /// in flight are kept.
    pub fn prune(&self, max_age: Duration) -> usize {
        let mut state = self.state.lock();
        let now = Instant::now();
        let CacheState { entries, in_flight } = &mut *state;
        let before = entries.len();
        entries.retain(|key, entry| {
            in_flight.contains_key(key)
                || entry
                    .fetched_at
                    .map_or(true, |t| now.duration_since(t) < max_age)
        });
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn downcast<T: Send + Sync + 'static>(key: &QueryKey, value: CachedValue) -> Result<Arc<T>, ApiError> {
    value
        .downcast::<T>()
        .map_err(|_| ApiError::Decode(format!("cached value for {key} has an unexpected type")))
}

fn write_locked(state: &mut CacheState, key: &QueryKey, value: CachedValue, stale_after: Duration) {
    let entry = state
        .entries
        .entry(key.clone())
        .or_insert_with(|| CacheEntry::new(stale_after));
    entry.generation += 1;
    entry.data = Some(value);
    entry.error = None;
    entry.fetched_at = Some(Instant::now());
    entry.stale_after = stale_after;
    entry.status = EntryStatus::Success;
    entry.invalidated = false;
    state.in_flight.remove(key);
}

fn invalidate_locked(state: &mut CacheState, patterns: &[KeyPattern]) -> Vec<QueryKey> {
    let matches = |key: &QueryKey| patterns.iter().any(|p| p.matches(key));

    let mut keys = Vec::new();
    for (key, entry) in state.entries.iter_mut() {
        if !matches(key) {
            continue;
        }
        entry.invalidated = true;
        entry.generation += 1;
        if entry.status == EntryStatus::Fetching {
            entry.status = EntryStatus::Idle;
        }
        keys.push(key.clone());
    }
    state.in_flight.retain(|key, _| !matches(key));
    keys
}

fn complete(
    state: &Weak<Mutex<CacheState>>,
    events: &broadcast::Sender<CacheEvent>,
    key: &QueryKey,
    generation: u64,
    result: &Result<CachedValue, ApiError>,
) {
    let Some(state) = state.upgrade() else {
        return;
    };

    {
        let mut state = state.lock();
        if matches!(state.in_flight.get(key), Some((g, _)) if *g == generation) {
            state.in_flight.remove(key);
        }

        let Some(entry) = state.entries.get_mut(key) else {
            return;
        };
        if entry.generation != generation {
            tracing::debug!(%key, generation, current = entry.generation, "discarding superseded response");
            return;
        }

        match result {
            Ok(value) => {
                entry.data = Some(value.clone());
                entry.error = None;
                entry.fetched_at = Some(Instant::now());
                entry.status = EntryStatus::Success;
                entry.invalidated = false;
            }
            Err(err) => {
                entry.error = Some(err.clone());
                entry.status = EntryStatus::Error;
            }
        }
    }

    let _ = events.send(CacheEvent::Updated(key.clone()));
}
