//! # Query Cache
//!
//! Keyed request cache with in-flight de-duplication, stale-while-revalidate
//! and invalidation.
//!
//! ## Read Path
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  get(key, opts, fetch)                                                  │
//! │                                                                         │
//! │  fresh data, not dirty ───────────────────────────► return cached       │
//! │                                                                         │
//! │  otherwise:                                                             │
//! │    fetch in flight (and newer than last invalidation) ─► join it        │
//! │    else dispatch fetch #seq as a detached task                          │
//! │                                                                         │
//! │    stale data + Background ──► return stale now (is_fetching = true)    │
//! │    no data / dirty / Blocking ──► wait for the fetch, return result     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Sequencing
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Every dispatched fetch takes the next value of a cache-wide counter.   │
//! │                                                                         │
//! │  result(seq) arrives:                                                   │
//! │    seq <= applied_seq ──► discarded (an older request lost the race)    │
//! │    Ok(v)              ──► data = v, status = Success, fresh for ttl     │
//! │    Err(e)             ──► status = Error, error = e, data kept          │
//! │                                                                         │
//! │  invalidate(key) records the highest seq dispatched so far; the entry   │
//! │  stays dirty until data from a later fetch lands.                       │
//! │                                                                         │
//! │  A new entry starts with applied_seq = counter, so fetches that were    │
//! │  running when the key was removed can never write into it.              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Fetches are never aborted: dropping the `get` future only stops waiting.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::error::{ClientError, ClientResult};

// =============================================================================
// Keys and Options
// =============================================================================

/// Cache key: request path plus query parameters sorted by name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryKey(String);

impl QueryKey {
    pub fn new(path: impl Into<String>) -> Self {
        QueryKey(path.into())
    }

    /// Builds a key whose text does not depend on parameter order.
    pub fn with_params<K, V>(path: &str, params: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let mut pairs: Vec<(String, String)> =
            params.into_iter().map(|(k, v)| (k.into(), v.into())).collect();
        if pairs.is_empty() {
            return QueryKey::new(path);
        }
        pairs.sort();

        let query = pairs
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&");
        QueryKey(format!("{path}?{query}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn starts_with(&self, prefix: &str) -> bool {
        self.0.starts_with(prefix)
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for QueryKey {
    fn from(path: &str) -> Self {
        QueryKey::new(path)
    }
}

/// What a read does when the cached value is past its TTL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Revalidate {
    /// Serve the stale value, refresh in the background.
    #[default]
    Background,
    /// Wait for the refresh.
    Blocking,
}

#[derive(Debug, Clone)]
pub struct QueryOptions {
    pub ttl: Duration,
    pub revalidate: Revalidate,
    /// Upper bound on one fetch; exceeding it records `ClientError::Timeout`.
    pub timeout: Duration,
}

impl Default for QueryOptions {
    fn default() -> Self {
        QueryOptions {
            ttl: Duration::from_secs(30),
            revalidate: Revalidate::Background,
            timeout: Duration::from_secs(20),
        }
    }
}

impl QueryOptions {
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn blocking(mut self) -> Self {
        self.revalidate = Revalidate::Blocking;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

// =============================================================================
// Snapshot
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStatus {
    Pending,
    Success,
    Error,
}

/// What a consumer sees for one key at one moment.
#[derive(Debug)]
pub struct CachedQuery<V> {
    pub key: QueryKey,
    /// Shared with every other consumer of the key.
    pub data: Option<Arc<V>>,
    pub status: QueryStatus,
    pub error: Option<ClientError>,
    pub stale_at: Option<Instant>,
    pub is_fetching: bool,
}

impl<V> Clone for CachedQuery<V> {
    fn clone(&self) -> Self {
        CachedQuery {
            key: self.key.clone(),
            data: self.data.clone(),
            status: self.status,
            error: self.error.clone(),
            stale_at: self.stale_at,
            is_fetching: self.is_fetching,
        }
    }
}

impl<V> CachedQuery<V> {
    fn pending(key: QueryKey) -> Self {
        CachedQuery {
            key,
            data: None,
            status: QueryStatus::Pending,
            error: None,
            stale_at: None,
            is_fetching: false,
        }
    }

    pub fn is_stale(&self) -> bool {
        self.stale_at.map_or(true, |at| Instant::now() >= at)
    }

    /// Data if any was ever loaded (possibly stale), otherwise the error.
    pub fn into_result(self) -> ClientResult<Arc<V>> {
        match (self.data, self.error) {
            (Some(data), _) => Ok(data),
            (None, Some(err)) => Err(err),
            (None, None) => Err(ClientError::Unavailable(format!(
                "query {} has no data yet",
                self.key
            ))),
        }
    }
}

// =============================================================================
// Cache
// =============================================================================

struct InFlight {
    seq: u64,
    done: watch::Receiver<bool>,
}

struct Entry<V> {
    data: Option<Arc<V>>,
    error: Option<ClientError>,
    status: QueryStatus,
    stale_at: Option<Instant>,
    applied_seq: u64,
    data_seq: u64,
    invalidated_seq: Option<u64>,
    in_flight: Option<InFlight>,
}

impl<V> Entry<V> {
    fn new(floor: u64) -> Self {
        Entry {
            data: None,
            error: None,
            status: QueryStatus::Pending,
            stale_at: None,
            applied_seq: floor,
            data_seq: floor,
            invalidated_seq: None,
            in_flight: None,
        }
    }

    fn is_dirty(&self) -> bool {
        self.invalidated_seq.is_some_and(|seq| self.data_seq <= seq)
    }

    fn is_fresh(&self, now: Instant) -> bool {
        self.data.is_some() && !self.is_dirty() && self.stale_at.is_some_and(|at| now < at)
    }

    fn snapshot(&self, key: &QueryKey) -> CachedQuery<V> {
        CachedQuery {
            key: key.clone(),
            data: self.data.clone(),
            status: self.status,
            error: self.error.clone(),
            stale_at: self.stale_at,
            is_fetching: self.in_flight.is_some(),
        }
    }
}

struct State<V> {
    entries: HashMap<QueryKey, Entry<V>>,
    last_seq: u64,
}

/// Shared request cache. Cloning yields another handle to the same cache.
pub struct QueryCache<V> {
    state: Arc<Mutex<State<V>>>,
}

impl<V> Clone for QueryCache<V> {
    fn clone(&self) -> Self {
        QueryCache {
            state: Arc::clone(&self.state),
        }
    }
}

impl<V> Default for QueryCache<V> {
    fn default() -> Self {
        QueryCache {
            state: Arc::new(Mutex::new(State {
                entries: HashMap::new(),
                last_seq: 0,
            })),
        }
    }
}

impl<V: Send + Sync + 'static> QueryCache<V> {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State<V>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the entry for `key`, fetching with `fetch` when it is missing,
    /// stale or invalidated. Concurrent callers share one fetch.
    pub async fn get<F, Fut>(&self, key: &QueryKey, opts: &QueryOptions, fetch: F) -> CachedQuery<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ClientResult<V>> + Send + 'static,
    {
        let mut done = {
            let mut state = self.lock();
            let floor = state.last_seq;
            let now = Instant::now();

            let entry = state.entries.entry(key.clone()).or_insert_with(|| Entry::new(floor));
            if entry.is_fresh(now) {
                return entry.snapshot(key);
            }

            let must_wait =
                entry.data.is_none() || entry.is_dirty() || opts.revalidate == Revalidate::Blocking;

            // A closed channel means the dispatching task is gone.
            let joinable = match (&entry.in_flight, entry.invalidated_seq) {
                (Some(flight), _) if flight.done.has_changed().is_err() => false,
                (Some(flight), Some(invalidated)) => flight.seq > invalidated,
                (Some(_), None) => true,
                (None, _) => false,
            };

            let done = if joinable {
                debug!(key = %key, "Joining in-flight fetch");
                entry
                    .in_flight
                    .as_ref()
                    .map(|flight| flight.done.clone())
            } else {
                None
            };

            let done = match done {
                Some(done) => done,
                None => {
                    state.last_seq += 1;
                    let seq = state.last_seq;
                    let (tx, rx) = watch::channel(false);
                    if let Some(entry) = state.entries.get_mut(key) {
                        entry.in_flight = Some(InFlight {
                            seq,
                            done: rx.clone(),
                        });
                    }
                    self.dispatch(key.clone(), seq, opts, fetch(), tx);
                    rx
                }
            };

            if !must_wait {
                return state
                    .entries
                    .get(key)
                    .map(|entry| entry.snapshot(key))
                    .unwrap_or_else(|| CachedQuery::pending(key.clone()));
            }
            done
        };

        // Err only if the fetch task died without reporting; the snapshot
        // below still reflects whatever state the entry is in.
        let _ = done.wait_for(|finished| *finished).await;

        self.peek(key).unwrap_or_else(|| CachedQuery::pending(key.clone()))
    }

    fn dispatch<Fut>(
        &self,
        key: QueryKey,
        seq: u64,
        opts: &QueryOptions,
        fut: Fut,
        done: watch::Sender<bool>,
    ) where
        Fut: Future<Output = ClientResult<V>> + Send + 'static,
    {
        let cache = self.clone();
        let timeout = opts.timeout;
        let ttl = opts.ttl;

        debug!(key = %key, seq, "Dispatching fetch");
        tokio::spawn(async move {
            // The fetch runs in its own task so a panic surfaces as a JoinError
            // here and the entry still leaves the in-flight state.
            let mut task = tokio::spawn(fut);
            let result = match tokio::time::timeout(timeout, &mut task).await {
                Ok(Ok(result)) => result,
                Ok(Err(err)) => {
                    warn!(key = %key, seq, error = %err, "Fetch task failed");
                    Err(ClientError::Transport(format!("fetch task failed: {err}")))
                }
                Err(_) => {
                    task.abort();
                    Err(ClientError::Timeout(timeout))
                }
            };
            cache.apply(&key, seq, ttl, result);
            let _ = done.send(true);
        });
    }

    fn apply(&self, key: &QueryKey, seq: u64, ttl: Duration, result: ClientResult<V>) {
        let mut state = self.lock();
        let Some(entry) = state.entries.get_mut(key) else {
            debug!(key = %key, seq, "Entry removed before fetch finished, dropping result");
            return;
        };

        if entry.in_flight.as_ref().is_some_and(|flight| flight.seq == seq) {
            entry.in_flight = None;
        }

        if seq <= entry.applied_seq {
            debug!(
                key = %key,
                seq,
                applied = entry.applied_seq,
                "Discarding out-of-order result"
            );
            return;
        }
        entry.applied_seq = seq;

        match result {
            Ok(value) => {
                entry.data = Some(Arc::new(value));
                entry.data_seq = seq;
                entry.status = QueryStatus::Success;
                entry.error = None;
                entry.stale_at = Some(Instant::now() + ttl);
            }
            Err(err) => {
                warn!(key = %key, seq, error = %err, "Query fetch failed");
                entry.status = QueryStatus::Error;
                entry.error = Some(err);
            }
        }
    }

    /// Current entry without triggering a fetch.
    pub fn peek(&self, key: &QueryKey) -> Option<CachedQuery<V>> {
        self.lock().entries.get(key).map(|entry| entry.snapshot(key))
    }

    /// Marks keys dirty; the next `get` on each refetches and waits.
    pub fn invalidate<'a>(&self, keys: impl IntoIterator<Item = &'a QueryKey>) -> usize {
        let mut state = self.lock();
        let mark = state.last_seq;
        let mut count = 0;
        for key in keys {
            if let Some(entry) = state.entries.get_mut(key) {
                entry.invalidated_seq = Some(mark);
                count += 1;
            }
        }
        debug!(count, "Invalidated queries");
        count
    }

    /// Marks every key whose text starts with `prefix` dirty.
    pub fn invalidate_prefix(&self, prefix: &str) -> usize {
        let mut state = self.lock();
        let mark = state.last_seq;
        let mut count = 0;
        for (_, entry) in state.entries.iter_mut().filter(|(key, _)| key.starts_with(prefix)) {
            entry.invalidated_seq = Some(mark);
            count += 1;
        }
        debug!(prefix, count, "Invalidated queries by prefix");
        count
    }

    pub fn remove(&self, key: &QueryKey) -> bool {
        self.lock().entries.remove(key).is_some()
    }

    /// Drops every entry. Results of fetches still running are discarded.
    pub fn clear(&self) {
        let mut state = self.lock();
        let count = state.entries.len();
        state.entries.clear();
        debug!(count, "Query cache cleared");
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    type BoxedFetch = std::pin::Pin<Box<dyn Future<Output = ClientResult<String>> + Send>>;

    fn counting_fetch(
        calls: &Arc<AtomicUsize>,
        delay: Duration,
        value: &'static str,
    ) -> impl FnOnce() -> BoxedFetch {
        let calls = Arc::clone(calls);
        move || -> BoxedFetch {
            Box::pin(async move {
                calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(delay).await;
                Ok(value.to_string())
            })
        }
    }

    fn failing_fetch() -> impl FnOnce() -> BoxedFetch {
        || -> BoxedFetch {
            Box::pin(async {
                Err(ClientError::Server {
                    status: 503,
                    message: "down".into(),
                })
            })
        }
    }

    fn panicking_fetch() -> impl FnOnce() -> BoxedFetch {
        fn explode() -> ClientResult<String> {
            panic!("fetch exploded")
        }
        || -> BoxedFetch { Box::pin(async { explode() }) }
    }

    #[test]
    fn test_key_params_are_canonical() {
        let a = QueryKey::with_params("/api/products", [("page", "2"), ("category", "c1")]);
        let b = QueryKey::with_params("/api/products", [("category", "c1"), ("page", "2")]);
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "/api/products?category=c1&page=2");

        let bare = QueryKey::with_params("/api/products", Vec::<(String, String)>::new());
        assert_eq!(bare.as_str(), "/api/products");
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_gets_share_one_fetch() {
        let cache = QueryCache::<String>::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let key = QueryKey::new("/api/dashboard");
        let opts = QueryOptions::default();

        let (a, b, c) = tokio::join!(
            cache.get(&key, &opts, counting_fetch(&calls, Duration::from_millis(50), "v1")),
            cache.get(&key, &opts, counting_fetch(&calls, Duration::from_millis(50), "v1")),
            cache.get(&key, &opts, counting_fetch(&calls, Duration::from_millis(50), "v1")),
        );

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(a.status, QueryStatus::Success);
        let (a, b, c) = (a.data.unwrap(), b.data.unwrap(), c.data.unwrap());
        assert!(Arc::ptr_eq(&a, &b));
        assert!(Arc::ptr_eq(&b, &c));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fresh_entry_is_served_from_cache() {
        let cache = QueryCache::<String>::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let key = QueryKey::new("/api/products");
        let opts = QueryOptions::default().with_ttl(Duration::from_secs(10));

        cache.get(&key, &opts, counting_fetch(&calls, Duration::ZERO, "v1")).await;
        tokio::time::advance(Duration::from_secs(5)).await;
        let second = cache.get(&key, &opts, counting_fetch(&calls, Duration::ZERO, "v2")).await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(second.data.as_deref().map(String::as_str), Some("v1"));
        assert!(!second.is_fetching);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_while_revalidate() {
        let cache = QueryCache::<String>::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let key = QueryKey::new("/api/sales");
        let opts = QueryOptions::default().with_ttl(Duration::from_secs(10));

        cache.get(&key, &opts, counting_fetch(&calls, Duration::ZERO, "v1")).await;
        tokio::time::advance(Duration::from_secs(11)).await;

        let stale = cache
            .get(&key, &opts, counting_fetch(&calls, Duration::from_millis(100), "v2"))
            .await;
        assert_eq!(stale.data.as_deref().map(String::as_str), Some("v1"));
        assert!(stale.is_fetching);

        tokio::time::sleep(Duration::from_millis(200)).await;
        let refreshed = cache.peek(&key).unwrap();
        assert_eq!(refreshed.data.as_deref().map(String::as_str), Some("v2"));
        assert!(!refreshed.is_fetching);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_blocking_revalidation_waits() {
        let cache = QueryCache::<String>::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let key = QueryKey::new("/api/company");
        let opts = QueryOptions::default()
            .with_ttl(Duration::from_secs(1))
            .blocking();

        cache.get(&key, &opts, counting_fetch(&calls, Duration::ZERO, "v1")).await;
        tokio::time::advance(Duration::from_secs(2)).await;

        let result = cache
            .get(&key, &opts, counting_fetch(&calls, Duration::from_millis(10), "v2"))
            .await;
        assert_eq!(result.data.as_deref().map(String::as_str), Some("v2"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_error_keeps_previous_data() {
        let cache = QueryCache::<String>::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let key = QueryKey::new("/api/categories");
        let opts = QueryOptions::default().with_ttl(Duration::from_secs(1)).blocking();

        cache.get(&key, &opts, counting_fetch(&calls, Duration::ZERO, "v1")).await;
        tokio::time::advance(Duration::from_secs(2)).await;

        let result = cache.get(&key, &opts, failing_fetch()).await;
        assert_eq!(result.status, QueryStatus::Error);
        assert!(matches!(result.error, Some(ClientError::Server { status: 503, .. })));
        assert_eq!(result.data.as_deref().map(String::as_str), Some("v1"));

        // Data is still handed out.
        assert_eq!(result.into_result().unwrap().as_str(), "v1");
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_fetch_error_surfaces() {
        let cache = QueryCache::<String>::new();
        let key = QueryKey::new("/api/suppliers");
        let result = cache.get(&key, &QueryOptions::default(), failing_fetch()).await;

        assert_eq!(result.status, QueryStatus::Error);
        assert!(result.data.is_none());
        assert!(result.into_result().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalidate_forces_blocking_refetch() {
        let cache = QueryCache::<String>::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let key = QueryKey::new("/api/products");
        let opts = QueryOptions::default().with_ttl(Duration::from_secs(60));

        cache.get(&key, &opts, counting_fetch(&calls, Duration::ZERO, "v1")).await;
        assert_eq!(cache.invalidate([&key]), 1);

        let result = cache
            .get(&key, &opts, counting_fetch(&calls, Duration::from_millis(10), "v2"))
            .await;
        assert_eq!(result.data.as_deref().map(String::as_str), Some("v2"));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalidate_prefix() {
        let cache = QueryCache::<String>::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let opts = QueryOptions::default();

        for path in ["/api/products", "/api/products/p1", "/api/sales"] {
            cache
                .get(&QueryKey::new(path), &opts, counting_fetch(&calls, Duration::ZERO, "v"))
                .await;
        }
        assert_eq!(cache.invalidate_prefix("/api/products"), 2);
        assert_eq!(cache.invalidate_prefix("/api/nothing"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_older_result_never_overwrites_newer() {
        let cache = QueryCache::<String>::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let key = QueryKey::new("/api/dashboard");
        let opts = QueryOptions::default();

        // Slow request dispatched first.
        let slow = {
            let cache = cache.clone();
            let key = key.clone();
            let opts = opts.clone();
            let fetch = counting_fetch(&calls, Duration::from_millis(500), "old");
            tokio::spawn(async move { cache.get(&key, &opts, fetch).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;

        // A mutation lands; a fresh request overtakes the slow one.
        cache.invalidate([&key]);
        let fast = cache
            .get(&key, &opts, counting_fetch(&calls, Duration::from_millis(10), "new"))
            .await;
        assert_eq!(fast.data.as_deref().map(String::as_str), Some("new"));

        slow.await.unwrap();
        let settled = cache.peek(&key).unwrap();
        assert_eq!(settled.data.as_deref().map(String::as_str), Some("new"));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_bounds_loading() {
        let cache = QueryCache::<String>::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let key = QueryKey::new("/api/sales");
        let opts = QueryOptions::default().with_timeout(Duration::from_secs(2));

        let result = cache
            .get(&key, &opts, counting_fetch(&calls, Duration::from_secs(60), "late"))
            .await;
        assert_eq!(result.status, QueryStatus::Error);
        assert_eq!(result.error, Some(ClientError::Timeout(Duration::from_secs(2))));
        assert!(!result.is_fetching);
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_discards_running_fetches() {
        let cache = QueryCache::<String>::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let key = QueryKey::new("/api/auth/me");
        let opts = QueryOptions::default();

        let pending = {
            let cache = cache.clone();
            let key = key.clone();
            let opts = opts.clone();
            let fetch = counting_fetch(&calls, Duration::from_millis(100), "previous-user");
            tokio::spawn(async move { cache.get(&key, &opts, fetch).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;

        cache.clear();
        assert!(cache.is_empty());

        // A new entry for the same key cannot receive the old result.
        let fresh = cache
            .get(&key, &opts, counting_fetch(&calls, Duration::from_millis(500), "next-user"))
            .await;
        pending.await.unwrap();

        assert_eq!(fresh.data.as_deref().map(String::as_str), Some("next-user"));
        assert_eq!(
            cache.peek(&key).unwrap().data.as_deref().map(String::as_str),
            Some("next-user")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_peek_and_remove() {
        let cache = QueryCache::<String>::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let key = QueryKey::new("/api/company");

        assert!(cache.peek(&key).is_none());
        cache
            .get(&key, &QueryOptions::default(), counting_fetch(&calls, Duration::ZERO, "acme"))
            .await;
        assert!(cache.peek(&key).is_some());
        assert!(cache.remove(&key));
        assert!(cache.peek(&key).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_panicking_fetch_does_not_leave_key_loading() {
        let cache = QueryCache::<String>::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let key = QueryKey::new("/api/products");
        let opts = QueryOptions::default();

        let first = cache.get(&key, &opts, panicking_fetch()).await;
        assert_eq!(first.status, QueryStatus::Error);
        assert!(!first.is_fetching);
        assert!(first.data.is_none());
        assert!(matches!(first.error, Some(ClientError::Transport(_))));

        tokio::time::advance(Duration::from_secs(3600)).await;
        let second = cache
            .get(&key, &opts, counting_fetch(&calls, Duration::from_millis(10), "ok"))
            .await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(second.status, QueryStatus::Success);
        assert!(!second.is_fetching);
        assert_eq!(second.data.as_deref().map(String::as_str), Some("ok"));
    }
}
