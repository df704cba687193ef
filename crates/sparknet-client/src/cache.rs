//! Keyed cache for contract reads.
//!
//! Entries are addressed by a [`QueryKey`] of ordered segments and expire
//! after a fixed freshness window. Writes invalidate by key prefix. A fetch
//! that was in flight when its entry was invalidated does not store its
//! result.

use crate::error::Result;
use crate::value::Value;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, trace};

/// Cache key: an ordered list of segments such as
/// `["rentals", "consumer", "G…"]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey(Vec<String>);

impl QueryKey {
    /// Create a key from segments.
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(segments.into_iter().map(Into::into).collect())
    }

    /// The segments.
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// Whether `prefix` matches the leading segments of this key.
    #[must_use]
    pub fn starts_with(&self, prefix: &Self) -> bool {
        self.0.starts_with(&prefix.0)
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("/"))
    }
}

/// Observable state of one cache entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryStatus {
    /// Never fetched, or invalidated.
    Idle,
    /// A fetch is in flight.
    Loading,
    /// Last fetch succeeded.
    Success(Value),
    /// Last fetch failed.
    Error(String),
}

impl QueryStatus {
    /// Whether a fetch is in flight.
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }
}

struct Entry {
    status: QueryStatus,
    updated_at: Instant,
    // Identifies the fetch that owns a Loading entry.
    ticket: u64,
}

#[derive(Default)]
struct Inner {
    entries: HashMap<QueryKey, Entry>,
    next_ticket: u64,
}

/// Thread-safe query cache.
pub struct QueryCache {
    inner: Mutex<Inner>,
    stale_after: Duration,
}

impl QueryCache {
    /// Create a cache whose successful entries stay fresh for `stale_after`.
    #[must_use]
    pub fn new(stale_after: Duration) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            stale_after,
        }
    }

    /// Return the cached value for `key` if fresh, otherwise run `loader`.
    ///
    /// The loader's result is always returned to the caller. Its value or
    /// error message is stored unless the entry was invalidated or
    /// re-fetched while it ran.
    ///
    /// # Errors
    ///
    /// Returns the loader's error.
    pub async fn fetch<F, Fut>(&self, key: QueryKey, loader: F) -> Result<Value>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Value>>,
    {
        let ticket = {
            let mut inner = self.inner.lock();
            if let Some(value) = inner.entries.get(&key).and_then(|e| self.fresh_value(e)) {
                trace!(%key, "cache hit");
                return Ok(value);
            }
            inner.next_ticket += 1;
            let ticket = inner.next_ticket;
            inner.entries.insert(
                key.clone(),
                Entry {
                    status: QueryStatus::Loading,
                    updated_at: Instant::now(),
                    ticket,
                },
            );
            ticket
        };

        debug!(%key, "cache miss, loading");
        let result = loader().await;

        let mut inner = self.inner.lock();
        match inner.entries.get_mut(&key) {
            Some(entry) if entry.ticket == ticket => {
                entry.status = match &result {
                    Ok(value) => QueryStatus::Success(value.clone()),
                    Err(e) => QueryStatus::Error(e.to_string()),
                };
                entry.updated_at = Instant::now();
            }
            _ => debug!(%key, "entry changed while loading, result not stored"),
        }
        result
    }

    fn fresh_value(&self, entry: &Entry) -> Option<Value> {
        match &entry.status {
            QueryStatus::Success(value) if entry.updated_at.elapsed() < self.stale_after => {
                Some(value.clone())
            }
            _ => None,
        }
    }

    /// Drop every entry whose key starts with `prefix`.
    ///
    /// Returns the number of entries removed.
    pub fn invalidate(&self, prefix: &QueryKey) -> usize {
        let mut inner = self.inner.lock();
        let before = inner.entries.len();
        inner.entries.retain(|key, _| !key.starts_with(prefix));
        let removed = before - inner.entries.len();
        debug!(%prefix, removed, "cache invalidated");
        removed
    }

    /// Current status of `key`.
    #[must_use]
    pub fn status(&self, key: &QueryKey) -> QueryStatus {
        self.inner
            .lock()
            .entries
            .get(key)
            .map_or(QueryStatus::Idle, |e| e.status.clone())
    }

    /// Number of entries, in any state.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    /// Whether the cache holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for QueryCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryCache")
            .field("entries", &self.len())
            .field("stale_after", &self.stale_after)
            .finish()
    }
}
