//! Schema Loader
//!
//! Fetches schema text from a [`SchemaSource`], parses it once and caches the
//! result for the loader's lifetime.
//!
//! ## Cache slots
//!
//! ```text
//! (absent) ──first request──► Pending ──fetch ok──────► Ready
//!                                │
//!                                ├────parse error──────► Failed (negative entry)
//!                                └────unavailable──────► (absent), next request retries
//! ```
//!
//! The fetch runs on its own task. Every caller that arrives while a slot is
//! `Pending` waits on the same watch channel, so one id is never fetched twice
//! concurrently, and a caller that gives up does not cancel the fetch.
//! Invalidating a `Pending` slot marks it stale: callers arriving afterwards
//! wait for the running fetch to finish, then start a fresh one.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::error::{Result, SchemaError};
use crate::schema::{SchemaDocument, SchemaId};
use crate::source::SchemaSource;

/// Default upper bound on one fetch
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

type Outcome = Result<Arc<SchemaDocument>>;

enum Slot {
    Ready(Arc<SchemaDocument>),
    Failed(SchemaError),
    Pending {
        ticket: u64,
        outcome: watch::Receiver<Option<Outcome>>,
        stale: bool,
    },
}

/// Counters describing loader activity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoaderStats {
    /// Fetches issued to the source
    pub fetches: u64,
    /// Requests answered from a ready or failed slot
    pub cache_hits: u64,
    /// Requests that joined a fetch already in flight
    pub coalesced: u64,
    /// Fetches that ended in an error
    pub failures: u64,
}

#[derive(Default)]
struct Counters {
    fetches: AtomicU64,
    cache_hits: AtomicU64,
    coalesced: AtomicU64,
    failures: AtomicU64,
}

struct LoaderInner {
    source: Arc<dyn SchemaSource>,
    fetch_timeout: Duration,
    slots: Mutex<HashMap<SchemaId, Slot>>,
    next_ticket: AtomicU64,
    counters: Counters,
}

/// Caching, coalescing schema loader
///
/// Cloning is cheap; clones share the cache.
#[derive(Clone)]
pub struct SchemaLoader {
    inner: Arc<LoaderInner>,
}

impl SchemaLoader {
    /// Create a loader over `source` with the default fetch timeout
    pub fn new(source: impl SchemaSource + 'static) -> Self {
        Self::from_shared(Arc::new(source), DEFAULT_FETCH_TIMEOUT)
    }

    /// Create a loader over a shared source
    pub fn from_shared(source: Arc<dyn SchemaSource>, fetch_timeout: Duration) -> Self {
        Self {
            inner: Arc::new(LoaderInner {
                source,
                fetch_timeout,
                slots: Mutex::new(HashMap::new()),
                next_ticket: AtomicU64::new(0),
                counters: Counters::default(),
            }),
        }
    }

    /// Replace the fetch timeout (only for loaders not yet shared)
    pub fn with_timeout(self, fetch_timeout: Duration) -> Self {
        Self::from_shared(Arc::clone(&self.inner.source), fetch_timeout)
    }

    pub fn fetch_timeout(&self) -> Duration {
        self.inner.fetch_timeout
    }

    pub fn source_name(&self) -> &str {
        self.inner.source.name()
    }

    /// Load a schema, fetching it on first use
    ///
    /// Returns the same `Arc` to every caller until the entry is invalidated.
    /// The fetch is spawned on the current tokio runtime; polled outside one,
    /// this returns [`SchemaError::SchemaUnavailable`] without fetching.
    pub async fn load_schema(&self, id: &SchemaId) -> Result<Arc<SchemaDocument>> {
        loop {
            let (ticket, mut waiter, stale) = {
                let mut slots = self.inner.lock_slots();
                match slots.get(id) {
                    Some(Slot::Ready(doc)) => {
                        self.inner.counters.cache_hits.fetch_add(1, Ordering::Relaxed);
                        debug!(schema_id = %id, "schema cache hit");
                        return Ok(Arc::clone(doc));
                    }
                    Some(Slot::Failed(err)) => {
                        self.inner.counters.cache_hits.fetch_add(1, Ordering::Relaxed);
                        debug!(schema_id = %id, "schema previously failed to parse");
                        return Err(err.clone());
                    }
                    Some(Slot::Pending {
                        ticket,
                        outcome,
                        stale,
                    }) => {
                        if *stale {
                            debug!(schema_id = %id, "waiting for invalidated fetch to finish");
                        } else {
                            self.inner.counters.coalesced.fetch_add(1, Ordering::Relaxed);
                            debug!(schema_id = %id, "joining schema fetch in flight");
                        }
                        (*ticket, outcome.clone(), *stale)
                    }
                    None => {
                        let runtime = Handle::try_current().map_err(|e| {
                            SchemaError::SchemaUnavailable {
                                schema_id: id.to_string(),
                                reason: format!("no async runtime to fetch on: {e}"),
                            }
                        })?;
                        let ticket = self.inner.next_ticket.fetch_add(1, Ordering::Relaxed);
                        let (tx, rx) = watch::channel(None);
                        slots.insert(
                            id.clone(),
                            Slot::Pending {
                                ticket,
                                outcome: rx.clone(),
                                stale: false,
                            },
                        );
                        self.spawn_fetch(&runtime, id.clone(), ticket, tx);
                        (ticket, rx, false)
                    }
                }
            };

            let settled = match waiter.wait_for(Option::is_some).await {
                Ok(value) => (*value).clone(),
                Err(_) => None,
            };

            match settled {
                // The stale fetch has settled and left its slot; fetch afresh.
                Some(_) if stale => continue,
                Some(result) => return result,
                None => {
                    // The fetch task went away without reporting (it panicked).
                    self.inner.abandon(id, ticket);
                    return Err(SchemaError::SchemaUnavailable {
                        schema_id: id.to_string(),
                        reason: "schema fetch ended without a result".to_string(),
                    });
                }
            }
        }
    }

    fn spawn_fetch(
        &self,
        runtime: &Handle,
        id: SchemaId,
        ticket: u64,
        tx: watch::Sender<Option<Outcome>>,
    ) {
        let inner = Arc::clone(&self.inner);
        runtime.spawn(async move {
            let outcome = inner.fetch(&id).await;
            inner.settle(&id, ticket, &outcome);
            tx.send_replace(Some(outcome));
        });
    }

    /// Cached document for `id`, without fetching
    pub fn cached(&self, id: &SchemaId) -> Option<Arc<SchemaDocument>> {
        match self.inner.lock_slots().get(id) {
            Some(Slot::Ready(doc)) => Some(Arc::clone(doc)),
            _ => None,
        }
    }

    /// Whether `id` has a ready document or a cached parse failure
    pub fn is_cached(&self, id: &SchemaId) -> bool {
        matches!(
            self.inner.lock_slots().get(id),
            Some(Slot::Ready(_)) | Some(Slot::Failed(_))
        )
    }

    /// Drop the cache entry for `id` (positive or negative)
    ///
    /// A fetch in flight still answers the callers already waiting on it but
    /// no longer populates the cache. Later callers wait for it to finish and
    /// then fetch again, so at most one fetch per id is ever running.
    /// Returns whether an entry was invalidated.
    pub fn invalidate(&self, id: &SchemaId) -> bool {
        let mut slots = self.inner.lock_slots();
        let invalidated = match slots.get_mut(id) {
            Some(Slot::Pending { stale, .. }) => {
                *stale = true;
                true
            }
            Some(_) => slots.remove(id).is_some(),
            None => false,
        };
        if invalidated {
            info!(schema_id = %id, "schema cache entry invalidated");
        }
        invalidated
    }

    /// Drop every cache entry
    pub fn invalidate_all(&self) {
        let mut slots = self.inner.lock_slots();
        info!(entries = slots.len(), "schema cache cleared");
        slots.retain(|_, slot| match slot {
            Slot::Pending { stale, .. } => {
                *stale = true;
                true
            }
            _ => false,
        });
    }

    pub fn stats(&self) -> LoaderStats {
        let counters = &self.inner.counters;
        LoaderStats {
            fetches: counters.fetches.load(Ordering::Relaxed),
            cache_hits: counters.cache_hits.load(Ordering::Relaxed),
            coalesced: counters.coalesced.load(Ordering::Relaxed),
            failures: counters.failures.load(Ordering::Relaxed),
        }
    }
}

impl LoaderInner {
    fn lock_slots(&self) -> MutexGuard<'_, HashMap<SchemaId, Slot>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn fetch(&self, id: &SchemaId) -> Outcome {
        self.counters.fetches.fetch_add(1, Ordering::Relaxed);
        debug!(schema_id = %id, source = self.source.name(), "fetching schema");

        let outcome = match tokio::time::timeout(self.fetch_timeout, self.source.fetch(id)).await {
            Ok(Ok(raw)) => SchemaDocument::parse(id.clone(), &raw).map(Arc::new),
            Ok(Err(e)) => Err(SchemaError::SchemaUnavailable {
                schema_id: id.to_string(),
                reason: format!("{e:#}"),
            }),
            Err(_) => Err(SchemaError::SchemaUnavailable {
                schema_id: id.to_string(),
                reason: format!("fetch timed out after {:?}", self.fetch_timeout),
            }),
        };

        match &outcome {
            Ok(doc) => info!(
                schema_id = %id,
                checksum = doc.checksum().short(),
                "schema loaded"
            ),
            Err(e) => {
                self.counters.failures.fetch_add(1, Ordering::Relaxed);
                warn!(schema_id = %id, error = %e, "schema load failed");
            }
        }
        outcome
    }

    /// Record a finished fetch, unless its slot was invalidated meanwhile
    fn settle(&self, id: &SchemaId, ticket: u64, outcome: &Outcome) {
        let mut slots = self.lock_slots();
        let stale = match slots.get(id) {
            Some(Slot::Pending { ticket: t, stale, .. }) if *t == ticket => *stale,
            _ => return,
        };
        if stale {
            debug!(schema_id = %id, "discarding result of invalidated fetch");
            slots.remove(id);
            return;
        }
        match outcome {
            Ok(doc) => {
                slots.insert(id.clone(), Slot::Ready(Arc::clone(doc)));
            }
            Err(err @ SchemaError::SchemaParse { .. }) => {
                slots.insert(id.clone(), Slot::Failed(err.clone()));
            }
            Err(_) => {
                slots.remove(id);
            }
        }
    }

    fn abandon(&self, id: &SchemaId, ticket: u64) {
        let mut slots = self.lock_slots();
        if matches!(slots.get(id), Some(Slot::Pending { ticket: t, .. }) if *t == ticket) {
            slots.remove(id);
        }
    }
}
