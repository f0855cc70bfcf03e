//! Query cache storage.
//!
//! Holds one [`CacheEntry`] per [`QueryKey`]. Fetches are ordered by a process-wide sequence
//! counter: a completion only replaces the cached page when no newer fetch for the same key has
//! been applied, so out-of-order responses can never roll a page back.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Instant;

use metrics::counter;
use netfeed_api_types::PostPage;
use thiserror::Error;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::domain::types::FeedView;
use crate::infra::transport::ApiError;

use super::config::CacheConfig;
use super::entry::CacheEntry;
use super::events::{CacheEvent, EventBus, Seq};
use super::keys::QueryKey;
use super::lock::{mutex_lock, rw_read, rw_write};

const SOURCE: &str = "cache::store";

const METRIC_CACHE_HIT: &str = "netfeed_cache_hit_total";
const METRIC_CACHE_MISS: &str = "netfeed_cache_miss_total";
const METRIC_CACHE_STALE_DISCARD: &str = "netfeed_cache_stale_discard_total";

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FetchError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("fetch for `{key}` was superseded and no page is cached")]
    Superseded { key: QueryKey },
}

impl FetchError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Api(err) if err.is_cancelled())
    }
}

/// Handle for one issued fetch, returned by [`QueryCache::begin_fetch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    key: QueryKey,
    seq: Seq,
}

impl FetchTicket {
    pub fn key(&self) -> &QueryKey {
        &self.key
    }

    pub fn seq(&self) -> Seq {
        self.seq
    }
}

/// What [`QueryCache::complete_fetch`] did with a result.
#[derive(Debug, Clone, PartialEq)]
pub enum Completion {
    /// The page replaced the entry.
    Applied(Arc<PostPage>),
    /// A newer fetch had already been applied; `current` is the page that stays.
    Discarded { current: Option<Arc<PostPage>> },
    /// The fetch failed. The cached page, if any, is untouched.
    Failed(ApiError),
}

/// Cancellation scope of one key. Fetches for the key stop once the last watcher leaves.
#[derive(Debug, Default)]
struct KeyWatch {
    token: CancellationToken,
    watchers: usize,
}

impl KeyWatch {
    fn live_token(&mut self) -> CancellationToken {
        if self.token.is_cancelled() {
            self.token = CancellationToken::new();
        }
        self.token.clone()
    }

    fn cancel(&mut self) {
        self.token.cancel();
        self.token = CancellationToken::new();
    }
}

/// Stale-while-revalidate store of feed pages.
pub struct QueryCache {
    entries: RwLock<HashMap<QueryKey, CacheEntry>>,
    watches: Mutex<HashMap<QueryKey, KeyWatch>>,
    seq: AtomicU64,
    events: EventBus,
}

impl QueryCache {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            watches: Mutex::new(HashMap::new()),
            seq: AtomicU64::new(0),
            events: EventBus::new(config),
        }
    }

    pub fn get(&self, key: &QueryKey) -> Option<CacheEntry> {
        rw_read(&self.entries, SOURCE, "get").get(key).cloned()
    }

    /// Cached page for `key`, fresh or stale.
    pub fn page(&self, key: &QueryKey) -> Option<Arc<PostPage>> {
        rw_read(&self.entries, SOURCE, "page")
            .get(key)
            .and_then(|entry| entry.page.clone())
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CacheEvent> {
        self.events.subscribe()
    }

    /// Returns the page for `key`.
    ///
    /// A fresh cached page is returned at once while `fetcher` refreshes it on a background
    /// task. Otherwise the fetcher is awaited inline. Either way the fetch runs until the last
    /// watcher of `key` leaves (see [`QueryCache::unwatch`]) or [`QueryCache::cancel`] is called.
    pub async fn fetch<F>(
        self: &Arc<Self>,
        key: QueryKey,
        fetcher: F,
    ) -> Result<Arc<PostPage>, FetchError>
    where
        F: Future<Output = Result<PostPage, ApiError>> + Send + 'static,
    {
        let cached = rw_read(&self.entries, SOURCE, "fetch")
            .get(&key)
            .filter(|entry| entry.is_fresh())
            .and_then(|entry| entry.page.clone());

        let ticket = self.begin_fetch(&key);
        let token = self.refresh_token(&key);

        if let Some(page) = cached {
            counter!(METRIC_CACHE_HIT, "view" => key.view.as_str()).increment(1);
            debug!(key = %key, seq = ticket.seq, "Serving cached page; refreshing in background");

            let cache = Arc::clone(self);
            tokio::spawn(async move {
                let result = run_cancellable(&token, fetcher).await;
                cache.complete_fetch(ticket, result);
            });
            return Ok(page);
        }

        counter!(METRIC_CACHE_MISS, "view" => key.view.as_str()).increment(1);
        debug!(key = %key, seq = ticket.seq, "No fresh page cached; fetching");

        match self.complete_fetch(ticket, run_cancellable(&token, fetcher).await) {
            Completion::Applied(page) | Completion::Discarded {
                current: Some(page),
            } => Ok(page),
            Completion::Discarded { current: None } => Err(FetchError::Superseded { key }),
            Completion::Failed(err) => Err(err.into()),
        }
    }

    /// Issues the next sequence number for `key` and marks the entry in flight.
    pub fn begin_fetch(&self, key: &QueryKey) -> FetchTicket {
        let seq = self.next_seq();
        let mut entries = rw_write(&self.entries, SOURCE, "begin_fetch");
        let entry = entries.entry(key.clone()).or_default();
        entry.issued_seq = seq;
        entry.in_flight = true;

        FetchTicket {
            key: key.clone(),
            seq,
        }
    }

    /// Records the outcome of a fetch started with [`QueryCache::begin_fetch`].
    pub fn complete_fetch(
        &self,
        ticket: FetchTicket,
        result: Result<PostPage, ApiError>,
    ) -> Completion {
        let FetchTicket { key, seq } = ticket;
        let mut entries = rw_write(&self.entries, SOURCE, "complete_fetch");

        let Some(entry) = entries.get_mut(&key) else {
            debug!(key = %key, seq, "Entry removed while fetching; dropping result");
            return match result {
                Ok(_) => Completion::Discarded { current: None },
                Err(err) => Completion::Failed(err),
            };
        };

        if entry.issued_seq == seq {
            entry.in_flight = false;
        }

        match result {
            Ok(page) if seq > entry.applied_seq => {
                let page = Arc::new(page);
                entry.page = Some(Arc::clone(&page));
                entry.applied_seq = seq;
                entry.last_error = None;
                entry.updated_at = Some(Instant::now());
                if seq > entry.invalidated_at {
                    entry.stale = false;
                }
                drop(entries);

                debug!(key = %key, seq, posts = page.posts.len(), "Cache entry replaced");
                self.events.publish(CacheEvent::Replaced { key, seq });
                Completion::Applied(page)
            }
            Ok(_) => {
                let current = entry.page.clone();
                let applied = entry.applied_seq;
                drop(entries);

                counter!(METRIC_CACHE_STALE_DISCARD, "view" => key.view.as_str()).increment(1);
                info!(
                    key = %key,
                    seq,
                    applied_seq = applied,
                    "Discarding out-of-order fetch result"
                );
                self.events.publish(CacheEvent::Discarded { key, seq });
                Completion::Discarded { current }
            }
            Err(ApiError::Cancelled) => {
                debug!(key = %key, seq, "Fetch cancelled");
                Completion::Failed(ApiError::Cancelled)
            }
            Err(err) => {
                let message = err.to_string();
                if seq > entry.applied_seq {
                    entry.last_error = Some(message.clone());
                }
                let kept_page = entry.page.is_some();
                drop(entries);

                warn!(key = %key, seq, kept_page, error = %message, "Fetch failed");
                self.events.publish(CacheEvent::RefreshFailed { key, seq, message });
                Completion::Failed(err)
            }
        }
    }

    /// Applies `transform` to the cached page for `key` and swaps the result in.
    ///
    /// Returns `false` when nothing is cached for the key or the transform reports that its
    /// target is not on the page. Both cases are benign: the next fetch brings the server's copy.
    pub fn patch<F>(&self, key: &QueryKey, transform: F) -> bool
    where
        F: FnOnce(&PostPage) -> Option<PostPage>,
    {
        let mut entries = rw_write(&self.entries, SOURCE, "patch");
        let Some(entry) = entries.get_mut(key) else {
            debug!(key = %key, "Stale cache miss: key not cached");
            return false;
        };
        let Some(current) = entry.page.as_deref() else {
            debug!(key = %key, "Stale cache miss: no page cached yet");
            return false;
        };
        let Some(patched) = transform(current) else {
            debug!(key = %key, "Stale cache miss: target not on cached page");
            return false;
        };

        entry.page = Some(Arc::new(patched));
        // fetches issued before the patch carry pre-mutation data
        entry.applied_seq = entry.applied_seq.max(entry.issued_seq);
        entry.updated_at = Some(Instant::now());
        drop(entries);

        self.events.publish(CacheEvent::Patched { key: key.clone() });
        true
    }

    /// Stores `page` for `key` as if a fetch had just completed.
    /// Fetches still in flight for the key will be discarded when they complete.
    pub fn prime(&self, key: &QueryKey, page: PostPage) -> Arc<PostPage> {
        let seq = self.next_seq();
        let page = Arc::new(page);
        {
            let mut entries = rw_write(&self.entries, SOURCE, "prime");
            let entry = entries.entry(key.clone()).or_default();
            entry.page = Some(Arc::clone(&page));
            entry.issued_seq = seq;
            entry.applied_seq = seq;
            entry.in_flight = false;
            entry.stale = false;
            entry.last_error = None;
            entry.updated_at = Some(Instant::now());
        }

        self.events.publish(CacheEvent::Replaced {
            key: key.clone(),
            seq,
        });
        page
    }

    pub fn invalidate(&self, key: &QueryKey) {
        let marked = self.mark_stale(|candidate| candidate == key);
        debug!(key = %key, marked, "Invalidated cache key");
    }

    /// Marks every page of `view` stale.
    pub fn invalidate_view(&self, view: &FeedView) {
        let marked = self.mark_stale(|candidate| &candidate.view == view);
        debug!(view = %view, marked, "Invalidated cache view");
    }

    pub fn invalidate_all(&self) {
        let marked = self.mark_stale(|_| true);
        info!(marked, "Invalidated all cache entries");
    }

    fn mark_stale<P>(&self, matches: P) -> usize
    where
        P: Fn(&QueryKey) -> bool,
    {
        let horizon = self.seq.load(Ordering::SeqCst);
        let invalidated: Vec<QueryKey> = {
            let mut entries = rw_write(&self.entries, SOURCE, "invalidate");
            entries
                .iter_mut()
                .filter(|(key, _)| matches(key))
                .map(|(key, entry)| {
                    entry.stale = true;
                    entry.invalidated_at = horizon;
                    key.clone()
                })
                .collect()
        };

        let marked = invalidated.len();
        for key in invalidated {
            self.events.publish(CacheEvent::Invalidated { key });
        }
        marked
    }

    /// Registers interest in `key`. Each call must be paired with one [`QueryCache::unwatch`].
    pub fn watch(&self, key: &QueryKey) {
        let mut watches = mutex_lock(&self.watches, SOURCE, "watch");
        let watch = watches.entry(key.clone()).or_default();
        watch.watchers += 1;
        debug!(key = %key, watchers = watch.watchers, "Watching cache key");
    }

    /// Drops one watcher of `key`. When it was the last one, outstanding fetches for the key are
    /// cancelled and its in-flight flag is cleared; returns `true` in that case.
    pub fn unwatch(&self, key: &QueryKey) -> bool {
        {
            let mut watches = mutex_lock(&self.watches, SOURCE, "unwatch");
            let Some(watch) = watches.get_mut(key).filter(|watch| watch.watchers > 0) else {
                return false;
            };
            watch.watchers -= 1;
            if watch.watchers > 0 {
                debug!(key = %key, watchers = watch.watchers, "Cache key still watched");
                return false;
            }
            if let Some(watch) = watches.remove(key) {
                watch.token.cancel();
            }
        }
        self.clear_in_flight(key, "unwatch");
        debug!(key = %key, "Last watcher left; cancelled cache refresh");
        true
    }

    pub fn watchers(&self, key: &QueryKey) -> usize {
        mutex_lock(&self.watches, SOURCE, "watchers")
            .get(key)
            .map_or(0, |watch| watch.watchers)
    }

    /// Cancels outstanding fetches for `key` regardless of who is watching it, and clears its
    /// in-flight flag. The cached page stays.
    pub fn cancel(&self, key: &QueryKey) {
        if let Some(watch) = mutex_lock(&self.watches, SOURCE, "cancel").get_mut(key) {
            watch.cancel();
        }
        self.clear_in_flight(key, "cancel");
        debug!(key = %key, "Cancelled cache refresh");
    }

    fn clear_in_flight(&self, key: &QueryKey, op: &'static str) {
        if let Some(entry) = rw_write(&self.entries, SOURCE, op).get_mut(key) {
            entry.in_flight = false;
        }
    }

    pub fn remove(&self, key: &QueryKey) -> Option<CacheEntry> {
        if let Some(watch) = mutex_lock(&self.watches, SOURCE, "remove").get_mut(key) {
            watch.cancel();
        }
        let removed = rw_write(&self.entries, SOURCE, "remove").remove(key);
        if removed.is_some() {
            self.events
                .publish(CacheEvent::Removed { key: key.clone() });
        }
        removed
    }

    pub fn clear(&self) {
        for watch in mutex_lock(&self.watches, SOURCE, "clear").values_mut() {
            watch.cancel();
        }
        let removed: Vec<QueryKey> = rw_write(&self.entries, SOURCE, "clear")
            .drain()
            .map(|(key, _)| key)
            .collect();
        info!(removed = removed.len(), "Cleared query cache");
        for key in removed {
            self.events.publish(CacheEvent::Removed { key });
        }
    }

    pub fn len(&self) -> usize {
        rw_read(&self.entries, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn keys(&self) -> Vec<QueryKey> {
        rw_read(&self.entries, SOURCE, "keys")
            .keys()
            .cloned()
            .collect()
    }

    fn next_seq(&self) -> Seq {
        self.seq.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn refresh_token(&self, key: &QueryKey) -> CancellationToken {
        mutex_lock(&self.watches, SOURCE, "refresh_token")
            .entry(key.clone())
            .or_default()
            .live_token()
    }
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new(&CacheConfig::default())
    }
}

async fn run_cancellable<F>(token: &CancellationToken, fetcher: F) -> Result<PostPage, ApiError>
where
    F: Future<Output = Result<PostPage, ApiError>>,
{
    tokio::select! {
        () = token.cancelled() => Err(ApiError::Cancelled),
        result = fetcher => result,
    }
}
