//! Per-key cache entry state.

use std::sync::Arc;
use std::time::Instant;

use netfeed_api_types::PostPage;

use super::events::Seq;

/// Snapshot of one cache slot. Pages are shared through `Arc`, so a clone is cheap and never
/// observes later patches.
#[derive(Debug, Clone, Default)]
pub struct CacheEntry {
    pub(crate) page: Option<Arc<PostPage>>,
    pub(crate) stale: bool,
    pub(crate) in_flight: bool,
    pub(crate) issued_seq: Seq,
    pub(crate) applied_seq: Seq,
    /// Highest sequence issued anywhere when the entry was invalidated; only a fetch issued
    /// after that point may clear `stale`.
    pub(crate) invalidated_at: Seq,
    pub(crate) last_error: Option<String>,
    pub(crate) updated_at: Option<Instant>,
}

impl CacheEntry {
    pub fn page(&self) -> Option<&Arc<PostPage>> {
        self.page.as_ref()
    }

    /// Explicitly invalidated; the next fetch waits for the network.
    pub fn is_stale(&self) -> bool {
        self.stale
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    /// Sequence number of the most recently issued fetch.
    pub fn issued_seq(&self) -> Seq {
        self.issued_seq
    }

    /// Sequence number of the fetch whose page is currently held.
    pub fn applied_seq(&self) -> Seq {
        self.applied_seq
    }

    /// Message of the last failed refresh, cleared by the next successful one.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn updated_at(&self) -> Option<Instant> {
        self.updated_at
    }

    /// Holds a page that may be served without waiting.
    pub fn is_fresh(&self) -> bool {
        self.page.is_some() && !self.stale
    }
}
