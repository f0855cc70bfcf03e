//! Query cache for feed pages.
//!
//! Pages are cached per [`QueryKey`] and served stale-while-revalidate: a cached page is
//! returned immediately while a background task fetches a fresh copy. Mutations patch cached
//! pages in place through [`QueryCache::patch`], and every change is announced on a broadcast
//! channel ([`QueryCache::subscribe`]).
//!
//! ## Configuration
//!
//! ```toml
//! [cache]
//! event_capacity = 64
//! ```

mod config;
mod entry;
mod events;
mod keys;
mod lock;
mod store;

pub use config::{CacheConfig, DEFAULT_EVENT_CAPACITY};
pub use entry::CacheEntry;
pub use events::{CacheEvent, EventBus, Seq};
pub use keys::QueryKey;
pub use store::{Completion, FetchError, FetchTicket, QueryCache};
