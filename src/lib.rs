//! In-process paginated collection cache.
//!
//! Caches fragments of a large ordered collection, keyed by a filter/sort
//! context plus a skip/limit range. Every page for one context lands in the
//! same sparse [`View`]; every keyed record lands in one shared [`ItemStore`],
//! so updating an entity updates it in every view at once. Concurrent misses
//! for the same request share a single fetch.
//!
//! ## Example
//!
//! ```
//! use collection_cache::{CollectionCache, Options};
//! use futures::executor::block_on;
//! use serde_json::json;
//!
//! let cache = CollectionCache::default();
//! let first_page = Options::new().with("sort", "date").skip(0).limit(2);
//!
//! let fetch = cache.get_with(&first_page, |settle| {
//!     // Normally handed off to an HTTP client or a database task.
//!     settle.supply(json!([{ "id": "a" }, { "id": "b" }]));
//! });
//! let page = block_on(fetch).unwrap();
//! assert_eq!(page.len(), 2);
//!
//! // Now cached: no getter needed.
//! assert!(cache.get(&first_page).now().unwrap().is_ok());
//! ```

mod cache;
mod config;
mod error;
mod item;
mod lock;
mod options;
mod queued;
mod view;

pub use cache::CollectionCache;
pub use config::CacheConfig;
pub use error::CacheError;
pub use item::{Item, ItemId, ItemStore};
pub use options::{FetchKey, Options, Range, ViewKey, EMPTY_OPTIONS_KEY};
pub use queued::{Fetch, Settle};
pub use view::{Page, Slot, View};
