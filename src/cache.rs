//! CollectionCache - the public operation surface.
//!
//! Ties the pieces together: options pick a view and a fetch key, the view
//! answers cached ranges, the pending fetch registry coalesces misses, and
//! every write goes through the item store so one entity is shared by every
//! view that contains it.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use futures::channel::oneshot;
use serde_json::Value;
use tracing::{debug, trace};

use crate::config::CacheConfig;
use crate::error::CacheError;
use crate::item::{Item, ItemId, ItemStore};
use crate::lock::mutex_lock;
use crate::options::{FetchKey, Options, Range, ViewKey};
use crate::queued::{Fetch, PendingFetches, Reply, Settle, Ticket, Waiter};
use crate::view::{Page, Slot, View};

/// Everything the cache holds. Only touched under [`Shared::state`].
struct CacheState {
    items: ItemStore,
    views: HashMap<ViewKey, View>,
    pending: PendingFetches,
}

impl CacheState {
    fn new(config: &CacheConfig) -> Self {
        Self {
            items: ItemStore::new(config.id_key.clone()),
            views: HashMap::new(),
            pending: PendingFetches::default(),
        }
    }

    /// Normalize one record: keyed objects go through the item store, anything
    /// else is kept in the slot as-is.
    fn slot_for(&mut self, record: Value) -> Slot {
        match record {
            Value::Object(object) => {
                let id = ItemId::of(&object, self.items.id_key());
                match id {
                    Some(id) => {
                        self.items.upsert(&id, object);
                        Slot::Entity(id)
                    }
                    None => Slot::Value(Value::Object(object)),
                }
            }
            other => Slot::Value(other),
        }
    }

    fn write_page(&mut self, view_key: &ViewKey, skip: usize, records: Vec<Value>) {
        let slots: Vec<Slot> = records
            .into_iter()
            .map(|record| self.slot_for(record))
            .collect();

        self.views
            .entry(view_key.clone())
            .or_insert_with(|| View::new(view_key.clone()))
            .write(skip, slots);
    }

    fn read_page(&self, view_key: &ViewKey, range: Range) -> Page {
        match self.views.get(view_key) {
            Some(view) => view
                .read(range.skip, range.limit)
                .into_iter()
                .map(|slot| self.resolve(slot))
                .collect(),
            None => vec![None; range.limit.unwrap_or(0)],
        }
    }

    fn resolve(&self, slot: Slot) -> Option<Value> {
        match slot {
            Slot::Absent => None,
            Slot::Entity(id) => self.items.get(&id).cloned().map(Value::Object),
            Slot::Value(value) => Some(value),
        }
    }

    fn is_satisfied(&self, view_key: &ViewKey, range: Range) -> bool {
        match self.views.get(view_key) {
            Some(view) => view.is_satisfied(range.skip, range.limit),
            None => range.limit == Some(0),
        }
    }
}

/// State shared by every clone of a [`CollectionCache`] and by outstanding
/// [`Settle`] handles.
pub(crate) struct Shared {
    config: CacheConfig,
    state: Mutex<CacheState>,
}

impl Shared {
    fn lock(&self, op: &'static str) -> MutexGuard<'_, CacheState> {
        mutex_lock(&self.state, op)
    }

    /// Apply a getter's outcome and answer everyone waiting on it.
    ///
    /// Ignored if `ticket` no longer owns the pending fetch for `key`, which
    /// happens after `destroy`. Waiters are answered in attachment order, after
    /// the lock is released.
    pub(crate) fn settle(&self, key: &FetchKey, ticket: Ticket, outcome: Result<Value, CacheError>) {
        let replies: Vec<(oneshot::Sender<Reply>, Reply)> = {
            let mut state = self.lock("settle");
            let Some(pending) = state.pending.take(key, ticket) else {
                debug!(fetch_key = %key, "Ignoring settlement of a fetch that is no longer pending");
                return;
            };

            let waiters = pending.waiters;
            match outcome {
                Ok(Value::Array(records)) => {
                    debug!(
                        fetch_key = %key,
                        records = records.len(),
                        waiters = waiters.len(),
                        "Pending fetch supplied"
                    );
                    state.write_page(&pending.view_key, pending.skip, records);
                    waiters
                        .into_iter()
                        .map(|waiter| {
                            let page = state.read_page(&pending.view_key, waiter.range);
                            (waiter.reply, Ok(page))
                        })
                        .collect()
                }
                Ok(other) => {
                    let error = CacheError::expected_array(&other);
                    debug!(fetch_key = %key, %error, "Pending fetch supplied an invalid payload");
                    fan_out(waiters, error)
                }
                Err(error) => {
                    debug!(fetch_key = %key, %error, "Pending fetch failed");
                    fan_out(waiters, error)
                }
            }
        };

        for (reply, result) in replies {
            // A caller that dropped its Fetch no longer wants the answer.
            let _ = reply.send(result);
        }
    }
}

fn fan_out(
    waiters: Vec<Waiter>,
    error: CacheError,
) -> Vec<(oneshot::Sender<Reply>, Reply)> {
    waiters
        .into_iter()
        .map(|waiter| (waiter.reply, Err(error.clone())))
        .collect()
}

/// In-process paginated collection cache.
///
/// Cheap to clone; clones share the same items, views and pending fetches.
///
/// ```
/// use collection_cache::{CollectionCache, Options};
/// use serde_json::json;
///
/// let cache = CollectionCache::default();
/// let by_date = Options::new().with("sort", "date");
///
/// cache.add(&by_date, json!([{ "id": "1", "title": "first" }])).unwrap();
/// cache.update("1", json!({ "title": "edited" })).unwrap();
///
/// let page = cache.get(&by_date.clone().skip(0).limit(1)).now().unwrap().unwrap();
/// assert_eq!(page[0].as_ref().unwrap()["title"], "edited");
/// ```
#[derive(Clone)]
pub struct CollectionCache {
    shared: Arc<Shared>,
}

impl Default for CollectionCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

impl fmt::Debug for CollectionCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CollectionCache")
            .field("config", &self.shared.config)
            .finish_non_exhaustive()
    }
}

impl CollectionCache {
    pub fn new(config: CacheConfig) -> Self {
        let state = CacheState::new(&config);
        Self {
            shared: Arc::new(Shared {
                config,
                state: Mutex::new(state),
            }),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.shared.config
    }

    /// Read the range named by `options` from cache.
    ///
    /// Resolves immediately on a cache hit, fails immediately with
    /// [`CacheError::MissingGetter`] on a miss unless a fetch for the same
    /// request is already pending, in which case it waits on that fetch.
    pub fn get(&self, options: &Options) -> Fetch {
        self.request(options, None::<fn(Settle)>)
    }

    /// Like [`get`](Self::get), but on a miss with nothing pending for this
    /// exact request, runs `getter` to load it.
    ///
    /// The getter runs at most once per outstanding request shape; concurrent
    /// callers with the same options wait on the first caller's fetch and
    /// their getters are never invoked.
    pub fn get_with<G>(&self, options: &Options, getter: G) -> Fetch
    where
        G: FnOnce(Settle),
    {
        self.request(options, Some(getter))
    }

    /// Everything cached for the view, from index 0 on.
    pub fn all(&self, options: &Options) -> Fetch {
        self.get(&options.unbounded(&self.shared.config))
    }

    pub fn all_with<G>(&self, options: &Options, getter: G) -> Fetch
    where
        G: FnOnce(Settle),
    {
        self.get_with(&options.unbounded(&self.shared.config), getter)
    }

    /// Write `data` into the view at the requested skip and return the
    /// written range as it now reads.
    ///
    /// `data` must be a JSON array. The whole page is applied before any other
    /// operation can observe the view.
    pub fn add(&self, options: &Options, data: Value) -> Result<Page, CacheError> {
        let records = match data {
            Value::Array(records) => records,
            other => return Err(CacheError::expected_array(&other)),
        };

        let config = &self.shared.config;
        let range = Range::from_options(options, config)?;
        let view_key = ViewKey::new(options, config);
        let written = Range::new(range.skip, Some(records.len()));

        let mut state = self.shared.lock("add");
        state.write_page(&view_key, range.skip, records);
        Ok(state.read_page(&view_key, written))
    }

    /// Merge `data` into the item `id`, creating it if needed.
    ///
    /// Every view holding `id` reads the merged item from now on.
    pub fn update(&self, id: impl Into<ItemId>, data: Value) -> Result<Item, CacheError> {
        let partial = match data {
            Value::Object(partial) => partial,
            other => return Err(CacheError::expected_object(&other)),
        };

        let id = id.into();
        let mut state = self.shared.lock("update");
        Ok(state.items.upsert(&id, partial).clone())
    }

    pub fn show(&self, id: impl Into<ItemId>) -> Option<Item> {
        let id = id.into();
        self.shared.lock("show").items.get(&id).cloned()
    }

    /// Every cached item, in the order first seen.
    pub fn list(&self) -> Vec<Item> {
        self.shared
            .lock("list")
            .items
            .list()
            .into_iter()
            .cloned()
            .collect()
    }

    /// Drop the item and every view slot referencing it.
    ///
    /// Views compact: entries after a removed slot move down one index.
    /// Returns true if the item existed.
    pub fn remove(&self, id: impl Into<ItemId>) -> bool {
        let id = id.into();
        let mut state = self.shared.lock("remove");

        let existed = state.items.remove(&id);
        let slots: usize = state
            .views
            .values_mut()
            .map(|view| view.remove_references(&id))
            .sum();

        debug!(id = %id, existed, slots, "Removed item");
        existed
    }

    /// Reset items, views and pending fetches.
    ///
    /// Outstanding fetches are abandoned: their getters may still settle, but
    /// the settlement is ignored and their waiters resolve with
    /// [`CacheError::Abandoned`].
    pub fn destroy(&self) {
        let mut state = self.shared.lock("destroy");
        let abandoned = state.pending.len();

        state.items.clear();
        state.views.clear();
        state.pending.clear();

        debug!(abandoned, "Destroyed collection cache");
    }

    /// Number of fetches currently in flight.
    pub fn pending_fetches(&self) -> usize {
        self.shared.lock("pending_fetches").pending.len()
    }

    /// Length of the view `options` selects: highest written index + 1.
    pub fn view_len(&self, options: &Options) -> usize {
        let view_key = ViewKey::new(options, &self.shared.config);
        self.shared
            .lock("view_len")
            .views
            .get(&view_key)
            .map_or(0, View::len)
    }

    fn request<G>(&self, options: &Options, getter: Option<G>) -> Fetch
    where
        G: FnOnce(Settle),
    {
        let config = &self.shared.config;
        let range = match Range::from_options(options, config) {
            Ok(range) => range,
            Err(error) => return Fetch::ready(Err(error)),
        };
        let view_key = ViewKey::new(options, config);
        let key = FetchKey::new(options, range, config);

        let (ticket, receiver, getter) = {
            let mut state = self.shared.lock("request");

            if state.is_satisfied(&view_key, range) {
                trace!(view = %view_key, skip = range.skip, limit = ?range.limit, "Cache hit");
                return Fetch::ready(Ok(state.read_page(&view_key, range)));
            }

            if let Some(receiver) = state.pending.attach(&key, range) {
                debug!(fetch_key = %key, "Coalesced onto pending fetch");
                return Fetch::waiting(receiver);
            }

            let Some(getter) = getter else {
                return Fetch::ready(Err(CacheError::MissingGetter));
            };

            debug_assert!(!state.pending.contains(&key));
            let (ticket, receiver) = state.pending.open(key.clone(), view_key, range);
            (ticket, receiver, getter)
        };

        debug!(fetch_key = %key, "Opened pending fetch");
        getter(Settle::new(Arc::clone(&self.shared), key, range, ticket));
        Fetch::waiting(receiver)
    }
}
