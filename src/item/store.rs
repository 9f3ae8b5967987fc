//! ItemStore - the single normalized table of cached entities.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use serde_json::Value;

use super::{Item, ItemId};

/// Id-keyed table of items, iterated in insertion order.
///
/// Writes merge: the first write for an id creates the item, every later write
/// overlays its fields on the existing one.
#[derive(Debug, Clone)]
pub struct ItemStore {
    id_key: String,
    items: HashMap<ItemId, Item>,
    order: Vec<ItemId>,
}

impl ItemStore {
    pub fn new(id_key: impl Into<String>) -> Self {
        Self {
            id_key: id_key.into(),
            items: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Create or shallow-merge the item for `id` and return the canonical item.
    ///
    /// New fields win and unspecified fields are kept. The id field is never
    /// rewritten by a merge. A newly created item always carries `id` in its
    /// id field; `partial`'s own value is kept only if it names the same id.
    pub fn upsert(&mut self, id: &ItemId, partial: Item) -> &Item {
        match self.items.entry(id.clone()) {
            Entry::Occupied(entry) => {
                let item = entry.into_mut();
                for (field, value) in partial {
                    if field != self.id_key {
                        item.insert(field, value);
                    }
                }
                item
            }
            Entry::Vacant(entry) => {
                self.order.push(id.clone());
                let mut created = partial;
                if ItemId::of(&created, &self.id_key).as_ref() != Some(id) {
                    created.insert(self.id_key.clone(), Value::String(id.as_str().to_string()));
                }
                entry.insert(created)
            }
        }
    }

    pub fn id_key(&self) -> &str {
        &self.id_key
    }

    pub fn get(&self, id: &ItemId) -> Option<&Item> {
        self.items.get(id)
    }

    pub fn contains(&self, id: &ItemId) -> bool {
        self.items.contains_key(id)
    }

    /// Delete the item. Returns true if it existed.
    pub fn remove(&mut self, id: &ItemId) -> bool {
        if self.items.remove(id).is_none() {
            return false;
        }
        self.order.retain(|existing| existing != id);
        true
    }

    /// All items, in insertion order.
    pub fn list(&self) -> Vec<&Item> {
        self.order
            .iter()
            .filter_map(|id| self.items.get(id))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.order.clear();
    }
}
