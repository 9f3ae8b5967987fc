//! View - a sparse, index-addressable projection for one view key.
//!
//! A view accumulates every page ever written for its key. Positions are
//! absolute; never-written positions hold [`Slot::Absent`].

use serde_json::Value;
use tracing::warn;

use crate::item::ItemId;
use crate::options::ViewKey;

/// One position in a view.
#[derive(Debug, Clone, PartialEq)]
pub enum Slot {
    /// Never written. Distinct from a written `null`.
    Absent,
    /// A reference into the item store.
    Entity(ItemId),
    /// A record with no id, kept as-is.
    Value(Value),
}

impl Slot {
    pub fn is_present(&self) -> bool {
        !matches!(self, Slot::Absent)
    }

    pub fn references(&self, id: &ItemId) -> bool {
        matches!(self, Slot::Entity(existing) if existing == id)
    }
}

/// Materialized range read. `None` marks an absent position.
pub type Page = Vec<Option<Value>>;

#[derive(Debug, Clone)]
pub struct View {
    key: ViewKey,
    slots: Vec<Slot>,
}

impl View {
    pub fn new(key: ViewKey) -> Self {
        Self {
            key,
            slots: Vec::new(),
        }
    }

    pub fn key(&self) -> &ViewKey {
        &self.key
    }

    /// Highest written index + 1.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Store `slots` at `skip, skip + 1, ...`, overwriting what was there.
    ///
    /// Writing past the end leaves the gap absent. A gap of more than one
    /// position is reported but allowed.
    pub fn write(&mut self, skip: usize, slots: impl IntoIterator<Item = Slot>) {
        if skip > self.slots.len() + 1 {
            warn!(
                view = %self.key,
                skip,
                len = self.slots.len(),
                "Sparse view write: skip is past the end of the cached data"
            );
        }

        for (offset, slot) in slots.into_iter().enumerate() {
            let index = skip + offset;
            if index >= self.slots.len() {
                self.slots.resize(index + 1, Slot::Absent);
            }
            self.slots[index] = slot;
        }
    }

    /// Slots in `[skip, skip + limit)`, or `[skip, len)` when `limit` is unset.
    ///
    /// A bounded read always returns `limit` slots; positions past the end
    /// come back absent.
    pub fn read(&self, skip: usize, limit: Option<usize>) -> Vec<Slot> {
        let end = match limit {
            Some(limit) => skip.saturating_add(limit),
            None => self.slots.len().max(skip),
        };

        (skip..end)
            .map(|index| self.slots.get(index).cloned().unwrap_or(Slot::Absent))
            .collect()
    }

    /// Drop every slot referencing `id`, shifting later slots down.
    ///
    /// Returns the number of slots removed. Absolute indices after a removed
    /// slot change.
    pub fn remove_references(&mut self, id: &ItemId) -> usize {
        let before = self.slots.len();
        self.slots.retain(|slot| !slot.references(id));
        before - self.slots.len()
    }

    /// Whether a read of this range can be served without fetching.
    ///
    /// Bounded: every position in the range is present. Unbounded: at least
    /// one position from `skip` on is present.
    pub fn is_satisfied(&self, skip: usize, limit: Option<usize>) -> bool {
        match limit {
            Some(limit) => {
                let end = skip.saturating_add(limit);
                end <= self.slots.len() && self.slots[skip..end].iter().all(Slot::is_present)
            }
            None => self
                .slots
                .get(skip..)
                .is_some_and(|tail| tail.iter().any(Slot::is_present)),
        }
    }
}
