//! Items - the normalized entities shared by every view.
//!
//! An item is a JSON object identified by one of its fields (`id` unless
//! configured otherwise). The [`ItemStore`] owns the only copy; views refer to
//! items by [`ItemId`].

mod store;

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

pub use store::ItemStore;

/// A cached entity.
pub type Item = Map<String, Value>;

/// Normalized entity id.
///
/// JSON strings are used as-is and numbers by their decimal form, so `1` and
/// `"1"` refer to the same item.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    pub fn new(id: impl Into<String>) -> Self {
        ItemId(id.into())
    }

    /// Extract an id from a JSON value. Only strings and numbers qualify.
    ///
    /// Integral floats unify with integers, so `1.0` names the same item as `1`.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(ItemId(s.clone())),
            Value::Number(n) => Some(ItemId(decimal(n))),
            _ => None,
        }
    }

    /// The id stored in `record` under `id_key`, if it has one.
    pub fn of(record: &Item, id_key: &str) -> Option<Self> {
        record.get(id_key).and_then(Self::from_value)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Largest magnitude below which every integral `f64` is exact.
const MAX_EXACT_FLOAT: f64 = 9_007_199_254_740_992.0;

fn decimal(n: &Number) -> String {
    match n.as_f64() {
        Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() < MAX_EXACT_FLOAT => {
            (f as i64).to_string()
        }
        _ => n.to_string(),
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ItemId {
    fn from(id: &str) -> Self {
        ItemId(id.to_string())
    }
}

impl From<String> for ItemId {
    fn from(id: String) -> Self {
        ItemId(id)
    }
}

impl From<&String> for ItemId {
    fn from(id: &String) -> Self {
        ItemId(id.clone())
    }
}

impl From<u64> for ItemId {
    fn from(id: u64) -> Self {
        ItemId(id.to_string())
    }
}

impl From<i64> for ItemId {
    fn from(id: i64) -> Self {
        ItemId(id.to_string())
    }
}

impl From<&ItemId> for ItemId {
    fn from(id: &ItemId) -> Self {
        id.clone()
    }
}
