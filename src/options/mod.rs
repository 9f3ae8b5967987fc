//! Request options and the keys derived from them.
//!
//! Every request carries an option set: filter and sort fields plus the two
//! pagination fields named by [`CacheConfig`]. The non-pagination fields pick
//! the [`ViewKey`]; the full set picks the [`FetchKey`].

mod key;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::CacheConfig;
use crate::error::CacheError;

pub use key::{FetchKey, ViewKey, EMPTY_OPTIONS_KEY};

/// Filter, sort and pagination fields of a request.
///
/// Backed by a `BTreeMap`, so iteration (and therefore key serialization) is
/// always in sorted field order regardless of insertion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Options(BTreeMap<String, Value>);

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field, builder style.
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(field.into(), value.into());
        self
    }

    /// Set the default `skip` field. Use [`Options::with`] for a custom skip key.
    pub fn skip(self, skip: usize) -> Self {
        self.with("skip", skip)
    }

    /// Set the default `limit` field. Use [`Options::with`] for a custom limit key.
    pub fn limit(self, limit: usize) -> Self {
        self.with("limit", limit)
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(field.into(), value.into())
    }

    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.0.remove(field)
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// The same options with pagination reset to the full range.
    pub(crate) fn unbounded(&self, config: &CacheConfig) -> Self {
        let mut options = self.clone();
        options.insert(config.skip_key.clone(), 0);
        options.remove(&config.limit_key);
        options
    }
}

impl From<Map<String, Value>> for Options {
    fn from(map: Map<String, Value>) -> Self {
        Options(map.into_iter().collect())
    }
}

impl TryFrom<Value> for Options {
    type Error = CacheError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Ok(map.into()),
            Value::Null => Ok(Options::new()),
            other => Err(CacheError::InvalidOptions {
                key: String::new(),
                reason: format!("options must be an object, got {}", other),
            }),
        }
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Options {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Options(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// The index range a request asks for: `[skip, skip + limit)`, or everything
/// from `skip` on when `limit` is unset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Range {
    pub skip: usize,
    pub limit: Option<usize>,
}

impl Range {
    pub fn new(skip: usize, limit: Option<usize>) -> Self {
        Self { skip, limit }
    }

    /// Read the pagination fields named by `config`.
    ///
    /// A missing or `null` field takes its default (`skip = 0`, no limit).
    /// Anything other than a non-negative integer is rejected.
    pub fn from_options(options: &Options, config: &CacheConfig) -> Result<Self, CacheError> {
        let skip = read_index(options, &config.skip_key)?.unwrap_or(0);
        let limit = read_index(options, &config.limit_key)?;
        Ok(Range { skip, limit })
    }

    /// Exclusive end index, if bounded.
    pub fn end(&self) -> Option<usize> {
        self.limit.map(|limit| self.skip.saturating_add(limit))
    }
}

fn read_index(options: &Options, field: &str) -> Result<Option<usize>, CacheError> {
    match options.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_u64()
            .and_then(|n| usize::try_from(n).ok())
            .map(Some)
            .ok_or_else(|| CacheError::InvalidOptions {
                key: field.to_string(),
                reason: format!("expected a non-negative integer, got {}", n),
            }),
        Some(other) => Err(CacheError::InvalidOptions {
            key: field.to_string(),
            reason: format!("expected a non-negative integer, got {}", other),
        }),
    }
}
