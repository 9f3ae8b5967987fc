use std::borrow::Cow;
use std::fmt;

use serde_json::Value;

use super::{Options, Range};
use crate::config::CacheConfig;

/// Key used when a request carries no fields besides pagination, so every
/// unfiltered request shares one view.
pub const EMPTY_OPTIONS_KEY: &str = "__CACHE__";

/// Identifies a view: the request's options with pagination removed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ViewKey(String);

/// Identifies a pending fetch: the request's options including pagination.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FetchKey(String);

impl ViewKey {
    pub fn new(options: &Options, config: &CacheConfig) -> Self {
        ViewKey(serialize(
            options
                .iter()
                .filter(|(field, _)| !config.is_pagination(field)),
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FetchKey {
    /// Build from options and the range already parsed from them.
    ///
    /// Pagination is written in its canonical form, so `{}` and `{skip: 0}`
    /// name the same fetch.
    pub fn new(options: &Options, range: Range, config: &CacheConfig) -> Self {
        let mut canonical = options.clone();
        canonical.insert(config.skip_key.clone(), range.skip);
        match range.limit {
            Some(limit) => canonical.insert(config.limit_key.clone(), limit),
            None => canonical.remove(&config.limit_key),
        };
        FetchKey(serialize(canonical.iter()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ViewKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for FetchKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// `field=value` pairs joined by `&`. Callers pass fields in sorted order.
///
/// Values are compact JSON, so `"1"` and `1` stay distinct. `%`, `&` and `=`
/// are percent-escaped in both halves of a pair, so no field or value can
/// forge a separator.
fn serialize<'a>(fields: impl Iterator<Item = (&'a String, &'a Value)>) -> String {
    let pairs: Vec<String> = fields
        .map(|(field, value)| format!("{}={}", escape(field), escape(&value.to_string())))
        .collect();

    if pairs.is_empty() {
        EMPTY_OPTIONS_KEY.to_string()
    } else {
        pairs.join("&")
    }
}

fn escape(raw: &str) -> Cow<'_, str> {
    if !raw.contains(['%', '&', '=']) {
        return Cow::Borrowed(raw);
    }

    let mut escaped = String::with_capacity(raw.len() + 4);
    for c in raw.chars() {
        match c {
            '%' => escaped.push_str("%25"),
            '&' => escaped.push_str("%26"),
            '=' => escaped.push_str("%3D"),
            other => escaped.push(other),
        }
    }
    Cow::Owned(escaped)
}
