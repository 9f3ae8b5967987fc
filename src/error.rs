use thiserror::Error;

/// Errors surfaced by [`CollectionCache`](crate::CollectionCache) operations.
///
/// `Clone` so a single fetch failure can be handed to every caller coalesced
/// onto that fetch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheError {
    /// Data handed to `add`, `update` or `Settle::supply` had the wrong shape.
    #[error("invalid payload: expected {expected}, got {actual}")]
    InvalidPayload {
        expected: &'static str,
        actual: &'static str,
    },
    /// The requested range is not cached and no getter was supplied.
    #[error("range is not cached and no getter was supplied")]
    MissingGetter,
    /// The getter reported a failure through `Settle::fail`.
    #[error("getter failed: {0}")]
    GetterFailure(String),
    /// The fetch was dropped before it settled, or discarded by `destroy`.
    #[error("fetch was abandoned before it settled")]
    Abandoned,
    /// A pagination option held something other than a non-negative integer.
    #[error("invalid option `{key}`: {reason}")]
    InvalidOptions { key: String, reason: String },
}

impl CacheError {
    pub(crate) fn expected_array(actual: &serde_json::Value) -> Self {
        CacheError::InvalidPayload {
            expected: "an array",
            actual: json_kind(actual),
        }
    }

    pub(crate) fn expected_object(actual: &serde_json::Value) -> Self {
        CacheError::InvalidPayload {
            expected: "an object",
            actual: json_kind(actual),
        }
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}
