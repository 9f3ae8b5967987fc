//! Cache configuration.
//!
//! Names the record field that identifies an entity and the two option fields
//! that carry pagination. Deserializable so it can live in an application's
//! own config file:
//!
//! ```toml
//! [collection_cache]
//! id_key = "_id"
//! skip_key = "offset"
//! ```

use serde::{Deserialize, Serialize};

const DEFAULT_ID_KEY: &str = "id";
const DEFAULT_SKIP_KEY: &str = "skip";
const DEFAULT_LIMIT_KEY: &str = "limit";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Record field holding the entity id.
    pub id_key: String,
    /// Option field holding the start index of a request.
    pub skip_key: String,
    /// Option field holding the length of a request.
    pub limit_key: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            id_key: DEFAULT_ID_KEY.to_string(),
            skip_key: DEFAULT_SKIP_KEY.to_string(),
            limit_key: DEFAULT_LIMIT_KEY.to_string(),
        }
    }
}

impl CacheConfig {
    pub fn with_id_key(mut self, key: impl Into<String>) -> Self {
        self.id_key = key.into();
        self
    }

    pub fn with_skip_key(mut self, key: impl Into<String>) -> Self {
        self.skip_key = key.into();
        self
    }

    pub fn with_limit_key(mut self, key: impl Into<String>) -> Self {
        self.limit_key = key.into();
        self
    }

    /// True if `field` is one of the two pagination fields.
    pub(crate) fn is_pagination(&self, field: &str) -> bool {
        field == self.skip_key || field == self.limit_key
    }
}
