use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use super::registry::Ticket;
use crate::cache::Shared;
use crate::error::CacheError;
use crate::options::{FetchKey, Range};

/// Single-use handle a getter settles its fetch through.
///
/// Exactly one of [`supply`](Settle::supply) or [`fail`](Settle::fail) should
/// be called, either inside the getter or later from another task or thread.
/// Both consume the handle. Dropping it unsettled abandons the fetch: every
/// waiting caller gets [`CacheError::Abandoned`] and the key can be fetched
/// again.
pub struct Settle {
    shared: Arc<Shared>,
    key: FetchKey,
    range: Range,
    ticket: Ticket,
    settled: bool,
}

impl Settle {
    pub(crate) fn new(shared: Arc<Shared>, key: FetchKey, range: Range, ticket: Ticket) -> Self {
        Self {
            shared,
            key,
            range,
            ticket,
            settled: false,
        }
    }

    /// The range this fetch should load.
    pub fn range(&self) -> Range {
        self.range
    }

    pub fn fetch_key(&self) -> &FetchKey {
        &self.key
    }

    /// Deliver the fetched records, in order, starting at the requested skip.
    ///
    /// Anything other than a JSON array fails the fetch with
    /// [`CacheError::InvalidPayload`].
    pub fn supply(mut self, records: impl Into<Value>) {
        self.settled = true;
        self.shared.settle(&self.key, self.ticket, Ok(records.into()));
    }

    /// Fail the fetch. Every waiting caller receives
    /// [`CacheError::GetterFailure`] with this message.
    pub fn fail(mut self, error: impl fmt::Display) {
        self.settled = true;
        self.shared.settle(
            &self.key,
            self.ticket,
            Err(CacheError::GetterFailure(error.to_string())),
        );
    }
}

impl Drop for Settle {
    fn drop(&mut self) {
        if !self.settled {
            self.shared
                .settle(&self.key, self.ticket, Err(CacheError::Abandoned));
        }
    }
}

impl fmt::Debug for Settle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settle")
            .field("key", &self.key)
            .field("range", &self.range)
            .field("settled", &self.settled)
            .finish()
    }
}
