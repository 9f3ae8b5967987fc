use std::collections::HashMap;

use futures::channel::oneshot;

use crate::error::CacheError;
use crate::options::{FetchKey, Range, ViewKey};
use crate::view::Page;

pub(crate) type Reply = Result<Page, CacheError>;

/// Identifies one pending fetch across `destroy` calls.
///
/// A settlement only applies if both the generation and the fetch id still
/// match the registry's entry for its key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Ticket {
    generation: u64,
    id: u64,
}

/// A caller waiting on a pending fetch.
pub(crate) struct Waiter {
    pub(crate) range: Range,
    pub(crate) reply: oneshot::Sender<Reply>,
}

/// The single in-flight fetch for one fetch key.
pub(crate) struct PendingFetch {
    ticket: Ticket,
    pub(crate) view_key: ViewKey,
    pub(crate) skip: usize,
    pub(crate) waiters: Vec<Waiter>,
}

/// At most one [`PendingFetch`] per fetch key.
///
/// Entries are removed when they settle, so the registry only ever holds
/// in-flight requests.
#[derive(Default)]
pub(crate) struct PendingFetches {
    generation: u64,
    next_id: u64,
    fetches: HashMap<FetchKey, PendingFetch>,
}

impl PendingFetches {
    pub(crate) fn contains(&self, key: &FetchKey) -> bool {
        self.fetches.contains_key(key)
    }

    /// Register a new pending fetch with its opener as the first waiter.
    ///
    /// The caller must have checked that nothing is pending for `key`.
    pub(crate) fn open(
        &mut self,
        key: FetchKey,
        view_key: ViewKey,
        range: Range,
    ) -> (Ticket, oneshot::Receiver<Reply>) {
        self.next_id += 1;
        let ticket = Ticket {
            generation: self.generation,
            id: self.next_id,
        };
        let (reply, receiver) = oneshot::channel();
        self.fetches.insert(
            key,
            PendingFetch {
                ticket,
                view_key,
                skip: range.skip,
                waiters: vec![Waiter { range, reply }],
            },
        );
        (ticket, receiver)
    }

    /// Attach a waiter to the pending fetch for `key`, in arrival order.
    ///
    /// Returns `None` if nothing is pending for `key`.
    pub(crate) fn attach(
        &mut self,
        key: &FetchKey,
        range: Range,
    ) -> Option<oneshot::Receiver<Reply>> {
        let pending = self.fetches.get_mut(key)?;
        let (reply, receiver) = oneshot::channel();
        pending.waiters.push(Waiter { range, reply });
        Some(receiver)
    }

    /// Remove and return the pending fetch for `key` if `ticket` still owns it.
    pub(crate) fn take(&mut self, key: &FetchKey, ticket: Ticket) -> Option<PendingFetch> {
        match self.fetches.get(key) {
            Some(pending) if pending.ticket == ticket => self.fetches.remove(key),
            _ => None,
        }
    }

    /// Forget every pending fetch. Outstanding tickets go stale and their
    /// waiters' channels close.
    pub(crate) fn clear(&mut self) {
        self.generation += 1;
        self.fetches.clear();
    }

    pub(crate) fn len(&self) -> usize {
        self.fetches.len()
    }
}
