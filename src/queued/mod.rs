//! Pending fetch coalescing.
//!
//! A read whose range is not cached attaches to the pending fetch for its
//! fetch key, opening one (and running the caller's getter) only if none is in
//! flight. When the getter settles, every attached caller re-reads its range
//! from the updated view or receives the same error.

mod fetch;
mod registry;
mod settle;

pub use fetch::Fetch;
pub use settle::Settle;

pub(crate) use registry::{PendingFetches, Reply, Ticket, Waiter};
