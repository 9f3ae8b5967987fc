use std::sync::{Mutex, MutexGuard};

use tracing::warn;

/// Lock the cache state, recovering from poisoning.
///
/// Every critical section over the cache state is short and leaves the state
/// consistent before it can panic, so a poisoned guard is still usable.
pub(crate) fn mutex_lock<'a, T>(lock: &'a Mutex<T>, op: &'static str) -> MutexGuard<'a, T> {
    match lock.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            warn!(
                op,
                lock_kind = "mutex.lock",
                result = "poisoned_recovered",
                "Recovered from poisoned collection cache lock"
            );
            poisoned.into_inner()
        }
    }
}
