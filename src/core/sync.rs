//! Synchronization utilities for robust mutex handling
//!
//! The client surface (`push`, `init`, `teardown`) must never panic, so a
//! poisoned lock is recovered rather than propagated. The data behind every
//! lock in this crate stays consistent between statements, which makes the
//! recovered guard safe to keep using.

use std::sync::{LockResult, PoisonError};

/// Recover the guard from a possibly poisoned lock result
///
/// Logs a warning naming the lock so a panic elsewhere stays visible, then
/// continues with the inner guard.
///
/// # Examples
/// ```
/// use std::sync::Mutex;
/// use gtm_client::core::sync::recover_lock;
///
/// let mutex = Mutex::new(42);
/// let guard = recover_lock(mutex.lock(), "example");
/// assert_eq!(*guard, 42);
/// ```
pub fn recover_lock<T>(result: LockResult<T>, lock_name: &str) -> T {
    result.unwrap_or_else(|poison_err: PoisonError<T>| {
        log::warn!(
            "Internal synchronisation error ({} lock poisoned); continuing with recovered state",
            lock_name
        );
        poison_err.into_inner()
    })
}
