//! Poison-tolerant locking helper.
//!
//! The messenger never holds its own locks across user handler code, so a
//! poisoned mutex can only mean a panic inside this crate's short critical
//! sections. Recovering the guard keeps registry and reply-slot state
//! usable instead of turning every later operation into a panic.

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Locks a mutex, recovering the guard if a previous holder panicked.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
