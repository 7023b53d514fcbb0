//! Common utilities shared by the player, providers and shell.

/// Reactive property system for fine-grained state updates
pub mod property;

use std::{
    future::Future,
    sync::{Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use tokio::runtime::Handle;
use tracing::warn;

pub use property::Property;

/// Locks a mutex, recovering the data if a previous holder panicked.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Read-locks an `RwLock`, recovering from poisoning.
pub(crate) fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

/// Write-locks an `RwLock`, recovering from poisoning.
pub(crate) fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

/// Spawns an async follow-up from synchronous listener code.
///
/// Listeners run outside of any task, so the current runtime is looked up
/// explicitly. Without a runtime the follow-up is dropped.
pub(crate) fn spawn_detached<F>(task: &'static str, future: F)
where
    F: Future<Output = ()> + Send + 'static,
{
    match Handle::try_current() {
        Ok(handle) => {
            handle.spawn(future);
        }
        Err(_) => warn!(task, "no tokio runtime available, dropping async follow-up"),
    }
}
