//! A replaceable callback shared between a long-lived task and its owner.
//!
//! Watchers and pollers are spawned once and hold a clone of the
//! [`CallbackSlot`] they were built with. The task looks the callback up at
//! the moment it fires, so it always runs the most recently installed one.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

type Callback<T> = Arc<dyn Fn(T) + Send + Sync>;

pub struct CallbackSlot<T> {
    current: Arc<RwLock<Callback<T>>>,
}

impl<T> CallbackSlot<T> {
    pub fn new(callback: impl Fn(T) + Send + Sync + 'static) -> Self {
        Self {
            current: Arc::new(RwLock::new(Arc::new(callback))),
        }
    }

    /// A slot that drops every value until a callback is installed.
    #[cfg(test)]
    pub(crate) fn noop() -> Self {
        Self::new(|_| {})
    }

    /// Install `callback`; every clone of this slot sees it from now on.
    #[cfg(test)]
    pub(crate) fn replace(&self, callback: impl Fn(T) + Send + Sync + 'static) {
        *self.current.write() = Arc::new(callback);
    }

    pub fn call(&self, value: T) {
        // Release the lock before running, so a callback may replace itself.
        let callback = self.current.read().clone();
        callback(value);
    }
}

impl<T> Clone for CallbackSlot<T> {
    fn clone(&self) -> Self {
        Self {
            current: Arc::clone(&self.current),
        }
    }
}

impl<T> fmt::Debug for CallbackSlot<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackSlot").finish_non_exhaustive()
    }
}
