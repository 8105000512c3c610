//! Readers-writer guarded state shared by every index container.

use std::sync::{PoisonError, RwLock};

/// A value behind a readers-writer lock, accessed only through closures.
///
/// The lock is never held past the closure. A panic inside a closure
/// poisons the lock; the next access recovers the inner value instead of
/// propagating the panic.
#[derive(Debug, Default)]
pub struct Guarded<T> {
    inner: RwLock<T>,
}

impl<T> Guarded<T> {
    pub fn new(value: T) -> Self {
        Self {
            inner: RwLock::new(value),
        }
    }

    pub fn read<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        let guard = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        f(&guard)
    }

    pub fn write<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }

    pub fn into_inner(self) -> T {
        self.inner.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T: Clone> Guarded<T> {
    /// Clone of the whole value, taken under a single read acquisition.
    pub fn snapshot(&self) -> T {
        self.read(T::clone)
    }
}
