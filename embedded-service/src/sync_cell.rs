//! # SyncCell: a cell-like API for static interior mutability scenarios
//!
//! The power manager publishes its configuration snapshot and busy masks through these cells so
//! that the idle hook can read them with interrupts disabled, without ever waiting on a mutex.
use core::cell::UnsafeCell;

/// A critical section backed Cell for sync scenarios where you want Cell behaviors, but need it to be thread safe (such as used in statics)
pub struct SyncCell<T: Copy> {
    inner: UnsafeCell<T>,
}

impl<T: Copy> SyncCell<T> {
    /// Constructs a SyncCell, initializing it with initial_value
    pub const fn new(initial_value: T) -> Self {
        Self {
            inner: UnsafeCell::new(initial_value),
        }
    }

    /// Reads the cell's content (in a critical section) and returns a copy
    pub fn get(&self) -> T {
        critical_section::with(|_cs|
            // SAFETY: safe as accessors are always completed in a critical section
            unsafe {
            *self.inner.get()
        })
    }

    /// Sets the cell's content in a critical section.
    ///
    /// This keeps the cell's content a valid `T` at all times, it does not make a separate
    /// read followed by a set atomic. Use [`SyncCell::update`] for read-modify-write.
    pub fn set(&self, value: T) {
        critical_section::with(|_cs|
            // SAFETY: safe as accessors are always completed in a critical section
            unsafe {
                *self.inner.get() = value;
        })
    }

    /// Replaces the content with `value`, returning the previous content
    pub fn replace(&self, value: T) -> T {
        critical_section::with(|_cs|
            // SAFETY: safe as accessors are always completed in a critical section
            unsafe {
                core::ptr::replace(self.inner.get(), value)
        })
    }

    /// Read-modify-write within a single critical section, returning the new content.
    ///
    /// `f` runs with interrupts masked so it must be short.
    pub fn update(&self, f: impl FnOnce(T) -> T) -> T {
        critical_section::with(|_cs|
            // SAFETY: safe as accessors are always completed in a critical section
            unsafe {
                let slot = self.inner.get();
                *slot = f(*slot);
                *slot
        })
    }
}

impl<T: Copy + Default> Default for SyncCell<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

// SAFETY: Sync is implemented here for SyncCell as T is only accessed via nestable critical sections
unsafe impl<T: Copy + Send> Sync for SyncCell<T> {}
