//! # Kernel synchronization primitives
//!
//! Locks, semaphores and object caches shared by the ACPI services layer and
//! the network stack glue.
//!
//! ## Building blocks
//!
//! * [`RawSpin`] is a test-and-test-and-set spin lock implementing
//!   [`RawLock`]/[`RawUnlock`]. [`Mutex`] wraps any raw lock around data
//!   and hands out scoped guards.
//! * [`Mutex::lock_irq`] additionally masks interrupts for the lifetime of the
//!   guard via [`IrqGuard`].
//!
//! ## Owner-aware primitives
//!
//! Everything above the raw locks goes through an [`ExecutionContext`]. It
//! identifies the caller and decides whether waiting yields or spins:
//!
//! * [`KernelLock`] is non-reentrant and rejects recursive acquisition and
//!   foreign release with a [`SyncError`].
//! * [`Semaphore`] counts units up to a fixed maximum.
//! * [`ObjectCache`] pools zeroed fixed-size objects from the global allocator.
//!
//! [`BootContext`] is the context used before the scheduler runs.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

extern crate alloc;

mod context;
mod error;
pub mod irq;
mod lock;
mod mutex;
mod object_cache;
mod raw_spin;
mod semaphore;

pub use context::{BootContext, ContextId, ExecutionContext};
pub use error::{CacheError, SyncError};
pub use irq::{IrqGuard, IrqMutex, restore_interrupts};
pub use lock::{KernelLock, KernelLockGuard};
pub use mutex::{Mutex, MutexGuard};
pub use object_cache::{CacheStats, OBJECT_ALIGN, ObjectCache};
pub use raw_spin::RawSpin;
pub use semaphore::Semaphore;

pub type SpinMutex<T> = Mutex<T, RawSpin>;

impl<T> SpinMutex<T> {
    pub const fn new(value: T) -> Self {
        Self::from_raw(RawSpin::new(), value)
    }
}

pub trait RawLock {
    fn raw_lock(&self);
    fn raw_try_lock(&self) -> bool;
    fn raw_is_locked(&self) -> bool;
}

pub trait RawUnlock {
    /// # Safety
    /// The caller must hold the lock.
    unsafe fn raw_unlock(&self);
}
