//! # Handle tables
//!
//! The interpreter only ever sees opaque non-zero integers. Each table maps
//! them to reference-counted primitives, so a blocking wait never holds the
//! table's own lock.

use alloc::sync::Arc;
use alloc::vec::Vec;
use core::num::NonZeroU32;
use kernel_sync::{ExecutionContext, SpinMutex};

/// Opaque interpreter-facing handle.
pub trait Handle: Copy {
    fn from_slot(slot: NonZeroU32) -> Self;
    fn slot(self) -> NonZeroU32;
}

macro_rules! handles {
    ($($(#[$meta:meta])* $name:ident;)*) => {$(
        $(#[$meta])*
        #[repr(transparent)]
        #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
        pub struct $name(NonZeroU32);

        impl $name {
            #[must_use]
            pub const fn get(self) -> u32 {
                self.0.get()
            }
        }

        impl Handle for $name {
            fn from_slot(slot: NonZeroU32) -> Self {
                Self(slot)
            }

            fn slot(self) -> NonZeroU32 {
                self.0
            }
        }
    )*};
}

handles! {
    /// Spin lock (`ACPI_SPINLOCK`).
    LockHandle;
    /// Blocking mutex (`ACPI_MUTEX`).
    MutexHandle;
    SemaphoreHandle;
    CacheHandle;
}

/// Slot table; freed slots are reused lowest-first.
pub struct HandleTable<H, T> {
    slots: SpinMutex<Vec<Option<Arc<T>>>>,
    _handle: core::marker::PhantomData<fn() -> H>,
}

impl<H: Handle, T> Default for HandleTable<H, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: Handle, T> HandleTable<H, T> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            slots: SpinMutex::new(Vec::new()),
            _handle: core::marker::PhantomData,
        }
    }

    /// Store `value`, returning its handle. `None` once `u32` slots are used up.
    pub fn insert<C: ExecutionContext + ?Sized>(&self, ctx: &C, value: T) -> Option<H> {
        let mut slots = self.slots.lock_irq(ctx);
        let value = Some(Arc::new(value));
        let index = match slots.iter().position(Option::is_none) {
            Some(free) => {
                slots[free] = value;
                free
            }
            None => {
                slots.push(value);
                slots.len() - 1
            }
        };
        let slot = u32::try_from(index + 1).ok().and_then(NonZeroU32::new)?;
        Some(H::from_slot(slot))
    }

    pub fn get<C: ExecutionContext + ?Sized>(&self, ctx: &C, handle: H) -> Option<Arc<T>> {
        let slots = self.slots.lock_irq(ctx);
        slots.get(Self::index(handle))?.clone()
    }

    pub fn remove<C: ExecutionContext + ?Sized>(&self, ctx: &C, handle: H) -> Option<Arc<T>> {
        let mut slots = self.slots.lock_irq(ctx);
        let taken = slots.get_mut(Self::index(handle))?.take();
        while slots.last().is_some_and(Option::is_none) {
            slots.pop();
        }
        taken
    }

    /// Live entries at this instant.
    pub fn snapshot<C: ExecutionContext + ?Sized>(&self, ctx: &C) -> Vec<Arc<T>> {
        let slots = self.slots.lock_irq(ctx);
        slots.iter().flatten().cloned().collect()
    }

    /// Empty the table, returning what it held.
    pub fn drain<C: ExecutionContext + ?Sized>(&self, ctx: &C) -> Vec<Arc<T>> {
        let mut slots = self.slots.lock_irq(ctx);
        slots.drain(..).flatten().collect()
    }

    pub fn len<C: ExecutionContext + ?Sized>(&self, ctx: &C) -> usize {
        self.slots.lock_irq(ctx).iter().flatten().count()
    }

    fn index(handle: H) -> usize {
        handle.slot().get() as usize - 1
    }
}
