use crate::{ExecutionContext, SyncError};
use core::hint::spin_loop;
use core::sync::atomic::{AtomicU32, Ordering};

/// Counting semaphore bounded by `max` units.
pub struct Semaphore {
    count: AtomicU32,
    max: u32,
}

impl Semaphore {
    /// # Errors
    /// [`SyncError::InvalidUnits`] if `initial` exceeds `max`.
    pub const fn new(initial: u32, max: u32) -> Result<Self, SyncError> {
        if initial > max {
            return Err(SyncError::InvalidUnits {
                requested: initial,
                max,
            });
        }
        Ok(Self {
            count: AtomicU32::new(initial),
            max,
        })
    }

    #[must_use]
    pub const fn max(&self) -> u32 {
        self.max
    }

    #[must_use]
    pub fn available(&self) -> u32 {
        self.count.load(Ordering::Relaxed)
    }

    /// Take `units` if they are available right now.
    ///
    /// # Errors
    /// [`SyncError::InvalidUnits`] if `units` exceeds the maximum; such a
    /// request could never be satisfied.
    pub fn try_wait(&self, units: u32) -> Result<bool, SyncError> {
        self.check_units(units)?;
        let mut cur = self.count.load(Ordering::Relaxed);
        while cur >= units {
            match self.count.compare_exchange_weak(
                cur,
                cur - units,
                Ordering::Acquire,
                Ordering::Relaxed,
            ) {
                Ok(_) => return Ok(true),
                Err(actual) => cur = actual,
            }
        }
        Ok(false)
    }

    /// Block until `units` can be taken.
    ///
    /// # Errors
    /// See [`try_wait`](Self::try_wait).
    pub fn wait<C: ExecutionContext + ?Sized>(&self, ctx: &C, units: u32) -> Result<(), SyncError> {
        while !self.try_wait(units)? {
            if ctx.may_block() {
                ctx.yield_now();
            } else {
                spin_loop();
            }
        }
        Ok(())
    }

    /// Return `units` to the semaphore.
    ///
    /// # Errors
    /// [`SyncError::SemaphoreOverflow`] if the count would exceed the maximum.
    pub fn signal(&self, units: u32) -> Result<(), SyncError> {
        let overflow = SyncError::SemaphoreOverflow {
            units,
            max: self.max,
        };
        self.count
            .fetch_update(Ordering::Release, Ordering::Relaxed, |cur| {
                cur.checked_add(units).filter(|&n| n <= self.max)
            })
            .map(|_| ())
            .map_err(|_| overflow)
    }

    const fn check_units(&self, units: u32) -> Result<(), SyncError> {
        if units > self.max {
            Err(SyncError::InvalidUnits {
                requested: units,
                max: self.max,
            })
        } else {
            Ok(())
        }
    }
}
