use crate::{ContextId, ExecutionContext, SyncError};
use core::hint::spin_loop;
use core::sync::atomic::{AtomicUsize, Ordering};

const UNOWNED: usize = 0;

/// Owner-tracked, non-reentrant blocking lock.
///
/// Waiters yield to the scheduler while their context
/// [may block](ExecutionContext::may_block) and spin otherwise, so the same
/// lock serves the single-threaded boot phase and a fully scheduled kernel.
///
/// On release exactly one waiter wins the next acquisition. Waiter order is
/// undefined: whichever context observes the free lock first takes it.
///
/// There is no timeout; a lock that is never released stalls its waiters.
pub struct KernelLock {
    owner: AtomicUsize,
    waiters: AtomicUsize,
}

impl Default for KernelLock {
    fn default() -> Self {
        Self::new()
    }
}

impl KernelLock {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            owner: AtomicUsize::new(UNOWNED),
            waiters: AtomicUsize::new(0),
        }
    }

    /// Single attempt at taking ownership.
    ///
    /// # Errors
    /// [`SyncError::Recursive`] if the calling context already owns the lock.
    pub fn try_acquire<C: ExecutionContext + ?Sized>(&self, ctx: &C) -> Result<bool, SyncError> {
        self.try_claim(ctx.current())
    }

    /// Block until the calling context owns the lock.
    ///
    /// # Errors
    /// [`SyncError::Recursive`] if the calling context already owns the lock;
    /// waiting would deadlock.
    pub fn acquire<C: ExecutionContext + ?Sized>(&self, ctx: &C) -> Result<(), SyncError> {
        let me = ctx.current();
        if self.try_claim(me)? {
            return Ok(());
        }

        self.waiters.fetch_add(1, Ordering::Relaxed);
        loop {
            while self.owner.load(Ordering::Relaxed) != UNOWNED {
                if ctx.may_block() {
                    ctx.yield_now();
                } else {
                    spin_loop();
                }
            }
            if self
                .owner
                .compare_exchange_weak(UNOWNED, me.get(), Ordering::Acquire, Ordering::Relaxed)
                .is_ok()
            {
                break;
            }
        }
        self.waiters.fetch_sub(1, Ordering::Relaxed);
        Ok(())
    }

    /// Give up ownership.
    ///
    /// # Errors
    /// [`SyncError::NotOwner`] if the calling context does not own the lock.
    pub fn release<C: ExecutionContext + ?Sized>(&self, ctx: &C) -> Result<(), SyncError> {
        let me = ctx.current();
        self.owner
            .compare_exchange(me.get(), UNOWNED, Ordering::Release, Ordering::Relaxed)
            .map(|_| ())
            .map_err(|owner| SyncError::NotOwner {
                caller: me,
                owner: ContextId::new(owner),
            })
    }

    /// Scoped acquisition; released when the guard drops.
    ///
    /// # Errors
    /// See [`acquire`](Self::acquire).
    pub fn lock<'a, C: ExecutionContext + ?Sized>(
        &'a self,
        ctx: &'a C,
    ) -> Result<KernelLockGuard<'a, C>, SyncError> {
        self.acquire(ctx)?;
        Ok(KernelLockGuard { lock: self, ctx })
    }

    /// Current owner, if any. Racy; for diagnostics.
    #[must_use]
    pub fn owner(&self) -> Option<ContextId> {
        ContextId::new(self.owner.load(Ordering::Relaxed))
    }

    /// Number of contexts currently waiting. Racy; for diagnostics.
    #[must_use]
    pub fn waiters(&self) -> usize {
        self.waiters.load(Ordering::Relaxed)
    }

    fn try_claim(&self, me: ContextId) -> Result<bool, SyncError> {
        match self.owner.compare_exchange(
            UNOWNED,
            me.get(),
            Ordering::Acquire,
            Ordering::Relaxed,
        ) {
            Ok(_) => Ok(true),
            Err(current) if current == me.get() => Err(SyncError::Recursive(me)),
            Err(_) => Ok(false),
        }
    }
}

pub struct KernelLockGuard<'a, C: ExecutionContext + ?Sized> {
    lock: &'a KernelLock,
    ctx: &'a C,
}

impl<C: ExecutionContext + ?Sized> Drop for KernelLockGuard<'_, C> {
    fn drop(&mut self) {
        let released = self.lock.release(self.ctx);
        debug_assert!(released.is_ok(), "guarded lock changed owner: {released:?}");
    }
}
