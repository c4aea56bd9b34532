use crate::NetSysError;
use kernel_acpi::Clock;
use kernel_sync::{ExecutionContext, IrqGuard, KernelLock, Semaphore, restore_interrupts};

/// Upper bound on a semaphore's count.
pub const SEM_MAX: u32 = 0xFFFF;

const TICKS_PER_MS: u64 = 10_000;

/// Services the network stack calls into.
pub struct NetSys<'p> {
    ctx: &'p dyn ExecutionContext,
    clock: &'p dyn Clock,
}

/// Saved interrupt state from [`NetSys::protect`].
#[must_use = "pass the protection back to `unprotect`"]
#[derive(Debug)]
pub struct Protection {
    were_enabled: bool,
}

/// Stack mutex; not recursive.
pub struct NetMutex(KernelLock);

/// Stack counting semaphore, bounded by [`SEM_MAX`].
pub struct NetSemaphore(Semaphore);

impl<'p> NetSys<'p> {
    #[must_use]
    pub const fn new(ctx: &'p dyn ExecutionContext, clock: &'p dyn Clock) -> Self {
        Self { ctx, clock }
    }

    pub(crate) fn context(&self) -> &'p dyn ExecutionContext {
        self.ctx
    }

    /// Milliseconds since boot. Wraps like the stack's 32-bit timestamps.
    #[allow(clippy::cast_possible_truncation)]
    #[must_use]
    pub fn now_ms(&self) -> u32 {
        (self.clock.ticks_100ns() / TICKS_PER_MS) as u32
    }

    /// Enter a short critical section by masking interrupts. Nests.
    pub fn protect(&self) -> Protection {
        Protection {
            were_enabled: IrqGuard::new(self.ctx).into_saved(),
        }
    }

    #[allow(clippy::needless_pass_by_value)]
    pub fn unprotect(&self, protection: Protection) {
        restore_interrupts(self.ctx, protection.were_enabled);
    }

    #[must_use]
    pub const fn mutex_new(&self) -> NetMutex {
        NetMutex(KernelLock::new())
    }

    /// # Errors
    /// [`NetSysError::Sync`] if the caller already holds `mutex`.
    pub fn mutex_lock(&self, mutex: &NetMutex) -> Result<(), NetSysError> {
        Ok(mutex.0.acquire(self.ctx)?)
    }

    /// # Errors
    /// [`NetSysError::Sync`] if the caller does not hold `mutex`.
    pub fn mutex_unlock(&self, mutex: &NetMutex) -> Result<(), NetSysError> {
        Ok(mutex.0.release(self.ctx)?)
    }

    #[allow(clippy::needless_pass_by_value)]
    pub fn mutex_free(&self, mutex: NetMutex) {
        if let Some(owner) = mutex.0.owner() {
            log::warn!("network stack freed a mutex held by {owner:?}");
        }
    }

    /// # Errors
    /// Never for counts up to [`SEM_MAX`].
    pub fn sem_new(&self, count: u8) -> Result<NetSemaphore, NetSysError> {
        Ok(NetSemaphore(Semaphore::new(u32::from(count), SEM_MAX)?))
    }

    /// # Errors
    /// [`NetSysError::Sync`] if the count is already at [`SEM_MAX`].
    pub fn sem_signal(&self, sem: &NetSemaphore) -> Result<(), NetSysError> {
        Ok(sem.0.signal(1)?)
    }

    /// Take one unit. A `timeout_ms` of `0` waits forever.
    /// Returns the milliseconds spent waiting.
    ///
    /// # Errors
    /// [`NetSysError::Timeout`] if the timeout passed first.
    pub fn sem_wait(&self, sem: &NetSemaphore, timeout_ms: u32) -> Result<u32, NetSysError> {
        let start = self.clock.ticks_100ns();
        if timeout_ms == 0 {
            sem.0.wait(self.ctx, 1)?;
        } else {
            let deadline = start.saturating_add(u64::from(timeout_ms) * TICKS_PER_MS);
            while !sem.0.try_wait(1)? {
                if self.clock.ticks_100ns() >= deadline {
                    return Err(NetSysError::Timeout);
                }
                if self.ctx.may_block() {
                    self.ctx.yield_now();
                } else {
                    core::hint::spin_loop();
                }
            }
        }
        let elapsed = self.clock.ticks_100ns().saturating_sub(start) / TICKS_PER_MS;
        Ok(u32::try_from(elapsed).unwrap_or(u32::MAX))
    }

    #[allow(clippy::needless_pass_by_value)]
    pub fn sem_free(&self, sem: NetSemaphore) {
        if sem.0.available() > 0 {
            log::trace!("semaphore freed with {} units left", sem.0.available());
        }
    }
}
