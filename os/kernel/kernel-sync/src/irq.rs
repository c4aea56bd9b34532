use crate::{ExecutionContext, Mutex, MutexGuard, RawLock, RawUnlock};

/// Interrupt-enable flag (`IF`) in `RFLAGS`.
#[cfg(target_arch = "x86_64")]
pub const RFLAGS_IF: u64 = 1 << 9;

/// A mutex guard that also keeps interrupts masked while held.
///
/// Created via [`Mutex::lock_irq`], it:
///
/// 1. saves the current interrupt state and disables interrupts, and
/// 2. acquires the underlying mutex,
///
/// releasing them in reverse order on drop.
///
/// This prevents interrupt handlers from preempting the critical section
/// and re-entering code that uses the same lock.
pub struct IrqMutex<'a, T, R: RawLock + RawUnlock, C: ExecutionContext + ?Sized> {
    // Field order matters: the mutex is released before interrupts return.
    g: MutexGuard<'a, T, R>,
    _irq: IrqGuard<'a, C>,
}

impl<T, R: RawLock + RawUnlock, C: ExecutionContext + ?Sized> core::ops::Deref
    for IrqMutex<'_, T, R, C>
{
    type Target = T;

    fn deref(&self) -> &T {
        &self.g
    }
}

impl<T, R: RawLock + RawUnlock, C: ExecutionContext + ?Sized> core::ops::DerefMut
    for IrqMutex<'_, T, R, C>
{
    fn deref_mut(&mut self) -> &mut T {
        &mut self.g
    }
}

impl<T, R: RawLock + RawUnlock> Mutex<T, R> {
    /// Acquires the mutex with interrupts disabled for the guard's lifetime.
    ///
    /// Interrupts are masked through `ctx` **before** spinning on the lock, so
    /// an interrupt handler on this CPU can never find the lock held by the
    /// code it interrupted.
    #[inline]
    pub fn lock_irq<'a, C: ExecutionContext + ?Sized>(
        &'a self,
        ctx: &'a C,
    ) -> IrqMutex<'a, T, R, C> {
        let ig = IrqGuard::new(ctx);
        let g = self.lock();
        IrqMutex { g, _irq: ig }
    }
}

/// RAII guard that disables interrupts on creation and restores them on drop.
///
/// `IrqGuard::new()` snapshots the interrupt flag. If interrupts were
/// enabled, it disables them. On drop, it re-enables them **only** if they
/// were previously enabled, preserving the original state.
pub struct IrqGuard<'a, C: ExecutionContext + ?Sized> {
    ctx: &'a C,
    /// Whether interrupts were enabled when the guard was created.
    were_enabled: bool,
}

impl<'a, C: ExecutionContext + ?Sized> IrqGuard<'a, C> {
    #[inline]
    #[must_use]
    pub fn new(ctx: &'a C) -> Self {
        let enabled = ctx.interrupts_enabled();
        if enabled {
            ctx.set_interrupts(false);
        }
        Self {
            ctx,
            were_enabled: enabled,
        }
    }

    /// Whether interrupts will be re-enabled on drop.
    #[must_use]
    pub const fn were_enabled(&self) -> bool {
        self.were_enabled
    }

    /// Forget the guard without restoring the interrupt state, returning
    /// the saved state for a later [`restore_interrupts`].
    #[must_use]
    pub fn into_saved(self) -> bool {
        let saved = self.were_enabled;
        core::mem::forget(self);
        saved
    }
}

impl<C: ExecutionContext + ?Sized> Drop for IrqGuard<'_, C> {
    fn drop(&mut self) {
        if self.were_enabled {
            self.ctx.set_interrupts(true);
        }
    }
}

/// Counterpart to [`IrqGuard::into_saved`].
pub fn restore_interrupts<C: ExecutionContext + ?Sized>(ctx: &C, were_enabled: bool) {
    if were_enabled {
        ctx.set_interrupts(true);
    }
}

/// Disables hardware interrupts (`cli`).
///
/// # Safety & Privilege
///
/// Must only be called in contexts where `cli` is permitted.
#[cfg(target_arch = "x86_64")]
#[inline]
pub fn cli_stop_interrupts() {
    unsafe { core::arch::asm!("cli", options(nomem, nostack, preserves_flags)) }
}

/// Enables hardware interrupts (`sti`).
///
/// # Safety & Privilege
///
/// Must only be called in contexts where `sti` is permitted.
#[cfg(target_arch = "x86_64")]
#[inline]
pub fn sti_enable_interrupts() {
    unsafe { core::arch::asm!("sti", options(nomem, nostack, preserves_flags)) }
}

/// Returns the current `RFLAGS` value (via `pushfq/pop`).
#[cfg(target_arch = "x86_64")]
#[inline]
#[must_use]
pub fn rflags() -> u64 {
    let r: u64;
    unsafe { core::arch::asm!("pushfq; pop {}", out(reg) r, options(preserves_flags)) }
    r
}
