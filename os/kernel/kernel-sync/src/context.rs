//! # Execution contexts
//!
//! The primitives in this crate never talk to a scheduler directly. The
//! kernel hands them an [`ExecutionContext`] that answers three questions:
//! who is calling, may the caller be suspended, and are interrupts enabled.

use core::num::NonZeroUsize;

/// Identity of a thread, CPU-local boot context, or interrupt frame.
///
/// Zero is reserved as "no owner".
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct ContextId(NonZeroUsize);

impl ContextId {
    /// The single context that runs before multitasking starts.
    pub const BOOT: Self = Self(NonZeroUsize::MIN);

    #[must_use]
    pub const fn new(raw: usize) -> Option<Self> {
        match NonZeroUsize::new(raw) {
            Some(v) => Some(Self(v)),
            None => None,
        }
    }

    #[must_use]
    pub const fn get(self) -> usize {
        self.0.get()
    }
}

/// Kernel services the synchronization primitives are built on.
pub trait ExecutionContext: Sync {
    /// Identity of the calling context.
    fn current(&self) -> ContextId;

    /// Hand the CPU to another runnable context.
    fn yield_now(&self);

    /// Whether the calling context may be suspended.
    ///
    /// `false` during the single-threaded boot phase and whenever interrupts
    /// are masked; waiters then spin instead of yielding.
    fn may_block(&self) -> bool;

    /// Current state of the interrupt flag.
    fn interrupts_enabled(&self) -> bool;

    /// Set the interrupt flag.
    fn set_interrupts(&self, enabled: bool);
}

/// Early-boot context: one CPU, no scheduler.
///
/// On `x86_64` the interrupt flag is read with `pushfq` and changed with
/// `cli`/`sti`; this requires ring 0. Elsewhere interrupts are reported as
/// disabled and left alone.
#[derive(Debug, Default, Copy, Clone)]
pub struct BootContext;

impl ExecutionContext for BootContext {
    fn current(&self) -> ContextId {
        ContextId::BOOT
    }

    fn yield_now(&self) {
        core::hint::spin_loop();
    }

    fn may_block(&self) -> bool {
        false
    }

    fn interrupts_enabled(&self) -> bool {
        #[cfg(target_arch = "x86_64")]
        {
            (crate::irq::rflags() & crate::irq::RFLAGS_IF) != 0
        }
        #[cfg(not(target_arch = "x86_64"))]
        {
            false
        }
    }

    fn set_interrupts(&self, enabled: bool) {
        #[cfg(target_arch = "x86_64")]
        {
            if enabled {
                crate::irq::sti_enable_interrupts();
            } else {
                crate::irq::cli_stop_interrupts();
            }
        }
        #[cfg(not(target_arch = "x86_64"))]
        {
            let _ = enabled;
        }
    }
}
