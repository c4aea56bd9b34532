#![allow(dead_code)]

use kernel_acpi::Clock;
use kernel_sync::{ContextId, ExecutionContext};
use std::cell::Cell;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

static NEXT_ID: AtomicUsize = AtomicUsize::new(1);

thread_local! {
    static ID: ContextId = ContextId::new(NEXT_ID.fetch_add(1, Ordering::Relaxed)).unwrap();
    static INTERRUPTS: Cell<bool> = const { Cell::new(true) };
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadContext;

impl ExecutionContext for ThreadContext {
    fn current(&self) -> ContextId {
        ID.with(|id| *id)
    }

    fn yield_now(&self) {
        std::thread::yield_now();
    }

    fn may_block(&self) -> bool {
        INTERRUPTS.with(Cell::get)
    }

    fn interrupts_enabled(&self) -> bool {
        INTERRUPTS.with(Cell::get)
    }

    fn set_interrupts(&self, enabled: bool) {
        INTERRUPTS.with(|c| c.set(enabled));
    }
}

pub fn interrupts_enabled() -> bool {
    INTERRUPTS.with(Cell::get)
}

/// Advances one millisecond per read.
#[derive(Default)]
pub struct StepClock(AtomicU64);

impl Clock for StepClock {
    fn ticks_100ns(&self) -> u64 {
        self.0.fetch_add(10_000, Ordering::SeqCst) + 10_000
    }

    fn stall_us(&self, us: u32) {
        self.0.fetch_add(u64::from(us) * 10, Ordering::SeqCst);
    }

    fn sleep_ms(&self, ms: u64) {
        self.0.fetch_add(ms * 10_000, Ordering::SeqCst);
    }
}
