#![allow(dead_code)]

use kernel_sync::{ContextId, ExecutionContext};
use std::cell::Cell;
use std::sync::atomic::{AtomicUsize, Ordering};

static NEXT_ID: AtomicUsize = AtomicUsize::new(1);

thread_local! {
    static ID: ContextId = ContextId::new(NEXT_ID.fetch_add(1, Ordering::Relaxed)).unwrap();
    static INTERRUPTS: Cell<bool> = const { Cell::new(true) };
}

/// One context per OS thread; interrupts are a thread-local flag.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadContext {
    pub blocking: bool,
}

impl ThreadContext {
    pub const fn blocking() -> Self {
        Self { blocking: true }
    }

    pub const fn spinning() -> Self {
        Self { blocking: false }
    }
}

impl ExecutionContext for ThreadContext {
    fn current(&self) -> ContextId {
        ID.with(|id| *id)
    }

    fn yield_now(&self) {
        std::thread::yield_now();
    }

    fn may_block(&self) -> bool {
        self.blocking
    }

    fn interrupts_enabled(&self) -> bool {
        INTERRUPTS.with(Cell::get)
    }

    fn set_interrupts(&self, enabled: bool) {
        INTERRUPTS.with(|c| c.set(enabled));
    }
}
