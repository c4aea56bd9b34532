mod common;

use common::ThreadContext;
use kernel_sync::{ExecutionContext, IrqGuard, SpinMutex, restore_interrupts};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::{panic, thread};

#[test]
fn basic_lock_and_raii() {
    let l = SpinMutex::new(0_u32);

    {
        let mut g = l.lock();
        *g = 41;
    }

    // previous drop must have unlocked
    {
        let mut g = l.lock();
        *g += 1;
        assert_eq!(*g, 42);
    }
    assert!(!l.is_locked());
}

#[test]
fn try_lock_semantics() {
    let l = SpinMutex::new(1u8);

    let g1 = l.try_lock();
    assert!(g1.is_some());
    assert!(l.is_locked());

    assert!(l.try_lock().is_none());

    drop(g1);
    assert!(l.try_lock().is_some());
}

#[test]
fn get_mut_and_into_inner() {
    let mut l = SpinMutex::new(vec![1, 2, 3]);
    l.get_mut().push(4);
    assert_eq!(l.lock().as_slice(), &[1, 2, 3, 4]);
    assert_eq!(l.into_inner(), vec![1, 2, 3, 4]);
}

#[test]
fn contended_increments_are_exact_and_exclusive() {
    let threads = 8;
    let iters = 5_000;

    let lock = Arc::new(SpinMutex::new(0usize));
    let in_cs = Arc::new(AtomicUsize::new(0));
    let start = Arc::new(Barrier::new(threads));

    let handles: Vec<_> = (0..threads)
        .map(|_| {
            let lock = Arc::clone(&lock);
            let in_cs = Arc::clone(&in_cs);
            let start = Arc::clone(&start);
            thread::spawn(move || {
                start.wait();
                for _ in 0..iters {
                    lock.with_lock(|v| {
                        let prev = in_cs.fetch_add(1, Ordering::SeqCst);
                        assert_eq!(prev, 0, "mutual exclusion violated");
                        *v += 1;
                        in_cs.fetch_sub(1, Ordering::SeqCst);
                    });
                    thread::yield_now();
                }
            })
        })
        .collect();

    for h in handles {
        h.join().unwrap();
    }

    assert_eq!(lock.with_lock(|v| *v), threads * iters);
}

#[test]
fn lock_is_released_on_panic() {
    let l = SpinMutex::new(0u32);

    let res = panic::catch_unwind(panic::AssertUnwindSafe(|| {
        l.with_lock(|v| {
            *v = 123;
            panic!("boom");
        });
    }));
    assert!(res.is_err());

    assert_eq!(l.with_lock(|v| *v), 123);
}

#[test]
fn lock_irq_masks_and_restores_interrupts() {
    let ctx = ThreadContext::spinning();
    let l = SpinMutex::new(0u8);

    assert!(ctx.interrupts_enabled());
    {
        let mut g = l.lock_irq(&ctx);
        *g = 7;
        assert!(!ctx.interrupts_enabled());
        assert!(l.is_locked());
    }
    assert!(ctx.interrupts_enabled());
    assert!(!l.is_locked());
}

#[test]
fn irq_guard_keeps_interrupts_off_when_they_were_off() {
    let ctx = ThreadContext::spinning();
    ctx.set_interrupts(false);
    {
        let g = IrqGuard::new(&ctx);
        assert!(!g.were_enabled());
    }
    assert!(!ctx.interrupts_enabled());
    ctx.set_interrupts(true);
}

#[test]
fn saved_interrupt_state_can_be_restored_later() {
    let ctx = ThreadContext::spinning();
    let saved = IrqGuard::new(&ctx).into_saved();
    assert!(saved);
    assert!(!ctx.interrupts_enabled());

    restore_interrupts(&ctx, saved);
    assert!(ctx.interrupts_enabled());
}

#[test]
fn spin_mutex_is_sync_for_send_t() {
    fn takes_sync<S: Sync>(_s: &S) {}
    let l = SpinMutex::new(0u8);
    takes_sync(&l);
}
