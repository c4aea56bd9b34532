mod common;

use common::ThreadContext;
use kernel_sync::{ExecutionContext, KernelLock, SyncError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

#[test]
fn sequential_acquire_release_never_blocks() {
    let ctx = ThreadContext::spinning();
    let lock = KernelLock::new();

    for _ in 0..100 {
        lock.acquire(&ctx).unwrap();
        assert_eq!(lock.owner(), Some(ctx.current()));
        lock.release(&ctx).unwrap();
    }
    assert_eq!(lock.owner(), None);
    assert_eq!(lock.waiters(), 0);
}

#[test]
fn recursive_acquire_is_rejected() {
    let ctx = ThreadContext::spinning();
    let lock = KernelLock::new();

    lock.acquire(&ctx).unwrap();
    let me = ctx.current();
    assert_eq!(lock.acquire(&ctx), Err(SyncError::Recursive(me)));
    assert_eq!(lock.try_acquire(&ctx), Err(SyncError::Recursive(me)));

    // still owned after the failed attempts
    assert_eq!(lock.owner(), Some(me));
    lock.release(&ctx).unwrap();
}

#[test]
fn release_by_non_owner_is_rejected() {
    let lock = Arc::new(KernelLock::new());
    let ctx = ThreadContext::spinning();

    // releasing a free lock
    assert!(matches!(
        lock.release(&ctx),
        Err(SyncError::NotOwner { owner: None, .. })
    ));

    lock.acquire(&ctx).unwrap();
    let owner = ctx.current();

    let other = Arc::clone(&lock);
    let err = thread::spawn(move || other.release(&ThreadContext::spinning()))
        .join()
        .unwrap()
        .unwrap_err();
    assert!(matches!(err, SyncError::NotOwner { owner: Some(o), .. } if o == owner));

    lock.release(&ctx).unwrap();
}

#[test]
fn try_acquire_fails_while_held_elsewhere() {
    let lock = Arc::new(KernelLock::new());
    let ctx = ThreadContext::spinning();
    lock.acquire(&ctx).unwrap();

    let other = Arc::clone(&lock);
    let got = thread::spawn(move || other.try_acquire(&ThreadContext::spinning()))
        .join()
        .unwrap();
    assert_eq!(got, Ok(false));

    lock.release(&ctx).unwrap();
}

#[test]
fn guard_releases_on_drop() {
    let ctx = ThreadContext::blocking();
    let lock = KernelLock::new();
    {
        let _g = lock.lock(&ctx).unwrap();
        assert!(lock.owner().is_some());
    }
    assert_eq!(lock.owner(), None);
}

fn contend(ctx: ThreadContext) {
    let threads = 6;
    let iters = 2_000;

    let lock = Arc::new(KernelLock::new());
    let in_cs = Arc::new(AtomicUsize::new(0));
    let total = Arc::new(AtomicUsize::new(0));
    let start = Arc::new(Barrier::new(threads));

    let handles: Vec<_> = (0..threads)
        .map(|_| {
            let lock = Arc::clone(&lock);
            let in_cs = Arc::clone(&in_cs);
            let total = Arc::clone(&total);
            let start = Arc::clone(&start);
            thread::spawn(move || {
                start.wait();
                for _ in 0..iters {
                    lock.acquire(&ctx).unwrap();
                    assert_eq!(in_cs.fetch_add(1, Ordering::SeqCst), 0);
                    total.fetch_add(1, Ordering::Relaxed);
                    in_cs.fetch_sub(1, Ordering::SeqCst);
                    lock.release(&ctx).unwrap();
                }
            })
        })
        .collect();

    for h in handles {
        h.join().unwrap();
    }
    assert_eq!(total.load(Ordering::Relaxed), threads * iters);
    assert_eq!(lock.owner(), None);
}

#[test]
fn mutual_exclusion_when_waiters_yield() {
    contend(ThreadContext::blocking());
}

#[test]
fn mutual_exclusion_when_waiters_spin() {
    contend(ThreadContext::spinning());
}
