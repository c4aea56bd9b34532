use crate::{CacheError, ExecutionContext, SpinMutex};
use alloc::alloc::{Layout, alloc_zeroed, dealloc};
use alloc::vec::Vec;
use core::ptr::NonNull;
use core::sync::atomic::{AtomicUsize, Ordering};

/// Alignment of every object handed out by an [`ObjectCache`].
pub const OBJECT_ALIGN: usize = 16;

/// Upper bound for the bookkeeping reserved at construction.
const RESERVE_LIMIT: usize = 256;

const NO_HOLDER: usize = 0;

/// Fixed-size object pool with a bounded number of live objects.
///
/// Objects are handed out zeroed. Released objects stay on a free list and are
/// reused before new memory is requested from the global allocator. The cache
/// never owns more than `max_depth` objects at once.
///
/// Bookkeeping runs under a spin lock with interrupts masked, so the cache can
/// be used from interrupt handlers. The allocator is called with that lock
/// held and must not call back into the same cache.
pub struct ObjectCache {
    name: &'static str,
    layout: Layout,
    max_depth: usize,
    holder: AtomicUsize,
    state: SpinMutex<CacheState>,
}

struct CacheState {
    free: Vec<NonNull<u8>>,
    all: Vec<NonNull<u8>>,
    hits: u64,
    misses: u64,
    destroyed: bool,
}

// Safety: the pointers are owned allocations and only touched under the lock.
unsafe impl Send for CacheState {}

/// Counters reported by [`ObjectCache::stats`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct CacheStats {
    pub object_size: usize,
    pub max_depth: usize,
    pub allocated: usize,
    pub free: usize,
    pub in_use: usize,
    pub hits: u64,
    pub misses: u64,
}

impl ObjectCache {
    /// # Errors
    /// [`CacheError::InvalidSize`] for zero-sized or unrepresentable objects,
    /// [`CacheError::InvalidDepth`] when `max_depth` is zero.
    pub fn new(name: &'static str, object_size: usize, max_depth: usize) -> Result<Self, CacheError> {
        if object_size == 0 {
            return Err(CacheError::InvalidSize(object_size));
        }
        if max_depth == 0 {
            return Err(CacheError::InvalidDepth);
        }
        let layout = Layout::from_size_align(object_size, OBJECT_ALIGN)
            .map_err(|_| CacheError::InvalidSize(object_size))?;

        let reserve = max_depth.min(RESERVE_LIMIT);
        Ok(Self {
            name,
            layout,
            max_depth,
            holder: AtomicUsize::new(NO_HOLDER),
            state: SpinMutex::new(CacheState {
                free: Vec::with_capacity(reserve),
                all: Vec::with_capacity(reserve),
                hits: 0,
                misses: 0,
                destroyed: false,
            }),
        })
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    #[must_use]
    pub const fn object_size(&self) -> usize {
        self.layout.size()
    }

    #[must_use]
    pub const fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Hand out a zeroed object.
    ///
    /// # Errors
    /// * [`CacheError::Exhausted`] when `max_depth` objects are in use.
    /// * [`CacheError::OutOfMemory`] when the allocator fails.
    /// * [`CacheError::Destroyed`] after [`destroy`](Self::destroy).
    pub fn acquire<C: ExecutionContext + ?Sized>(&self, ctx: &C) -> Result<NonNull<u8>, CacheError> {
        self.with_state(ctx, |st| {
            if st.destroyed {
                return Err(CacheError::Destroyed);
            }

            if let Some(obj) = st.free.pop() {
                st.hits += 1;
                // Safety: `obj` is a live allocation of `layout.size()` bytes.
                unsafe { obj.as_ptr().write_bytes(0, self.layout.size()) };
                return Ok(obj);
            }

            if st.all.len() >= self.max_depth {
                return Err(CacheError::Exhausted {
                    max_depth: self.max_depth,
                });
            }

            // Safety: the layout has a non-zero size.
            let raw = unsafe { alloc_zeroed(self.layout) };
            let obj = NonNull::new(raw).ok_or(CacheError::OutOfMemory {
                size: self.layout.size(),
            })?;
            st.all.push(obj);
            st.misses += 1;
            Ok(obj)
        })
    }

    /// Return an object obtained from [`acquire`](Self::acquire).
    ///
    /// # Errors
    /// * [`CacheError::ForeignObject`] if the cache never handed out `obj`.
    /// * [`CacheError::DoubleRelease`] if `obj` is already free.
    /// * [`CacheError::Destroyed`] after [`destroy`](Self::destroy); the
    ///   object was leaked at that point and is not freed.
    pub fn release<C: ExecutionContext + ?Sized>(&self, ctx: &C, obj: NonNull<u8>) -> Result<(), CacheError> {
        self.with_state(ctx, |st| {
            if st.destroyed {
                return Err(CacheError::Destroyed);
            }
            if !st.all.contains(&obj) {
                return Err(CacheError::ForeignObject);
            }
            if st.free.contains(&obj) {
                return Err(CacheError::DoubleRelease);
            }
            st.free.push(obj);
            Ok(())
        })
    }

    /// Give every free object back to the allocator. Returns how many were freed.
    pub fn purge<C: ExecutionContext + ?Sized>(&self, ctx: &C) -> usize {
        self.with_state(ctx, |st| self.purge_locked(st))
    }

    /// Tear the cache down.
    ///
    /// Free objects go back to the allocator. Objects still in use are leaked
    /// and reported; the cache rejects all further use either way.
    ///
    /// # Errors
    /// [`CacheError::Leaked`] if objects were still in use,
    /// [`CacheError::Destroyed`] if the cache was already destroyed.
    pub fn destroy<C: ExecutionContext + ?Sized>(&self, ctx: &C) -> Result<(), CacheError> {
        self.with_state(ctx, |st| {
            if st.destroyed {
                return Err(CacheError::Destroyed);
            }
            self.purge_locked(st);
            st.destroyed = true;

            let outstanding = st.all.len();
            st.all.clear();
            if outstanding == 0 {
                Ok(())
            } else {
                log::warn!(
                    "object cache {} destroyed with {outstanding} objects in use",
                    self.name
                );
                Err(CacheError::Leaked { outstanding })
            }
        })
    }

    pub fn stats<C: ExecutionContext + ?Sized>(&self, ctx: &C) -> CacheStats {
        self.with_state(ctx, |st| CacheStats {
            object_size: self.layout.size(),
            max_depth: self.max_depth,
            allocated: st.all.len(),
            free: st.free.len(),
            in_use: st.all.len() - st.free.len(),
            hits: st.hits,
            misses: st.misses,
        })
    }

    fn with_state<C, F, T>(&self, ctx: &C, f: F) -> T
    where
        C: ExecutionContext + ?Sized,
        F: FnOnce(&mut CacheState) -> T,
    {
        let me = ctx.current().get();
        debug_assert_ne!(
            self.holder.load(Ordering::Relaxed),
            me,
            "object cache {} re-entered by its own holder",
            self.name
        );

        let mut st = self.state.lock_irq(ctx);
        self.holder.store(me, Ordering::Relaxed);
        let out = f(&mut *st);
        self.holder.store(NO_HOLDER, Ordering::Relaxed);
        out
    }

    fn purge_locked(&self, st: &mut CacheState) -> usize {
        let CacheState { free, all, .. } = st;
        all.retain(|p| !free.contains(p));
        let freed = free.len();
        for obj in free.drain(..) {
            // Safety: every pointer on the free list came from `alloc_zeroed(layout)`.
            unsafe { dealloc(obj.as_ptr(), self.layout) };
        }
        freed
    }
}

impl Drop for ObjectCache {
    fn drop(&mut self) {
        let layout = self.layout;
        let st = self.state.get_mut();
        let CacheState { free, all, .. } = st;
        all.retain(|p| !free.contains(p));
        for obj in free.drain(..) {
            // Safety: see `purge_locked`.
            unsafe { dealloc(obj.as_ptr(), layout) };
        }
        if !all.is_empty() {
            log::warn!(
                "object cache {} dropped with {} objects in use",
                self.name,
                all.len()
            );
        }
    }
}
