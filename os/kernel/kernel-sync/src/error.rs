use crate::ContextId;

/// Contract violations reported by [`KernelLock`](crate::KernelLock) and
/// [`Semaphore`](crate::Semaphore).
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SyncError {
    #[error("context {0:?} tried to acquire a lock it already owns")]
    Recursive(ContextId),
    #[error("context {caller:?} released a lock owned by {owner:?}")]
    NotOwner {
        caller: ContextId,
        owner: Option<ContextId>,
    },
    #[error("requested {requested} units from a semaphore with at most {max}")]
    InvalidUnits { requested: u32, max: u32 },
    #[error("signalling {units} units would exceed the semaphore maximum of {max}")]
    SemaphoreOverflow { units: u32, max: u32 },
}

/// Failures of an [`ObjectCache`](crate::ObjectCache).
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CacheError {
    #[error("invalid object size {0}")]
    InvalidSize(usize),
    #[error("cache depth must be at least one object")]
    InvalidDepth,
    #[error("cache exhausted: all {max_depth} objects are in use")]
    Exhausted { max_depth: usize },
    #[error("allocator could not provide {size} bytes")]
    OutOfMemory { size: usize },
    #[error("object does not belong to this cache")]
    ForeignObject,
    #[error("object was already returned to the cache")]
    DoubleRelease,
    #[error("cache has been destroyed")]
    Destroyed,
    #[error("cache destroyed with {outstanding} objects still in use; they are leaked")]
    Leaked { outstanding: usize },
}
