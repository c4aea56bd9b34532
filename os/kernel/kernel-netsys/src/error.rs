use kernel_sync::{CacheError, SyncError};

#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NetSysError {
    #[error("timed out")]
    Timeout,
    #[error(transparent)]
    Sync(#[from] SyncError),
    #[error("packet pool: {0}")]
    Pool(#[from] CacheError),
}
