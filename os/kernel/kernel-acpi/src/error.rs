use crate::devtree::DeviceTreeError;
use crate::osl::OslState;
use crate::rsdp::RsdpError;
use crate::status::{self, AcpiStatus};
use kernel_info::hwmap::{BootMapError, PhysAddr};
use kernel_sync::{CacheError, SyncError};

/// Failure of a façade callback or lifecycle transition.
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OslError {
    #[error("mandatory platform service `{0}` was not provided")]
    MissingCallback(&'static str),
    #[error("invalid transition from {from:?} to {to:?}")]
    InvalidTransition { from: OslState, to: OslState },
    #[error("services layer is {0:?}, not active")]
    NotActive(OslState),
    #[error("services layer has been terminated")]
    Terminated,
    #[error("invalid boot hardware map: {0}")]
    BootMap(#[from] BootMapError),
    #[error("{0} cache objects are still in use")]
    OutstandingObjects(usize),
    #[error("unknown or deleted handle")]
    InvalidHandle,
    #[error("handle table is full")]
    HandlesExhausted,
    #[error("out of memory")]
    NoMemory,
    #[error("cannot map {len:#x} bytes at {phys:#x}")]
    MapFailed { phys: PhysAddr, len: u64 },
    #[error("address {0:#x} is not mapped")]
    NotMapped(usize),
    #[error("invalid parameter: {0}")]
    BadParameter(&'static str),
    #[error("{0}-bit accesses are not supported here")]
    UnsupportedWidth(u32),
    #[error("port {port:#x} is not aligned for a {width}-bit access")]
    MisalignedPort { port: u64, width: u32 },
    #[error("no PCI configuration access available")]
    NoPciAccess,
    #[error("timed out")]
    Timeout,
    #[error("firmware did not report an RSDP")]
    NoRootPointer,
    #[error("invalid RSDP: {0}")]
    BadRootPointer(#[from] RsdpError),
    #[error("interrupt {0} already has a handler")]
    HandlerExists(u32),
    #[error("no matching handler on interrupt {0}")]
    NoHandler(u32),
    #[error("interrupt {0} cannot be routed")]
    InterruptUnavailable(u32),
    #[error("interrupt controller is not ready")]
    RouterNotReady,
    #[error(transparent)]
    Sync(#[from] SyncError),
    #[error(transparent)]
    Cache(#[from] CacheError),
}

impl OslError {
    /// Status code reported to the interpreter.
    #[must_use]
    pub const fn status(&self) -> AcpiStatus {
        match self {
            Self::MissingCallback(_) | Self::NotActive(_) | Self::InvalidTransition { .. } => {
                status::AE_NOT_CONFIGURED
            }
            Self::Terminated => status::AE_ERROR,
            Self::BootMap(_) | Self::BadRootPointer(_) => status::AE_BAD_DATA,
            Self::OutstandingObjects(_) => status::AE_ACCESS,
            Self::InvalidHandle | Self::BadParameter(_) | Self::MisalignedPort { .. } => {
                status::AE_BAD_PARAMETER
            }
            Self::NotMapped(_) => status::AE_BAD_ADDRESS,
            Self::HandlesExhausted => status::AE_LIMIT,
            Self::NoMemory | Self::MapFailed { .. } => status::AE_NO_MEMORY,
            Self::UnsupportedWidth(_) => status::AE_NOT_IMPLEMENTED,
            Self::NoPciAccess => status::AE_SUPPORT,
            Self::Timeout => status::AE_TIME,
            Self::NoRootPointer => status::AE_NOT_FOUND,
            Self::HandlerExists(_) => status::AE_ALREADY_EXISTS,
            Self::NoHandler(_) => status::AE_NOT_EXIST,
            Self::InterruptUnavailable(_) | Self::RouterNotReady => status::AE_NO_HARDWARE_RESPONSE,
            Self::Sync(e) => match e {
                SyncError::Recursive(_) => status::AE_ALREADY_ACQUIRED,
                SyncError::NotOwner { .. } => status::AE_NOT_ACQUIRED,
                SyncError::InvalidUnits { .. } => status::AE_BAD_PARAMETER,
                SyncError::SemaphoreOverflow { .. } => status::AE_LIMIT,
            },
            Self::Cache(e) => match e {
                CacheError::Exhausted { .. } | CacheError::OutOfMemory { .. } => {
                    status::AE_NO_MEMORY
                }
                CacheError::InvalidSize(_)
                | CacheError::InvalidDepth
                | CacheError::ForeignObject
                | CacheError::DoubleRelease => status::AE_BAD_PARAMETER,
                CacheError::Destroyed => status::AE_ERROR,
                CacheError::Leaked { .. } => status::AE_ACCESS,
            },
        }
    }
}

impl From<OslError> for AcpiStatus {
    fn from(e: OslError) -> Self {
        e.status()
    }
}

/// Failure while handing the platform to the interpreter.
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BringUpError {
    #[error(transparent)]
    Osl(#[from] OslError),
    #[error("device tree rejected: {0}")]
    DeviceTree(#[from] DeviceTreeError),
    #[error("interpreter failed to {stage}: {status}")]
    Interpreter {
        stage: &'static str,
        status: AcpiStatus,
    },
}
