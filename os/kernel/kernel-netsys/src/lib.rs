//! # Network Stack System Layer
//!
//! The TCP/IP stack is an external library that, like the ACPI interpreter,
//! only needs a handful of services from the kernel: a millisecond clock,
//! a critical-section guard, mutexes, counting semaphores with timeouts, and
//! fixed-size packet buffers. [`NetSys`] provides them on top of the same
//! `kernel-sync` primitives and platform [`Clock`](kernel_acpi::Clock) the
//! ACPI services layer uses.
//!
//! Unlike the ACPI façade there are no handle tables: the stack stores the
//! objects ([`NetMutex`], [`NetSemaphore`]) in its own structures and passes
//! them back by reference.
//!
//! | Stack hook              | Here                                   |
//! |-------------------------|----------------------------------------|
//! | `sys_now`               | [`NetSys::now_ms`]                     |
//! | `SYS_ARCH_PROTECT`      | [`NetSys::protect`] / [`NetSys::unprotect`] |
//! | `sys_mutex_*`           | [`NetSys::mutex_new`] ... [`NetSys::mutex_free`] |
//! | `sys_sem_*`             | [`NetSys::sem_new`] ... [`NetSys::sem_free`] |
//! | packet buffer pool      | [`PacketPool`], [`PacketBuf`]          |

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

mod error;
mod packet;
mod sys;

pub use error::NetSysError;
pub use packet::{PacketBuf, PacketPool};
pub use sys::{NetMutex, NetSemaphore, NetSys, Protection, SEM_MAX};
