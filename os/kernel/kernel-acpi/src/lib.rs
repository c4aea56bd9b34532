//! # ACPI OS Services Layer
//!
//! The ACPI interpreter is portable; everything it needs from the kernel it
//! asks for through a fixed set of callbacks. This crate is that callback
//! surface for our kernel.
//!
//! ## Overview
//!
//! ```text
//! boot hardware map (kernel-info)
//!     ↓  configure
//! Osl ──────────── platform services (PhysMapper, Clock, InterruptRouter,
//!     ↑  callbacks                    PortIo, PciConfigSpace)
//! ACPI interpreter
//! ```
//!
//! * [`Osl`] is the façade. It is built once from the kernel's platform
//!   services with [`OslBuilder`], configured from the
//!   [`BootHardwareMap`](kernel_info::hwmap::BootHardwareMap), and then
//!   serves interpreter callbacks until it is terminated.
//! * [`bringup`] decides whether ACPI or a device tree describes the machine
//!   and drives the interpreter's initialization stages.
//!
//! ## Key Components
//!
//! ### Lifecycle ([`OslState`])
//! `Uninitialized → Configured → Active → ShuttingDown → Terminated`.
//! The façade refuses to terminate while cache objects are outstanding, and
//! refuses every callback once terminated.
//!
//! ### Synchronization
//! Spin locks, mutexes and semaphores live in handle tables and are built on
//! `kernel-sync`. Spin locks mask interrupts and hand the saved state back to
//! the interpreter as [`AcpiCpuFlags`](kernel_info::width::AcpiCpuFlags).
//! Recursive acquisition or foreign release is a bugcheck.
//!
//! ### Object caches
//! Fixed-size, zeroed objects with a bounded free list and usage counters,
//! backed by [`kernel_sync::ObjectCache`].
//!
//! ### Memory and I/O
//! * Physical mappings are page granular; callers get a pointer to the
//!   exact byte they asked for.
//! * Port I/O accepts 8, 16 and 32-bit naturally aligned accesses.
//! * PCI configuration space goes through a [`PciConfigSpace`]
//!   implementation, e.g. [`LegacyPciConfig`] over ports `0xCF8`/`0xCFC`.
//!
//! ### Interrupts
//! Handlers installed before the interrupt controller is up are kept and
//! bound later by [`Osl::bind_deferred_interrupts`].
//!
//! ### Formatted output ([`printf`])
//! The interpreter's C-style `printf` templates are rendered without libc
//! into fixed-size lines and forwarded to the `log` facade.
//!
//! ### Firmware structures
//! * [`rsdp`]: RSDP (ACPI 1.0) and XSDP (ACPI 2.0+) validation.
//! * [`devtree`]: flattened device tree header checks.
//!
//! ## Status codes
//!
//! Every [`OslError`] maps to the [`AcpiStatus`] the interpreter expects via
//! [`OslError::status`].
//!
//! ## Usage
//!
//! ```rust,ignore
//! use kernel_acpi::{OslBuilder, bringup};
//!
//! let mut osl = OslBuilder::new()
//!     .context(&ctx)
//!     .memory(&HhdmMapper)
//!     .clock(&pit)
//!     .interrupts(&ioapic)
//!     .ports(&X86Ports)
//!     .pci(&LegacyPciConfig::new(X86Ports))
//!     .build()?;
//!
//! let map = kernel_info::hwmap::boot_map()?;
//! bringup::bring_up(&mut osl, map, &mut interpreter)?;
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

extern crate alloc;

pub mod bringup;
pub mod devtree;
pub mod error;
pub mod handles;
pub mod osl;
pub mod platform;
pub mod printf;
pub mod rsdp;
pub mod status;

pub use bringup::{BringUp, Interpreter, bring_up, shut_down};
pub use error::{BringUpError, OslError};
pub use handles::{CacheHandle, LockHandle, MutexHandle, SemaphoreHandle};
pub use osl::{AcpiSignal, Osl, OslBuilder, OslState, WAIT_FOREVER};
pub use platform::{
    Clock, HhdmMapper, InterruptBinding, InterruptRouter, InterruptServiceRoutine,
    LegacyPciConfig, PciConfigSpace, PhysMapper, PortIo, PortWidth,
};
#[cfg(target_arch = "x86_64")]
pub use platform::X86Ports;
pub use printf::FormatArg;
pub use status::AcpiStatus;

/// Byte sum used by firmware table checksums.
fn sum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0, |a, &b| a.wrapping_add(b))
}
