//! # Kernel Configuration and Boot Interface
//!
//! This crate holds the static, build-time configuration every other kernel
//! crate agrees on before the ACPI subsystem exists: what hardware the image
//! was built for, how wide the machine is, and how physical memory is reached.
//!
//! ## Overview
//!
//! The ACPI interpreter cannot run until the kernel knows where RAM lives and
//! how wide the interpreter's integers are. Both facts are fixed when the
//! image is built, so they live here as `const` data rather than runtime
//! state. Nothing in this crate is mutable and nothing needs locking.
//!
//! ## Modules
//!
//! ### Boot Hardware Map ([`hwmap`])
//! * **Platform Profiles**: one [`PlatformProfile`](hwmap::PlatformProfile) per
//!   supported board, selected through a `platform-*` Cargo feature
//! * **RAM Extent**: base and length of general-purpose RAM
//! * **Debug Console**: optional MMIO base, guaranteed outside RAM
//! * **Firmware Description**: optional device tree blob and ACPI root pointer
//! * **Fail Fast**: [`boot_map`](hwmap::boot_map) refuses a map without RAM
//!
//! ### Machine Width ([`width`])
//! * **Width Profiles**: 32- or 64-bit, selected by feature or target
//! * **Interpreter Types**: `AcpiSize`, `AcpiPhysicalAddress`, `AcpiPciId`, ...
//! * **Build-Time Checks**: a profile that disagrees with the target's pointer
//!   width, or a type whose size drifts from the profile, fails compilation
//!
//! ### Memory Layout ([`memory`])
//! * **Paging**: page size and page arithmetic helpers
//! * **Physical Memory Mapping**: HHDM (Higher Half Direct Mapping) window
//!
//! ## Board Selection
//!
//! ```toml
//! [dependencies]
//! kernel-info = { path = "../kernel-info", default-features = false, features = ["platform-qemu-virt"] }
//! ```
//!
//! ```rust
//! use kernel_info::hwmap::{boot_map, FirmwareSource};
//!
//! let map = boot_map().expect("board defines RAM");
//! assert!(map.ram_length > 0);
//! match map.firmware_source() {
//!     FirmwareSource::Acpi { root } => { let _ = root; }
//!     FirmwareSource::DeviceTree(blob) => { let _ = blob.len(); }
//! }
//! ```
//!
//! ## Safety Guarantees
//!
//! * **No Unsafe Code**: Marked `#![deny(unsafe_code)]`
//! * **Stable Layouts**: `#[repr(C)]` on every structure crossing into
//!   assembly or the interpreter

#![cfg_attr(not(any(test, doctest)), no_std)]
#![deny(unsafe_code)]

pub mod hwmap;
pub mod memory;
pub mod width;
