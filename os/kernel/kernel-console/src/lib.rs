//! # Kernel Console and Log Pipeline
//!
//! Early-boot text output for every supported board, and the `log::Log`
//! implementation the rest of the kernel (including the ACPI services layer)
//! writes through.
//!
//! ## Overview
//!
//! ```text
//! log::info!(..) / console_trace!(..)
//!     ↓
//! ConsoleLogger  "[LEVEL] target: message\n"
//!     ↓
//! ConsoleSink (byte at a time)
//!     ├─ DebugPort  → I/O port 0x402 (QEMU -debugcon, PC profile)
//!     └─ Pl011      → UART data register at the boot map's console address
//! ```
//!
//! ## Sink selection
//!
//! [`Console::from_map`] picks the sink from the
//! [`BootHardwareMap`](kernel_info::hwmap::BootHardwareMap): boards with an
//! MMIO console get a [`Pl011`] at that address (reached through the HHDM),
//! the PC profile gets the QEMU [`DebugPort`].
//!
//! ## `enabled` feature (default)
//!
//! Without it every sink is a no-op and no port or MMIO access is compiled
//! in, so the same logging calls cost nothing in production images.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use kernel_console::{ConsoleLogger, DebugPort};
//! use log::LevelFilter;
//!
//! static LOGGER: ConsoleLogger<DebugPort> = ConsoleLogger::new(DebugPort, LevelFilter::Debug);
//!
//! LOGGER.init()?;
//! log::info!("console up");
//! ```
//!
//! On the host, capture the PC debug port with
//! `qemu-system-x86_64 ... -debugcon stdio`.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

mod logger;
mod sink;

pub use logger::ConsoleLogger;
pub use sink::{Console, ConsoleSink, DebugPort, Pl011, SinkWriter, write_to};

/// Formatted output straight to a sink, bypassing the log facade.
#[macro_export]
macro_rules! console_trace {
    ($sink:expr, $($arg:tt)*) => {{
        // `format_args!` does not allocate.
        $crate::write_to(&$sink, core::format_args!($($arg)*));
    }};
}
