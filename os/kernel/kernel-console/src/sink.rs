use core::fmt::{self, Write};
use kernel_info::hwmap::BootHardwareMap;
use kernel_info::memory::HHDM_BASE;

/// Byte-oriented console output.
pub trait ConsoleSink: Send + Sync {
    fn put(&self, byte: u8);
}

impl<S: ConsoleSink + ?Sized> ConsoleSink for &S {
    fn put(&self, byte: u8) {
        (**self).put(byte);
    }
}

/// [`fmt::Write`] adapter over a sink.
pub struct SinkWriter<'a, S: ?Sized>(pub &'a S);

impl<S: ConsoleSink + ?Sized> Write for SinkWriter<'_, S> {
    #[inline]
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for b in s.bytes() {
            self.0.put(b);
        }
        Ok(())
    }
}

/// Best-effort formatted write; errors are dropped.
#[inline]
pub fn write_to<S: ConsoleSink + ?Sized>(sink: &S, args: fmt::Arguments<'_>) {
    if cfg!(feature = "enabled") {
        let _ = fmt::write(&mut SinkWriter(sink), args);
    }
}

/// QEMU's debug console on I/O port `0x402`.
#[derive(Debug, Default, Copy, Clone)]
pub struct DebugPort;

impl DebugPort {
    pub const PORT: u16 = 0x402;
}

impl ConsoleSink for DebugPort {
    #[allow(clippy::inline_always)]
    #[inline(always)]
    fn put(&self, byte: u8) {
        #[cfg(all(feature = "enabled", target_arch = "x86_64"))]
        unsafe {
            core::arch::asm!(
                "out dx, al",
                in("dx") Self::PORT,
                in("al") byte,
                options(nomem, nostack, preserves_flags)
            );
        }
        #[cfg(not(all(feature = "enabled", target_arch = "x86_64")))]
        let _ = byte;
    }
}

/// ARM PrimeCell PL011 UART, transmit side only.
#[derive(Debug)]
pub struct Pl011 {
    base: usize,
}

/// Data register.
const UARTDR: usize = 0x00;
/// Flag register.
const UARTFR: usize = 0x18;
/// Transmit FIFO full.
const FR_TXFF: u32 = 1 << 5;

impl Pl011 {
    /// # Safety
    /// `base` must be the mapped virtual address of a PL011 register block
    /// that stays mapped for the lifetime of the sink.
    #[must_use]
    pub const unsafe fn new(base: usize) -> Self {
        Self { base }
    }

    #[must_use]
    pub const fn base(&self) -> usize {
        self.base
    }

    #[cfg(feature = "enabled")]
    fn write_byte(&self, byte: u8) {
        let fr = (self.base + UARTFR) as *const u32;
        let dr = (self.base + UARTDR) as *mut u32;
        // Safety: per `new`, both registers are mapped.
        unsafe {
            while fr.read_volatile() & FR_TXFF != 0 {
                core::hint::spin_loop();
            }
            dr.write_volatile(u32::from(byte));
        }
    }
}

impl ConsoleSink for Pl011 {
    fn put(&self, byte: u8) {
        #[cfg(feature = "enabled")]
        {
            if byte == b'\n' {
                self.write_byte(b'\r');
            }
            self.write_byte(byte);
        }
        #[cfg(not(feature = "enabled"))]
        let _ = byte;
    }
}

/// The board's console, chosen from the boot hardware map.
#[derive(Debug)]
pub enum Console {
    DebugPort(DebugPort),
    Pl011(Pl011),
}

impl Console {
    /// # Safety
    /// If the map names an MMIO console, the HHDM must already cover it.
    #[must_use]
    pub unsafe fn from_map(map: &BootHardwareMap) -> Self {
        let virt = map
            .console_base
            .and_then(|phys| HHDM_BASE.checked_add(phys))
            .and_then(|virt| usize::try_from(virt).ok());
        match virt {
            // Safety: forwarded to the caller.
            Some(base) => Self::Pl011(unsafe { Pl011::new(base) }),
            None => Self::DebugPort(DebugPort),
        }
    }
}

impl ConsoleSink for Console {
    fn put(&self, byte: u8) {
        match self {
            Self::DebugPort(port) => port.put(byte),
            Self::Pl011(uart) => uart.put(byte),
        }
    }
}
