//! # Platform services
//!
//! The kernel services the façade is built on. Each trait is a narrow seam so
//! the façade can run against real hardware in the kernel and against fakes
//! in host tests.

use core::ptr::NonNull;
use kernel_info::hwmap::PhysAddr;
use kernel_info::memory::{HHDM_BASE, HHDM_LIMIT, PAGE_SIZE};
use kernel_info::width::AcpiPciId;
use kernel_sync::SpinMutex;

/// Maps physical pages into the kernel's address space.
pub trait PhysMapper: Sync {
    /// Map `pages` pages starting at the page-aligned `phys_page`.
    /// Returns the virtual address of the first page.
    fn map(&self, phys_page: PhysAddr, pages: usize) -> Option<NonNull<u8>>;

    /// Undo a [`map`](Self::map) of `pages` pages at `virt_page`.
    ///
    /// # Safety
    /// `virt_page` and `pages` must describe a live mapping returned by `map`.
    unsafe fn unmap(&self, virt_page: NonNull<u8>, pages: usize);

    /// Translate a kernel virtual address back to physical.
    fn virt_to_phys(&self, virt: usize) -> Option<PhysAddr>;
}

/// Monotonic time and delays.
pub trait Clock: Sync {
    /// Monotonic time in 100 ns units.
    fn ticks_100ns(&self) -> u64;

    /// Busy-wait for `us` microseconds without yielding.
    fn stall_us(&self, us: u32);

    /// Suspend the caller for at least `ms` milliseconds.
    fn sleep_ms(&self, ms: u64);
}

/// Interrupt service routine as the interpreter registers it.
pub type InterruptServiceRoutine = extern "C" fn(context: usize) -> u32;

/// One interpreter interrupt handler.
#[derive(Debug, Copy, Clone)]
pub struct InterruptBinding {
    /// Global system interrupt.
    pub gsi: u32,
    pub handler: InterruptServiceRoutine,
    pub context: usize,
}

impl InterruptBinding {
    #[must_use]
    pub fn is_handler(&self, handler: InterruptServiceRoutine) -> bool {
        self.handler as usize == handler as usize
    }
}

/// Routes global system interrupts to handlers.
///
/// The interpreter installs its SCI handler while the interrupt controller is
/// usually still unconfigured, since the controller is itself described by
/// ACPI. Until [`is_ready`](Self::is_ready) reports `true` the façade keeps
/// bindings pending.
pub trait InterruptRouter: Sync {
    fn is_ready(&self) -> bool;

    /// Returns `false` if the line cannot be routed.
    fn bind(&self, binding: InterruptBinding) -> bool;

    fn unbind(&self, gsi: u32);
}

/// Width of a port or PCI configuration access.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PortWidth {
    Byte,
    Word,
    Dword,
}

impl PortWidth {
    /// Decode an access width given in bits.
    #[must_use]
    pub const fn from_bits(bits: u32) -> Option<Self> {
        match bits {
            8 => Some(Self::Byte),
            16 => Some(Self::Word),
            32 => Some(Self::Dword),
            _ => None,
        }
    }

    #[must_use]
    pub const fn bytes(self) -> u16 {
        match self {
            Self::Byte => 1,
            Self::Word => 2,
            Self::Dword => 4,
        }
    }

    /// Mask selecting the bits of a value of this width.
    #[must_use]
    pub const fn mask(self) -> u32 {
        match self {
            Self::Byte => 0xFF,
            Self::Word => 0xFFFF,
            Self::Dword => 0xFFFF_FFFF,
        }
    }
}

/// I/O port space.
pub trait PortIo: Sync {
    /// # Safety
    /// Port reads can have side effects on hardware.
    unsafe fn read(&self, port: u16, width: PortWidth) -> u32;

    /// # Safety
    /// Port writes reconfigure hardware.
    unsafe fn write(&self, port: u16, width: PortWidth, value: u32);
}

impl<T: PortIo + ?Sized> PortIo for &T {
    unsafe fn read(&self, port: u16, width: PortWidth) -> u32 {
        unsafe { (**self).read(port, width) }
    }

    unsafe fn write(&self, port: u16, width: PortWidth, value: u32) {
        unsafe { (**self).write(port, width, value) }
    }
}

/// PCI configuration space, accessed in aligned dwords.
pub trait PciConfigSpace: Sync {
    /// Whether `register` of function `id` is reachable.
    fn supports(&self, id: AcpiPciId, register: u16) -> bool;

    /// # Safety
    /// `id`/`register` must be [supported](Self::supports) and dword-aligned.
    unsafe fn read32(&self, id: AcpiPciId, register: u16) -> u32;

    /// # Safety
    /// As [`read32`](Self::read32); writes reconfigure devices.
    unsafe fn write32(&self, id: AcpiPciId, register: u16, value: u32);
}

/// Higher-half direct map: physical memory is permanently mapped at
/// [`HHDM_BASE`], so mapping is an offset and unmapping is a no-op.
#[derive(Debug, Default, Copy, Clone)]
pub struct HhdmMapper;

impl PhysMapper for HhdmMapper {
    fn map(&self, phys_page: PhysAddr, pages: usize) -> Option<NonNull<u8>> {
        let len = u64::try_from(pages).ok()?.checked_mul(PAGE_SIZE)?;
        if phys_page.checked_add(len)? > HHDM_LIMIT {
            return None;
        }
        let virt = usize::try_from(HHDM_BASE + phys_page).ok()?;
        NonNull::new(core::ptr::with_exposed_provenance_mut(virt))
    }

    unsafe fn unmap(&self, _virt_page: NonNull<u8>, _pages: usize) {}

    fn virt_to_phys(&self, virt: usize) -> Option<PhysAddr> {
        let virt = u64::try_from(virt).ok()?;
        let phys = virt.checked_sub(HHDM_BASE)?;
        (phys < HHDM_LIMIT).then_some(phys)
    }
}

/// x86 `in`/`out` instructions. Requires ring 0 (or a suitable IOPL).
#[cfg(target_arch = "x86_64")]
#[derive(Debug, Default, Copy, Clone)]
pub struct X86Ports;

#[cfg(target_arch = "x86_64")]
impl PortIo for X86Ports {
    unsafe fn read(&self, port: u16, width: PortWidth) -> u32 {
        use core::arch::asm;
        unsafe {
            match width {
                PortWidth::Byte => {
                    let v: u8;
                    asm!("in al, dx", out("al") v, in("dx") port, options(nomem, nostack, preserves_flags));
                    u32::from(v)
                }
                PortWidth::Word => {
                    let v: u16;
                    asm!("in ax, dx", out("ax") v, in("dx") port, options(nomem, nostack, preserves_flags));
                    u32::from(v)
                }
                PortWidth::Dword => {
                    let v: u32;
                    asm!("in eax, dx", out("eax") v, in("dx") port, options(nomem, nostack, preserves_flags));
                    v
                }
            }
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    unsafe fn write(&self, port: u16, width: PortWidth, value: u32) {
        use core::arch::asm;
        unsafe {
            match width {
                PortWidth::Byte => {
                    asm!("out dx, al", in("dx") port, in("al") value as u8, options(nomem, nostack, preserves_flags));
                }
                PortWidth::Word => {
                    asm!("out dx, ax", in("dx") port, in("ax") value as u16, options(nomem, nostack, preserves_flags));
                }
                PortWidth::Dword => {
                    asm!("out dx, eax", in("dx") port, in("eax") value, options(nomem, nostack, preserves_flags));
                }
            }
        }
    }
}

/// `CONFIG_ADDRESS` register of PCI configuration mechanism #1.
#[bitfield_struct::bitfield(u32)]
#[derive(PartialEq, Eq)]
pub struct PciConfigAddress {
    /// Dword-aligned register offset (bits 0..7; low two bits zero).
    #[bits(8)]
    pub register: u8,
    #[bits(3)]
    pub function: u8,
    #[bits(5)]
    pub device: u8,
    pub bus: u8,
    #[bits(7)]
    __reserved: u8,
    /// Bit 31 turns the access into a configuration cycle.
    pub enable: bool,
}

impl PciConfigAddress {
    /// Address of the dword containing `register`, or `None` if `id` or
    /// `register` lie outside what mechanism #1 can reach.
    #[must_use]
    pub fn for_register(id: AcpiPciId, register: u16) -> Option<Self> {
        if id.segment != 0 || id.device >= 32 || id.function >= 8 {
            return None;
        }
        Some(
            Self::new()
                .with_register(u8::try_from(register).ok()? & 0xFC)
                .with_function(u8::try_from(id.function).ok()?)
                .with_device(u8::try_from(id.device).ok()?)
                .with_bus(u8::try_from(id.bus).ok()?)
                .with_enable(true),
        )
    }
}

/// Legacy `0xCF8`/`0xCFC` configuration access. Segment 0 and the first
/// 256 bytes of each function only.
pub struct LegacyPciConfig<P> {
    ports: P,
    // Address and data ports form one transaction.
    cycle: SpinMutex<()>,
}

pub const PCI_CONFIG_ADDRESS: u16 = 0xCF8;
pub const PCI_CONFIG_DATA: u16 = 0xCFC;

impl<P: PortIo> LegacyPciConfig<P> {
    pub const fn new(ports: P) -> Self {
        Self {
            ports,
            cycle: SpinMutex::new(()),
        }
    }
}

impl<P: PortIo> PciConfigSpace for LegacyPciConfig<P> {
    fn supports(&self, id: AcpiPciId, register: u16) -> bool {
        PciConfigAddress::for_register(id, register).is_some()
    }

    unsafe fn read32(&self, id: AcpiPciId, register: u16) -> u32 {
        let Some(address) = PciConfigAddress::for_register(id, register) else {
            return u32::MAX;
        };
        let _cycle = self.cycle.lock();
        unsafe {
            self.ports
                .write(PCI_CONFIG_ADDRESS, PortWidth::Dword, address.into_bits());
            self.ports.read(PCI_CONFIG_DATA, PortWidth::Dword)
        }
    }

    unsafe fn write32(&self, id: AcpiPciId, register: u16, value: u32) {
        let Some(address) = PciConfigAddress::for_register(id, register) else {
            return;
        };
        let _cycle = self.cycle.lock();
        unsafe {
            self.ports
                .write(PCI_CONFIG_ADDRESS, PortWidth::Dword, address.into_bits());
            self.ports.write(PCI_CONFIG_DATA, PortWidth::Dword, value);
        }
    }
}
