//! # Boot Hardware Map
//!
//! Static description of the board the kernel image was built for: where
//! general-purpose RAM lives, where the debug console is mapped, and where
//! firmware left a hardware description (ACPI root pointer or device tree).
//!
//! Values are fixed per [`PlatformProfile`] and selected with a Cargo feature;
//! nothing here probes hardware.

/// Physical address as seen by the CPU before paging.
pub type PhysAddr = u64;

/// A half-open physical range `[start, end)`.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct BlobRange {
    pub start: PhysAddr,
    pub end: PhysAddr,
}

impl BlobRange {
    #[must_use]
    pub const fn new(start: PhysAddr, end: PhysAddr) -> Self {
        Self { start, end }
    }

    /// Length of the range in bytes; zero for inverted ranges.
    #[must_use]
    pub const fn len(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Early-boot inventory of the platform.
///
/// Keep this `#[repr(C)]`; boot stubs written in assembly may read it.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct BootHardwareMap {
    /// First byte of general-purpose RAM.
    pub ram_base: PhysAddr,

    /// Size of general-purpose RAM in **bytes**. Must be non-zero.
    pub ram_length: u64,

    /// MMIO base of the debug console, if the board has one.
    /// Never part of the RAM region.
    pub console_base: Option<PhysAddr>,

    /// Flattened device tree handed over by firmware or the bootloader.
    pub hw_description_blob: Option<BlobRange>,

    /// RSDP (ACPI 2.0+) physical address, if firmware reported one.
    pub acpi_root: Option<PhysAddr>,
}

/// Where the kernel should take its hardware description from.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FirmwareSource {
    /// Hand the platform to the ACPI interpreter. Without a root pointer the
    /// interpreter scans the legacy BIOS areas itself.
    Acpi { root: Option<PhysAddr> },
    /// No ACPI; the device tree is the only description.
    DeviceTree(BlobRange),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BootMapError {
    #[error("boot hardware map defines no RAM region")]
    NoRamRegion,
    #[error("RAM region at {base:#x} with length {length:#x} wraps the address space")]
    RamRegionOverflow { base: PhysAddr, length: u64 },
    #[error("console at {0:#x} overlaps general-purpose RAM")]
    ConsoleInRam(PhysAddr),
    #[error("hardware description blob {start:#x}..{end:#x} is empty")]
    EmptyBlob { start: PhysAddr, end: PhysAddr },
}

impl BootHardwareMap {
    /// Exclusive end of the RAM region, if it does not wrap.
    #[must_use]
    pub const fn ram_end(&self) -> Option<PhysAddr> {
        self.ram_base.checked_add(self.ram_length)
    }

    /// Whether `addr` lies in general-purpose RAM.
    #[must_use]
    pub const fn contains_ram(&self, addr: PhysAddr) -> bool {
        match self.ram_end() {
            Some(end) => addr >= self.ram_base && addr < end,
            None => false,
        }
    }

    /// Check the map's invariants.
    ///
    /// # Errors
    /// Returns the first violated invariant; see [`BootMapError`].
    pub const fn validate(&self) -> Result<(), BootMapError> {
        if self.ram_length == 0 {
            return Err(BootMapError::NoRamRegion);
        }
        if self.ram_end().is_none() {
            return Err(BootMapError::RamRegionOverflow {
                base: self.ram_base,
                length: self.ram_length,
            });
        }
        if let Some(console) = self.console_base
            && self.contains_ram(console)
        {
            return Err(BootMapError::ConsoleInRam(console));
        }
        if let Some(blob) = self.hw_description_blob
            && blob.is_empty()
        {
            return Err(BootMapError::EmptyBlob {
                start: blob.start,
                end: blob.end,
            });
        }
        Ok(())
    }

    /// Decide whether ACPI or the device tree describes the machine.
    #[must_use]
    pub const fn firmware_source(&self) -> FirmwareSource {
        match (self.acpi_root, self.hw_description_blob) {
            (Some(root), _) => FirmwareSource::Acpi { root: Some(root) },
            (None, Some(blob)) => FirmwareSource::DeviceTree(blob),
            (None, None) => FirmwareSource::Acpi { root: None },
        }
    }
}

const MIB: u64 = 1024 * 1024;

/// Boards this kernel can be built for.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PlatformProfile {
    /// x86-64 PC (QEMU `q35`/`pc`). Console is the I/O-port debug console,
    /// so no MMIO address is recorded.
    Pc,
    /// QEMU AArch64 `virt` board. QEMU places the DTB at the start of RAM.
    QemuVirt,
    /// ARM RealView Platform Baseboard (ARMv7).
    RealviewPb,
}

impl PlatformProfile {
    pub const ALL: [Self; 3] = [Self::Pc, Self::QemuVirt, Self::RealviewPb];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Pc => "pc",
            Self::QemuVirt => "qemu-virt",
            Self::RealviewPb => "realview-pb",
        }
    }

    #[must_use]
    pub const fn hardware_map(self) -> BootHardwareMap {
        match self {
            Self::Pc => BootHardwareMap {
                ram_base: 0x0010_0000,
                ram_length: 128 * MIB,
                console_base: None,
                hw_description_blob: None,
                acpi_root: None,
            },
            Self::QemuVirt => BootHardwareMap {
                ram_base: 0x4000_0000,
                ram_length: 128 * MIB,
                console_base: Some(0x0900_0000),
                hw_description_blob: Some(BlobRange::new(0x4000_0000, 0x4010_0000)),
                acpi_root: None,
            },
            Self::RealviewPb => BootHardwareMap {
                ram_base: 0x7000_0000,
                ram_length: 256 * MIB,
                console_base: Some(0x1000_9000),
                hw_description_blob: None,
                acpi_root: None,
            },
        }
    }

    /// The profile selected at build time.
    #[must_use]
    pub const fn selected() -> Self {
        SELECTED
    }
}

#[cfg(all(feature = "platform-qemu-virt", feature = "platform-realview-pb"))]
compile_error!("select at most one of `platform-qemu-virt` and `platform-realview-pb`");

#[cfg(feature = "platform-qemu-virt")]
const SELECTED: PlatformProfile = PlatformProfile::QemuVirt;

#[cfg(all(feature = "platform-realview-pb", not(feature = "platform-qemu-virt")))]
const SELECTED: PlatformProfile = PlatformProfile::RealviewPb;

#[cfg(not(any(feature = "platform-qemu-virt", feature = "platform-realview-pb")))]
const SELECTED: PlatformProfile = PlatformProfile::Pc;

/// The hardware map of the board this image was built for.
///
/// # Errors
/// Fails fast with a [`BootMapError`] if the selected profile is malformed,
/// most importantly when it defines no RAM region.
pub const fn boot_map() -> Result<BootHardwareMap, BootMapError> {
    let map = SELECTED.hardware_map();
    match map.validate() {
        Ok(()) => Ok(map),
        Err(e) => Err(e),
    }
}

const _: () = {
    let mut i = 0;
    while i < PlatformProfile::ALL.len() {
        assert!(PlatformProfile::ALL[i].hardware_map().validate().is_ok());
        i += 1;
    }
};
