//! # Machine Width & ABI Configuration
//!
//! The ACPI interpreter computes its struct layouts from a compile-time
//! machine width. The aliases in this module must agree byte-for-byte with
//! what the interpreter was built with, so the profile is chosen before
//! compilation and never branched on at runtime.
//!
//! * The `width-32` / `width-64` features force a profile.
//! * Without either feature the profile follows `target_pointer_width`.
//!
//! A profile that disagrees with the target's pointer width fails the build.

/// Supported machine widths.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum MachineWidth {
    Bits32,
    Bits64,
}

impl MachineWidth {
    /// The profile this image was built with.
    pub const ACTIVE: Self = profile::WIDTH;

    #[must_use]
    pub const fn pointer_bytes(self) -> usize {
        match self {
            Self::Bits32 => 4,
            Self::Bits64 => 8,
        }
    }

    #[must_use]
    pub const fn pointer_bits(self) -> u32 {
        match self {
            Self::Bits32 => 32,
            Self::Bits64 => 64,
        }
    }

    /// Expected size of every interpreter-visible type under this profile.
    #[must_use]
    pub const fn expected_layout(self) -> &'static [TypeWidth] {
        match self {
            Self::Bits32 => &LAYOUT_32,
            Self::Bits64 => &LAYOUT_64,
        }
    }
}

/// Name and byte size of one interpreter-visible type.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TypeWidth {
    pub name: &'static str,
    pub bytes: usize,
}

const fn tw(name: &'static str, bytes: usize) -> TypeWidth {
    TypeWidth { name, bytes }
}

const LAYOUT_64: [TypeWidth; 11] = [
    tw("AcpiSize", 8),
    tw("AcpiNativeInt", 8),
    tw("AcpiNativeUint", 8),
    tw("AcpiIoAddress", 8),
    tw("AcpiCpuFlags", 8),
    tw("AcpiPhysicalAddress", 8),
    tw("AcpiInteger", 8),
    tw("AcpiThreadId", 8),
    tw("AcpiStatusCode", 4),
    tw("AcpiPciId", 8),
    tw("pointer", 8),
];

const LAYOUT_32: [TypeWidth; 11] = [
    tw("AcpiSize", 4),
    tw("AcpiNativeInt", 4),
    tw("AcpiNativeUint", 4),
    tw("AcpiIoAddress", 4),
    tw("AcpiCpuFlags", 4),
    tw("AcpiPhysicalAddress", 8),
    tw("AcpiInteger", 8),
    tw("AcpiThreadId", 8),
    tw("AcpiStatusCode", 4),
    tw("AcpiPciId", 8),
    tw("pointer", 4),
];

#[cfg(all(feature = "width-32", feature = "width-64"))]
compile_error!("features `width-32` and `width-64` are mutually exclusive");

#[cfg(any(
    feature = "width-64",
    all(not(feature = "width-32"), target_pointer_width = "64")
))]
mod profile {
    use super::MachineWidth;

    pub const WIDTH: MachineWidth = MachineWidth::Bits64;

    pub type AcpiSize = u64;
    pub type AcpiNativeInt = i64;
    pub type AcpiNativeUint = u64;
    pub type AcpiIoAddress = u64;
}

#[cfg(any(
    feature = "width-32",
    all(not(feature = "width-64"), not(target_pointer_width = "64"))
))]
mod profile {
    use super::MachineWidth;

    pub const WIDTH: MachineWidth = MachineWidth::Bits32;

    pub type AcpiSize = u32;
    pub type AcpiNativeInt = i32;
    pub type AcpiNativeUint = u32;
    pub type AcpiIoAddress = u32;
}

pub use profile::{AcpiIoAddress, AcpiNativeInt, AcpiNativeUint, AcpiSize};

/// Saved interrupt state returned by spinlock acquisition.
pub type AcpiCpuFlags = AcpiSize;

/// Physical addresses stay 64-bit on both profiles (no 32-bit PA build).
pub type AcpiPhysicalAddress = u64;

/// ACPI 2.0+ integers are always 64-bit.
pub type AcpiInteger = u64;

pub type AcpiThreadId = u64;

/// Raw interpreter status code.
pub type AcpiStatusCode = u32;

/// PCI function address as the interpreter passes it.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct AcpiPciId {
    pub segment: u16,
    pub bus: u16,
    pub device: u16,
    pub function: u16,
}

/// Measured size of each interpreter-visible type, in the same order as
/// [`MachineWidth::expected_layout`].
#[must_use]
pub const fn measured_layout() -> [TypeWidth; 11] {
    use core::mem::size_of;
    [
        tw("AcpiSize", size_of::<AcpiSize>()),
        tw("AcpiNativeInt", size_of::<AcpiNativeInt>()),
        tw("AcpiNativeUint", size_of::<AcpiNativeUint>()),
        tw("AcpiIoAddress", size_of::<AcpiIoAddress>()),
        tw("AcpiCpuFlags", size_of::<AcpiCpuFlags>()),
        tw("AcpiPhysicalAddress", size_of::<AcpiPhysicalAddress>()),
        tw("AcpiInteger", size_of::<AcpiInteger>()),
        tw("AcpiThreadId", size_of::<AcpiThreadId>()),
        tw("AcpiStatusCode", size_of::<AcpiStatusCode>()),
        tw("AcpiPciId", size_of::<AcpiPciId>()),
        tw("pointer", size_of::<*const ()>()),
    ]
}

const _: () = {
    assert!(
        MachineWidth::ACTIVE.pointer_bits() == usize::BITS,
        "machine width profile does not match the target pointer width"
    );
    let expected = MachineWidth::ACTIVE.expected_layout();
    let measured = measured_layout();
    assert!(expected.len() == measured.len());
    let mut i = 0;
    while i < measured.len() {
        assert!(expected[i].bytes == measured[i].bytes);
        i += 1;
    }
};
