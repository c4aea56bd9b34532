//! # Flattened device tree header
//!
//! Boards without ACPI hand the kernel a device tree blob instead. Bring-up
//! only checks that the blob is a well-formed FDT that fits the range the
//! boot map reserved for it; walking the tree is left to the driver layer.

use core::ops::Range;

pub const FDT_MAGIC: u32 = 0xd00d_feed;

/// Size of the version 17 header.
pub const FDT_HEADER_LEN: usize = 40;

/// Oldest layout this header reader understands.
const FDT_MIN_COMPAT_VERSION: u32 = 16;

/// Big-endian FDT header, decoded.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct FdtHeader {
    pub total_size: u32,
    pub off_dt_struct: u32,
    pub off_dt_strings: u32,
    pub off_mem_rsvmap: u32,
    pub version: u32,
    pub last_comp_version: u32,
    pub boot_cpuid_phys: u32,
    pub size_dt_strings: u32,
    pub size_dt_struct: u32,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeviceTreeError {
    #[error("device tree header truncated: {0} bytes available")]
    Truncated(usize),
    #[error("bad device tree magic {0:#010x}")]
    BadMagic(u32),
    #[error("device tree claims {total_size} bytes but only {available} are reserved")]
    BadSize { total_size: u32, available: u64 },
    #[error("device tree version {version} (compatible with {last_comp_version}) is not supported")]
    UnsupportedVersion { version: u32, last_comp_version: u32 },
    #[error("device tree block {name} at {offset:#x}+{len:#x} lies outside the blob")]
    BlockOutOfBounds {
        name: &'static str,
        offset: u32,
        len: u32,
    },
}

fn be32(bytes: &[u8], at: usize) -> u32 {
    u32::from_be_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

impl FdtHeader {
    /// Decode and validate the header of a blob with `available` reserved bytes.
    ///
    /// # Errors
    /// See [`DeviceTreeError`].
    pub fn parse(header: &[u8], available: u64) -> Result<Self, DeviceTreeError> {
        if header.len() < FDT_HEADER_LEN {
            return Err(DeviceTreeError::Truncated(header.len()));
        }
        let magic = be32(header, 0);
        if magic != FDT_MAGIC {
            return Err(DeviceTreeError::BadMagic(magic));
        }

        let hdr = Self {
            total_size: be32(header, 4),
            off_dt_struct: be32(header, 8),
            off_dt_strings: be32(header, 12),
            off_mem_rsvmap: be32(header, 16),
            version: be32(header, 20),
            last_comp_version: be32(header, 24),
            boot_cpuid_phys: be32(header, 28),
            size_dt_strings: be32(header, 32),
            size_dt_struct: be32(header, 36),
        };

        if (hdr.total_size as usize) < FDT_HEADER_LEN || u64::from(hdr.total_size) > available {
            return Err(DeviceTreeError::BadSize {
                total_size: hdr.total_size,
                available,
            });
        }
        if hdr.last_comp_version > FDT_MIN_COMPAT_VERSION + 1
            || hdr.version < FDT_MIN_COMPAT_VERSION
        {
            return Err(DeviceTreeError::UnsupportedVersion {
                version: hdr.version,
                last_comp_version: hdr.last_comp_version,
            });
        }

        hdr.check_block("structure", hdr.off_dt_struct, hdr.size_dt_struct)?;
        hdr.check_block("strings", hdr.off_dt_strings, hdr.size_dt_strings)?;
        hdr.check_block("memory reservation", hdr.off_mem_rsvmap, 16)?;
        Ok(hdr)
    }

    /// Byte range of the structure block within the blob.
    #[must_use]
    pub const fn struct_block(&self) -> Range<u32> {
        self.off_dt_struct..self.off_dt_struct + self.size_dt_struct
    }

    fn check_block(&self, name: &'static str, offset: u32, len: u32) -> Result<(), DeviceTreeError> {
        let fits = (offset as usize) >= FDT_HEADER_LEN
            && offset
                .checked_add(len)
                .is_some_and(|end| end <= self.total_size);
        if fits {
            Ok(())
        } else {
            Err(DeviceTreeError::BlockOutOfBounds { name, offset, len })
        }
    }
}
