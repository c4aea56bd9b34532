//! # RSDP/XSDP (Root/Extended System Description Pointer)

use crate::sum;
use kernel_info::hwmap::PhysAddr;

/// Bytes covered by the ACPI 1.0 checksum.
pub const RSDP_V1_LEN: usize = 20;

/// Size of the ACPI 2.0+ structure.
pub const XSDP_LEN: usize = 36;

const SIGNATURE: &[u8; 8] = b"RSD PTR ";

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct AcpiRoots {
    pub rsdp_addr: PhysAddr,
    pub revision: u8,
    pub xsdt_addr: Option<PhysAddr>,
    pub rsdt_addr: Option<PhysAddr>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RsdpError {
    #[error("RSDP pointer is null")]
    Null,
    #[error("RSDP truncated: {0} bytes available")]
    Truncated(usize),
    #[error("RSDP signature mismatch")]
    BadSignature,
    #[error("RSDP checksum mismatch")]
    BadChecksum,
    #[error("XSDP length {0} out of range")]
    BadLength(u32),
    #[error("XSDP extended checksum mismatch")]
    BadExtendedChecksum,
}

impl AcpiRoots {
    /// Validate the RSDP/XSDP copied from `rsdp_addr`.
    ///
    /// `bytes` must hold at least [`RSDP_V1_LEN`] bytes, and [`XSDP_LEN`] for
    /// revision 2 and later.
    ///
    /// # Errors
    /// See [`RsdpError`].
    #[allow(clippy::similar_names)]
    pub fn parse(rsdp_addr: PhysAddr, bytes: &[u8]) -> Result<Self, RsdpError> {
        if rsdp_addr == 0 {
            return Err(RsdpError::Null);
        }
        let v1 = bytes
            .get(..RSDP_V1_LEN)
            .ok_or(RsdpError::Truncated(bytes.len()))?;
        if &v1[0..8] != SIGNATURE {
            return Err(RsdpError::BadSignature);
        }
        if sum(v1) != 0 {
            return Err(RsdpError::BadChecksum);
        }

        let revision = v1[15];
        let rsdt = u32::from_le_bytes([v1[16], v1[17], v1[18], v1[19]]);
        let rsdt_addr = (rsdt != 0).then_some(PhysAddr::from(rsdt));

        if revision < 2 {
            return Ok(Self {
                rsdp_addr,
                revision,
                xsdt_addr: None,
                rsdt_addr,
            });
        }

        let v2 = bytes
            .get(..XSDP_LEN)
            .ok_or(RsdpError::Truncated(bytes.len()))?;
        let length = u32::from_le_bytes([v2[20], v2[21], v2[22], v2[23]]);
        let len = usize::try_from(length).unwrap_or(usize::MAX);
        if len < XSDP_LEN || len > bytes.len() {
            return Err(RsdpError::BadLength(length));
        }
        if sum(&bytes[..len]) != 0 {
            return Err(RsdpError::BadExtendedChecksum);
        }

        let mut xsdt = [0u8; 8];
        xsdt.copy_from_slice(&v2[24..32]);
        let xsdt = u64::from_le_bytes(xsdt);

        Ok(Self {
            rsdp_addr,
            revision,
            xsdt_addr: (xsdt != 0).then_some(xsdt),
            rsdt_addr,
        })
    }

    /// XSDT if present, otherwise the RSDT.
    #[must_use]
    pub const fn root_table(&self) -> Option<PhysAddr> {
        match self.xsdt_addr {
            Some(x) => Some(x),
            None => self.rsdt_addr,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fix_checksum(bytes: &mut [u8], at: usize) {
        bytes[at] = 0;
        bytes[at] = 0u8.wrapping_sub(sum(bytes));
    }

    fn xsdp(xsdt: u64, rsdt: u32) -> [u8; XSDP_LEN] {
        let mut b = [0u8; XSDP_LEN];
        b[0..8].copy_from_slice(SIGNATURE);
        b[9..15].copy_from_slice(b"RUSTOS");
        b[15] = 2;
        b[16..20].copy_from_slice(&rsdt.to_le_bytes());
        b[20..24].copy_from_slice(&36u32.to_le_bytes());
        b[24..32].copy_from_slice(&xsdt.to_le_bytes());
        fix_checksum(&mut b[..RSDP_V1_LEN], 8);
        fix_checksum(&mut b, 32);
        b
    }

    #[test]
    fn parses_acpi2_pointer() {
        let b = xsdp(0x7FE1_4000, 0x7FE1_3000);
        let roots = AcpiRoots::parse(0xE_0000, &b).unwrap();
        assert_eq!(roots.revision, 2);
        assert_eq!(roots.xsdt_addr, Some(0x7FE1_4000));
        assert_eq!(roots.rsdt_addr, Some(0x7FE1_3000));
        assert_eq!(roots.root_table(), Some(0x7FE1_4000));
    }

    #[test]
    fn parses_acpi1_pointer() {
        let mut b = [0u8; RSDP_V1_LEN];
        b[0..8].copy_from_slice(SIGNATURE);
        b[16..20].copy_from_slice(&0x000F_1000u32.to_le_bytes());
        fix_checksum(&mut b, 8);

        let roots = AcpiRoots::parse(0xE_0000, &b).unwrap();
        assert_eq!(roots.revision, 0);
        assert_eq!(roots.xsdt_addr, None);
        assert_eq!(roots.root_table(), Some(0x000F_1000));
    }

    #[test]
    fn rejects_corruption() {
        assert_eq!(AcpiRoots::parse(0, &[0; 36]), Err(RsdpError::Null));
        assert_eq!(
            AcpiRoots::parse(1, &[0; 36]),
            Err(RsdpError::BadSignature)
        );

        let mut b = xsdp(0x1000, 0x2000);
        b[12] ^= 0xFF;
        assert_eq!(AcpiRoots::parse(1, &b), Err(RsdpError::BadChecksum));

        let mut b = xsdp(0x1000, 0x2000);
        b[30] ^= 0x01;
        assert_eq!(AcpiRoots::parse(1, &b), Err(RsdpError::BadExtendedChecksum));

        let b = xsdp(0x1000, 0x2000);
        assert_eq!(
            AcpiRoots::parse(1, &b[..24]),
            Err(RsdpError::Truncated(24))
        );
    }
}
