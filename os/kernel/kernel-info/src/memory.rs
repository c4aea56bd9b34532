//! # Memory Layout

/// Size of a base page.
pub const PAGE_SIZE: u64 = 4096;

/// A simple Higher Half Direct Map (HHDM) base.
/// Anything you map at [`HHDM_BASE`] + `pa` lets the kernel
/// access physical memory via a fixed offset.
pub const HHDM_BASE: u64 = 0xffff_8880_0000_0000;

/// Largest physical address reachable through the HHDM window.
pub const HHDM_LIMIT: u64 = 0x0000_0080_0000_0000; // 512 GiB

/// Round `addr` down to its page base.
#[must_use]
pub const fn page_base(addr: u64) -> u64 {
    addr & !(PAGE_SIZE - 1)
}

/// Number of pages touched by `len` bytes starting at `addr`.
#[must_use]
pub const fn pages_spanned(addr: u64, len: u64) -> u64 {
    let ofs = addr & (PAGE_SIZE - 1);
    (ofs + len).div_ceil(PAGE_SIZE)
}

const _: () = {
    assert!(PAGE_SIZE.is_power_of_two());
    assert!(HHDM_BASE.is_multiple_of(PAGE_SIZE));
    assert!(HHDM_BASE.checked_add(HHDM_LIMIT).is_some());
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_math() {
        assert_eq!(page_base(0x1234), 0x1000);
        assert_eq!(pages_spanned(0x1000, 1), 1);
        assert_eq!(pages_spanned(0x1FFF, 2), 2);
        assert_eq!(pages_spanned(0x1000, 0x1000), 1);
        assert_eq!(pages_spanned(0x1800, 0x1000), 2);
        assert_eq!(pages_spanned(0x1000, 0), 0);
    }
}
