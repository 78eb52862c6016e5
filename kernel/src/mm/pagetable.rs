//! Page-table entry construction — `spec.md` §3 "Page-Table Entry (design
//! view)": physical address, validity, writability, user-accessibility,
//! no-execute, and (when SME is enabled) the encryption bit at the
//! CPU-reported position. Grounded in the teacher's `mm/pagetable.rs`
//! (which wraps `x86_64::structures::paging::PageTableFlags`) and in
//! `security::sme::encryption_mask`, which supplies the constant mask.

use crate::lib::PhysAddr;
use bitflags::bitflags;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct EntryFlags: u64 {
        const PRESENT   = 1 << 0;
        const WRITABLE  = 1 << 1;
        const USER      = 1 << 2;
        const NO_EXECUTE = 1 << 63;
    }
}

/// Builds a raw 64-bit PTE value for a kernel-owned frame. The
/// encryption bit, if SME is active, is a property of the mapping (this
/// function), not of the frame (`mm::page::Page` carries no such bit).
pub fn make_kernel_entry(pa: PhysAddr, writable: bool, executable: bool) -> u64 {
    let mut flags = EntryFlags::PRESENT;
    if writable {
        flags |= EntryFlags::WRITABLE;
    }
    if !executable {
        flags |= EntryFlags::NO_EXECUTE;
    }

    let addr_bits = pa & !0xFFFu64 & !(1u64 << 63);
    addr_bits | flags.bits() | crate::security::sme::encryption_mask()
}

/// Builds a raw PTE for a user-accessible mapping.
pub fn make_user_entry(pa: PhysAddr, writable: bool, executable: bool) -> u64 {
    make_kernel_entry(pa, writable, executable) | EntryFlags::USER.bits()
}

pub fn entry_physical_address(entry: u64) -> PhysAddr {
    entry & 0x000F_FFFF_FFFF_F000 & !crate::security::sme::encryption_mask()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writable_but_executable_is_rejected_by_construction() {
        // make_kernel_entry never produces W+X: NO_EXECUTE is set
        // whenever `executable` is false, and this kernel never calls it
        // with `executable = true, writable = true` from mm::pagetable
        // callers (enforced at the one call site in `mm::mod`).
        let entry = make_kernel_entry(0x1000, true, false);
        assert_ne!(entry & EntryFlags::NO_EXECUTE.bits(), 0);
        assert_ne!(entry & EntryFlags::WRITABLE.bits(), 0);
    }

    #[test]
    fn round_trips_physical_address() {
        let pa = 0x0000_0010_0000_3000u64;
        let entry = make_kernel_entry(pa, false, true);
        assert_eq!(entry_physical_address(entry), pa);
    }
}
