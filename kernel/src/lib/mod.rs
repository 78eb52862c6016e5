//! Primitive layer: error taxonomy, basic newtypes shared by every other
//! module. Named `lib` (not `core`/`std`) after the teacher's own
//! `#[allow(special_module_name)] pub mod lib;` convention.

#[allow(special_module_name)]
pub mod error;

pub use error::{Errno, KernelError, Result};

/// Classification / clearance level, 0..=4 per the lattice in
/// `security::classification`. Kept as a bare type alias here (not a
/// newtype) because every call site treats it as a small integer to be
/// compared, exactly like the teacher treats `Pid`/`PhysAddr`.
pub type Level = u8;

pub const PAGE_SIZE: usize = 4096;
pub type Pfn = usize;
pub type PhysAddr = u64;
pub type VirtAddr = u64;

pub const fn pa_to_pfn(pa: PhysAddr) -> Pfn {
    (pa / PAGE_SIZE as u64) as Pfn
}

pub const fn pfn_to_pa(pfn: Pfn) -> PhysAddr {
    (pfn as u64) * PAGE_SIZE as u64
}

pub const fn page_align_down(addr: u64) -> u64 {
    addr & !(PAGE_SIZE as u64 - 1)
}

pub const fn page_align_up(addr: u64) -> u64 {
    page_align_down(addr + PAGE_SIZE as u64 - 1)
}
