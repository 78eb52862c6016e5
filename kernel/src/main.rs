#![cfg_attr(not(test), no_std)]
#![cfg_attr(not(test), no_main)]

//! Kernel entry point — `spec.md` §2 "Boot sequence" / §9.
//!
//! Module tree and the `_start`/`entry_point!` split follow the
//! teacher's `main.rs`; the boot sequence body is this kernel's own
//! (NX/SMEP/SMAP enable, zoned buddy init, VFS mount, scheduler init,
//! rather than the teacher's AArch64/PIT/PS2 demo loop).

extern crate alloc;

pub mod boundary;
pub mod interrupts;
#[allow(special_module_name)]
pub mod lib;
pub mod log;
pub mod cpu;
pub mod mm;
pub mod process;
pub mod security;
pub mod stats;
pub mod syscall;
pub mod uart;
pub mod vfs;

#[cfg(not(test))]
use mm::heap::KernelAllocator;

#[cfg(not(test))]
#[global_allocator]
static ALLOCATOR: KernelAllocator = KernelAllocator;

#[cfg(not(test))]
bootloader_api::entry_point!(kernel_main);

#[cfg(not(test))]
fn kernel_main(boot_info: &'static mut bootloader_api::BootInfo) -> ! {
    uart::init();
    crate::info!("sentinel_kernel booting");

    let features = cpu::detect();
    let boot_mapping_flags: [x86_64::structures::paging::PageTableFlags; 0] = [];
    if let Err(e) = security::init::init(&features, &boot_mapping_flags) {
        crate::error!("security init failed: {:?}", e);
        halt();
    }

    security::sme::init(&features);
    let _slide = security::kaslr::init();

    let ram_ranges: alloc::vec::Vec<(u64, u64)> = boot_info
        .memory_regions
        .iter()
        .filter(|r| r.kind == bootloader_api::info::MemoryRegionKind::Usable)
        .map(|r| (r.start, r.end - r.start))
        .collect();
    mm::init(&ram_ranges);

    process::init();
    vfs::init();
    interrupts::init();

    crate::info!("boot sequence complete");

    loop {
        x86_64::instructions::hlt();
    }
}

#[cfg(not(test))]
fn halt() -> ! {
    security::audit::drain_pending();
    loop {
        x86_64::instructions::hlt();
    }
}

#[cfg(not(test))]
#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    crate::error!("panic: {}", info);
    halt()
}
