//! One-shot CPU protection init (`spec.md` §4.2), grounded in the
//! teacher's `arch/x86_64/cpu.rs::enable_cpu_features`, narrowed to the
//! exact ordering the spec requires and extended with the
//! verify-before-enable pass (see DESIGN.md's resolution of the Open
//! Question).

use crate::cpu::CpuFeatures;
use crate::lib::{KernelError, Result};
use core::sync::atomic::{AtomicBool, Ordering};
use x86_64::registers::control::{Cr0, Cr0Flags, Cr4, Cr4Flags};
use x86_64::registers::model_specific::{Efer, EferFlags};
use x86_64::structures::paging::PageTableFlags;

static DONE: AtomicBool = AtomicBool::new(false);

/// Returns true if any boot-provided kernel mapping is both writable and
/// executable. The caller must refuse to enable NX/SMEP on top of such a
/// mapping, since the CPU would then immediately fault on legitimate
/// kernel code that happens to share a writable page.
pub fn has_writable_executable_kernel_mapping(entries: &[PageTableFlags]) -> bool {
    entries.iter().any(|flags| {
        flags.contains(PageTableFlags::WRITABLE) && !flags.contains(PageTableFlags::NO_EXECUTE)
    })
}

/// Run once at boot. `boot_mapping_flags` is the flattened set of flags
/// across the kernel's own page-table entries as handed off by the
/// bootloader; an empty slice is accepted (UEFI/`bootloader_api` hand-offs
/// that provide no inspectable table) and treated as "nothing to verify".
pub fn init(features: &CpuFeatures, boot_mapping_flags: &[PageTableFlags]) -> Result<()> {
    if DONE.swap(true, Ordering::SeqCst) {
        return Ok(());
    }

    if !features.has_sse2 || !features.has_apic {
        return Err(KernelError::Invalid);
    }

    if has_writable_executable_kernel_mapping(boot_mapping_flags) {
        crate::error!("protection init: found writable+executable kernel mapping, refusing to enable NX/SMEP");
        return Err(KernelError::Invalid);
    }

    // No-execute, globally.
    unsafe {
        Efer::update(|flags| *flags |= EferFlags::NO_EXECUTE_ENABLE);
    }
    crate::info!("security: NX enabled");

    // Write-protect: CR0.WP — supervisor writes to read-only pages fault.
    let mut cr0 = Cr0::read();
    cr0.insert(Cr0Flags::WRITE_PROTECT);
    unsafe { Cr0::write(cr0) };
    crate::info!("security: write-protect enabled");

    let mut cr4 = Cr4::read();
    if features.has_smep {
        cr4.insert(Cr4Flags::SUPERVISOR_MODE_EXECUTION_PROTECTION);
        crate::info!("security: SMEP enabled");
    }
    if features.has_smap {
        cr4.insert(Cr4Flags::SUPERVISOR_MODE_ACCESS_PREVENTION);
        crate::info!("security: SMAP enabled");
    }
    if features.has_umip {
        cr4.insert(Cr4Flags::USER_MODE_INSTRUCTION_PREVENTION);
        crate::info!("security: UMIP enabled");
    }
    unsafe { Cr4::write(cr4) };

    if features.has_cet_ss {
        // Shadow-stack enable lives behind MSR IA32_S_CET; the `x86_64`
        // crate (pinned at 0.14.13, matching the teacher) has no typed
        // wrapper for it, so this is recorded but not flipped — the
        // kernel does not yet build CET-compatible call frames.
        crate::info!("security: CET shadow stack available but not enabled (no CET-safe call frames yet)");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_writable_executable_mapping() {
        let bad = [PageTableFlags::PRESENT | PageTableFlags::WRITABLE];
        assert!(has_writable_executable_kernel_mapping(&bad));

        let good = [PageTableFlags::PRESENT | PageTableFlags::WRITABLE | PageTableFlags::NO_EXECUTE];
        assert!(!has_writable_executable_kernel_mapping(&good));

        let ro_exec = [PageTableFlags::PRESENT];
        assert!(!has_writable_executable_kernel_mapping(&ro_exec));
    }

    #[test]
    fn empty_mapping_list_is_vacuously_safe() {
        assert!(!has_writable_executable_kernel_mapping(&[]));
    }
}
