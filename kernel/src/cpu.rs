//! CPU feature probing (CPUID) for the protection-init and
//! memory-encryption stages. Adapted from the teacher's
//! `arch/x86_64/cpu.rs`, trimmed to the features this kernel's protection
//! init and SME detection actually consume.

use raw_cpuid::CpuId;

#[derive(Debug, Clone, Copy, Default)]
pub struct CpuFeatures {
    pub has_sse2: bool,
    pub has_apic: bool,
    pub has_nx: bool,
    pub has_smep: bool,
    pub has_smap: bool,
    pub has_umip: bool,
    pub has_cet_ss: bool,
    /// AMD SME (Secure Memory Encryption): leaf 0x8000001F, bit 0.
    pub has_sme: bool,
    /// Physical-address bit position of the C-bit, valid iff `has_sme`.
    pub sme_cbit_position: u8,
}

pub fn detect() -> CpuFeatures {
    let cpuid = CpuId::new();

    let feature_info = cpuid.get_feature_info();
    let extended = cpuid.get_extended_feature_info();
    let extended_proc = cpuid.get_extended_processor_and_feature_identifiers();

    let has_sse2 = feature_info.as_ref().map_or(false, |f| f.has_sse2());
    let has_apic = feature_info.as_ref().map_or(false, |f| f.has_apic());
    let has_nx = extended_proc.as_ref().map_or(false, |f| f.has_execute_disable());
    let has_smep = extended.as_ref().map_or(false, |f| f.has_smep());
    let has_smap = extended.as_ref().map_or(false, |f| f.has_smap());
    let has_umip = extended.as_ref().map_or(false, |f| f.has_umip());
    let has_cet_ss = extended.as_ref().map_or(false, |f| f.has_cet_ss());

    let (has_sme, sme_cbit_position) = match cpuid.get_memory_encryption_info() {
        Some(mem) => (mem.has_sme(), mem.c_bit_position()),
        None => (false, 0),
    };

    CpuFeatures {
        has_sse2,
        has_apic,
        has_nx,
        has_smep,
        has_smap,
        has_umip,
        has_cet_ss,
        has_sme,
        sme_cbit_position,
    }
}
