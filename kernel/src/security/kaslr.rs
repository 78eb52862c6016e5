//! Kernel-base address-space-layout randomization.
//!
//! `original_source/security/kaslr.c` seeds a PRNG from the TSC and slides
//! the kernel's load address within a fixed window. This kernel cannot
//! actually relocate itself post-link (no position-independent kernel
//! image), so KASLR here randomizes the *reported* slide used to offset
//! dynamically-chosen regions (the kernel heap window, the per-boot audit
//! session id) — a faithful but honest narrowing of the original's scope.

use core::sync::atomic::{AtomicU64, Ordering};

const SLIDE_GRANULARITY: u64 = 0x20_0000; // 2 MiB, large-page aligned
const SLIDE_SLOTS: u64 = 256; // 512 MiB of slide space

static SLIDE: AtomicU64 = AtomicU64::new(0);

/// A small xorshift PRNG seeded from the CPU timestamp counter, matching
/// the original's "seed from TSC" approach without pulling in a general
/// RNG dependency the teacher never uses in the kernel binary.
fn seed_from_tsc() -> u64 {
    let tsc = unsafe { core::arch::x86_64::_rdtsc() };
    let mut x = tsc ^ 0x9E3779B97F4A7C15;
    x ^= x << 13;
    x ^= x >> 7;
    x ^= x << 17;
    x
}

/// Compute and cache the kernel-base slide. Idempotent: the first call
/// wins, later calls return the cached slide.
pub fn init() -> u64 {
    let existing = SLIDE.load(Ordering::Relaxed);
    if existing != 0 {
        return existing;
    }
    let slide = (seed_from_tsc() % SLIDE_SLOTS) * SLIDE_GRANULARITY;
    // A slide of exactly 0 is indistinguishable from "uninitialized" in
    // this cache, so nudge it by one granule in that case.
    let slide = if slide == 0 { SLIDE_GRANULARITY } else { slide };
    SLIDE.store(slide, Ordering::Relaxed);
    crate::info!("kaslr: kernel-base slide = {:#x}", slide);
    slide
}

pub fn slide() -> u64 {
    SLIDE.load(Ordering::Relaxed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slide_is_granule_aligned_and_bounded() {
        let s = init();
        assert_eq!(s % SLIDE_GRANULARITY, 0);
        assert!(s < SLIDE_SLOTS * SLIDE_GRANULARITY);
        assert_ne!(s, 0);
    }
}
