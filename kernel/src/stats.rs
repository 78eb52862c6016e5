//! Kernel statistics surface — `spec.md` §6 "Statistics Surface":
//! a single aggregated snapshot combining memory, scheduler, and audit
//! counters, exposed to userspace through `vfs::procfs`.

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct KernelStats {
    pub heap_used_bytes: usize,
    pub heap_total_bytes: usize,
    pub heap_allocations: u64,
    pub heap_failures: u64,
    pub context_switches: u64,
    pub processes_created: u64,
    pub audit_emitted: u64,
    pub audit_dropped: u64,
}

pub fn snapshot() -> KernelStats {
    let heap = crate::mm::heap::stats();
    let audit = crate::security::audit::stats();
    KernelStats {
        heap_used_bytes: heap.used_bytes,
        heap_total_bytes: heap.total_bytes,
        heap_allocations: heap.allocations,
        heap_failures: heap.failures,
        context_switches: crate::process::scheduler::context_switch_count(),
        processes_created: crate::process::scheduler::total_created(),
        audit_emitted: audit.emitted,
        audit_dropped: audit.dropped,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_reads_without_panicking() {
        let s = snapshot();
        assert!(s.heap_total_bytes > 0);
    }
}
