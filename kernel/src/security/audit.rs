//! Append-only audit ring plus an optional file-backed mirror.
//!
//! Grounded in the teacher's `heapless`-backed fixed-capacity structures
//! (the showcase uses `heapless::Vec` for its driver registry in
//! `driver.rs`); this ring reuses that no-alloc-growth idiom because the
//! audit path must never itself trigger an allocation failure.

use crate::lib::Level;
use core::sync::atomic::{AtomicU64, Ordering};
use heapless::Deque;
use spin::Mutex;

const RING_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy)]
pub struct AuditRecord {
    pub timestamp_ticks: u64,
    pub session_id: u64,
    pub actor_pid: u32,
    pub actor_clearance: Level,
    pub event_tag: EventTag,
    /// A small fixed-width inline string: a path or a formatted pid.
    pub subject: [u8; 48],
    pub subject_len: u8,
    pub result: AuditResult,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventTag {
    AccessDenied,
    Syscall(u16),
    Mount,
    Unmount,
    Open,
    Write,
    Exec,
    Kill,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditResult {
    Allowed,
    Denied,
}

impl AuditRecord {
    pub fn new(
        timestamp_ticks: u64,
        session_id: u64,
        actor_pid: u32,
        actor_clearance: Level,
        event_tag: EventTag,
        subject: &str,
        result: AuditResult,
    ) -> Self {
        let mut buf = [0u8; 48];
        let bytes = subject.as_bytes();
        let len = bytes.len().min(48);
        buf[..len].copy_from_slice(&bytes[..len]);
        Self {
            timestamp_ticks,
            session_id,
            actor_pid,
            actor_clearance,
            event_tag,
            subject: buf,
            subject_len: len as u8,
            result,
        }
    }

    pub fn subject_str(&self) -> &str {
        core::str::from_utf8(&self.subject[..self.subject_len as usize]).unwrap_or("?")
    }

    fn event_str(&self) -> &'static str {
        match self.event_tag {
            EventTag::AccessDenied => "ACCESS_DENIED",
            EventTag::Syscall(_) => "SYSCALL",
            EventTag::Mount => "MOUNT",
            EventTag::Unmount => "UNMOUNT",
            EventTag::Open => "OPEN",
            EventTag::Write => "WRITE",
            EventTag::Exec => "EXEC",
            EventTag::Kill => "KILL",
        }
    }
}

impl core::fmt::Display for AuditRecord {
    /// `[<tick>] session=<id> pid=<pid> clearance=<0..4> event=<TAG> subject=<str>`
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "[{}] session={} pid={} clearance={} event={} subject={}",
            self.timestamp_ticks,
            self.session_id,
            self.actor_pid,
            self.actor_clearance,
            self.event_str(),
            self.subject_str(),
        )
    }
}

struct AuditRing {
    records: Deque<AuditRecord, RING_CAPACITY>,
    dropped: u64,
    emitted: u64,
}

static RING: Mutex<AuditRing> = Mutex::new(AuditRing {
    records: Deque::new(),
    dropped: 0,
    emitted: 0,
});

static SINK_FD: AtomicU64 = AtomicU64::new(u64::MAX);
static TICK: AtomicU64 = AtomicU64::new(0);

/// Convenience wrapper for syscall-boundary call sites: stamps the
/// record with an internally-generated monotonic tick and session 0
/// (the kernel has no multi-session concept yet) and emits it.
pub fn log(actor_pid: u32, actor_clearance: Level, event_tag: EventTag, subject: &str, result: AuditResult) {
    let tick = TICK.fetch_add(1, Ordering::Relaxed);
    emit(AuditRecord::new(tick, 0, actor_pid, actor_clearance, event_tag, subject, result));
}

/// Configure a VFS inode (by inode number) to mirror every appended
/// record as raw text lines. `u64::MAX` means "no sink".
pub fn set_sink(fd: u64) {
    SINK_FD.store(fd, Ordering::Relaxed);
}

pub fn emit(record: AuditRecord) {
    let mut ring = RING.lock();
    if ring.records.is_full() {
        let _ = ring.records.pop_front();
        ring.dropped += 1;
    }
    // Deque::push_back only fails when full; we just made room above.
    let _ = ring.records.push_back(record);
    ring.emitted += 1;
    drop(ring);

    let fd = SINK_FD.load(Ordering::Relaxed);
    if fd != u64::MAX {
        mirror_to_sink(fd, &record);
    }
}

fn mirror_to_sink(fd: u64, record: &AuditRecord) {
    // The sink is a VFS inode number, not a process-local fd; writing
    // through it would otherwise re-enter the VFS layer (which itself
    // audits >=SECRET callers), so the mirror never itself audits.
    crate::vfs::audit_sink_write(fd, record);
}

#[derive(Debug, Clone, Copy)]
pub struct AuditStats {
    pub emitted: u64,
    pub dropped: u64,
}

pub fn stats() -> AuditStats {
    let ring = RING.lock();
    AuditStats {
        emitted: ring.emitted,
        dropped: ring.dropped,
    }
}

/// Drain every pending record through the sink. Called on the fatal
/// panic path before halting, per `spec.md` §7.
pub fn drain_pending() {
    let fd = SINK_FD.load(Ordering::Relaxed);
    if fd == u64::MAX {
        return;
    }
    let ring = RING.lock();
    for record in ring.records.iter() {
        mirror_to_sink(fd, record);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ring_overflow_drops_oldest_and_counts() {
        let mut ring = AuditRing {
            records: Deque::new(),
            dropped: 0,
            emitted: 0,
        };
        for i in 0..(RING_CAPACITY + 5) {
            if ring.records.is_full() {
                ring.records.pop_front();
                ring.dropped += 1;
            }
            let rec = AuditRecord::new(i as u64, 1, 1, 0, EventTag::Open, "/x", AuditResult::Allowed);
            ring.records.push_back(rec).ok();
            ring.emitted += 1;
        }
        assert_eq!(ring.dropped, 5);
        assert_eq!(ring.records.len(), RING_CAPACITY);
        // Oldest surviving record should be timestamp 5.
        assert_eq!(ring.records.front().unwrap().timestamp_ticks, 5);
    }
}
