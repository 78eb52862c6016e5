//! Minimal process-information filesystem — exposes `/proc/stats` as a
//! read-only rendering of `crate::stats::snapshot()`.
//!
//! `spec.md` §6 names a "Statistics Surface"; procfs is the teacher's own
//! convention (per `vfs/mod.rs`'s doc comment) for exposing it as a file
//! rather than a syscall.

use super::inode::{Inode, InodeOps, InodeType};
use crate::lib::{Errno, Level};
use alloc::sync::Arc;
use core::fmt::Write;
use heapless::String as HString;

struct StatsFile;

impl InodeOps for StatsFile {
    fn lookup(&self, _name: &str) -> Result<Arc<Inode>, Errno> {
        Err(Errno::ENOTDIR)
    }

    fn create(&self, _name: &str, _owner_pid: u32, _classification: Level) -> Result<Arc<Inode>, Errno> {
        Err(Errno::ENOTDIR)
    }

    fn read(&self, offset: u64, buf: &mut [u8]) -> Result<usize, Errno> {
        let snap = crate::stats::snapshot();
        let mut rendered: HString<512> = HString::new();
        let _ = write!(
            rendered,
            "heap_used={} heap_total={} context_switches={} processes={} audit_emitted={} audit_dropped={}\n",
            snap.heap_used_bytes,
            snap.heap_total_bytes,
            snap.context_switches,
            snap.processes_created,
            snap.audit_emitted,
            snap.audit_dropped,
        );

        let bytes = rendered.as_bytes();
        let offset = offset as usize;
        if offset >= bytes.len() {
            return Ok(0);
        }
        let n = buf.len().min(bytes.len() - offset);
        buf[..n].copy_from_slice(&bytes[offset..offset + n]);
        Ok(n)
    }

    fn write(&self, _offset: u64, _buf: &[u8]) -> Result<usize, Errno> {
        Err(Errno::EACCES)
    }
}

struct ProcRoot {
    stats: Arc<Inode>,
}

impl InodeOps for ProcRoot {
    fn lookup(&self, name: &str) -> Result<Arc<Inode>, Errno> {
        if name == "stats" {
            Ok(self.stats.clone())
        } else {
            Err(Errno::ENOENT)
        }
    }

    fn create(&self, _name: &str, _owner_pid: u32, _classification: Level) -> Result<Arc<Inode>, Errno> {
        Err(Errno::EACCES)
    }

    fn read(&self, _offset: u64, _buf: &mut [u8]) -> Result<usize, Errno> {
        Err(Errno::EISDIR)
    }

    fn write(&self, _offset: u64, _buf: &[u8]) -> Result<usize, Errno> {
        Err(Errno::EISDIR)
    }
}

pub fn new_root() -> Arc<Inode> {
    let stats = Inode::new(InodeType::Regular, 0, 0, Arc::new(StatsFile));
    Inode::new(InodeType::Directory, 0, 0, Arc::new(ProcRoot { stats }))
}
