//! Minimal device filesystem — exposes a console character device at
//! `/dev/console` that forwards through `crate::uart`.
//!
//! `spec.md` §4.5 Non-goals exclude a full device-driver subsystem; this
//! stays a stat-only-plus-console surface, grounded in the teacher's
//! devfs mention in `vfs/mod.rs`'s module doc comment.

use super::inode::{Inode, InodeOps, InodeType};
use crate::lib::{Errno, Level};
use alloc::sync::Arc;

struct ConsoleDevice;

impl InodeOps for ConsoleDevice {
    fn lookup(&self, _name: &str) -> Result<Arc<Inode>, Errno> {
        Err(Errno::ENOTDIR)
    }

    fn create(&self, _name: &str, _owner_pid: u32, _classification: Level) -> Result<Arc<Inode>, Errno> {
        Err(Errno::ENOTDIR)
    }

    fn read(&self, _offset: u64, _buf: &mut [u8]) -> Result<usize, Errno> {
        Ok(0)
    }

    fn write(&self, _offset: u64, buf: &[u8]) -> Result<usize, Errno> {
        crate::uart::write_bytes(buf);
        Ok(buf.len())
    }
}

struct DevRoot {
    console: Arc<Inode>,
}

impl InodeOps for DevRoot {
    fn lookup(&self, name: &str) -> Result<Arc<Inode>, Errno> {
        if name == "console" {
            Ok(self.console.clone())
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
    let console = Inode::new(InodeType::CharDevice, 0, 0, Arc::new(ConsoleDevice));
    Inode::new(InodeType::Directory, 0, 0, Arc::new(DevRoot { console }))
}
