//! Mount table with longest-prefix mount-point resolution —
//! `spec.md` §4.5.
//!
//! The teacher's `vfs/mount.rs` only ever special-cased `/`; this kernel
//! needs several simultaneous mounts (tmpfs root, devfs at `/dev`, procfs
//! at `/proc`) resolved by longest matching prefix, so `resolve_mount`
//! replaces the teacher's single `root` field with a `Vec<Mount>` scan.

use super::inode::Inode;
use crate::lib::Errno;
use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use spin::RwLock;

pub const MAX_MOUNTS: usize = 32;

#[derive(Clone)]
pub struct Mount {
    pub fs_type: &'static str,
    pub mountpoint: String,
    pub root: Arc<Inode>,
}

struct MountTable {
    mounts: Vec<Mount>,
}

static TABLE: RwLock<MountTable> = RwLock::new(MountTable { mounts: Vec::new() });

pub fn init() {
    TABLE.write().mounts.clear();
}

pub fn mount(fs_type: &'static str, mountpoint: &str, root: Arc<Inode>) -> Result<(), Errno> {
    let mut table = TABLE.write();
    if table.mounts.len() >= MAX_MOUNTS {
        return Err(Errno::EMFILE);
    }
    table.mounts.push(Mount { fs_type, mountpoint: String::from(mountpoint), root });
    crate::info!("vfs: mounted {} at {}", fs_type, mountpoint);
    Ok(())
}

/// Removes the mount at `mountpoint`. `spec.md` §8's round-trip property
/// ("mount then unmount returns the mount list to the prior state")
/// depends on this existing at all; the teacher's `vfs/mount.rs` never
/// needed it since it only ever mounted `/` once at boot.
pub fn unmount(mountpoint: &str) -> Result<(), Errno> {
    let mut table = TABLE.write();
    let before = table.mounts.len();
    table.mounts.retain(|m| m.mountpoint != mountpoint);
    if table.mounts.len() == before {
        return Err(Errno::ENODEV);
    }
    crate::info!("vfs: unmounted {}", mountpoint);
    Ok(())
}

pub fn mount_count() -> usize {
    TABLE.read().mounts.len()
}

/// Finds the mount whose `mountpoint` is the longest prefix of `path`,
/// and returns it along with the path remainder relative to that mount.
pub fn resolve_mount(path: &str) -> Result<(Mount, String), Errno> {
    let table = TABLE.read();
    let best = table
        .mounts
        .iter()
        .filter(|m| {
            m.mountpoint == "/"
                || path == m.mountpoint
                || path.starts_with(&alloc::format!("{}/", m.mountpoint))
        })
        .max_by_key(|m| m.mountpoint.len());

    match best {
        Some(m) => {
            let remainder = if m.mountpoint == "/" {
                path.trim_start_matches('/')
            } else {
                path[m.mountpoint.len()..].trim_start_matches('/')
            };
            Ok((m.clone(), String::from(remainder)))
        }
        None => Err(Errno::ENODEV),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vfs::inode::{InodeOps, InodeType};

    struct NullOps;
    impl InodeOps for NullOps {
        fn lookup(&self, _name: &str) -> Result<Arc<Inode>, Errno> {
            Err(Errno::ENOENT)
        }
        fn create(&self, _name: &str, _owner_pid: u32, _classification: u8) -> Result<Arc<Inode>, Errno> {
            Err(Errno::ENOSYS)
        }
        fn read(&self, _offset: u64, _buf: &mut [u8]) -> Result<usize, Errno> {
            Ok(0)
        }
        fn write(&self, _offset: u64, _buf: &[u8]) -> Result<usize, Errno> {
            Ok(0)
        }
    }

    #[test]
    fn resolves_longest_matching_prefix() {
        init();
        let root = Inode::new(InodeType::Directory, 0, 0, Arc::new(NullOps));
        let dev = Inode::new(InodeType::Directory, 0, 0, Arc::new(NullOps));
        mount("tmpfs", "/", root).unwrap();
        mount("devfs", "/dev", dev).unwrap();

        let (m, rest) = resolve_mount("/dev/console").unwrap();
        assert_eq!(m.fs_type, "devfs");
        assert_eq!(rest, "console");

        let (m, rest) = resolve_mount("/home/file").unwrap();
        assert_eq!(m.fs_type, "tmpfs");
        assert_eq!(rest, "home/file");
    }
}
