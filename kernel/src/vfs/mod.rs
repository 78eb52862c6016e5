//! Virtual filesystem layer — `spec.md` §4.5.
//!
//! Path resolution shape and the open/read/write split follow the
//! teacher's `vfs/mod.rs` (`open`, `create`, `path_walk`, `split_path`);
//! the classification gate, multi-mount longest-prefix resolution, and
//! bounded inode cache are this kernel's additions, grounded in
//! `spec.md` §4.5 and §4.6.

pub mod devfs;
pub mod driver;
pub mod inode;
pub mod mount;
pub mod procfs;
pub mod tmpfs;

pub use inode::{Inode, InodeCache, InodeType, Ino, INODE_CACHE_CAPACITY};

use crate::lib::{Errno, Level};
use crate::security::classification::{verify_access, Operation};
use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use bitflags::bitflags;
use spin::Mutex;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct OpenFlags: u32 {
        const O_RDONLY = 0o0;
        const O_WRONLY = 0o1;
        const O_RDWR   = 0o2;
        const O_CREAT  = 0o100;
    }
}

impl OpenFlags {
    pub fn is_readable(self) -> bool {
        (self & OpenFlags::O_WRONLY).is_empty()
    }

    pub fn is_writable(self) -> bool {
        self.intersects(OpenFlags::O_WRONLY | OpenFlags::O_RDWR)
    }
}

/// `OpenedFile::access_mode` / `pcb::OpenHandle::access_mode` bits.
/// Stored as independent flags (not the old read-xor-write encoding) so
/// `O_RDWR` retains both capabilities instead of collapsing to "write
/// only" — `spec.md` §4.5 requires read and write to be checked as
/// separate capabilities at read/write time.
pub const ACCESS_READ: u8 = 0b01;
pub const ACCESS_WRITE: u8 = 0b10;

fn access_mode_bits(flags: OpenFlags) -> u8 {
    let mut mode = 0u8;
    if flags.is_readable() {
        mode |= ACCESS_READ;
    }
    if flags.is_writable() {
        mode |= ACCESS_WRITE;
    }
    mode
}

pub struct OpenedFile {
    pub inode_ref: Ino,
    pub access_mode: u8,
}

/// `spec.md` §4.5 "default path policy": paths under `/classified/`,
/// `/secret/`, or `/pentagon/` require caller clearance >= `SECRET`;
/// writes under `/system/` require uid 0. Consulted before every
/// open/mount/unmount/mkdir/rmdir.
pub fn check_path_security(path: &str, operation: Operation, caller_clearance: Level, caller_uid: u32) -> Result<(), Errno> {
    let restricted = path.contains("/classified/") || path.contains("/secret/") || path.contains("/pentagon/");
    if restricted && caller_clearance < crate::security::classification::SECRET {
        return Err(Errno::EACCES);
    }
    if operation == Operation::Write && path.starts_with("/system/") && caller_uid != 0 {
        return Err(Errno::EACCES);
    }
    Ok(())
}

static CACHE: Mutex<InodeCache> = Mutex::new(InodeCache::new(INODE_CACHE_CAPACITY));

pub fn init() {
    mount::init();
    let root = tmpfs::TmpfsDir::new_root(0, 0);
    mount::mount("tmpfs", "/", root).ok();
    mount::mount("devfs", "/dev", devfs::new_root()).ok();
    mount::mount("procfs", "/proc", procfs::new_root()).ok();
    driver::register("tmpfs").ok();
    driver::register("devfs").ok();
    driver::register("procfs").ok();
}

fn path_walk(root: Arc<Inode>, remainder: &str) -> Result<Arc<Inode>, Errno> {
    let mut current = root;
    for component in remainder.split('/').filter(|c| !c.is_empty()) {
        current = current.ops.lookup(component)?;
    }
    Ok(current)
}

fn split_last_component(remainder: &str) -> (&str, &str) {
    match remainder.rfind('/') {
        Some(pos) => (&remainder[..pos], &remainder[pos + 1..]),
        None => ("", remainder),
    }
}

/// Opens `path` on behalf of `caller_pid` at `caller_clearance`,
/// enforcing `check_path_security` and then the Bell-LaPadula gate from
/// `spec.md` §4.6 against the resolved inode's owner and classification.
pub fn open(
    path: &str,
    flags: OpenFlags,
    caller_pid: u32,
    caller_clearance: Level,
    caller_uid: u32,
) -> Result<OpenedFile, Errno> {
    let op = if flags.is_writable() { Operation::Write } else { Operation::Read };
    check_path_security(path, op, caller_clearance, caller_uid)?;

    let (mount, remainder) = mount::resolve_mount(path)?;

    let inode = match path_walk(mount.root.clone(), &remainder) {
        Ok(inode) => inode,
        Err(Errno::ENOENT) if flags.contains(OpenFlags::O_CREAT) => {
            let (parent_path, name) = split_last_component(&remainder);
            if name.is_empty() {
                return Err(Errno::EINVAL);
            }
            let parent = path_walk(mount.root.clone(), parent_path)?;
            parent.ops.create(name, caller_pid, caller_clearance)?
        }
        Err(e) => return Err(e),
    };

    if !verify_access(caller_pid, caller_clearance, inode.owner_pid(), inode.classification(), op) {
        return Err(Errno::EACCES);
    }

    let ino = inode.ino();
    let mut cache = CACHE.lock();
    cache.insert(inode)?;
    cache.pin(ino);

    Ok(OpenedFile { inode_ref: ino, access_mode: access_mode_bits(flags) })
}

pub fn close(inode_ref: Ino) {
    CACHE.lock().unpin(inode_ref);
}

/// Mounts `root` at `path`, gated by `check_path_security` since mount
/// points are writes to the namespace.
pub fn mount_fs(
    fs_type: &'static str,
    path: &str,
    root: Arc<Inode>,
    caller_clearance: Level,
    caller_uid: u32,
) -> Result<(), Errno> {
    check_path_security(path, Operation::Write, caller_clearance, caller_uid)?;
    mount::mount(fs_type, path, root)
}

pub fn unmount_fs(path: &str, caller_clearance: Level, caller_uid: u32) -> Result<(), Errno> {
    check_path_security(path, Operation::Write, caller_clearance, caller_uid)?;
    mount::unmount(path)
}

/// Creates a directory at `path`. `path`'s last component is the new
/// directory's name; the remainder must already resolve to a directory.
pub fn mkdir(path: &str, caller_pid: u32, caller_clearance: Level, caller_uid: u32) -> Result<(), Errno> {
    check_path_security(path, Operation::Write, caller_clearance, caller_uid)?;
    let (mount, remainder) = mount::resolve_mount(path)?;
    let (parent_path, name) = split_last_component(&remainder);
    if name.is_empty() {
        return Err(Errno::EINVAL);
    }
    let parent = path_walk(mount.root.clone(), parent_path)?;
    parent.ops.mkdir(name, caller_pid, caller_clearance)?;
    Ok(())
}

pub fn rmdir(path: &str, caller_clearance: Level, caller_uid: u32) -> Result<(), Errno> {
    check_path_security(path, Operation::Write, caller_clearance, caller_uid)?;
    let (mount, remainder) = mount::resolve_mount(path)?;
    let (parent_path, name) = split_last_component(&remainder);
    if name.is_empty() {
        return Err(Errno::EINVAL);
    }
    let parent = path_walk(mount.root.clone(), parent_path)?;
    parent.ops.rmdir(name)
}

pub fn readdir(path: &str, caller_clearance: Level, caller_uid: u32) -> Result<Vec<inode::DirEntry>, Errno> {
    check_path_security(path, Operation::Read, caller_clearance, caller_uid)?;
    let (mount, remainder) = mount::resolve_mount(path)?;
    let dir = path_walk(mount.root.clone(), &remainder)?;
    dir.ops.readdir()
}

pub fn read_inode(inode_ref: Ino, offset: u64, buf: &mut [u8]) -> Result<usize, Errno> {
    let inode = CACHE.lock().get(inode_ref).ok_or(Errno::EBADF)?;
    inode.ops.read(offset, buf)
}

pub fn write_inode(inode_ref: Ino, offset: u64, buf: &[u8]) -> Result<usize, Errno> {
    let inode = CACHE.lock().get(inode_ref).ok_or(Errno::EBADF)?;
    inode.ops.write(offset, buf)
}

/// Mirrors an audit record through a VFS inode used as the sink, per
/// `security::audit::mirror_to_sink`. `fd` here is an inode number, not a
/// process-local descriptor, since the audit subsystem has no process of
/// its own.
pub fn audit_sink_write(fd: u64, record: &crate::security::audit::AuditRecord) {
    let mut line: heapless::String<160> = heapless::String::new();
    if core::fmt::Write::write_fmt(&mut line, format_args!("{}\n", record)).is_err() {
        return;
    }
    if let Some(inode) = CACHE.lock().get(fd) {
        let offset = inode.meta.read().size;
        if let Ok(n) = inode.ops.write(offset, line.as_bytes()) {
            inode.meta.write().size += n as u64;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reset() {
        init();
    }

    #[test]
    fn create_then_open_round_trips_through_tmpfs() {
        reset();
        let opened = open("/hello.txt", OpenFlags::O_WRONLY | OpenFlags::O_CREAT, 1, 0, 0).unwrap();
        write_inode(opened.inode_ref, 0, b"hi").unwrap();

        let opened_r = open("/hello.txt", OpenFlags::O_RDONLY, 1, 0, 0).unwrap();
        let mut buf = [0u8; 2];
        assert_eq!(read_inode(opened_r.inode_ref, 0, &mut buf).unwrap(), 2);
        assert_eq!(&buf, b"hi");
    }

    #[test]
    fn write_down_is_denied_by_the_lattice() {
        reset();
        let opened = open("/secret.txt", OpenFlags::O_WRONLY | OpenFlags::O_CREAT, 1, 3, 0).unwrap();
        close(opened.inode_ref);

        // A different, lower-clearance process cannot write down into it.
        let result = open("/secret.txt", OpenFlags::O_WRONLY, 2, 0, 0);
        assert_eq!(result.unwrap_err(), Errno::EACCES);
    }

    #[test]
    fn missing_file_without_o_creat_is_enoent() {
        reset();
        assert_eq!(open("/nope.txt", OpenFlags::O_RDONLY, 1, 0, 0).unwrap_err(), Errno::ENOENT);
    }

    #[test]
    fn classified_path_requires_secret_clearance() {
        reset();
        let result = open("/classified/plans.txt", OpenFlags::O_RDONLY | OpenFlags::O_CREAT, 1, 0, 0);
        assert_eq!(result.unwrap_err(), Errno::EACCES);
        assert!(open("/classified/plans.txt", OpenFlags::O_RDONLY | OpenFlags::O_CREAT, 1, crate::security::classification::SECRET, 0).is_ok());
    }

    #[test]
    fn system_path_write_requires_uid_zero() {
        reset();
        let result = open("/system/config", OpenFlags::O_WRONLY | OpenFlags::O_CREAT, 1, 0, 1);
        assert_eq!(result.unwrap_err(), Errno::EACCES);
        assert!(open("/system/config", OpenFlags::O_WRONLY | OpenFlags::O_CREAT, 1, 0, 0).is_ok());
    }

    #[test]
    fn mkdir_then_readdir_lists_entry_and_rmdir_removes_it() {
        reset();
        mkdir("/docs", 1, 0, 0).unwrap();
        let entries = readdir("/", 0, 0).unwrap();
        assert!(entries.iter().any(|e| e.name == "docs"));
        rmdir("/docs", 0, 0).unwrap();
        let entries = readdir("/", 0, 0).unwrap();
        assert!(!entries.iter().any(|e| e.name == "docs"));
    }

    #[test]
    fn mount_then_unmount_restores_prior_mount_list() {
        reset();
        let before = mount::mount_count();
        let root = tmpfs::TmpfsDir::new_root(0, 0);
        mount_fs("tmpfs", "/mnt", root, 0, 0).unwrap();
        assert_eq!(mount::mount_count(), before + 1);
        unmount_fs("/mnt", 0, 0).unwrap();
        assert_eq!(mount::mount_count(), before);
    }
}
