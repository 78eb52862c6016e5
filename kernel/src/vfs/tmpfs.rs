//! In-memory filesystem — reference driver used for mount at `/`.
//!
//! Grounded in the teacher's tmpfs-backed `InodeOps` pattern (Phase A1's
//! "tmpfs (in-memory filesystem)" comment in `vfs/mod.rs`): a directory
//! inode holding a name->child map, regular files backing their bytes in
//! a `Mutex<Vec<u8>>`.

use super::inode::{DirEntry, Inode, InodeOps, InodeType};
use crate::lib::{Errno, Level};
use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use spin::Mutex;

pub struct TmpfsFile {
    data: Mutex<Vec<u8>>,
}

impl InodeOps for TmpfsFile {
    fn lookup(&self, _name: &str) -> Result<Arc<Inode>, Errno> {
        Err(Errno::ENOTDIR)
    }

    fn create(&self, _name: &str, _owner_pid: u32, _classification: Level) -> Result<Arc<Inode>, Errno> {
        Err(Errno::ENOTDIR)
    }

    fn read(&self, offset: u64, buf: &mut [u8]) -> Result<usize, Errno> {
        let data = self.data.lock();
        let offset = offset as usize;
        if offset >= data.len() {
            return Ok(0);
        }
        let n = buf.len().min(data.len() - offset);
        buf[..n].copy_from_slice(&data[offset..offset + n]);
        Ok(n)
    }

    fn write(&self, offset: u64, buf: &[u8]) -> Result<usize, Errno> {
        let mut data = self.data.lock();
        let offset = offset as usize;
        if data.len() < offset + buf.len() {
            data.resize(offset + buf.len(), 0);
        }
        data[offset..offset + buf.len()].copy_from_slice(buf);
        Ok(buf.len())
    }
}

pub struct TmpfsDir {
    children: Mutex<BTreeMap<String, Arc<Inode>>>,
}

impl TmpfsDir {
    pub fn new_root(owner_pid: u32, classification: Level) -> Arc<Inode> {
        let dir = Arc::new(TmpfsDir { children: Mutex::new(BTreeMap::new()) });
        Inode::new(InodeType::Directory, owner_pid, classification, dir)
    }
}

impl InodeOps for TmpfsDir {
    fn lookup(&self, name: &str) -> Result<Arc<Inode>, Errno> {
        self.children.lock().get(name).cloned().ok_or(Errno::ENOENT)
    }

    fn create(&self, name: &str, owner_pid: u32, classification: Level) -> Result<Arc<Inode>, Errno> {
        let mut children = self.children.lock();
        if children.contains_key(name) {
            return Err(Errno::EEXIST);
        }
        let file = Arc::new(TmpfsFile { data: Mutex::new(Vec::new()) });
        let inode = Inode::new(InodeType::Regular, owner_pid, classification, file);
        children.insert(String::from(name), inode.clone());
        Ok(inode)
    }

    fn read(&self, _offset: u64, _buf: &mut [u8]) -> Result<usize, Errno> {
        Err(Errno::EISDIR)
    }

    fn write(&self, _offset: u64, _buf: &[u8]) -> Result<usize, Errno> {
        Err(Errno::EISDIR)
    }

    fn mkdir(&self, name: &str, owner_pid: u32, classification: Level) -> Result<Arc<Inode>, Errno> {
        let mut children = self.children.lock();
        if children.contains_key(name) {
            return Err(Errno::EEXIST);
        }
        let dir = Arc::new(TmpfsDir { children: Mutex::new(BTreeMap::new()) });
        let inode = Inode::new(InodeType::Directory, owner_pid, classification, dir);
        children.insert(String::from(name), inode.clone());
        Ok(inode)
    }

    fn rmdir(&self, name: &str) -> Result<(), Errno> {
        let mut children = self.children.lock();
        match children.get(name) {
            Some(inode) if inode.meta.read().itype == InodeType::Directory => {
                children.remove(name);
                Ok(())
            }
            Some(_) => Err(Errno::ENOTDIR),
            None => Err(Errno::ENOENT),
        }
    }

    fn readdir(&self) -> Result<Vec<DirEntry>, Errno> {
        let children = self.children.lock();
        Ok(children.iter().map(|(name, inode)| DirEntry { ino: inode.ino(), name: name.clone() }).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_then_write_then_read_round_trips() {
        let root = TmpfsDir::new_root(0, 0);
        let file = root.ops.create("greeting", 1, 0).unwrap();
        file.ops.write(0, b"hello").unwrap();

        let mut buf = [0u8; 5];
        let n = file.ops.read(0, &mut buf).unwrap();
        assert_eq!(n, 5);
        assert_eq!(&buf, b"hello");
    }

    #[test]
    fn duplicate_create_fails_with_eexist() {
        let root = TmpfsDir::new_root(0, 0);
        root.ops.create("x", 1, 0).unwrap();
        assert_eq!(root.ops.create("x", 1, 0).unwrap_err(), Errno::EEXIST);
    }

    #[test]
    fn mkdir_appears_in_readdir_and_rmdir_removes_it() {
        let root = TmpfsDir::new_root(0, 0);
        root.ops.mkdir("sub", 1, 0).unwrap();
        let entries = root.ops.readdir().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "sub");

        root.ops.rmdir("sub").unwrap();
        assert!(root.ops.readdir().unwrap().is_empty());
    }

    #[test]
    fn rmdir_on_regular_file_fails_with_enotdir() {
        let root = TmpfsDir::new_root(0, 0);
        root.ops.create("plain.txt", 1, 0).unwrap();
        assert_eq!(root.ops.rmdir("plain.txt").unwrap_err(), Errno::ENOTDIR);
    }
}
