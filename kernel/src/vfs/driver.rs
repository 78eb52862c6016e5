//! Filesystem driver registry — `spec.md` §4.5 "pluggable driver
//! operation tables" / "up to 32 drivers".
//!
//! Grounded in the teacher's `driver.rs`, which keeps its device-driver
//! registry in a `heapless::Vec` rather than `alloc::Vec` since the
//! registry itself must never allocate. Filesystem drivers here follow
//! the same fixed-capacity idiom.
//!
//! This registry only tracks driver *names*; the operation table itself
//! (`mount`/`unmount`/`read`/`write`/`readdir`/`mkdir`/`rmdir`/...) lives
//! on each filesystem's root `Inode`, as the `InodeOps` trait object in
//! `inode.rs` — one vtable per mounted instance rather than one shared
//! table per driver name, since two tmpfs mounts need independent state
//! but the same operations. `mount`/`unmount` additionally gate through
//! `vfs::check_path_security` before touching the mount table.

use heapless::Vec as HVec;
use spin::Mutex;

pub const MAX_DRIVERS: usize = 32;

#[derive(Clone, Copy)]
pub struct DriverInfo {
    pub name: &'static str,
}

static REGISTRY: Mutex<HVec<DriverInfo, MAX_DRIVERS>> = Mutex::new(HVec::new());

pub fn register(name: &'static str) -> Result<(), crate::lib::KernelError> {
    let mut registry = REGISTRY.lock();
    if registry.iter().any(|d| d.name == name) {
        return Ok(());
    }
    registry.push(DriverInfo { name }).map_err(|_| crate::lib::KernelError::TooManyOpen)
}

pub fn registered_count() -> usize {
    REGISTRY.lock().len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_rejects_past_capacity() {
        let registry = REGISTRY.lock();
        drop(registry);
        for i in 0..MAX_DRIVERS {
            let leaked: &'static str = alloc::boxed::Box::leak(alloc::format!("drv{}", i).into_boxed_str());
            register(leaked).unwrap();
        }
        assert_eq!(registered_count(), MAX_DRIVERS);
    }
}
