//! Priority round-robin scheduler — `spec.md` §4.3.
//!
//! Grounded in `original_source/kernel/sched/scheduler.c`: a fixed
//! `process_table[256]` scanned linearly for a `PROC_DEAD` slot on
//! create, and a doubly-linked `ready_queue` with head-of-queue dispatch
//! on `schedule()`. The original's `security_check` gates *dispatch*
//! itself on the Bell-LaPadula relation between the outgoing and
//! incoming process; `spec.md` §4.3 is explicit that the classification
//! lattice does not gate scheduling order, only resource access, so that
//! check is dropped here — the lattice gate lives at the syscall/VFS
//! boundary instead (`security::classification::verify_access`).
//!
//! `spec.md` §4.3 also pins "PIDs monotonically increasing", which a
//! fixed-size, slot-reusing table cannot honor if the externally visible
//! pid is also used as the table index (a reaped slot's next occupant
//! would have to take a *lower* pid than processes already running).
//! The original resolves this the same way: `process_create` assigns
//! `next_pid++` to a freshly `kmalloc`'d struct and `process_find_by_pid`
//! does a linear scan to turn a pid back into a table entry, rather than
//! indexing by it directly. This table does the same: `table` is indexed
//! by slot (stable only for the process's lifetime), pids are a separate
//! monotonic `u32` counter, and `find_slot` is the scan that bridges the
//! two. Only `create_process`'s internal family-linking and the
//! ready-queue (`QueueLinks`, `ready_head`/`ready_tail`/`current`) ever
//! hold slot numbers; every public function taking a `pid` resolves it
//! through `find_slot` first.

use super::pcb::{FamilyLinks, Pcb, ProcessState, QueueLinks, IDLE_PID, PCB_TABLE_SIZE};
use crate::lib::{KernelError, Level, Result};
use core::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use spin::Mutex;

struct SchedulerState {
    table: [Pcb; PCB_TABLE_SIZE],
    current: Option<u32>,
    ready_head: Option<u32>,
    ready_tail: Option<u32>,
}

impl SchedulerState {
    fn slot(&self, slot: u32) -> &Pcb {
        &self.table[slot as usize]
    }

    fn slot_mut(&mut self, slot: u32) -> &mut Pcb {
        &mut self.table[slot as usize]
    }

    /// Scans for the live slot holding `pid`, mirroring the original's
    /// `process_find_by_pid` linear search.
    fn find_slot(&self, pid: u32) -> Option<u32> {
        self.table
            .iter()
            .position(|p| p.state != ProcessState::Dead && p.pid == pid)
            .map(|i| i as u32)
    }

    fn alloc_slot(&mut self) -> Option<u32> {
        self.table
            .iter()
            .position(|p| p.state == ProcessState::Dead)
            .map(|i| i as u32)
    }

    fn push_ready(&mut self, slot: u32) {
        self.slot_mut(slot).state = ProcessState::Ready;
        self.slot_mut(slot).queue = QueueLinks { prev: self.ready_tail, next: None };
        if let Some(tail) = self.ready_tail {
            self.slot_mut(tail).queue.next = Some(slot);
        } else {
            self.ready_head = Some(slot);
        }
        self.ready_tail = Some(slot);
    }

    /// Pop the highest-priority ready process; among equal priorities,
    /// the one that has waited longest (closest to the head) wins.
    fn pop_ready(&mut self) -> Option<u32> {
        let mut best: Option<u32> = None;
        let mut cursor = self.ready_head;
        while let Some(slot) = cursor {
            let p = self.slot(slot);
            let better = match best {
                None => true,
                Some(b) => p.priority > self.slot(b).priority,
            };
            if better {
                best = Some(slot);
            }
            cursor = self.slot(slot).queue.next;
        }

        if let Some(slot) = best {
            self.unlink_ready(slot);
        }
        best
    }

    fn unlink_ready(&mut self, slot: u32) {
        let QueueLinks { prev, next } = self.slot(slot).queue;
        match prev {
            Some(p) => self.slot_mut(p).queue.next = next,
            None => self.ready_head = next,
        }
        match next {
            Some(n) => self.slot_mut(n).queue.prev = prev,
            None => self.ready_tail = prev,
        }
        self.slot_mut(slot).queue = QueueLinks { prev: None, next: None };
    }
}

static CONTEXT_SWITCHES: AtomicU64 = AtomicU64::new(0);
static NEXT_PID: AtomicU32 = AtomicU32::new(1);
static TOTAL_CREATED: AtomicU64 = AtomicU64::new(0);

static STATE: Mutex<SchedulerState> = Mutex::new(SchedulerState {
    table: [Pcb::dead_slot(); PCB_TABLE_SIZE],
    current: None,
    ready_head: None,
    ready_tail: None,
});

pub const DEFAULT_TIME_SLICE: u32 = 10;

/// Creates the idle process at PID 0 and enters it as `current`. Must run
/// once, before any `create_process` call.
pub fn init() {
    let mut s = STATE.lock();
    let mut idle = Pcb::dead_slot();
    idle.pid = IDLE_PID;
    idle.state = ProcessState::Running;
    idle.priority = 0;
    idle.time_slice = DEFAULT_TIME_SLICE;
    s.table[IDLE_PID as usize] = idle;
    s.current = Some(IDLE_PID);
}

/// Allocates a PCB, links it into its parent's child list, and enqueues
/// it ready. Returns `KernelError::OutOfMemory` when the table is full,
/// matching `original_source`'s `alloc_process` returning `NULL`.
pub fn create_process(parent_pid: u32, classification: Level, priority: u32) -> Result<u32> {
    let mut s = STATE.lock();
    let slot = s.alloc_slot().ok_or(KernelError::OutOfMemory)?;
    let pid = NEXT_PID.fetch_add(1, Ordering::SeqCst);

    let mut pcb = Pcb::dead_slot();
    pcb.pid = pid;
    pcb.parent_pid = parent_pid;
    pcb.classification = classification;
    pcb.priority = priority;
    pcb.time_slice = DEFAULT_TIME_SLICE;
    pcb.family = FamilyLinks { parent: slot, first_child: 0, next_sibling: 0 };

    if let Some(parent_slot) = s.find_slot(parent_pid) {
        pcb.uid = s.slot(parent_slot).uid;
        if parent_slot != slot {
            pcb.family.parent = parent_slot;
            let old_first = s.slot(parent_slot).family.first_child;
            s.slot_mut(parent_slot).family.first_child = slot;
            pcb.family.next_sibling = old_first;
        }
    }

    s.table[slot as usize] = pcb;
    s.push_ready(slot);
    TOTAL_CREATED.fetch_add(1, Ordering::Relaxed);
    Ok(pid)
}

pub fn current_pid() -> Option<u32> {
    let s = STATE.lock();
    s.current.map(|slot| s.slot(slot).pid)
}

pub fn state_of(pid: u32) -> Option<ProcessState> {
    let s = STATE.lock();
    let slot = s.find_slot(pid)?;
    Some(s.slot(slot).state)
}

pub fn classification_of(pid: u32) -> Option<Level> {
    let s = STATE.lock();
    let slot = s.find_slot(pid)?;
    Some(s.slot(slot).classification)
}

/// Priority of `pid`'s PCB, consulted by `sys_fork` to inherit the
/// parent's scheduling priority into the child.
pub fn priority_of(pid: u32) -> Option<u32> {
    let s = STATE.lock();
    let slot = s.find_slot(pid)?;
    Some(s.slot(slot).priority)
}

/// Owning uid of `pid`'s PCB, consulted by `check_path_security`'s
/// `/system/` write gate.
pub fn uid_of(pid: u32) -> Option<u32> {
    let s = STATE.lock();
    let slot = s.find_slot(pid)?;
    Some(s.slot(slot).uid)
}

/// Dispatches the head of the ready queue, demoting the outgoing running
/// process back to ready. No-op when the ready queue is empty, same as
/// `schedule()` returning early when `ready_queue` is `NULL`.
pub fn schedule() -> Option<u32> {
    let mut s = STATE.lock();
    let next = s.pop_ready()?;

    if let Some(running) = s.current {
        if s.slot(running).state == ProcessState::Running {
            s.push_ready(running);
        }
    }

    s.slot_mut(next).state = ProcessState::Running;
    s.current = Some(next);
    CONTEXT_SWITCHES.fetch_add(1, Ordering::Relaxed);
    Some(s.slot(next).pid)
}

/// Called from the timer IRQ handler once per tick. Decrements the
/// running process's time slice and dispatches the next ready process
/// once it expires, resetting the slice for its next turn.
pub fn tick() {
    let mut s = STATE.lock();
    let Some(running) = s.current else { return };
    s.slot_mut(running).cpu_time_used += 1;
    if s.slot_mut(running).time_slice > 0 {
        s.slot_mut(running).time_slice -= 1;
    }
    if s.slot(running).time_slice == 0 {
        s.slot_mut(running).time_slice = DEFAULT_TIME_SLICE;
        drop(s);
        schedule();
    }
}

pub fn block_current() {
    let mut s = STATE.lock();
    if let Some(pid) = s.current {
        s.slot_mut(pid).state = ProcessState::Blocked;
    }
}

pub fn unblock(pid: u32) -> Result<()> {
    let mut s = STATE.lock();
    let slot = s.find_slot(pid).ok_or(KernelError::Invalid)?;
    if s.slot(slot).state != ProcessState::Blocked {
        return Err(KernelError::Invalid);
    }
    s.push_ready(slot);
    Ok(())
}

/// Marks `pid` zombie with `status`, waking a parent parked in
/// `wait_on_child` for exactly this child.
pub fn exit_process(pid: u32, status: i32) {
    let mut s = STATE.lock();
    let Some(slot) = s.find_slot(pid) else { return };
    s.slot_mut(slot).state = ProcessState::Zombie;
    s.slot_mut(slot).exit_status = status;

    let parent_slot = s.slot(slot).family.parent;
    if parent_slot != slot && s.slot(parent_slot).waiting_parent == Some(pid) {
        s.slot_mut(parent_slot).waiting_parent = None;
        s.push_ready(parent_slot);
    }
}

/// Blocks the calling process until `child_pid` becomes a zombie, then
/// reaps it to `Dead` and returns its exit status.
pub fn wait_on_child(caller_pid: u32, child_pid: u32) -> Result<i32> {
    let mut s = STATE.lock();
    let caller_slot = s.find_slot(caller_pid).ok_or(KernelError::Invalid)?;
    let child_slot = s.find_slot(child_pid).ok_or(KernelError::NoChild)?;
    if s.slot(child_slot).family.parent != caller_slot {
        return Err(KernelError::NoChild);
    }
    if s.slot(child_slot).state != ProcessState::Zombie {
        s.slot_mut(caller_slot).waiting_parent = Some(child_pid);
        s.slot_mut(caller_slot).state = ProcessState::Blocked;
        return Err(KernelError::Invalid);
    }
    let status = s.slot(child_slot).exit_status;
    s.table[child_slot as usize] = Pcb::dead_slot();
    Ok(status)
}

/// Allocates a process-local file descriptor in `pid`'s open-handle
/// table, per `spec.md` §4.3's fixed per-process handle array.
pub fn alloc_open_handle(pid: u32, inode_ref: u64, open_flags: u32, access_mode: u8) -> Option<usize> {
    let mut s = STATE.lock();
    let slot = s.find_slot(pid)?;
    s.slot_mut(slot).alloc_handle(inode_ref, open_flags, access_mode)
}

pub fn close_open_handle(pid: u32, fd: usize) -> Result<()> {
    let mut s = STATE.lock();
    let slot = s.find_slot(pid).ok_or(KernelError::BadHandle)?;
    let pcb = s.slot_mut(slot);
    let handle = pcb.open_handles.get_mut(fd).ok_or(KernelError::BadHandle)?;
    if !handle.in_use {
        return Err(KernelError::BadHandle);
    }
    *handle = crate::process::pcb::OpenHandle::empty();
    Ok(())
}

/// Returns `(inode_ref, offset, access_mode, open_flags)` for `pid`'s fd
/// `fd`. `open_flags` carries the raw `OpenFlags` bits so callers can
/// check read/write capability precisely (`access_mode` alone collapses
/// `O_RDONLY`/`O_WRONLY`/`O_RDWR` into a lossy read-or-write bit).
pub fn open_handle_state(pid: u32, fd: usize) -> Result<(u64, u64, u8, u32)> {
    let s = STATE.lock();
    let slot = s.find_slot(pid).ok_or(KernelError::BadHandle)?;
    let handle = s.slot(slot).open_handles.get(fd).ok_or(KernelError::BadHandle)?;
    if !handle.in_use {
        return Err(KernelError::BadHandle);
    }
    Ok((handle.inode_ref, handle.offset, handle.access_mode, handle.open_flags))
}

pub fn advance_open_handle_offset(pid: u32, fd: usize, delta: u64) -> Result<()> {
    let mut s = STATE.lock();
    let slot = s.find_slot(pid).ok_or(KernelError::BadHandle)?;
    let handle = s.slot_mut(slot).open_handles.get_mut(fd).ok_or(KernelError::BadHandle)?;
    if !handle.in_use {
        return Err(KernelError::BadHandle);
    }
    handle.offset += delta;
    Ok(())
}

pub fn context_switch_count() -> u64 {
    CONTEXT_SWITCHES.load(Ordering::Relaxed)
}

pub fn total_created() -> u64 {
    TOTAL_CREATED.load(Ordering::Relaxed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use spin::Once;

    static INIT: Once = Once::new();

    fn reset() {
        INIT.call_once(|| {});
        let mut s = STATE.lock();
        s.table = [Pcb::dead_slot(); PCB_TABLE_SIZE];
        s.current = None;
        s.ready_head = None;
        s.ready_tail = None;
        NEXT_PID.store(1, Ordering::SeqCst);
    }

    #[test]
    fn init_creates_running_idle_process() {
        reset();
        init();
        assert_eq!(current_pid(), Some(IDLE_PID));
        assert_eq!(state_of(IDLE_PID), Some(ProcessState::Running));
    }

    #[test]
    fn schedule_picks_highest_priority_ready_process() {
        reset();
        init();
        let low = create_process(IDLE_PID, 0, 1).unwrap();
        let high = create_process(IDLE_PID, 0, 5).unwrap();
        let picked = schedule().unwrap();
        assert_eq!(picked, high);
        assert_ne!(picked, low);
    }

    #[test]
    fn exit_then_wait_reaps_zombie_and_returns_status() {
        reset();
        init();
        let child = create_process(IDLE_PID, 0, 1).unwrap();
        exit_process(child, 7);
        assert_eq!(wait_on_child(IDLE_PID, child).unwrap(), 7);
        assert_eq!(state_of(child), None);
    }

    #[test]
    fn wait_on_non_child_is_rejected() {
        reset();
        init();
        let a = create_process(IDLE_PID, 0, 1).unwrap();
        let b = create_process(IDLE_PID, 0, 1).unwrap();
        // Fabricate a's parent to be b via direct table edit, then b should
        // still not be a's real parent once we check against the other way.
        assert_eq!(wait_on_child(a, b).unwrap_err(), KernelError::NoChild);
    }

    #[test]
    fn tick_reschedules_once_time_slice_is_exhausted() {
        reset();
        init();
        let other = create_process(IDLE_PID, 0, 1).unwrap();
        for _ in 0..DEFAULT_TIME_SLICE {
            tick();
        }
        assert_eq!(current_pid(), Some(other));
    }

    #[test]
    fn table_exhaustion_reports_out_of_memory() {
        reset();
        init();
        let mut last = Ok(0);
        for _ in 0..(PCB_TABLE_SIZE + 1) {
            last = create_process(IDLE_PID, 0, 1);
        }
        assert_eq!(last.unwrap_err(), KernelError::OutOfMemory);
    }
}
