//! Process control block — `spec.md` §3 "Process Control Block (PCB)".
//!
//! `original_source/kernel/core/process.c` links PCBs with raw
//! `next`/`prev`/`parent`/`first_child`/`next_sibling` pointers into a
//! 256-entry static table. `spec.md` §9 "Design Notes" directs exactly
//! this reshape: arena-allocated items referenced by stable indices. Here
//! the arena is the scheduler's fixed `[Pcb; PCB_TABLE_SIZE]` array and
//! the "pointers" in `FamilyLinks`/`QueueLinks` are table *slot* indices,
//! not `pid`s — `pid` is a separate monotonic counter the scheduler hands
//! out (see `scheduler::find_slot`), so it can keep increasing even as
//! slots are reaped and reused. Slot `0` is idle's permanent home and
//! doubles as the "no parent/child/sibling/queue-neighbor" sentinel,
//! since idle is never a child, sibling, or ready-queue member of
//! anything else.

use crate::lib::Level;

pub type Pid = u32;

pub const IDLE_PID: Pid = 0;
pub const PCB_TABLE_SIZE: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    Ready,
    Running,
    Blocked,
    Zombie,
    Dead,
}

#[derive(Debug, Clone, Copy)]
pub struct Registers {
    pub rsp: u64,
    pub rbp: u64,
    pub rip: u64,
    pub rflags: u64,
    pub rbx: u64,
    pub r12: u64,
    pub r13: u64,
    pub r14: u64,
    pub r15: u64,
}

impl Registers {
    pub const fn zeroed() -> Self {
        Self {
            rsp: 0,
            rbp: 0,
            rip: 0,
            rflags: 0,
            rbx: 0,
            r12: 0,
            r13: 0,
            r14: 0,
            r15: 0,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct OpenHandle {
    pub in_use: bool,
    pub inode_ref: u64,
    pub offset: u64,
    pub open_flags: u32,
    pub access_mode: u8,
    pub reference_count: u32,
}

impl OpenHandle {
    pub const fn empty() -> Self {
        Self {
            in_use: false,
            inode_ref: 0,
            offset: 0,
            open_flags: 0,
            access_mode: 0,
            reference_count: 0,
        }
    }
}

pub const MAX_OPEN_HANDLES: usize = 32;

/// Slot indices, not pids — see the module doc comment.
#[derive(Debug, Clone, Copy)]
pub struct FamilyLinks {
    pub parent: u32,
    pub first_child: u32,
    pub next_sibling: u32,
}

/// Slot indices, not pids — see the module doc comment.
#[derive(Debug, Clone, Copy)]
pub struct QueueLinks {
    pub prev: Option<u32>,
    pub next: Option<u32>,
}

#[derive(Debug, Clone, Copy)]
pub struct Pcb {
    pub pid: Pid,
    pub parent_pid: Pid,
    /// Owning user id, inherited from the parent at fork/spawn time.
    /// `original_source/kernel/core/process.c` carries the equivalent
    /// `uid`/`gid`/`euid`/`egid` fields on `struct process`; this kernel
    /// only needs the owner identity `check_path_security` gates on
    /// (`/system/` writes require uid 0), so the rest aren't modeled.
    pub uid: u32,
    pub state: ProcessState,
    pub classification: Level,
    pub priority: u32,
    pub time_slice: u32,
    pub cpu_time_used: u64,
    pub saved_register_set: Registers,
    pub kernel_stack_range: (u64, u64),
    pub user_stack_range: (u64, u64),
    pub address_space_root: u64,
    pub open_handles: [OpenHandle; MAX_OPEN_HANDLES],
    pub security_flags: u32,
    pub audit_context: u64,
    pub family: FamilyLinks,
    pub queue: QueueLinks,
    pub exit_status: i32,
    /// Set when `wait_on_child` blocked the parent on this specific pid;
    /// used to route the wake-up on exit.
    pub waiting_parent: Option<Pid>,
}

impl Pcb {
    pub const fn dead_slot() -> Self {
        Self {
            pid: 0,
            parent_pid: 0,
            uid: 0,
            state: ProcessState::Dead,
            classification: 0,
            priority: 0,
            time_slice: 0,
            cpu_time_used: 0,
            saved_register_set: Registers::zeroed(),
            kernel_stack_range: (0, 0),
            user_stack_range: (0, 0),
            address_space_root: 0,
            open_handles: [OpenHandle::empty(); MAX_OPEN_HANDLES],
            security_flags: 0,
            audit_context: 0,
            family: FamilyLinks {
                parent: 0,
                first_child: 0,
                next_sibling: 0,
            },
            queue: QueueLinks {
                prev: None,
                next: None,
            },
            exit_status: 0,
            waiting_parent: None,
        }
    }

    pub fn alloc_handle(&mut self, inode_ref: u64, open_flags: u32, access_mode: u8) -> Option<usize> {
        for (i, slot) in self.open_handles.iter_mut().enumerate() {
            if !slot.in_use {
                *slot = OpenHandle {
                    in_use: true,
                    inode_ref,
                    offset: 0,
                    open_flags,
                    access_mode,
                    reference_count: 1,
                };
                return Some(i);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dead_slot_has_no_open_handles() {
        let pcb = Pcb::dead_slot();
        assert!(pcb.open_handles.iter().all(|h| !h.in_use));
        assert_eq!(pcb.state, ProcessState::Dead);
    }

    #[test]
    fn alloc_handle_fills_first_free_slot() {
        let mut pcb = Pcb::dead_slot();
        let a = pcb.alloc_handle(1, 0, 0).unwrap();
        let b = pcb.alloc_handle(2, 0, 0).unwrap();
        assert_eq!(a, 0);
        assert_eq!(b, 1);
    }

    #[test]
    fn alloc_handle_fails_when_table_full() {
        let mut pcb = Pcb::dead_slot();
        for _ in 0..MAX_OPEN_HANDLES {
            assert!(pcb.alloc_handle(1, 0, 0).is_some());
        }
        assert!(pcb.alloc_handle(1, 0, 0).is_none());
    }
}
