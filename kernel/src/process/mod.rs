//! Process model — `spec.md` §4.3: PCB layout, fixed-size process table,
//! and the priority round-robin scheduler.

pub mod pcb;
pub mod scheduler;

pub use pcb::{Pid, ProcessState, IDLE_PID, PCB_TABLE_SIZE};

use crate::lib::{Level, Result};

pub fn init() {
    scheduler::init();
}

pub fn spawn(parent_pid: Pid, classification: Level, priority: u32) -> Result<Pid> {
    scheduler::create_process(parent_pid, classification, priority)
}

pub fn exit(pid: Pid, status: i32) {
    scheduler::exit_process(pid, status)
}

pub fn wait(caller_pid: Pid, child_pid: Pid) -> Result<i32> {
    scheduler::wait_on_child(caller_pid, child_pid)
}

pub fn current() -> Option<Pid> {
    scheduler::current_pid()
}
