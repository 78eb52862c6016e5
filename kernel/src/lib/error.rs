//! Kernel error taxonomy and POSIX-style errno mapping.
//!
//! `KernelError` is what internal kernel callers see; `Errno` is what
//! crosses the syscall boundary as a negated `isize`. The two fatal kinds
//! (`HeapCorruption`, `StackCorruption`) never reach user space — they are
//! caught at their call site and routed to `crate::panic::fatal`.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelError {
    OutOfMemory,
    BadHandle,
    BadPath,
    PermissionDenied,
    NoSuchProcess,
    NoChild,
    Invalid,
    IoError,
    TooManyOpen,
    CacheFull,
    UnknownSyscall,
    HeapCorruption,
    StackCorruption,
}

impl KernelError {
    pub const fn is_fatal(self) -> bool {
        matches!(self, Self::HeapCorruption | Self::StackCorruption)
    }
}

#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Errno {
    EPERM = 1,
    ENOENT = 2,
    ESRCH = 3,
    EIO = 5,
    EBADF = 9,
    ECHILD = 10,
    EAGAIN = 11,
    ENOMEM = 12,
    EACCES = 13,
    EFAULT = 14,
    EEXIST = 17,
    ENOTDIR = 20,
    EISDIR = 21,
    EINVAL = 22,
    EMFILE = 24,
    ENODEV = 19,
    ENOSYS = 38,
    ENAMETOOLONG = 36,
}

impl From<KernelError> for Errno {
    fn from(err: KernelError) -> Self {
        match err {
            KernelError::OutOfMemory => Errno::ENOMEM,
            KernelError::BadHandle => Errno::EBADF,
            KernelError::BadPath => Errno::ENOENT,
            KernelError::PermissionDenied => Errno::EACCES,
            KernelError::NoSuchProcess => Errno::ESRCH,
            KernelError::NoChild => Errno::ECHILD,
            KernelError::Invalid => Errno::EINVAL,
            KernelError::IoError => Errno::EIO,
            KernelError::TooManyOpen => Errno::EMFILE,
            KernelError::CacheFull => Errno::EMFILE,
            KernelError::UnknownSyscall => Errno::ENOSYS,
            // Fatal kinds should be intercepted before conversion; map to
            // something sane so `From` stays total.
            KernelError::HeapCorruption | KernelError::StackCorruption => Errno::EFAULT,
        }
    }
}

impl Errno {
    /// The negated value a syscall handler hands back to user space.
    pub const fn as_isize(self) -> isize {
        -(self as i32 as isize)
    }

    pub const fn description(self) -> &'static str {
        match self {
            Errno::EPERM => "Operation not permitted",
            Errno::ENOENT => "No such file or directory",
            Errno::ESRCH => "No such process",
            Errno::EIO => "I/O error",
            Errno::EBADF => "Bad file descriptor",
            Errno::ECHILD => "No child processes",
            Errno::EAGAIN => "Resource temporarily unavailable",
            Errno::ENOMEM => "Out of memory",
            Errno::EACCES => "Permission denied",
            Errno::EFAULT => "Bad address",
            Errno::EEXIST => "File exists",
            Errno::ENOTDIR => "Not a directory",
            Errno::EISDIR => "Is a directory",
            Errno::EINVAL => "Invalid argument",
            Errno::EMFILE => "Too many open files",
            Errno::ENODEV => "No such device",
            Errno::ENOSYS => "Function not implemented",
            Errno::ENAMETOOLONG => "File name too long",
        }
    }
}

pub type Result<T> = core::result::Result<T, KernelError>;
