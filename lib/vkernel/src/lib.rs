//! An emulated, POSIX-flavored kernel surface.
//!
//! Programs run as [`Process`]es that talk to a virtual filesystem through
//! file descriptors and path-based syscalls. Terminal devices are driven
//! through the canonical-mode line discipline from [`virtual_tty`], so an
//! interactive program reading from `/dev/tty` receives edited lines just as
//! it would from a real tty driver.
//!
//! The crate is laid out as follows:
//!
//! * [`fs`] holds the file model, the permission evaluator, the
//!   [`FileSystem`](fs::FileSystem) storage trait and an in-memory backend,
//! * [`os`] holds the descriptor table, processes, the control plane handing
//!   out pids and the capabilities passed to executables,
//! * [`runtime`] ties storage, identity and pid allocation together.

pub mod config;
mod errno;
pub mod fs;
pub mod logging;
pub mod os;
pub mod runtime;
mod syscalls;

pub use crate::{
    config::{ConfigError, SystemConfig},
    errno::{Errno, SyscallResult},
    os::{
        exec::{Entrypoint, Io, PathCapability, ProgramContext},
        fd::{Fd, FdEntry, FdTable, OpenFlags, UnlinkFlags},
        task::{ControlPlane, Process, ProcessId},
    },
    runtime::{PluggableRuntime, Runtime},
    syscalls::Uname,
};

pub use virtual_tty::TtyMode;
