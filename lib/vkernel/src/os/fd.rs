use std::collections::BTreeMap;

use bitflags::bitflags;

/// A file descriptor number.
pub type Fd = u32;

/// Descriptors handed to every spawned process.
pub const STDIN: Fd = 0;
pub const STDOUT: Fd = 1;
pub const STDERR: Fd = 2;

bitflags! {
    /// How a descriptor was opened.
    pub struct OpenFlags: u32 {
        /// This descriptor can be used with read system calls.
        const READ = 1;
        /// This descriptor can be used with write system calls. Opening a
        /// missing path with this flag creates the file.
        const WRITE = 2;
    }
}

bitflags! {
    pub struct UnlinkFlags: u32 {
        /// Remove a directory, together with its contents.
        const REMOVE_DIR = 1;
    }
}

/// An open descriptor.
///
/// Only the path is recorded; every use looks it up again, so replacing the
/// file behind an open descriptor is visible through it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FdEntry {
    pub pathname: String,
    pub flags: OpenFlags,
    pub offset: usize,
}

impl FdEntry {
    pub fn new(pathname: impl Into<String>, flags: OpenFlags) -> Self {
        Self {
            pathname: pathname.into(),
            flags,
            offset: 0,
        }
    }
}

/// The descriptors of one process.
#[derive(Debug, Clone, Default)]
pub struct FdTable {
    entries: BTreeMap<Fd, FdEntry>,
}

impl FdTable {
    /// The number the next [`insert`](Self::insert) hands out: one past the
    /// highest open descriptor, or 0 when none is open.
    ///
    /// Numbers freed below the highest descriptor are not reused.
    pub fn next_fd(&self) -> Fd {
        self.entries
            .last_key_value()
            .map_or(0, |(fd, _)| fd + 1)
    }

    pub fn insert(&mut self, entry: FdEntry) -> Fd {
        let fd = self.next_fd();
        self.entries.insert(fd, entry);
        fd
    }

    pub fn get(&self, fd: Fd) -> Option<&FdEntry> {
        self.entries.get(&fd)
    }

    pub fn get_mut(&mut self, fd: Fd) -> Option<&mut FdEntry> {
        self.entries.get_mut(&fd)
    }

    pub fn remove(&mut self, fd: Fd) -> Option<FdEntry> {
        self.entries.remove(&fd)
    }

    pub fn contains(&self, fd: Fd) -> bool {
        self.entries.contains_key(&fd)
    }

    /// Open descriptors, lowest first.
    pub fn fds(&self) -> impl Iterator<Item = Fd> + '_ {
        self.entries.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
