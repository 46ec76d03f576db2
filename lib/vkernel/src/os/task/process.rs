use std::{collections::HashMap, fmt, sync::Arc};

use crate::{fs::FileSystem, os::fd::FdTable, runtime::Runtime};

/// Represents the ID of a process
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProcessId(u32);

impl ProcessId {
    /// The parent id of a process that was not spawned by another one.
    pub const NONE: ProcessId = ProcessId(0);

    pub fn raw(&self) -> u32 {
        self.0
    }
}

impl From<u32> for ProcessId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl From<ProcessId> for u32 {
    fn from(val: ProcessId) -> Self {
        val.0
    }
}

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A process: its identity, its descriptors and its view of storage.
///
/// The syscalls are implemented as methods; see the `fd`, `path` and `proc`
/// groups in the crate documentation.
pub struct Process {
    pub(crate) pid: ProcessId,
    pub(crate) ppid: ProcessId,
    pub(crate) name: String,
    pub(crate) args: Vec<String>,
    pub(crate) env: HashMap<String, String>,
    pub(crate) uid: u32,
    pub(crate) gid: u32,
    pub(crate) fd_table: FdTable,
    /// Storage session, obtained once and shared with children.
    pub(crate) fs: Arc<dyn FileSystem>,
    pub(crate) runtime: Arc<dyn Runtime>,
    pub(crate) children: Vec<ProcessId>,
}

impl Process {
    /// Creates a top-level process running as root with an empty descriptor
    /// table.
    pub fn new(runtime: Arc<dyn Runtime>, name: impl Into<String>) -> Self {
        let pid = runtime.control_plane().reserve_pid();
        let fs = runtime.session(pid);

        Self {
            pid,
            ppid: ProcessId::NONE,
            name: name.into(),
            args: Vec::new(),
            env: HashMap::new(),
            uid: 0,
            gid: 0,
            fd_table: FdTable::default(),
            fs,
            runtime,
            children: Vec::new(),
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_env<I, K, V>(mut self, env: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.env
            .extend(env.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// A new process that inherits this one's storage session, environment
    /// and credentials. Its descriptor table starts out empty.
    pub(crate) fn new_child(&self) -> Self {
        let pid = self.runtime.control_plane().reserve_pid();

        Self {
            pid,
            ppid: self.pid,
            name: self.name.clone(),
            args: Vec::new(),
            env: self.env.clone(),
            uid: self.uid,
            gid: self.gid,
            fd_table: FdTable::default(),
            fs: self.fs.clone(),
            runtime: self.runtime.clone(),
            children: Vec::new(),
        }
    }

    pub fn fd_table(&self) -> &FdTable {
        &self.fd_table
    }

    pub fn runtime(&self) -> &Arc<dyn Runtime> {
        &self.runtime
    }

    pub fn fs(&self) -> &Arc<dyn FileSystem> {
        &self.fs
    }
}

/// A dropped process exits: its descriptors are closed, its
/// `<proc_dir>/<pid>` directory is removed and its pid is released.
impl Drop for Process {
    fn drop(&mut self) {
        self.exit();
        self.runtime.control_plane().release(self.pid);
    }
}

impl fmt::Debug for Process {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Process")
            .field("pid", &self.pid)
            .field("ppid", &self.ppid)
            .field("name", &self.name)
            .field("uid", &self.uid)
            .field("gid", &self.gid)
            .field("fd_table", &self.fd_table)
            .field("children", &self.children)
            .finish_non_exhaustive()
    }
}
