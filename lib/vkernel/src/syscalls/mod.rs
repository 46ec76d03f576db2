//! The syscalls, as methods on [`Process`].
//!
//! They are grouped by what they operate on: descriptors (`fd`), paths
//! (`path`) and the process itself (`proc`). Relative paths are resolved
//! against the `PWD` environment variable.

mod fd;
mod path;
mod proc;

pub use self::proc::Uname;

use std::path::Path;

use crate::{
    errno::{Errno, SyscallResult},
    fs::{Access, File, FileRef, is_permitted, split_parent},
    os::task::Process,
};

impl Process {
    /// Resolves `path` against the working directory and normalizes `.` and
    /// `..` away. `..` at the root stays at the root.
    pub fn absolute(&self, path: &str) -> String {
        let base = if path.starts_with('/') {
            ""
        } else {
            self.getcwd()
        };

        let mut components = Vec::new();
        for component in base.split('/').chain(path.split('/')) {
            match component {
                "" | "." => {}
                ".." => {
                    components.pop();
                }
                name => components.push(name),
            }
        }

        format!("/{}", components.join("/"))
    }

    /// Looks an absolute path up in the process' storage session.
    pub(crate) fn lookup(&self, path: &str, follow_links: bool) -> SyscallResult<FileRef> {
        Ok(self.fs.get(Path::new(path), follow_links)?)
    }

    pub(crate) fn check_access(&self, file: &File, access: Access) -> SyscallResult<()> {
        if is_permitted(file, self.uid, self.gid, access) {
            Ok(())
        } else {
            Err(Errno::AccessDenied)
        }
    }

    /// Checks `access` on the directory containing the absolute `path`.
    pub(crate) fn check_parent_access(&self, path: &str, access: Access) -> SyscallResult<()> {
        let (parent, _) = split_parent(Path::new(path))?;
        let parent = self.fs.get(parent, true)?;
        self.check_access(&parent.read(), access)
    }
}
