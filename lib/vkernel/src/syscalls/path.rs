use std::path::Path;

use tracing::instrument;

use crate::{
    errno::{Errno, SyscallResult},
    fs::{Access, File, FileKind, Stat, split_parent},
    os::{fd::UnlinkFlags, task::Process},
};

/// Mode of directories created on the way by a recursive `mkdir`.
const INTERMEDIATE_DIR_MODE: u32 = 0o755;

impl Process {
    /// ### `stat()`
    #[instrument(level = "trace", skip_all, fields(pid = %self.pid, %path), ret)]
    pub fn stat(&self, path: &str) -> SyscallResult<Stat> {
        let file = self.lookup(&self.absolute(path), true)?;
        let stat = file.read().stat();

        Ok(stat)
    }

    /// ### `lstat()`
    /// Like [`stat`](Self::stat), but reports a symbolic link itself rather
    /// than what it points to.
    #[instrument(level = "trace", skip_all, fields(pid = %self.pid, %path), ret)]
    pub fn lstat(&self, path: &str) -> SyscallResult<Stat> {
        let file = self.lookup(&self.absolute(path), false)?;
        let stat = file.read().stat();

        Ok(stat)
    }

    /// ### `unlink()`
    /// Removes a file. Directories are only removed, together with their
    /// contents, when [`UnlinkFlags::REMOVE_DIR`] is given. A mount point
    /// counts as a directory; removing it unmounts the filesystem.
    #[instrument(level = "trace", skip_all, fields(pid = %self.pid, %path, ?flags), ret)]
    pub fn unlink(&self, path: &str, flags: UnlinkFlags) -> SyscallResult<()> {
        let path = self.absolute(path);
        let remove_dir = flags.contains(UnlinkFlags::REMOVE_DIR);

        let is_directory = {
            let file = self.lookup(&path, false)?;
            let file = file.read();
            file.is_directory() || file.is_filesystem()
        };
        match (remove_dir, is_directory) {
            (true, false) => return Err(Errno::NotADirectory),
            (false, true) => return Err(Errno::IsADirectory),
            _ => {}
        }

        self.check_parent_access(&path, Access::WRITE)?;
        self.fs.delete(Path::new(&path), remove_dir)?;

        Ok(())
    }

    /// ### `mkdir()`
    /// Creates a directory. With `recursive`, missing parents are created
    /// first.
    #[instrument(level = "trace", skip_all, fields(pid = %self.pid, %path, %mode, %recursive), ret)]
    pub fn mkdir(&self, path: &str, mode: u32, recursive: bool) -> SyscallResult<()> {
        let path = self.absolute(path);

        match self.create_directory(&path, mode) {
            Err(Errno::NotFound) if recursive => {
                let (parent, _) = split_parent(Path::new(&path))?;
                let parent = parent.to_string_lossy();
                self.mkdir(&parent, INTERMEDIATE_DIR_MODE, true)?;
                self.create_directory(&path, mode)
            }
            result => result,
        }
    }

    fn create_directory(&self, path: &str, mode: u32) -> SyscallResult<()> {
        let (parent, name) = split_parent(Path::new(path))?;

        {
            let parent = self.fs.get(parent, true)?;
            let parent = parent.read();
            if !parent.is_directory() && !parent.is_filesystem() {
                return Err(Errno::NotADirectory);
            }
            self.check_access(&parent, Access::WRITE)?;
        }

        let directory = File::directory()
            .with_mode(mode & 0o7777)
            .with_owner(self.uid, self.gid);
        self.fs.create(parent, name, directory)?;

        Ok(())
    }

    /// ### `readdir()`
    /// Names of the entries of a directory, in the order storage keeps them.
    #[instrument(level = "trace", skip_all, fields(pid = %self.pid, %path), ret)]
    pub fn readdir(&self, path: &str) -> SyscallResult<Vec<String>> {
        let path = self.absolute(path);

        {
            let directory = self.lookup(&path, true)?;
            let directory = directory.read();
            if !directory.is_directory() && !directory.is_filesystem() {
                return Err(Errno::NotADirectory);
            }
            self.check_access(&directory, Access::READ)?;
        }

        Ok(self.fs.list(Path::new(&path))?)
    }

    /// ### `rmdir()`
    #[instrument(level = "trace", skip_all, fields(pid = %self.pid, %path), ret)]
    pub fn rmdir(&self, path: &str) -> SyscallResult<()> {
        let path = self.absolute(path);

        if !self.lookup(&path, false)?.read().is_directory() {
            return Err(Errno::NotADirectory);
        }
        if !self.fs.list(Path::new(&path))?.is_empty() {
            return Err(Errno::DirectoryNotEmpty);
        }

        self.check_parent_access(&path, Access::WRITE)?;
        self.fs.delete(Path::new(&path), false)?;

        Ok(())
    }

    /// ### `symlink()`
    /// Creates `linkpath` pointing at `target`. The target is stored as
    /// given and need not exist.
    #[instrument(level = "trace", skip_all, fields(pid = %self.pid, %target, %linkpath), ret)]
    pub fn symlink(&self, target: &str, linkpath: &str) -> SyscallResult<()> {
        let linkpath = self.absolute(linkpath);
        self.check_parent_access(&linkpath, Access::WRITE)?;

        let (parent, name) = split_parent(Path::new(&linkpath))?;
        let link = File::symlink(target).with_owner(self.uid, self.gid);
        self.fs.create(parent, name, link)?;

        Ok(())
    }

    /// ### `readlink()`
    #[instrument(level = "trace", skip_all, fields(pid = %self.pid, %path), ret)]
    pub fn readlink(&self, path: &str) -> SyscallResult<String> {
        let file = self.lookup(&self.absolute(path), false)?;
        let file = file.read();

        match &file.kind {
            FileKind::SymbolicLink { target } => Ok(target.clone()),
            _ => Err(Errno::InvalidArgument),
        }
    }

    /// ### `chown()`
    #[instrument(level = "trace", skip_all, fields(pid = %self.pid, %path, %uid, %gid), ret)]
    pub fn chown(&self, path: &str, uid: u32, gid: u32) -> SyscallResult<()> {
        self.set_owner(path, true, uid, gid)
    }

    /// ### `lchown()`
    #[instrument(level = "trace", skip_all, fields(pid = %self.pid, %path, %uid, %gid), ret)]
    pub fn lchown(&self, path: &str, uid: u32, gid: u32) -> SyscallResult<()> {
        self.set_owner(path, false, uid, gid)
    }

    fn set_owner(&self, path: &str, follow_links: bool, uid: u32, gid: u32) -> SyscallResult<()> {
        let file = self.lookup(&self.absolute(path), follow_links)?;
        let mut file = file.write();
        file.owner = uid;
        file.group = gid;

        Ok(())
    }

    /// ### `chmod()`
    /// Only the permission bits of `mode` are kept.
    #[instrument(level = "trace", skip_all, fields(pid = %self.pid, %path, %mode), ret)]
    pub fn chmod(&self, path: &str, mode: u32) -> SyscallResult<()> {
        let file = self.lookup(&self.absolute(path), true)?;
        file.write().mode = mode & 0o7777;

        Ok(())
    }

    /// ### `chdir()`
    /// Sets the current working directory
    #[instrument(level = "trace", skip_all, fields(pid = %self.pid, %path), ret)]
    pub fn chdir(&mut self, path: &str) -> SyscallResult<()> {
        let path = self.absolute(path);

        {
            let directory = self.lookup(&path, true)?;
            let directory = directory.read();
            if !directory.is_directory() && !directory.is_filesystem() {
                return Err(Errno::NotADirectory);
            }
            self.check_access(&directory, Access::EXECUTE)?;
        }

        self.env.insert("PWD".to_string(), path);
        Ok(())
    }

    /// ### `getcwd()`
    /// The `PWD` environment variable, `/` when unset.
    pub fn getcwd(&self) -> &str {
        self.env.get("PWD").map_or("/", String::as_str)
    }
}
