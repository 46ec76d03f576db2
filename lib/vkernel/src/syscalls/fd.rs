use std::path::{Path, PathBuf};

use tracing::{Span, field, instrument};

use crate::{
    errno::{Errno, SyscallResult},
    fs::{self, Access, EXECUTABLE_PLACEHOLDER, File, FileKind, FsError, Stat, split_parent},
    os::{
        fd::{Fd, FdEntry, OpenFlags},
        task::Process,
    },
};

impl Process {
    /// ### `open()`
    /// Opens a file and returns the lowest descriptor above every open one.
    ///
    /// With [`OpenFlags::WRITE`] a missing file is created, empty and owned
    /// by the caller, provided the parent directory is writable.
    #[instrument(level = "trace", skip_all, fields(pid = %self.pid, %pathname, ?flags), ret)]
    pub fn open(&mut self, pathname: &str, flags: OpenFlags) -> SyscallResult<Fd> {
        let path = self.absolute(pathname);

        let file = match self.fs.get(Path::new(&path), true) {
            Ok(file) => file,
            Err(FsError::EntryNotFound) if flags.contains(OpenFlags::WRITE) => {
                self.check_parent_access(&path, Access::WRITE)?;
                let (parent, name) = split_parent(Path::new(&path))?;
                let file = File::regular(Vec::new()).with_owner(self.uid, self.gid);
                self.fs.create(parent, name, file)?;
                self.lookup(&path, true)?
            }
            Err(err) => return Err(err.into()),
        };

        {
            let file = file.read();
            if file.is_directory() || file.is_filesystem() {
                return Err(Errno::IsADirectory);
            }
            if flags.contains(OpenFlags::READ) {
                self.check_access(&file, Access::READ)?;
            }
            if flags.contains(OpenFlags::WRITE) {
                self.check_access(&file, Access::WRITE)?;
            }
        }

        let fd = self.fd_table.insert(FdEntry::new(path.clone(), flags));
        self.publish_fd_link(fd, &path);

        Ok(fd)
    }

    /// ### `close()`
    #[instrument(level = "trace", skip_all, fields(pid = %self.pid, %fd), ret)]
    pub fn close(&mut self, fd: Fd) -> SyscallResult<()> {
        if !self.fd_table.contains(fd) {
            return Err(Errno::BadFileDescriptor);
        }

        self.remove_fd_link(fd);
        self.fd_table.remove(fd);

        Ok(())
    }

    /// ### `seek()`
    /// Moves the cursor of `fd`. Any offset is accepted; reads past the end
    /// return nothing and writes past the end append.
    #[instrument(level = "trace", skip_all, fields(pid = %self.pid, %fd, %offset), ret)]
    pub fn seek(&mut self, fd: Fd, offset: usize) -> SyscallResult<()> {
        let entry = self
            .fd_table
            .get_mut(fd)
            .ok_or(Errno::BadFileDescriptor)?;
        entry.offset = offset;

        Ok(())
    }

    /// ### `read()`
    /// Reads up to `count` bytes (everything when `None`) from the cursor.
    ///
    /// On a device this waits for the device's next chunk instead, and the
    /// cursor is left alone.
    #[instrument(level = "trace", skip_all, fields(pid = %self.pid, %fd, nread = field::Empty), err)]
    pub async fn read(&mut self, fd: Fd, count: Option<usize>) -> SyscallResult<Vec<u8>> {
        let entry = self.fd_table.get(fd).ok_or(Errno::BadFileDescriptor)?;
        if !entry.flags.contains(OpenFlags::READ) {
            return Err(Errno::BadFileDescriptor);
        }
        let offset = entry.offset;
        let file = self.lookup(&entry.pathname, true)?;

        let device = match &mut file.write().kind {
            FileKind::Regular { data } => {
                let bytes = read_at(data, offset, count);
                self.advance(fd, bytes.len());
                Span::current().record("nread", bytes.len());
                return Ok(bytes);
            }
            FileKind::Executable { data, .. } => {
                let data = data.get_or_insert_with(|| EXECUTABLE_PLACEHOLDER.to_vec());
                let bytes = read_at(data, offset, count);
                self.advance(fd, bytes.len());
                Span::current().record("nread", bytes.len());
                return Ok(bytes);
            }
            FileKind::Device(device) => device.clone(),
            FileKind::Directory | FileKind::Filesystem { .. } => {
                return Err(Errno::IsADirectory);
            }
            FileKind::SymbolicLink { .. } => return Err(Errno::IoError),
        };

        let bytes = device.read().await?;
        Span::current().record("nread", bytes.len());

        Ok(bytes)
    }

    /// ### `write()`
    /// Writes the first `count` bytes of `buf` (all of it when `None`).
    ///
    /// Regular files get the bytes inserted at the cursor, which then moves
    /// past them. Devices receive them as is.
    #[instrument(level = "trace", skip_all, fields(pid = %self.pid, %fd, len = buf.len()), ret)]
    pub fn write(&mut self, fd: Fd, buf: &[u8], count: Option<usize>) -> SyscallResult<usize> {
        let entry = self.fd_table.get(fd).ok_or(Errno::BadFileDescriptor)?;
        if !entry.flags.contains(OpenFlags::WRITE) {
            return Err(Errno::BadFileDescriptor);
        }
        let offset = entry.offset;
        let file = self.lookup(&entry.pathname, true)?;

        let buf = &buf[..count.map_or(buf.len(), |count| count.min(buf.len()))];

        let written = match &mut file.write().kind {
            FileKind::Regular { data } => {
                let at = offset.min(data.len());
                data.splice(at..at, buf.iter().copied());
                self.advance(fd, buf.len());
                buf.len()
            }
            FileKind::Device(device) => device.write(buf)?,
            FileKind::Directory | FileKind::Filesystem { .. } => {
                return Err(Errno::IsADirectory);
            }
            FileKind::Executable { .. } | FileKind::SymbolicLink { .. } => {
                return Err(Errno::IoError);
            }
        };

        Ok(written)
    }

    /// ### `fstat()`
    #[instrument(level = "trace", skip_all, fields(pid = %self.pid, %fd), ret)]
    pub fn fstat(&self, fd: Fd) -> SyscallResult<Stat> {
        let entry = self.fd_table.get(fd).ok_or(Errno::BadFileDescriptor)?;
        let file = self.lookup(&entry.pathname, true)?;
        let stat = file.read().stat();

        Ok(stat)
    }

    /// ### `fchown()`
    #[instrument(level = "trace", skip_all, fields(pid = %self.pid, %fd, %uid, %gid), ret)]
    pub fn fchown(&self, fd: Fd, uid: u32, gid: u32) -> SyscallResult<()> {
        let entry = self.fd_table.get(fd).ok_or(Errno::BadFileDescriptor)?;
        let file = self.lookup(&entry.pathname, true)?;
        let mut file = file.write();
        file.owner = uid;
        file.group = gid;

        Ok(())
    }

    /// ### `fchmod()`
    #[instrument(level = "trace", skip_all, fields(pid = %self.pid, %fd, %mode), ret)]
    pub fn fchmod(&self, fd: Fd, mode: u32) -> SyscallResult<()> {
        let entry = self.fd_table.get(fd).ok_or(Errno::BadFileDescriptor)?;
        let file = self.lookup(&entry.pathname, true)?;
        file.write().mode = mode & 0o7777;

        Ok(())
    }

    /// Closes every open descriptor.
    pub(crate) fn close_all(&mut self) {
        let fds: Vec<Fd> = self.fd_table.fds().collect();
        for fd in fds {
            self.remove_fd_link(fd);
            self.fd_table.remove(fd);
        }
    }

    fn advance(&mut self, fd: Fd, by: usize) {
        if let Some(entry) = self.fd_table.get_mut(fd) {
            entry.offset += by;
        }
    }

    /// `<proc_dir>/<pid>`
    pub(crate) fn proc_dir(&self) -> PathBuf {
        Path::new(&self.runtime.config().proc_dir).join(self.pid.to_string())
    }

    fn fd_dir(&self) -> PathBuf {
        self.proc_dir().join("fd")
    }

    /// Makes `<proc_dir>/<pid>/fd/<fd>` point at what `fd` was opened on.
    /// The descriptor works without it, so failures are only logged.
    fn publish_fd_link(&self, fd: Fd, target: &str) {
        match self.try_publish_fd_link(fd, target) {
            Ok(()) => tracing::trace!(pid = %self.pid, %fd, %target, "published descriptor link"),
            Err(error) => {
                tracing::warn!(pid = %self.pid, %fd, %error, "unable to publish descriptor link")
            }
        }
    }

    fn try_publish_fd_link(&self, fd: Fd, target: &str) -> fs::Result<()> {
        let dir = self.fd_dir();
        self.create_dir_all(&dir)?;

        let name = fd.to_string();
        let link = || File::symlink(target).with_owner(self.uid, self.gid);
        match self.fs.create(&dir, &name, link()) {
            Err(FsError::AlreadyExists) => {
                self.fs.delete(&dir.join(&name), false)?;
                self.fs.create(&dir, &name, link())?;
            }
            result => {
                result?;
            }
        }

        Ok(())
    }

    fn remove_fd_link(&self, fd: Fd) {
        let link = self.fd_dir().join(fd.to_string());
        match self.fs.delete(&link, false) {
            Ok(()) | Err(FsError::EntryNotFound) => {}
            Err(error) => {
                tracing::warn!(pid = %self.pid, %fd, %error, "unable to remove descriptor link")
            }
        }
    }

    /// Creates the directories leading to `path` as needed, owned by root.
    fn create_dir_all(&self, path: &Path) -> fs::Result<()> {
        let mut current = PathBuf::from("/");
        for name in path.iter().filter_map(|name| name.to_str()).filter(|name| *name != "/") {
            match self.fs.create(&current, name, File::directory()) {
                Ok(_) | Err(FsError::AlreadyExists) => {}
                Err(error) => return Err(error),
            }
            current.push(name);
        }

        Ok(())
    }
}

/// `data[offset..offset + count]`, clamped to what is there.
fn read_at(data: &[u8], offset: usize, count: Option<usize>) -> Vec<u8> {
    let start = offset.min(data.len());
    let end = match count {
        Some(count) => start.saturating_add(count).min(data.len()),
        None => data.len(),
    };

    data[start..end].to_vec()
}
