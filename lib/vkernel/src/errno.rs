use crate::fs::FsError;

/// The result of a syscall.
pub type SyscallResult<T> = Result<T, Errno>;

/// Error codes returned by syscalls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, thiserror::Error)]
pub enum Errno {
    /// The descriptor is not open, or not open for the requested access.
    #[error("bad file descriptor")]
    BadFileDescriptor,
    #[error("no such file or directory")]
    NotFound,
    #[error("not a directory")]
    NotADirectory,
    #[error("is a directory")]
    IsADirectory,
    #[error("input/output error")]
    IoError,
    #[error("directory not empty")]
    DirectoryNotEmpty,
    /// The file exists but cannot be executed.
    #[error("linkage error")]
    LinkageError,
    #[error("invalid argument")]
    InvalidArgument,
    #[error("permission denied")]
    AccessDenied,
    #[error("file exists")]
    AlreadyExists,
    #[error("too many levels of symbolic links")]
    SymlinkLoop,
}

impl Errno {
    /// The conventional short name (`ENOENT`, ...), used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Errno::BadFileDescriptor => "EBADF",
            Errno::NotFound => "ENOENT",
            Errno::NotADirectory => "ENOTDIR",
            Errno::IsADirectory => "EISDIR",
            Errno::IoError => "EIO",
            Errno::DirectoryNotEmpty => "ENOTEMPTY",
            Errno::LinkageError => "ENOEXEC",
            Errno::InvalidArgument => "EINVAL",
            Errno::AccessDenied => "EACCES",
            Errno::AlreadyExists => "EEXIST",
            Errno::SymlinkLoop => "ELOOP",
        }
    }
}

/// Storage errors surface to programs through this mapping only.
impl From<FsError> for Errno {
    fn from(err: FsError) -> Self {
        match err {
            FsError::EntryNotFound => Errno::NotFound,
            FsError::BaseNotDirectory => Errno::NotADirectory,
            FsError::AlreadyExists => Errno::AlreadyExists,
            FsError::DirectoryNotEmpty => Errno::DirectoryNotEmpty,
            FsError::InvalidInput => Errno::InvalidArgument,
            FsError::TooManySymlinks => Errno::SymlinkLoop,
            FsError::IOError => Errno::IoError,
        }
    }
}
