//! Files and the storage they live in.

mod file;
mod layout;
pub mod mem_fs;
mod permissions;
mod terminal;

use std::{fmt, path::Path, sync::Arc};

use async_trait::async_trait;

pub use self::{
    file::{EXECUTABLE_PLACEHOLDER, File, FileKind, Stat},
    layout::build_default_fs,
    mem_fs::MemFileSystem,
    permissions::{Access, is_permitted},
    terminal::{Terminal, TerminalInput},
};

pub type Result<T> = std::result::Result<T, FsError>;

/// A shared handle on a stored file.
///
/// Handles stay valid after the entry is deleted; the storage backend flags
/// such files with [`File::deleted`].
pub type FileRef = Arc<parking_lot::RwLock<File>>;

/// Error type for storage operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum FsError {
    /// The requested file or directory could not be found
    #[error("entry not found")]
    EntryNotFound,
    /// A path component that had to be a directory was not one
    #[error("base not a directory")]
    BaseNotDirectory,
    /// File exists
    #[error("file exists")]
    AlreadyExists,
    /// The directory still has children
    #[error("directory not empty")]
    DirectoryNotEmpty,
    /// The provided data is invalid
    #[error("invalid input")]
    InvalidInput,
    /// Symbolic links chained deeper than the resolution limit
    #[error("too many symbolic links")]
    TooManySymlinks,
    /// Something failed when doing IO. These errors can generally not be handled.
    #[error("io error")]
    IOError,
}

/// A storage session.
///
/// All paths are absolute. Implementations own the ordering of directory
/// listings.
pub trait FileSystem: fmt::Debug + Send + Sync {
    /// Looks an entry up. When `follow_links` is false a symbolic link in
    /// the final component is returned as is; links in earlier components
    /// are always followed.
    fn get(&self, path: &Path, follow_links: bool) -> Result<FileRef>;

    /// Adds `file` as `name` under the directory at `parent`.
    fn create(&self, parent: &Path, name: &str, file: File) -> Result<FileRef>;

    /// Removes an entry. A non-empty directory is only removed when
    /// `recursive` is set.
    fn delete(&self, path: &Path, recursive: bool) -> Result<()>;

    /// Names of the children of a directory.
    fn list(&self, path: &Path) -> Result<Vec<String>>;
}

/// The device half of a [`FileKind::Device`] file.
#[async_trait]
pub trait Device: fmt::Debug + Send + Sync {
    /// Waits for the next chunk of input. An empty chunk means end of file.
    async fn read(&self) -> Result<Vec<u8>>;

    fn write(&self, buf: &[u8]) -> Result<usize>;
}

/// Splits an absolute path into its parent directory and final component.
///
/// Fails with [`FsError::InvalidInput`] on the root, which has neither.
pub(crate) fn split_parent(path: &Path) -> Result<(&Path, &str)> {
    let parent = path.parent().ok_or(FsError::InvalidInput)?;
    let name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or(FsError::InvalidInput)?;
    Ok((parent, name))
}
