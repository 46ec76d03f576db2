//! An in-memory [`FileSystem`](super::FileSystem).
//!
//! Entries are kept as [`Node`]s in a slab, indexed by their inode. A
//! directory node lists the inodes of its children in insertion order, which
//! is also the order [`list`](super::FileSystem::list) reports them in.

mod filesystem;

pub use self::filesystem::MemFileSystem;

use super::FileRef;

type Inode = usize;

/// The inode of the root directory. It is created with the filesystem and
/// can never be removed.
const ROOT_INODE: Inode = 0;

/// Maximum number of symbolic links followed while resolving one path.
pub const MAX_SYMLINKS: usize = 40;

#[derive(Debug)]
struct Node {
    inode: Inode,
    name: String,
    file: FileRef,
    /// Only ever non-empty for directories.
    children: Vec<Inode>,
}
