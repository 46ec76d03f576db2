use std::sync::Arc;

use super::{Device, FileSystem};
use crate::os::exec::Entrypoint;

/// What an executable without a stored image reads back as.
pub const EXECUTABLE_PLACEHOLDER: &[u8] = b"\x7fELF\x02\x01\x01\0vkernel builtin\n";

/// File type bits, as found in the upper bits of `st_mode`.
const S_IFREG: u32 = 0o100000;
const S_IFDIR: u32 = 0o040000;
const S_IFLNK: u32 = 0o120000;
const S_IFCHR: u32 = 0o020000;

/// A stored file: ownership and permission bits plus a kind-specific payload.
#[derive(Debug)]
pub struct File {
    /// Permission bits, `owner << 6 | group << 3 | other`.
    pub mode: u32,
    pub owner: u32,
    pub group: u32,
    /// Set by the storage backend once the entry has been removed.
    pub deleted: bool,
    pub kind: FileKind,
}

#[derive(Debug)]
pub enum FileKind {
    Regular {
        data: Vec<u8>,
    },
    /// A program. `data` is filled with a placeholder image the first time
    /// the file is read.
    Executable {
        data: Option<Vec<u8>>,
        entrypoint: Arc<dyn Entrypoint>,
    },
    Device(Arc<dyn Device>),
    SymbolicLink {
        target: String,
    },
    /// A mount point; paths below it resolve inside `target`.
    Filesystem {
        target: Arc<dyn FileSystem>,
    },
    /// Children are tracked by the storage backend.
    Directory,
}

/// What `stat` and friends report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stat {
    /// File type bits and permission bits.
    pub mode: u32,
    pub owner: u32,
    pub group: u32,
    /// Always 0.
    pub size: u64,
}

impl File {
    pub fn new(kind: FileKind, mode: u32) -> Self {
        Self {
            mode,
            owner: 0,
            group: 0,
            deleted: false,
            kind,
        }
    }

    pub fn regular(data: impl Into<Vec<u8>>) -> Self {
        Self::new(FileKind::Regular { data: data.into() }, 0o644)
    }

    pub fn executable(entrypoint: Arc<dyn Entrypoint>) -> Self {
        Self::new(
            FileKind::Executable {
                data: None,
                entrypoint,
            },
            0o755,
        )
    }

    pub fn device(device: Arc<dyn Device>) -> Self {
        Self::new(FileKind::Device(device), 0o666)
    }

    pub fn symlink(target: impl Into<String>) -> Self {
        Self::new(
            FileKind::SymbolicLink {
                target: target.into(),
            },
            0o777,
        )
    }

    pub fn filesystem(target: Arc<dyn FileSystem>) -> Self {
        Self::new(FileKind::Filesystem { target }, 0o755)
    }

    pub fn directory() -> Self {
        Self::new(FileKind::Directory, 0o755)
    }

    pub fn with_mode(mut self, mode: u32) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_owner(mut self, owner: u32, group: u32) -> Self {
        self.owner = owner;
        self.group = group;
        self
    }

    pub fn is_regular_file(&self) -> bool {
        matches!(self.kind, FileKind::Regular { .. })
    }

    pub fn is_executable(&self) -> bool {
        matches!(self.kind, FileKind::Executable { .. })
    }

    pub fn is_device(&self) -> bool {
        matches!(self.kind, FileKind::Device(_))
    }

    pub fn is_symlink(&self) -> bool {
        matches!(self.kind, FileKind::SymbolicLink { .. })
    }

    pub fn is_filesystem(&self) -> bool {
        matches!(self.kind, FileKind::Filesystem { .. })
    }

    pub fn is_directory(&self) -> bool {
        matches!(self.kind, FileKind::Directory)
    }

    fn type_bits(&self) -> u32 {
        match self.kind {
            FileKind::Regular { .. } | FileKind::Executable { .. } => S_IFREG,
            FileKind::Directory | FileKind::Filesystem { .. } => S_IFDIR,
            FileKind::SymbolicLink { .. } => S_IFLNK,
            FileKind::Device(_) => S_IFCHR,
        }
    }

    pub fn stat(&self) -> Stat {
        Stat {
            mode: self.type_bits() | (self.mode & 0o7777),
            owner: self.owner,
            group: self.group,
            size: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::{
        errno::Errno,
        fs::{MemFileSystem, Terminal},
        os::exec::ProgramContext,
    };

    #[derive(Debug)]
    struct Noop;

    #[async_trait]
    impl Entrypoint for Noop {
        async fn on_start(&self, _ctx: &mut ProgramContext<'_>) -> Result<(), Errno> {
            Ok(())
        }
    }

    fn predicates(file: &File) -> [bool; 6] {
        [
            file.is_regular_file(),
            file.is_executable(),
            file.is_device(),
            file.is_symlink(),
            file.is_filesystem(),
            file.is_directory(),
        ]
    }

    #[test]
    fn exactly_one_kind_predicate_holds() {
        let (terminal, _input) = Terminal::new();
        let files = [
            File::regular("data"),
            File::executable(Arc::new(Noop)),
            File::device(terminal),
            File::symlink("/etc"),
            File::filesystem(Arc::new(MemFileSystem::default())),
            File::directory(),
        ];

        for (i, file) in files.iter().enumerate() {
            let holds = predicates(file);
            assert_eq!(holds.iter().filter(|h| **h).count(), 1, "{file:?}");
            assert!(holds[i], "{file:?}");
        }
    }

    #[test]
    fn stat_combines_type_and_permission_bits() {
        let file = File::regular("abc").with_mode(0o640).with_owner(5, 9);
        assert_eq!(
            file.stat(),
            Stat {
                mode: 0o100640,
                owner: 5,
                group: 9,
                size: 0,
            }
        );
        assert_eq!(File::directory().stat().mode, 0o040755);
        assert_eq!(File::symlink("x").stat().mode, 0o120777);
        let (terminal, _input) = Terminal::new();
        assert_eq!(File::device(terminal).stat().mode, 0o020666);
    }
}
