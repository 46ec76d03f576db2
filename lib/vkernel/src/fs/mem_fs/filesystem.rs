//! This module contains the [`MemFileSystem`] type itself.

use std::{
    fmt,
    path::{Component, Path, PathBuf},
    sync::Arc,
};

use parking_lot::RwLock;
use slab::Slab;

use super::{Inode, MAX_SYMLINKS, Node, ROOT_INODE};
use crate::fs::{File, FileKind, FileRef, FileSystem, FsError, Result, split_parent};

/// The in-memory file system!
///
/// This type can be cloned, it's a light copy of the `FileSystemInner`
/// (which is behind an `Arc` + `RwLock`).
#[derive(Clone, Default)]
pub struct MemFileSystem {
    inner: Arc<RwLock<FileSystemInner>>,
}

impl MemFileSystem {
    /// Mounts `target` at `path`. Everything below `path` is then looked up
    /// in `target`, relative to its root.
    pub fn mount(&self, path: &Path, target: Arc<dyn FileSystem>) -> Result<()> {
        let path = canonical_path(path)?;
        let (parent, name) = split_parent(&path)?;
        self.create(parent, name, File::filesystem(target))?;
        Ok(())
    }
}

impl FileSystem for MemFileSystem {
    fn get(&self, path: &Path, follow_links: bool) -> Result<FileRef> {
        let inner = self.inner.read();
        match inner.resolve(path, follow_links)? {
            InodeResolution::Found(inode) => Ok(inner.node(inode)?.file.clone()),
            InodeResolution::Redirect(fs, path) => {
                drop(inner);
                fs.get(&path, follow_links)
            }
        }
    }

    fn create(&self, parent: &Path, name: &str, file: File) -> Result<FileRef> {
        validate_name(name)?;

        let mut inner = self.inner.write();
        let inode_of_parent = match inner.resolve(parent, true)? {
            InodeResolution::Found(inode) => inode,
            InodeResolution::Redirect(fs, path) => {
                drop(inner);
                return fs.create(&path, name, file);
            }
        };

        if let Some(target) = inner.mount_target(inode_of_parent)? {
            drop(inner);
            return target.create(Path::new("/"), name, file);
        }

        let parent_node = inner.node(inode_of_parent)?;
        if inner.child_of(parent_node, name).is_ok() {
            return Err(FsError::AlreadyExists);
        }

        let file: FileRef = Arc::new(RwLock::new(file));
        let inode = inner.storage.vacant_key();
        inner.storage.insert(Node {
            inode,
            name: name.to_string(),
            file: file.clone(),
            children: Vec::new(),
        });
        inner.add_child_to_node(inode_of_parent, inode)?;

        Ok(file)
    }

    fn delete(&self, path: &Path, recursive: bool) -> Result<()> {
        let path = canonical_path(path)?;
        let (parent, name) = split_parent(&path)?;

        let mut inner = self.inner.write();
        let inode_of_parent = match inner.resolve(parent, true)? {
            InodeResolution::Found(inode) => inode,
            InodeResolution::Redirect(fs, parent) => {
                drop(inner);
                return fs.delete(&parent.join(name), recursive);
            }
        };

        if let Some(target) = inner.mount_target(inode_of_parent)? {
            drop(inner);
            return target.delete(&Path::new("/").join(name), recursive);
        }

        let parent_node = inner.node(inode_of_parent)?;
        let child = inner.child_of(parent_node, name)?;
        if !recursive && !child.children.is_empty() {
            return Err(FsError::DirectoryNotEmpty);
        }
        let inode = child.inode;

        inner.remove_child_from_node(inode_of_parent, inode)?;
        inner.remove_subtree(inode);

        Ok(())
    }

    fn list(&self, path: &Path) -> Result<Vec<String>> {
        let inner = self.inner.read();
        let inode = match inner.resolve(path, true)? {
            InodeResolution::Found(inode) => inode,
            InodeResolution::Redirect(fs, path) => {
                drop(inner);
                return fs.list(&path);
            }
        };

        if let Some(target) = inner.mount_target(inode)? {
            drop(inner);
            return target.list(Path::new("/"));
        }

        let node = inner.node(inode)?;
        if !node.file.read().is_directory() {
            return Err(FsError::BaseNotDirectory);
        }

        Ok(node
            .children
            .iter()
            .filter_map(|inode| inner.storage.get(*inode))
            .map(|child| child.name.clone())
            .collect())
    }
}

impl fmt::Debug for MemFileSystem {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fs: &FileSystemInner = &self.inner.read();

        fmt::Debug::fmt(fs, formatter)
    }
}

/// The core of the file system. It contains a collection of `Node`s,
/// indexed by their respective `Inode` in a slab.
struct FileSystemInner {
    storage: Slab<Node>,
}

impl Default for FileSystemInner {
    fn default() -> Self {
        let mut storage = Slab::new();
        let inode = storage.vacant_key();
        storage.insert(Node {
            inode,
            name: "/".to_string(),
            file: Arc::new(RwLock::new(File::directory())),
            children: Vec::new(),
        });
        debug_assert_eq!(inode, ROOT_INODE);

        Self { storage }
    }
}

#[derive(Debug)]
enum InodeResolution {
    Found(Inode),
    Redirect(Arc<dyn FileSystem>, PathBuf),
}

/// One pass over a path.
enum Step {
    Found(Inode),
    Redirect(Arc<dyn FileSystem>, PathBuf),
    /// A symbolic link was hit; resolution starts over from this path.
    Link(PathBuf),
}

impl FileSystemInner {
    fn node(&self, inode: Inode) -> Result<&Node> {
        self.storage.get(inode).ok_or(FsError::IOError)
    }

    /// Resolves a path to an inode, following symbolic links. Crossing a
    /// mount point hands the rest of the path over to the mounted
    /// filesystem.
    fn resolve(&self, path: &Path, follow_links: bool) -> Result<InodeResolution> {
        let mut components = canonical_components(path)?;

        for _ in 0..=MAX_SYMLINKS {
            match self.walk(&components, follow_links)? {
                Step::Found(inode) => return Ok(InodeResolution::Found(inode)),
                Step::Redirect(fs, path) => return Ok(InodeResolution::Redirect(fs, path)),
                Step::Link(next) => components = canonical_components(&next)?,
            }
        }

        Err(FsError::TooManySymlinks)
    }

    fn walk(&self, components: &[String], follow_links: bool) -> Result<Step> {
        let mut inode = ROOT_INODE;

        for (depth, name) in components.iter().enumerate() {
            if let Some(target) = self.mount_target(inode)? {
                return Ok(Step::Redirect(target, join_absolute(&components[depth..])));
            }

            let child = self.child_of(self.node(inode)?, name)?;
            let is_last = depth + 1 == components.len();

            if !is_last || follow_links {
                if let FileKind::SymbolicLink { target } = &child.file.read().kind {
                    let mut next = if target.starts_with('/') {
                        PathBuf::from(target)
                    } else {
                        join_absolute(&components[..depth]).join(target)
                    };
                    next.extend(&components[depth + 1..]);
                    return Ok(Step::Link(next));
                }
            }

            inode = child.inode;
        }

        Ok(Step::Found(inode))
    }

    /// The filesystem mounted at `inode`, if it is a mount point.
    fn mount_target(&self, inode: Inode) -> Result<Option<Arc<dyn FileSystem>>> {
        match &self.node(inode)?.file.read().kind {
            FileKind::Filesystem { target } => Ok(Some(target.clone())),
            _ => Ok(None),
        }
    }

    /// Looks `name` up among the children of the directory `parent`.
    fn child_of(&self, parent: &Node, name: &str) -> Result<&Node> {
        if !parent.file.read().is_directory() {
            return Err(FsError::BaseNotDirectory);
        }

        parent
            .children
            .iter()
            .filter_map(|inode| self.storage.get(*inode))
            .find(|child| child.name == name)
            .ok_or(FsError::EntryNotFound)
    }

    /// Add a child to a directory node represented by `inode`.
    fn add_child_to_node(&mut self, inode: Inode, new_child: Inode) -> Result<()> {
        let node = self.storage.get_mut(inode).ok_or(FsError::IOError)?;
        node.children.push(new_child);

        Ok(())
    }

    /// Remove `child` from the children of the directory node `inode`.
    fn remove_child_from_node(&mut self, inode: Inode, child: Inode) -> Result<()> {
        let node = self.storage.get_mut(inode).ok_or(FsError::IOError)?;
        let position = node
            .children
            .iter()
            .position(|inode| *inode == child)
            .ok_or(FsError::EntryNotFound)?;
        node.children.remove(position);

        Ok(())
    }

    /// Drops `inode` and everything below it, flagging every file as deleted
    /// for the handles still out there.
    fn remove_subtree(&mut self, inode: Inode) {
        let mut remaining = vec![inode];

        while let Some(inode) = remaining.pop() {
            if let Some(node) = self.storage.try_remove(inode) {
                node.file.write().deleted = true;
                remaining.extend(node.children);
            }
        }
    }
}

impl fmt::Debug for FileSystemInner {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            formatter,
            "\n{inode:<8}    {ty:<6}    name",
            inode = "inode",
            ty = "type",
        )?;

        fn debug(
            inodes: &[Inode],
            slf: &FileSystemInner,
            formatter: &mut fmt::Formatter<'_>,
            indentation: usize,
        ) -> fmt::Result {
            for node in inodes.iter().filter_map(|inode| slf.storage.get(*inode)) {
                let ty = match node.file.read().kind {
                    FileKind::Regular { .. } => "file",
                    FileKind::Executable { .. } => "exec",
                    FileKind::Device(_) => "device",
                    FileKind::SymbolicLink { .. } => "link",
                    FileKind::Filesystem { .. } => "mount",
                    FileKind::Directory => "dir",
                };

                writeln!(
                    formatter,
                    "{inode:<8}    {ty:<6}   {indentation_symbol:indentation_width$}{name}",
                    inode = node.inode,
                    name = node.name,
                    indentation_symbol = " ",
                    indentation_width = indentation * 2 + 1,
                )?;

                debug(&node.children, slf, formatter, indentation + 1)?;
            }

            Ok(())
        }

        debug(&[ROOT_INODE], self, formatter, 0)
    }
}

fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() || name == "." || name == ".." || name.contains('/') {
        return Err(FsError::InvalidInput);
    }

    Ok(())
}

/// Splits an absolute path into normalized components. `.` is dropped and
/// `..` pops the previous component; `..` at the root stays at the root.
fn canonical_components(path: &Path) -> Result<Vec<String>> {
    let mut components = path.components();

    match components.next() {
        Some(Component::RootDir) => {}
        _ => return Err(FsError::InvalidInput),
    }

    let mut names = Vec::new();
    for component in components {
        match component {
            Component::CurDir => (),
            Component::ParentDir => {
                names.pop();
            }
            Component::Normal(name) => {
                let name = name.to_str().ok_or(FsError::InvalidInput)?;
                names.push(name.to_string());
            }
            Component::RootDir | Component::Prefix(_) => return Err(FsError::InvalidInput),
        }
    }

    Ok(names)
}

fn canonical_path(path: &Path) -> Result<PathBuf> {
    Ok(join_absolute(&canonical_components(path)?))
}

fn join_absolute(components: &[String]) -> PathBuf {
    let mut path = PathBuf::from("/");
    path.extend(components);
    path
}
