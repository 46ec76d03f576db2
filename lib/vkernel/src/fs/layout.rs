use std::{path::Path, sync::Arc};

use super::{Device, File, FileSystem, MemFileSystem, Result};

const DIRECTORIES: &[(&str, u32)] = &[
    ("bin", 0o755),
    ("dev", 0o755),
    ("etc", 0o755),
    ("home", 0o755),
    ("proc", 0o755),
    ("tmp", 0o777),
];

/// Lays out the conventional top-level tree in a fresh in-memory filesystem,
/// with `tty` installed as `/dev/tty`. Everything is owned by root.
pub fn build_default_fs(tty: Arc<dyn Device>) -> Result<MemFileSystem> {
    let fs = MemFileSystem::default();
    let root = Path::new("/");

    for (name, mode) in DIRECTORIES {
        fs.create(root, name, File::directory().with_mode(*mode))?;
    }
    fs.create(Path::new("/dev"), "tty", File::device(tty).with_mode(0o666))?;

    tracing::debug!(?fs, "default filesystem ready");

    Ok(fs)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::fs::Terminal;

    #[test]
    fn default_tree() {
        let (terminal, _input) = Terminal::new();
        let fs = build_default_fs(terminal).unwrap();

        assert_eq!(
            fs.list(Path::new("/")).unwrap(),
            ["bin", "dev", "etc", "home", "proc", "tmp"]
        );

        let tty = fs.get(Path::new("/dev/tty"), true).unwrap();
        let tty = tty.read();
        assert!(tty.is_device());
        assert_eq!(tty.mode, 0o666);
        assert_eq!((tty.owner, tty.group), (0, 0));

        assert_eq!(fs.get(Path::new("/tmp"), true).unwrap().read().mode, 0o777);
    }
}
