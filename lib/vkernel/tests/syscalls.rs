mod common;

use std::{path::Path, sync::Arc};

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use vkernel::{
    Entrypoint, Errno, OpenFlags, ProgramContext, UnlinkFlags,
    fs::{EXECUTABLE_PLACEHOLDER, File, FileSystem, MemFileSystem},
};

use common::Machine;

fn read_write() -> OpenFlags {
    OpenFlags::READ | OpenFlags::WRITE
}

#[derive(Debug)]
struct Idle;

#[async_trait]
impl Entrypoint for Idle {
    async fn on_start(&self, _ctx: &mut ProgramContext<'_>) -> Result<(), Errno> {
        Ok(())
    }
}

#[tokio::test]
async fn open_with_write_creates_an_empty_file() {
    let machine = Machine::new();
    let mut process = machine.user_process("touch", 1000, 1000);

    let fd = process.open("/tmp/new", OpenFlags::WRITE).unwrap();
    assert_eq!(fd, 0);

    let stat = process.stat("/tmp/new").unwrap();
    assert_eq!(stat.mode, 0o100644);
    assert_eq!((stat.owner, stat.group), (1000, 1000));
    assert_eq!(stat.size, 0);

    let file = machine.fs.get(Path::new("/tmp/new"), true).unwrap();
    match &file.read().kind {
        vkernel::fs::FileKind::Regular { data } => assert!(data.is_empty()),
        other => panic!("unexpected kind: {other:?}"),
    }
}

#[tokio::test]
async fn open_under_read_only_parent_is_denied() {
    let machine = Machine::new();
    let mut process = machine.user_process("touch", 1000, 1000);

    assert_eq!(
        process.open("/etc/passwd", OpenFlags::WRITE),
        Err(Errno::AccessDenied)
    );
    assert!(!process.readdir("/etc").unwrap().contains(&"passwd".to_string()));
}

#[tokio::test]
async fn open_missing_file_for_reading_fails() {
    let machine = Machine::new();
    let mut process = machine.process("cat");

    assert_eq!(
        process.open("/tmp/missing", OpenFlags::READ),
        Err(Errno::NotFound)
    );
}

#[tokio::test]
async fn open_checks_file_permissions() {
    let machine = Machine::new();
    let mut root = machine.process("root");
    let fd = root.open("/tmp/secret", OpenFlags::WRITE).unwrap();
    root.write(fd, b"hush", None).unwrap();
    root.chmod("/tmp/secret", 0o600).unwrap();

    let mut user = machine.user_process("user", 1000, 1000);
    assert_eq!(user.open("/tmp/secret", OpenFlags::READ), Err(Errno::AccessDenied));
    assert_eq!(user.open("/tmp/secret", OpenFlags::WRITE), Err(Errno::AccessDenied));
    assert_eq!(user.open("/tmp", OpenFlags::READ), Err(Errno::IsADirectory));
}

#[tokio::test]
async fn write_inserts_at_the_cursor() {
    let machine = Machine::new();
    let mut process = machine.process("editor");
    let fd = process.open("/tmp/file", read_write()).unwrap();

    assert_eq!(process.write(fd, b"AB", None), Ok(2));
    process.seek(fd, 0).unwrap();
    assert_eq!(process.read(fd, None).await.unwrap(), b"AB");

    process.seek(fd, 1).unwrap();
    assert_eq!(process.write(fd, b"X", None), Ok(1));
    process.seek(fd, 0).unwrap();
    assert_eq!(process.read(fd, None).await.unwrap(), b"AXB");
}

#[tokio::test]
async fn read_and_write_honour_count() {
    let machine = Machine::new();
    let mut process = machine.process("dd");
    let fd = process.open("/tmp/file", read_write()).unwrap();

    assert_eq!(process.write(fd, b"abcdef", Some(4)), Ok(4));
    process.seek(fd, 0).unwrap();
    assert_eq!(process.read(fd, Some(3)).await.unwrap(), b"abc");
    assert_eq!(process.read(fd, Some(3)).await.unwrap(), b"d");
    assert_eq!(process.read(fd, Some(3)).await.unwrap(), b"");

    // Past the end, writes append.
    process.seek(fd, 100).unwrap();
    process.write(fd, b"!", None).unwrap();
    process.seek(fd, 0).unwrap();
    assert_eq!(process.read(fd, None).await.unwrap(), b"abcd!");
}

#[tokio::test]
async fn closed_descriptors_are_bad() {
    let machine = Machine::new();
    let mut process = machine.process("cat");
    let fd = process.open("/tmp/file", read_write()).unwrap();

    process.close(fd).unwrap();

    assert_eq!(process.read(fd, None).await, Err(Errno::BadFileDescriptor));
    assert_eq!(process.write(fd, b"x", None), Err(Errno::BadFileDescriptor));
    assert_eq!(process.seek(fd, 0), Err(Errno::BadFileDescriptor));
    assert_eq!(process.close(fd), Err(Errno::BadFileDescriptor));
    assert_eq!(process.fstat(fd), Err(Errno::BadFileDescriptor));
}

#[tokio::test]
async fn descriptors_enforce_their_open_flags() {
    let machine = Machine::new();
    let mut process = machine.process("cat");
    let write_only = process.open("/tmp/file", OpenFlags::WRITE).unwrap();
    let read_only = process.open("/tmp/file", OpenFlags::READ).unwrap();

    assert_eq!(
        process.read(write_only, None).await,
        Err(Errno::BadFileDescriptor)
    );
    assert_eq!(
        process.write(read_only, b"x", None),
        Err(Errno::BadFileDescriptor)
    );
}

#[tokio::test]
async fn descriptor_numbers_are_max_plus_one() {
    let machine = Machine::new();
    let mut process = machine.process("sh");

    let fds: Vec<_> = (0..3)
        .map(|_| process.open("/tmp/file", OpenFlags::WRITE).unwrap())
        .collect();
    assert_eq!(fds, vec![0, 1, 2]);

    process.close(1).unwrap();
    assert_eq!(process.open("/tmp/file", OpenFlags::WRITE), Ok(3));
}

#[tokio::test]
async fn descriptor_links_follow_the_table() {
    let machine = Machine::new();
    let mut process = machine.process("sh");
    let pid = process.getpid();

    let fd = process.open("/tmp/file", OpenFlags::WRITE).unwrap();
    let link = format!("/proc/{pid}/fd/{fd}");
    assert_eq!(process.readlink(&link).unwrap(), "/tmp/file");
    assert_eq!(process.lstat(&link).unwrap().mode, 0o120777);

    process.close(fd).unwrap();
    assert_eq!(process.readlink(&link), Err(Errno::NotFound));
}

#[tokio::test]
async fn descriptors_see_replaced_files() {
    let machine = Machine::new();
    let mut process = machine.process("tail");

    let fd = process.open("/tmp/log", OpenFlags::WRITE).unwrap();
    process.write(fd, b"old", None).unwrap();
    process.close(fd).unwrap();

    let reader = process.open("/tmp/log", OpenFlags::READ).unwrap();
    assert_eq!(process.read(reader, Some(1)).await.unwrap(), b"o");

    process.unlink("/tmp/log", UnlinkFlags::empty()).unwrap();
    let fd = process.open("/tmp/log", OpenFlags::WRITE).unwrap();
    process.write(fd, b"NEW", None).unwrap();
    process.close(fd).unwrap();

    assert_eq!(process.read(reader, None).await.unwrap(), b"EW");
}

#[tokio::test]
async fn executables_read_back_a_placeholder_and_reject_writes() {
    let machine = Machine::new();
    machine
        .fs
        .create(Path::new("/bin"), "idle", File::executable(Arc::new(Idle)))
        .unwrap();
    let mut process = machine.process("hexdump");

    let fd = process.open("/bin/idle", OpenFlags::READ).unwrap();
    assert_eq!(process.read(fd, None).await.unwrap(), EXECUTABLE_PLACEHOLDER);

    let fd = process.open("/bin/idle", OpenFlags::WRITE).unwrap();
    assert_eq!(process.write(fd, b"patch", None), Err(Errno::IoError));

    assert_eq!(process.stat("/bin/idle").unwrap().mode, 0o100755);
}

#[tokio::test]
async fn terminal_reads_and_writes() {
    let machine = Machine::new();
    let mut process = machine.process("getty");
    let stdin = process.open("/dev/tty", OpenFlags::READ).unwrap();
    let stdout = process.open("/dev/tty", OpenFlags::WRITE).unwrap();

    machine.input.send("typed").unwrap();
    assert_eq!(process.read(stdin, None).await.unwrap(), b"typed");

    process.write(stdout, b"login: ", None).unwrap();
    assert_eq!(machine.terminal.take_output_string(), "login: ");

    assert_eq!(process.stat("/dev/tty").unwrap().mode, 0o020666);
    assert_eq!(process.fstat(stdin).unwrap().mode, 0o020666);
}

#[tokio::test]
async fn stat_follows_links_and_lstat_does_not() {
    let machine = Machine::new();
    let mut process = machine.process("ls");
    process.open("/tmp/target", OpenFlags::WRITE).unwrap();
    process.symlink("/tmp/target", "/tmp/link").unwrap();

    assert_eq!(process.stat("/tmp/link").unwrap().mode, 0o100644);
    assert_eq!(process.lstat("/tmp/link").unwrap().mode, 0o120777);
    assert_eq!(process.readlink("/tmp/link").unwrap(), "/tmp/target");
    assert_eq!(process.readlink("/tmp/target"), Err(Errno::InvalidArgument));
    assert_eq!(process.stat("/tmp/nothing"), Err(Errno::NotFound));
}

#[tokio::test]
async fn symlink_loops_are_reported() {
    let machine = Machine::new();
    let process = machine.process("ls");
    process.symlink("/tmp/b", "/tmp/a").unwrap();
    process.symlink("/tmp/a", "/tmp/b").unwrap();

    assert_eq!(process.stat("/tmp/a"), Err(Errno::SymlinkLoop));
}

#[tokio::test]
async fn unlink_only_removes_directories_when_asked() {
    let machine = Machine::new();
    let mut process = machine.process("rm");
    process.mkdir("/tmp/dir", 0o755, false).unwrap();
    process.open("/tmp/dir/file", OpenFlags::WRITE).unwrap();
    process.open("/tmp/plain", OpenFlags::WRITE).unwrap();

    assert_eq!(
        process.unlink("/tmp/dir", UnlinkFlags::empty()),
        Err(Errno::IsADirectory)
    );
    assert_eq!(
        process.unlink("/tmp/plain", UnlinkFlags::REMOVE_DIR),
        Err(Errno::NotADirectory)
    );

    process.unlink("/tmp/dir", UnlinkFlags::REMOVE_DIR).unwrap();
    process.unlink("/tmp/plain", UnlinkFlags::empty()).unwrap();
    assert_eq!(process.readdir("/tmp").unwrap(), Vec::<String>::new());
    assert_eq!(
        process.unlink("/tmp/plain", UnlinkFlags::empty()),
        Err(Errno::NotFound)
    );
}

#[tokio::test]
async fn unlink_removes_the_link_not_its_target() {
    let machine = Machine::new();
    let mut process = machine.process("rm");
    process.mkdir("/tmp/dir", 0o755, false).unwrap();
    process.symlink("/tmp/dir", "/tmp/link").unwrap();

    process.unlink("/tmp/link", UnlinkFlags::empty()).unwrap();
    assert_eq!(process.readdir("/tmp").unwrap(), vec!["dir".to_string()]);
}

#[tokio::test]
async fn recursive_mkdir_creates_each_ancestor_once() {
    let machine = Machine::new();
    let process = machine.process("mkdir");

    assert_eq!(process.mkdir("/tmp/a/b/c", 0o700, false), Err(Errno::NotFound));
    process.mkdir("/tmp/a/b/c", 0o700, true).unwrap();

    assert_eq!(process.readdir("/tmp").unwrap(), vec!["a".to_string()]);
    assert_eq!(process.readdir("/tmp/a").unwrap(), vec!["b".to_string()]);
    assert_eq!(process.readdir("/tmp/a/b").unwrap(), vec!["c".to_string()]);
    assert_eq!(process.stat("/tmp/a").unwrap().mode, 0o040755);
    assert_eq!(process.stat("/tmp/a/b/c").unwrap().mode, 0o040700);

    assert_eq!(
        process.mkdir("/tmp/a/b/c", 0o700, true),
        Err(Errno::AlreadyExists)
    );
}

#[tokio::test]
async fn mkdir_under_a_file_fails() {
    let machine = Machine::new();
    let mut process = machine.process("mkdir");
    process.open("/tmp/file", OpenFlags::WRITE).unwrap();

    assert_eq!(
        process.mkdir("/tmp/file/sub", 0o755, true),
        Err(Errno::NotADirectory)
    );
}

#[tokio::test]
async fn rmdir_requires_an_empty_directory() {
    let machine = Machine::new();
    let mut process = machine.process("rmdir");
    process.mkdir("/tmp/full", 0o755, false).unwrap();
    process.mkdir("/tmp/empty", 0o755, false).unwrap();
    process.open("/tmp/full/file", OpenFlags::WRITE).unwrap();

    assert_eq!(process.rmdir("/tmp/full"), Err(Errno::DirectoryNotEmpty));
    assert_eq!(process.rmdir("/tmp/full/file"), Err(Errno::NotADirectory));
    assert_eq!(process.rmdir("/tmp/empty"), Ok(()));
    assert_eq!(process.readdir("/tmp").unwrap(), vec!["full".to_string()]);
}

#[tokio::test]
async fn ownership_and_mode_changes() {
    let machine = Machine::new();
    let mut process = machine.process("chown");
    let fd = process.open("/tmp/file", OpenFlags::WRITE).unwrap();
    process.symlink("/tmp/file", "/tmp/link").unwrap();

    process.chown("/tmp/link", 5, 9).unwrap();
    let stat = process.stat("/tmp/file").unwrap();
    assert_eq!((stat.owner, stat.group), (5, 9));

    process.lchown("/tmp/link", 7, 7).unwrap();
    let stat = process.lstat("/tmp/link").unwrap();
    assert_eq!((stat.owner, stat.group), (7, 7));
    let stat = process.stat("/tmp/file").unwrap();
    assert_eq!((stat.owner, stat.group), (5, 9));

    process.fchown(fd, 1, 2).unwrap();
    assert_eq!(process.fstat(fd).unwrap().owner, 1);

    process.chmod("/tmp/file", 0o100600).unwrap();
    assert_eq!(process.stat("/tmp/file").unwrap().mode, 0o100600);
    process.fchmod(fd, 0o640).unwrap();
    assert_eq!(process.stat("/tmp/file").unwrap().mode, 0o100640);
}

#[tokio::test]
async fn path_operations_need_a_writable_parent() {
    let machine = Machine::new();
    let root = machine.process("root");
    root.mkdir("/etc/conf.d", 0o755, false).unwrap();

    let user = machine.user_process("user", 1000, 1000);
    assert_eq!(user.mkdir("/etc/mine", 0o755, false), Err(Errno::AccessDenied));
    assert_eq!(user.symlink("/tmp", "/etc/tmp"), Err(Errno::AccessDenied));
    assert_eq!(
        user.unlink("/etc/conf.d", UnlinkFlags::REMOVE_DIR),
        Err(Errno::AccessDenied)
    );
    assert_eq!(user.rmdir("/etc/conf.d"), Err(Errno::AccessDenied));

    user.mkdir("/tmp/mine", 0o755, false).unwrap();
    assert_eq!(user.stat("/tmp/mine").unwrap().owner, 1000);
}

#[tokio::test]
async fn readdir_needs_read_permission() {
    let machine = Machine::new();
    let root = machine.process("root");
    root.mkdir("/tmp/private", 0o700, false).unwrap();

    let user = machine.user_process("user", 1000, 1000);
    assert_eq!(user.readdir("/tmp/private"), Err(Errno::AccessDenied));
    assert_eq!(root.readdir("/tmp/private"), Ok(vec![]));
}

#[tokio::test]
async fn relative_paths_use_the_working_directory() {
    let machine = Machine::new();
    let mut process = machine.process("sh");
    assert_eq!(process.getcwd(), "/");

    process.chdir("home").unwrap();
    assert_eq!(process.getcwd(), "/home");
    assert_eq!(process.getenv("PWD"), Some("/home"));

    process.mkdir("user", 0o755, false).unwrap();
    process.chdir("./user/../user").unwrap();
    assert_eq!(process.getcwd(), "/home/user");

    let fd = process.open("notes.txt", OpenFlags::WRITE).unwrap();
    assert_eq!(process.fd_table().get(fd).unwrap().pathname, "/home/user/notes.txt");
    assert_eq!(process.absolute("../../.."), "/");

    assert_eq!(process.chdir("notes.txt"), Err(Errno::NotADirectory));
    assert_eq!(process.chdir("/nowhere"), Err(Errno::NotFound));
}

#[tokio::test]
async fn chdir_needs_search_permission() {
    let machine = Machine::new();
    let root = machine.process("root");
    root.mkdir("/tmp/locked", 0o600, false).unwrap();

    let mut user = machine.user_process("user", 1000, 1000);
    assert_eq!(user.chdir("/tmp/locked"), Err(Errno::AccessDenied));
    assert_eq!(user.getcwd(), "/");
}

#[tokio::test]
async fn mounted_filesystems_are_transparent() {
    let machine = Machine::new();
    let data = MemFileSystem::default();
    data.create(Path::new("/"), "readme", File::regular("hello"))
        .unwrap();
    machine
        .fs
        .mount(Path::new("/mnt"), Arc::new(data.clone()))
        .unwrap();

    let mut process = machine.process("sh");
    assert_eq!(process.readdir("/mnt").unwrap(), vec!["readme".to_string()]);
    assert_eq!(process.stat("/mnt").unwrap().mode, 0o040755);

    let fd = process.open("/mnt/readme", OpenFlags::READ).unwrap();
    assert_eq!(process.read(fd, None).await.unwrap(), b"hello");

    process.mkdir("/mnt/sub", 0o755, false).unwrap();
    assert!(data.get(Path::new("/sub"), true).unwrap().read().is_directory());
}

#[tokio::test]
async fn mount_points_are_unlinked_like_directories() {
    let machine = Machine::new();
    let data = MemFileSystem::default();
    data.create(Path::new("/"), "readme", File::regular("hello"))
        .unwrap();
    machine
        .fs
        .mount(Path::new("/mnt"), Arc::new(data.clone()))
        .unwrap();
    let process = machine.process("umount");

    assert_eq!(
        process.unlink("/mnt", UnlinkFlags::empty()),
        Err(Errno::IsADirectory)
    );
    assert_eq!(process.readdir("/mnt").unwrap(), vec!["readme".to_string()]);

    process.unlink("/mnt", UnlinkFlags::REMOVE_DIR).unwrap();
    assert_eq!(process.stat("/mnt"), Err(Errno::NotFound));
    assert!(data.get(Path::new("/readme"), true).is_ok());
}
