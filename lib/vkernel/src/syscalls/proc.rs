use std::{collections::HashMap, path::Path, sync::Arc};

use futures::future::BoxFuture;
use tracing::{Span, field, instrument};

use crate::{
    errno::{Errno, SyscallResult},
    fs::{Access, FileKind},
    os::{
        exec::{Entrypoint, ProgramContext},
        fd::OpenFlags,
        task::{Process, ProcessId},
    },
};

/// What `uname` reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Uname {
    pub hostname: String,
    pub os_name: String,
    pub os_version: String,
}

/// What resolving an `exec` target turned up.
enum Program {
    Native(Arc<dyn Entrypoint>),
    /// A regular file, which would need an interpreter.
    Script,
    NotExecutable,
}

impl Process {
    pub fn getpid(&self) -> ProcessId {
        self.pid
    }

    /// The parent's pid, [`ProcessId::NONE`] for a process that was not
    /// spawned.
    pub fn getppid(&self) -> ProcessId {
        self.ppid
    }

    /// Children currently running.
    pub fn children(&self) -> &[ProcessId] {
        &self.children
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn env(&self) -> &HashMap<String, String> {
        &self.env
    }

    pub fn getenv(&self, key: &str) -> Option<&str> {
        self.env.get(key).map(String::as_str)
    }

    pub fn setenv(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.env.insert(key.into(), value.into());
    }

    pub fn getuid(&self) -> u32 {
        self.uid
    }

    /// No privilege check is made.
    pub fn setuid(&mut self, uid: u32) {
        self.uid = uid;
    }

    pub fn getgid(&self) -> u32 {
        self.gid
    }

    /// No privilege check is made.
    pub fn setgid(&mut self, gid: u32) {
        self.gid = gid;
    }

    /// ### `uname()`
    pub fn uname(&self) -> Uname {
        let config = self.runtime.config();
        let lookup = |key: &str| config.lookup(key).unwrap_or_default().to_string();

        Uname {
            hostname: lookup("hostname"),
            os_name: lookup("os.name"),
            os_version: lookup("os.version"),
        }
    }

    /// ### `spawn()`
    /// Runs `body` as a new child process and returns what it returned.
    ///
    /// The child shares this process' storage session and copies its
    /// environment and credentials. It starts with the terminal open as
    /// descriptors 0 (read), 1 and 2 (write). This process' own descriptors
    /// are left untouched.
    ///
    /// ```no_run
    /// # use futures::FutureExt;
    /// # async fn demo(shell: &mut vkernel::Process) -> vkernel::SyscallResult<()> {
    /// let child = shell
    ///     .spawn(|child| async move { child.getpid() }.boxed())
    ///     .await?;
    /// assert_ne!(child, shell.getpid());
    /// # Ok(())
    /// # }
    /// ```
    #[instrument(level = "debug", skip_all, fields(pid = %self.pid, child = field::Empty))]
    pub async fn spawn<F, T>(&mut self, body: F) -> SyscallResult<T>
    where
        F: for<'a> FnOnce(&'a mut Process) -> BoxFuture<'a, T>,
    {
        let mut child = self.new_child();
        Span::current().record("child", child.pid.raw());

        let tty = self.runtime.config().tty_path.clone();
        for flags in [OpenFlags::READ, OpenFlags::WRITE, OpenFlags::WRITE] {
            if let Err(err) = child.open(&tty, flags) {
                child.exit();
                return Err(err);
            }
        }

        self.children.push(child.pid);
        let ret = body(&mut child).await;
        self.children.retain(|pid| *pid != child.pid);

        child.exit();
        Ok(ret)
    }

    /// ### `exec()`
    /// Runs the program at `pathname` in this process.
    ///
    /// The process takes the program's file name, `args` replaces its
    /// arguments and `env` is merged over its environment. Only executables
    /// can actually be run; anything else fails with
    /// [`Errno::LinkageError`].
    #[instrument(level = "debug", skip_all, fields(pid = %self.pid, %pathname), ret)]
    pub async fn exec(
        &mut self,
        pathname: &str,
        args: Vec<String>,
        env: HashMap<String, String>,
    ) -> SyscallResult<()> {
        let path = self.absolute(pathname);

        let program = {
            let file = self.lookup(&path, true)?;
            let file = file.read();
            if file.is_executable() || file.is_regular_file() {
                self.check_access(&file, Access::EXECUTE)?;
            }

            match &file.kind {
                FileKind::Executable { entrypoint, .. } => Program::Native(entrypoint.clone()),
                FileKind::Regular { .. } => Program::Script,
                _ => Program::NotExecutable,
            }
        };

        self.name = Path::new(&path)
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or(&path)
            .to_string();
        self.args = args;
        self.env.extend(env);

        match program {
            Program::Native(entrypoint) => {
                let mut ctx = ProgramContext::new(self);
                entrypoint.on_start(&mut ctx).await
            }
            Program::Script => {
                tracing::warn!(%path, "running scripts is not supported");
                Ok(())
            }
            Program::NotExecutable => Err(Errno::LinkageError),
        }
    }

    /// Releases what the process holds in storage: its descriptors and its
    /// `<proc_dir>/<pid>` directory. Also run on drop; calling it again is a
    /// no-op.
    pub fn exit(&mut self) {
        self.close_all();

        if let Err(error) = self.fs.delete(&self.proc_dir(), true) {
            tracing::trace!(pid = %self.pid, %error, "no process directory to remove");
        }
    }
}
