//! What an executable gets to work with once it is started.

use std::fmt;

use async_trait::async_trait;
use virtual_tty::{LineDiscipline, TtyMode};

use crate::{
    errno::{Errno, SyscallResult},
    os::{
        fd::{Fd, STDOUT},
        task::Process,
    },
};

/// The code behind an executable file.
#[async_trait]
pub trait Entrypoint: fmt::Debug + Send + Sync {
    /// Runs the program on behalf of the process in `ctx`. The process has
    /// already been renamed and given its arguments and environment.
    async fn on_start(&self, ctx: &mut ProgramContext<'_>) -> Result<(), Errno>;
}

/// The process an executable runs in, plus the capabilities it is handed.
#[derive(Debug)]
pub struct ProgramContext<'a> {
    process: &'a mut Process,
}

impl<'a> ProgramContext<'a> {
    pub(crate) fn new(process: &'a mut Process) -> Self {
        Self { process }
    }

    pub fn process(&self) -> &Process {
        &*self.process
    }

    pub fn process_mut(&mut self) -> &mut Process {
        &mut *self.process
    }

    pub fn io(&mut self) -> Io<'_> {
        Io {
            process: &mut *self.process,
        }
    }

    pub fn path(&self) -> PathCapability<'_> {
        PathCapability {
            process: &*self.process,
        }
    }
}

/// Text-level reads and writes on descriptors.
#[derive(Debug)]
pub struct Io<'a> {
    process: &'a mut Process,
}

impl Io<'_> {
    /// Reads text from `fd`.
    ///
    /// In line-buffered mode raw input is run through a fresh
    /// [`LineDiscipline`] until a full line has been entered (or the input
    /// ends), echoing edits to stdout when `mode.echo` is set. The line is
    /// returned without its newline.
    ///
    /// Otherwise a single chunk is read and returned as is.
    pub async fn read(&mut self, fd: Fd, mode: TtyMode) -> SyscallResult<String> {
        if !mode.line_buffered {
            let chunk = self.process.read(fd, None).await?;
            let text = String::from_utf8_lossy(&chunk).into_owned();
            if mode.echo && !text.is_empty() {
                self.process.write(STDOUT, text.as_bytes(), None)?;
            }
            return Ok(text);
        }

        let mut discipline = LineDiscipline::new();
        while !discipline.is_ended() {
            let chunk = self.process.read(fd, None).await?;
            if chunk.is_empty() {
                tracing::debug!(fd, "end of input before a full line");
                break;
            }

            let echo = discipline.process(&chunk);
            if mode.echo && !echo.is_empty() {
                self.process.write(STDOUT, echo.as_bytes(), None)?;
            }
        }

        Ok(discipline.line())
    }

    /// Writes `value` to `fd`, returning the number of bytes written.
    pub fn write(&mut self, value: &str, fd: Fd) -> SyscallResult<usize> {
        self.process.write(fd, value.as_bytes(), None)
    }
}

/// Path helpers bound to the process' working directory.
#[derive(Debug)]
pub struct PathCapability<'a> {
    process: &'a Process,
}

impl PathCapability<'_> {
    /// Resolves `path` against the working directory and normalizes it.
    pub fn absolute(&self, path: &str) -> String {
        self.process.absolute(path)
    }
}
