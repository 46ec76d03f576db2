#![allow(dead_code)]

use std::sync::Arc;

use vkernel::{
    PluggableRuntime, Process, SystemConfig,
    fs::{MemFileSystem, Terminal, TerminalInput, build_default_fs},
};

/// A freshly booted machine: the default tree, one terminal and a runtime.
pub struct Machine {
    pub fs: MemFileSystem,
    pub terminal: Arc<Terminal>,
    pub input: TerminalInput,
    pub runtime: Arc<PluggableRuntime>,
}

impl Machine {
    pub fn new() -> Self {
        Self::with_config(SystemConfig::default())
    }

    pub fn with_config(config: SystemConfig) -> Self {
        let (terminal, input) = Terminal::new();
        let fs = build_default_fs(terminal.clone()).unwrap();

        let mut runtime = PluggableRuntime::new(Arc::new(fs.clone()));
        runtime.set_config(config);

        Self {
            fs,
            terminal,
            input,
            runtime: Arc::new(runtime),
        }
    }

    /// A top-level process running as root.
    pub fn process(&self, name: &str) -> Process {
        Process::new(self.runtime.clone(), name)
    }

    /// A top-level process running as `uid`/`gid`.
    pub fn user_process(&self, name: &str, uid: u32, gid: u32) -> Process {
        let mut process = self.process(name);
        process.setuid(uid);
        process.setgid(gid);
        process
    }
}
