use std::{fmt, sync::Arc};

use crate::{
    config::SystemConfig,
    fs::FileSystem,
    os::task::{ControlPlane, ProcessId},
};

/// The machine processes run on: where they store files, who they are and
/// where their ids come from.
pub trait Runtime
where
    Self: fmt::Debug + Send + Sync,
{
    /// Allocates process ids for every process of this runtime.
    fn control_plane(&self) -> &ControlPlane;

    fn config(&self) -> &SystemConfig;

    /// Opens the storage session a new process works against.
    fn session(&self, pid: ProcessId) -> Arc<dyn FileSystem>;
}

/// A [`Runtime`] assembled from parts, all processes sharing one filesystem.
#[derive(Debug, Clone)]
pub struct PluggableRuntime {
    pub control_plane: ControlPlane,
    pub config: SystemConfig,
    pub fs: Arc<dyn FileSystem>,
}

impl PluggableRuntime {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self {
            control_plane: ControlPlane::new(),
            config: SystemConfig::default(),
            fs,
        }
    }

    pub fn set_config(&mut self, config: SystemConfig) -> &mut Self {
        self.config = config;
        self
    }

    pub fn set_control_plane(&mut self, control_plane: ControlPlane) -> &mut Self {
        self.control_plane = control_plane;
        self
    }
}

impl Runtime for PluggableRuntime {
    fn control_plane(&self) -> &ControlPlane {
        &self.control_plane
    }

    fn config(&self) -> &SystemConfig {
        &self.config
    }

    fn session(&self, pid: ProcessId) -> Arc<dyn FileSystem> {
        tracing::trace!(%pid, "opening storage session");
        self.fs.clone()
    }
}
