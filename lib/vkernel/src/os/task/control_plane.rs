use std::{
    collections::HashSet,
    sync::{
        Arc,
        atomic::{AtomicU32, Ordering},
    },
};

use parking_lot::RwLock;

use super::ProcessId;

/// Hands out process ids and keeps track of which ones are in use.
///
/// Clones share the same state, so every process of a tree sees the same
/// counter.
#[derive(Debug, Clone)]
pub struct ControlPlane {
    /// The processes running on this machine
    processes: Arc<RwLock<HashSet<ProcessId>>>,
    /// Seed used to generate process ID's
    process_seed: Arc<AtomicU32>,
}

impl Default for ControlPlane {
    fn default() -> Self {
        Self {
            processes: Default::default(),
            process_seed: Arc::new(AtomicU32::new(1)),
        }
    }
}

impl ControlPlane {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserves a PID and returns it.
    ///
    /// Ids increase monotonically. Once the counter wraps, ids still held by
    /// a live process are skipped; 0 is never handed out.
    pub fn reserve_pid(&self) -> ProcessId {
        loop {
            let raw = self.process_seed.fetch_add(1, Ordering::AcqRel);
            if raw == 0 {
                continue;
            }

            let pid = ProcessId::from(raw);
            if self.processes.write().insert(pid) {
                tracing::trace!(%pid, "reserved pid");
                return pid;
            }
        }
    }

    /// Returns a PID to the pool.
    pub fn release(&self, pid: ProcessId) {
        self.processes.write().remove(&pid);
    }

    pub fn is_running(&self, pid: ProcessId) -> bool {
        self.processes.read().contains(&pid)
    }

    /// Number of PIDs currently reserved.
    pub fn active_processes(&self) -> usize {
        self.processes.read().len()
    }
}
