//! An emulated terminal device.
//!
//! Keystrokes are pushed in through a [`TerminalInput`] handle and whatever
//! programs write to the device piles up in an output buffer that the host
//! drains with [`Terminal::take_output`].

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex as AsyncMutex, mpsc};

use super::{Device, FsError, Result};

#[derive(Debug)]
pub struct Terminal {
    input: AsyncMutex<mpsc::UnboundedReceiver<Vec<u8>>>,
    output: parking_lot::Mutex<Vec<u8>>,
}

/// The keyboard end of a [`Terminal`]. Dropping it hangs the terminal up:
/// pending chunks are still delivered, after which reads report end of file.
#[derive(Debug, Clone)]
pub struct TerminalInput {
    tx: mpsc::UnboundedSender<Vec<u8>>,
}

impl Terminal {
    pub fn new() -> (Arc<Self>, TerminalInput) {
        let (tx, rx) = mpsc::unbounded_channel();
        let terminal = Self {
            input: AsyncMutex::new(rx),
            output: parking_lot::Mutex::new(Vec::new()),
        };
        (Arc::new(terminal), TerminalInput { tx })
    }

    /// Drains everything written to the terminal so far.
    pub fn take_output(&self) -> Vec<u8> {
        std::mem::take(&mut *self.output.lock())
    }

    /// Like [`take_output`](Self::take_output), decoded lossily.
    pub fn take_output_string(&self) -> String {
        String::from_utf8_lossy(&self.take_output()).into_owned()
    }
}

impl TerminalInput {
    /// Queues one chunk of raw input, as if it had been typed.
    pub fn send(&self, chunk: impl Into<Vec<u8>>) -> Result<()> {
        self.tx.send(chunk.into()).map_err(|_| FsError::IOError)
    }
}

#[async_trait]
impl Device for Terminal {
    async fn read(&self) -> Result<Vec<u8>> {
        let mut input = self.input.lock().await;
        match input.recv().await {
            Some(chunk) => Ok(chunk),
            None => {
                tracing::trace!("terminal hung up");
                Ok(Vec::new())
            }
        }
    }

    fn write(&self, buf: &[u8]) -> Result<usize> {
        self.output.lock().extend_from_slice(buf);
        Ok(buf.len())
    }
}
