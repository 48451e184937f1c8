//! In-process transport.
//!
//! [`pair`] returns two connected endpoints; what one side sends, the other
//! receives, in order. Dropping or closing a sink ends the peer's source.

use bytes::Bytes;
use tokio::sync::mpsc;
use tracing::trace;

use crate::error::{Result, TransportError};
use crate::traits::{FrameSink, FrameSource};

/// Sending half of an in-memory endpoint.
#[derive(Debug)]
pub struct MemorySink {
    tx: Option<mpsc::UnboundedSender<Bytes>>,
}

/// Receiving half of an in-memory endpoint.
#[derive(Debug)]
pub struct MemorySource {
    rx: mpsc::UnboundedReceiver<Bytes>,
}

/// One side of a connected pair.
#[derive(Debug)]
pub struct MemoryEndpoint {
    pub sink: MemorySink,
    pub source: MemorySource,
}

impl MemoryEndpoint {
    pub fn into_split(self) -> (MemorySink, MemorySource) {
        (self.sink, self.source)
    }
}

/// Create two connected endpoints.
pub fn pair() -> (MemoryEndpoint, MemoryEndpoint) {
    let (a_tx, a_rx) = mpsc::unbounded_channel();
    let (b_tx, b_rx) = mpsc::unbounded_channel();
    (
        MemoryEndpoint {
            sink: MemorySink { tx: Some(a_tx) },
            source: MemorySource { rx: b_rx },
        },
        MemoryEndpoint {
            sink: MemorySink { tx: Some(b_tx) },
            source: MemorySource { rx: a_rx },
        },
    )
}

impl MemorySink {
    /// Send without awaiting. Useful from synchronous test code.
    pub fn try_send(&self, frame: Bytes) -> Result<()> {
        let tx = self.tx.as_ref().ok_or(TransportError::Closed)?;
        trace!(len = frame.len(), "memory send");
        tx.send(frame).map_err(|_| TransportError::Closed)
    }
}

impl FrameSink for MemorySink {
    async fn send_frame(&mut self, frame: Bytes) -> Result<()> {
        self.try_send(frame)
    }

    async fn close(&mut self) -> Result<()> {
        self.tx = None;
        Ok(())
    }
}

impl MemorySource {
    /// Receive without waiting; `None` if nothing is queued.
    pub fn try_next(&mut self) -> Option<Bytes> {
        self.rx.try_recv().ok()
    }
}

impl FrameSource for MemorySource {
    async fn next_frame(&mut self) -> Option<Result<Bytes>> {
        self.rx.recv().await.map(Ok)
    }
}
