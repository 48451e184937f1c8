use std::future::Future;

use bytes::Bytes;

use crate::error::Result;

/// Outbound half of a duplex connection.
pub trait FrameSink: Send {
    /// Send one binary message.
    fn send_frame(&mut self, frame: Bytes) -> impl Future<Output = Result<()>> + Send;

    /// Close the outbound half. Further sends fail.
    fn close(&mut self) -> impl Future<Output = Result<()>> + Send;
}

/// Inbound half of a duplex connection.
pub trait FrameSource: Send {
    /// Next binary message. `None` once the connection is closed.
    fn next_frame(&mut self) -> impl Future<Output = Option<Result<Bytes>>> + Send;
}
