//! Duplex message transports for the HoloPlay driver.
//!
//! A transport is split into a [`FrameSink`] and a [`FrameSource`] so the
//! writer and reader can live on different tasks. Each item is one whole
//! binary message; framing inside it is the caller's business.
//!
//! - [`memory`]: connected in-process pair, for tests and embedding
//! - [`ws`]: WebSocket client (behind the `ws` feature)

pub mod error;
pub mod memory;
pub mod traits;

#[cfg(feature = "ws")]
pub mod ws;

pub use error::{Result, TransportError};
pub use traits::{FrameSink, FrameSource};

#[cfg(feature = "ws")]
pub use ws::{connect, WebSocketSink, WebSocketSource};

/// Default driver endpoint.
pub const DEFAULT_URL: &str = "ws://localhost:11222/driver";

/// Subprotocol offered during the WebSocket handshake.
pub const DEFAULT_SUBPROTOCOL: &str = "rep.sp.nanomsg.org";
