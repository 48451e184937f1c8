//! Request/reply client for HoloPlay Service.
//!
//! Connect, send driver commands, get replies. Each request is framed with a
//! random id and re-sent until the driver answers; replies are matched back
//! to the caller by that id.
//!
//! ```no_run
//! # async fn run() -> holoplay_client::Result<()> {
//! use holoplay_client::{Client, ClientConfig, Message};
//! use holoplay_transport::memory;
//!
//! // `Client::connect` opens a WebSocket instead (feature `ws`).
//! let (local, _driver) = memory::pair();
//! let (sink, source) = local.into_split();
//! let client = Client::with_transport(sink, source, ClientConfig::default()).await?;
//! let reply = client.send_message(&Message::wipe(None))?.await?;
//! println!("{reply:?}");
//! client.disconnect().await;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod correlator;
pub mod error;
pub mod message;

pub use client::{Client, ConnectionEvent};
pub use config::{
    ClientConfig, CloseBehavior, CorrelatorConfig, DEFAULT_HISTORY_LIMIT, DEFAULT_REQUEST_TIMEOUT,
};
pub use correlator::{
    Correlator, DropReason, FrameDisposition, Outbox, Outcome, Reply, RequestResult,
};
pub use error::{ClientError, RequestError, Result};
pub use message::{InitOptions, Message, QuiltSettings};
