//! Client for HoloPlay Service, the Looking Glass display driver.
//!
//! The driver listens on a local WebSocket and speaks request/reply over
//! binary messages: a 4-byte request id followed by a CBOR payload.
//!
//! # Crate Structure
//!
//! - [`cbor`]: Value type and the CBOR codec
//! - [`frame`]: Request-id framing and the id generator
//! - [`transport`]: WebSocket and in-memory transports
//! - [`client`]: Request correlation, driver commands, the async client

/// Re-export codec types.
pub mod cbor {
    pub use holoplay_cbor::*;
}

/// Re-export frame types.
pub mod frame {
    pub use holoplay_frame::*;
}

/// Re-export transport types.
pub mod transport {
    pub use holoplay_transport::*;
}

/// Re-export client types.
pub mod client {
    pub use holoplay_client::*;
}

pub use holoplay_cbor::Value;
pub use holoplay_client::{Client, ClientConfig, Message, QuiltSettings};
