use std::fmt;
use std::time::Duration;

use holoplay_transport::{DEFAULT_SUBPROTOCOL, DEFAULT_URL};

/// Retransmit interval when none is given.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Completed replies kept for inspection by default.
pub const DEFAULT_HISTORY_LIMIT: usize = 64;

/// What the driver should do with the display when this client disconnects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseBehavior {
    /// Show the background image.
    Wipe,
    /// Hide the window.
    Hide,
    /// Leave the last image up.
    None,
}

impl CloseBehavior {
    pub fn as_str(self) -> &'static str {
        match self {
            CloseBehavior::Wipe => "wipe",
            CloseBehavior::Hide => "hide",
            CloseBehavior::None => "none",
        }
    }
}

impl fmt::Display for CloseBehavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request table behavior.
#[derive(Debug, Clone)]
pub struct CorrelatorConfig {
    /// Retransmit interval for requests submitted without one.
    pub default_timeout: Duration,
    /// Give up after this many transmissions. `None` retransmits forever.
    pub max_attempts: Option<u32>,
    /// Completed replies to keep. `None` keeps all of them.
    pub history_limit: Option<usize>,
    /// Set `cmd.debug = true` on every outgoing message.
    pub always_debug: bool,
}

impl Default for CorrelatorConfig {
    fn default() -> Self {
        Self {
            default_timeout: DEFAULT_REQUEST_TIMEOUT,
            max_attempts: None,
            history_limit: Some(DEFAULT_HISTORY_LIMIT),
            always_debug: false,
        }
    }
}

/// Configuration for [`Client`](crate::Client).
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Driver WebSocket endpoint.
    pub url: String,
    /// Subprotocol offered in the WebSocket handshake.
    pub subprotocol: Option<String>,
    /// Application id sent with `init`.
    pub app_id: Option<String>,
    /// Ask the driver to take over the display.
    pub greedy: bool,
    /// Display behavior when the connection closes.
    pub on_close: Option<CloseBehavior>,
    /// Ask the driver for verbose replies.
    pub debug: bool,
    /// Send `info` on connect when no `init` is needed.
    pub fetch_info: bool,
    /// Request table behavior.
    pub correlator: CorrelatorConfig,
    /// Fixed id generator seed. Random (time-based) when unset.
    pub id_seed: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            subprotocol: Some(DEFAULT_SUBPROTOCOL.to_string()),
            app_id: None,
            greedy: false,
            on_close: None,
            debug: false,
            fetch_info: true,
            correlator: CorrelatorConfig::default(),
            id_seed: None,
        }
    }
}

impl ClientConfig {
    /// True when connecting must send `init` rather than `info`.
    pub fn needs_init(&self) -> bool {
        self.app_id.is_some() || self.greedy || self.on_close.is_some()
    }
}
