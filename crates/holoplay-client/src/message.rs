//! Driver command messages.
//!
//! Every command is a two-field map, `{"cmd": {<name>: {...}}, "bin": <bytes
//! or null>}`. The constructors here only shape that map; what the driver
//! does with it is its own business.

use bytes::Bytes;
use holoplay_cbor::{encode, Value};

use crate::config::CloseBehavior;

/// A command for the driver, with an optional binary attachment.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub cmd: Value,
    pub bin: Option<Bytes>,
}

/// Options carried by `init`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InitOptions {
    pub app_id: Option<String>,
    pub greedy: bool,
    pub on_close: Option<CloseBehavior>,
    pub debug: bool,
}

/// Quilt layout: views across, views down, and the aspect of one view.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuiltSettings {
    pub vx: u32,
    pub vy: u32,
    pub aspect: f64,
    /// Number of views actually used, when fewer than `vx * vy`.
    pub vtotal: Option<u32>,
}

impl Default for QuiltSettings {
    fn default() -> Self {
        Self {
            vx: 5,
            vy: 9,
            aspect: 1.6,
            vtotal: None,
        }
    }
}

impl QuiltSettings {
    pub fn to_value(&self) -> Value {
        let mut settings = Value::map([
            ("vx", Value::from(self.vx)),
            ("vy", Value::from(self.vy)),
            ("aspect", Value::from(self.aspect)),
        ]);
        if let Some(vtotal) = self.vtotal {
            settings.insert("vtotal", vtotal);
        }
        settings
    }
}

impl Message {
    pub fn new(cmd: Value, bin: Option<Bytes>) -> Self {
        Self { cmd, bin }
    }

    /// A command with an empty argument map and no attachment.
    fn bare(name: &str) -> Self {
        Self::new(Value::map([(name, Value::empty_map())]), None)
    }

    fn command(name: &str, args: Value, bin: Option<Bytes>) -> Self {
        Self::new(Value::map([(name, args)]), bin)
    }

    /// Register with the driver. Only the options that are set are sent.
    pub fn init(options: &InitOptions) -> Self {
        let mut args = Value::empty_map();
        if let Some(app_id) = options.app_id.as_deref().filter(|id| !id.is_empty()) {
            args.insert("appid", app_id);
        }
        if let Some(on_close) = options.on_close {
            args.insert("onclose", on_close.as_str());
        }
        if options.greedy {
            args.insert("greedy", true);
        }
        if options.debug {
            args.insert("debug", true);
        }
        Self::command("init", args, None)
    }

    /// Query driver and display information.
    pub fn info() -> Self {
        Self::bare("info")
    }

    /// Ask whether a quilt is cached under `name`.
    pub fn check(name: &str) -> Self {
        Self::command("check", Value::map([("name", name)]), None)
    }

    /// Remove the cached quilt `name`.
    pub fn delete(name: &str) -> Self {
        Self::command("delete", Value::map([("name", name)]), None)
    }

    /// Clear the display back to the background image.
    pub fn wipe(target_display: Option<u32>) -> Self {
        let mut args = Value::empty_map();
        if let Some(display) = target_display {
            args.insert("targetDisplay", display);
        }
        Self::command("wipe", args, None)
    }

    /// Show the quilt image in `image`.
    pub fn show(settings: QuiltSettings, image: Bytes, target_display: Option<u32>) -> Self {
        let quilt = Value::map([
            ("type", Value::from("image")),
            ("settings", settings.to_value()),
        ]);
        let mut args = Value::map([("source", Value::from("bindata")), ("quilt", quilt)]);
        if let Some(display) = target_display {
            args.insert("targetDisplay", display);
        }
        Self::command("show", args, Some(image))
    }

    /// Store the quilt image in `image` under `name`, optionally showing it.
    pub fn cache(name: &str, settings: QuiltSettings, image: Bytes, show: bool) -> Self {
        let quilt = Value::map([
            ("name", Value::from(name)),
            ("type", Value::from("image")),
            ("settings", settings.to_value()),
        ]);
        let args = Value::map([("show", Value::from(show)), ("quilt", quilt)]);
        Self::command("cache", args, Some(image))
    }

    /// Show a quilt previously stored with [`Message::cache`].
    pub fn show_cached(
        name: &str,
        target_display: Option<u32>,
        settings: Option<QuiltSettings>,
    ) -> Self {
        let mut quilt = Value::map([("name", name)]);
        if let Some(settings) = settings {
            quilt.insert("settings", settings.to_value());
        }
        let mut args = Value::map([("source", Value::from("cache")), ("quilt", quilt)]);
        if let Some(display) = target_display {
            args.insert("targetDisplay", display);
        }
        Self::command("show", args, None)
    }

    /// Fetch the lenticular shader uniforms.
    pub fn uniforms() -> Self {
        Self::bare("uniforms")
    }

    /// Fetch the lenticular shader source.
    pub fn shader() -> Self {
        Self::bare("shader")
    }

    /// Name of the command, i.e. the single key of `cmd`.
    pub fn name(&self) -> Option<&str> {
        self.cmd.as_map()?.first()?.0.as_str()
    }

    pub fn to_value(&self) -> Value {
        Value::map([
            ("cmd", self.cmd.clone()),
            ("bin", self.bin.clone().map_or(Value::Null, Value::Bytes)),
        ])
    }

    pub fn to_cbor(&self) -> Bytes {
        encode(&self.to_value())
    }
}

impl From<Message> for Value {
    fn from(message: Message) -> Self {
        Value::map([
            ("cmd", message.cmd),
            ("bin", message.bin.map_or(Value::Null, Value::Bytes)),
        ])
    }
}
