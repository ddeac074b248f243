//! Typed builders for the device command vocabulary
//!
//! The engine moves command text opaquely; these types only spare callers from
//! formatting strings by hand. Rendering goes through [`std::fmt::Display`].

use std::fmt;

use serde_json::Value;

/// What a `trigger` command fires
#[derive(Debug, Clone, PartialEq)]
pub enum TriggerTarget {
    /// Preset slot
    Index(u32),
    /// Inline definition, sent as compact JSON
    Inline(Value),
}

/// A command understood by the device firmware
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Handshake; the response describes the device
    Init,
    /// Fire a preset or inline trigger
    Trigger(TriggerTarget),
    /// Read a config value at a path
    ConfigGet(String),
    /// Write a config value at a path
    ConfigSet {
        /// Config path
        path: String,
        /// New value, sent as compact JSON
        value: Value,
    },
    /// Persist the working config
    ConfigSave,
    /// Drop unsaved config changes
    ConfigRevert,
    /// Put the device to sleep
    Sleep,
    /// Restart the device
    Reboot,
    /// Keep-alive ping
    Heartbeat,
    /// Toggle raw sensor streaming
    SensorStream(bool),
    /// Toggle practice mode
    Practice(bool),
}

impl Command {
    /// Build a `config get` command
    pub fn config_get(path: impl Into<String>) -> Self {
        Self::ConfigGet(path.into())
    }

    /// Build a `config set` command
    pub fn config_set(path: impl Into<String>, value: Value) -> Self {
        Self::ConfigSet {
            path: path.into(),
            value,
        }
    }
}

fn on_off(enabled: bool) -> &'static str {
    if enabled { "on" } else { "off" }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Init => f.write_str("init"),
            Self::Trigger(TriggerTarget::Index(index)) => write!(f, "trigger {index}"),
            Self::Trigger(TriggerTarget::Inline(value)) => write!(f, "trigger {value}"),
            Self::ConfigGet(path) => write!(f, "config get {path}"),
            Self::ConfigSet { path, value } => write!(f, "config set {path} {value}"),
            Self::ConfigSave => f.write_str("config save"),
            Self::ConfigRevert => f.write_str("config revert"),
            Self::Sleep => f.write_str("sleep"),
            Self::Reboot => f.write_str("reboot"),
            Self::Heartbeat => f.write_str("hb"),
            Self::SensorStream(enabled) => write!(f, "sensor_stream {}", on_off(*enabled)),
            Self::Practice(enabled) => write!(f, "practice {}", on_off(*enabled)),
        }
    }
}
