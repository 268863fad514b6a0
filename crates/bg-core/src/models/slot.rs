use std::fmt;

use serde::{Deserialize, Serialize};

/// One of the two symmetric deployment targets.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SlotColor {
    Blue,
    Green,
}

impl SlotColor {
    pub const ALL: [SlotColor; 2] = [SlotColor::Blue, SlotColor::Green];

    pub fn other(self) -> Self {
        match self {
            Self::Blue => Self::Green,
            Self::Green => Self::Blue,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Blue => "blue",
            Self::Green => "green",
        }
    }
}

impl fmt::Display for SlotColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

/// Static description of a slot. Whether it is running is always observed
/// from the container runtime, never stored here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SlotSpec {
    pub container: String,
    pub port: u16,
    #[serde(default = "default_host")]
    pub host: String,
}

impl SlotSpec {
    pub fn new(container: impl Into<String>, port: u16) -> Self {
        Self {
            container: container.into(),
            port,
            host: default_host(),
        }
    }

    /// `host:port` as it appears in the routing config.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
