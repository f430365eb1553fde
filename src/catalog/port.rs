use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::SessionError;

/// Token reported for native ports missing from the catalog
pub const UNKNOWN_TOKEN: &str = "unknown";

/// Class of audio output device known to the routing core
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Port {
    AirPlay,
    BluetoothLe,
    BluetoothHfp,
    BluetoothA2dp,
    BuiltinSpeaker,
    BuiltinReceiver,
    Hdmi,
    Headphones,
    LineOut,
}

// (port, native port id, stable token)
const PORT_TABLE: [(Port, &str, &str); 9] = [
    (Port::AirPlay, "AirPlay", "airplay"),
    (Port::BluetoothLe, "BluetoothLE", "bluetooth-le"),
    (Port::BluetoothHfp, "BluetoothHFP", "bluetooth-hfp"),
    (Port::BluetoothA2dp, "BluetoothA2DPOutput", "bluetooth-a2dp"),
    (Port::BuiltinSpeaker, "Speaker", "builtin-speaker"),
    (Port::BuiltinReceiver, "Receiver", "builtin-receiver"),
    (Port::Hdmi, "HDMI", "hdmi"),
    (Port::Headphones, "Headphones", "headphones"),
    (Port::LineOut, "LineOut", "line-out"),
];

impl Port {
    pub const ALL: [Port; 9] = [
        Port::AirPlay,
        Port::BluetoothLe,
        Port::BluetoothHfp,
        Port::BluetoothA2dp,
        Port::BuiltinSpeaker,
        Port::BuiltinReceiver,
        Port::Hdmi,
        Port::Headphones,
        Port::LineOut,
    ];

    fn entry(self) -> &'static (Port, &'static str, &'static str) {
        // Table order matches declaration order.
        &PORT_TABLE[self as usize]
    }

    /// Stable string token used by the host application layer
    pub fn token(self) -> &'static str {
        self.entry().2
    }

    /// Opaque identifier the OS uses for this port class
    pub fn native_id(self) -> &'static str {
        self.entry().1
    }

    pub fn from_token(token: &str) -> Option<Port> {
        PORT_TABLE
            .iter()
            .find(|(_, _, t)| *t == token)
            .map(|(port, _, _)| *port)
    }

    pub fn from_native_id(native_id: &str) -> Option<Port> {
        PORT_TABLE
            .iter()
            .find(|(_, n, _)| *n == native_id)
            .map(|(port, _, _)| *port)
    }

    pub fn is_bluetooth(self) -> bool {
        matches!(
            self,
            Port::BluetoothA2dp | Port::BluetoothHfp | Port::BluetoothLe
        )
    }
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl FromStr for Port {
    type Err = SessionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Port::from_token(s).ok_or_else(|| SessionError::InvalidInput(format!("unknown port '{s}'")))
    }
}

impl Serialize for Port {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.token())
    }
}

impl<'de> Deserialize<'de> for Port {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let token = String::deserialize(deserializer)?;
        token.parse().map_err(serde::de::Error::custom)
    }
}

/// A native port translated through the catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResolvedPort {
    Known(Port),
    Unknown,
}

impl ResolvedPort {
    pub fn token(self) -> &'static str {
        match self {
            ResolvedPort::Known(port) => port.token(),
            ResolvedPort::Unknown => UNKNOWN_TOKEN,
        }
    }

    pub fn port(self) -> Option<Port> {
        match self {
            ResolvedPort::Known(port) => Some(port),
            ResolvedPort::Unknown => None,
        }
    }
}

impl From<Port> for ResolvedPort {
    fn from(port: Port) -> Self {
        ResolvedPort::Known(port)
    }
}

impl fmt::Display for ResolvedPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl Serialize for ResolvedPort {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.token())
    }
}

/// Translate an opaque OS port identifier. Never fails: ids missing from the
/// catalog come back as [`ResolvedPort::Unknown`].
pub fn translate(native_id: &str) -> ResolvedPort {
    Port::from_native_id(native_id).map_or(ResolvedPort::Unknown, ResolvedPort::Known)
}
