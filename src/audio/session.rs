use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::catalog::Port;
use crate::error::SessionError;

/// Session category requested before routing commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SessionCategory {
    PlayAndRecord,
}

/// Capability flags applied together with the session category
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryOptions {
    pub allow_bluetooth_a2dp: bool,
    pub allow_bluetooth_hfp: bool,
    pub allow_airplay: bool,
    pub mix_with_others: bool,
}

impl CategoryOptions {
    /// Options used before an explicit override: A2DP and AirPlay routing allowed
    pub fn for_override() -> Self {
        Self {
            allow_bluetooth_a2dp: true,
            allow_bluetooth_hfp: false,
            allow_airplay: true,
            mix_with_others: true,
        }
    }

    /// Options enabling only the capability the target port needs
    pub fn for_port(port: Port) -> Self {
        Self {
            allow_bluetooth_a2dp: port == Port::BluetoothA2dp,
            allow_bluetooth_hfp: matches!(port, Port::BluetoothHfp | Port::BluetoothLe),
            allow_airplay: port == Port::AirPlay,
            mix_with_others: true,
        }
    }
}

impl fmt::Display for CategoryOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut flags = Vec::new();
        if self.allow_bluetooth_a2dp {
            flags.push("allowBluetoothA2DP");
        }
        if self.allow_bluetooth_hfp {
            flags.push("allowBluetooth");
        }
        if self.allow_airplay {
            flags.push("allowAirPlay");
        }
        if self.mix_with_others {
            flags.push("mixWithOthers");
        }
        write!(f, "[{}]", flags.join(", "))
    }
}

/// Hardware-level output override understood by the OS
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortOverride {
    None,
    Speaker,
}

/// Output override requested by the host application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverrideType {
    Default,
    Speaker,
}

impl OverrideType {
    pub fn token(self) -> &'static str {
        match self {
            OverrideType::Default => "default",
            OverrideType::Speaker => "speaker",
        }
    }

    pub fn port_override(self) -> PortOverride {
        match self {
            OverrideType::Default => PortOverride::None,
            OverrideType::Speaker => PortOverride::Speaker,
        }
    }
}

impl fmt::Display for OverrideType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl FromStr for OverrideType {
    type Err = SessionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "default" => Ok(OverrideType::Default),
            "speaker" => Ok(OverrideType::Speaker),
            other => Err(SessionError::InvalidInput(format!(
                "unrecognized output type '{other}'"
            ))),
        }
    }
}
