use serde::{Serialize, Serializer};
use std::fmt;

/// Why the OS changed the audio route
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteChangeReason {
    NewDeviceAvailable,
    OldDeviceUnavailable,
    CategoryChange,
    Override,
    WakeFromSleep,
    NoSuitableRouteForCategory,
    RouteConfigChange,
    Unknown,
}

// (reason, native code, token)
const REASON_TABLE: [(RouteChangeReason, u64, &str); 8] = [
    (RouteChangeReason::NewDeviceAvailable, 1, "new-device-available"),
    (RouteChangeReason::OldDeviceUnavailable, 2, "old-device-unavailable"),
    (RouteChangeReason::CategoryChange, 3, "category-change"),
    (RouteChangeReason::Override, 4, "override"),
    (RouteChangeReason::WakeFromSleep, 6, "wake-from-sleep"),
    (
        RouteChangeReason::NoSuitableRouteForCategory,
        7,
        "no-suitable-route-for-category",
    ),
    (RouteChangeReason::RouteConfigChange, 8, "route-config-change"),
    (RouteChangeReason::Unknown, 0, "unknown"),
];

impl RouteChangeReason {
    /// Map an OS reason code; unrecognized codes become `Unknown`
    pub fn from_code(code: u64) -> Self {
        REASON_TABLE
            .iter()
            .find(|(_, c, _)| *c == code)
            .map_or(RouteChangeReason::Unknown, |(reason, _, _)| *reason)
    }

    pub fn code(self) -> u64 {
        self.entry().1
    }

    pub fn token(self) -> &'static str {
        self.entry().2
    }

    fn entry(self) -> &'static (RouteChangeReason, u64, &'static str) {
        &REASON_TABLE[self as usize]
    }
}

impl fmt::Display for RouteChangeReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl Serialize for RouteChangeReason {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.token())
    }
}

/// Phase of a system audio interruption
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InterruptionType {
    Began,
    Ended,
    Unknown,
}

impl InterruptionType {
    pub fn from_code(code: u64) -> Self {
        match code {
            1 => InterruptionType::Began,
            0 => InterruptionType::Ended,
            _ => InterruptionType::Unknown,
        }
    }

    pub fn code(self) -> Option<u64> {
        match self {
            InterruptionType::Began => Some(1),
            InterruptionType::Ended => Some(0),
            InterruptionType::Unknown => None,
        }
    }

    pub fn token(self) -> &'static str {
        match self {
            InterruptionType::Began => "began",
            InterruptionType::Ended => "ended",
            InterruptionType::Unknown => "unknown",
        }
    }
}

impl fmt::Display for InterruptionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl Serialize for InterruptionType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.token())
    }
}
