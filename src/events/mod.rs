//! Normalized session events and their delivery to listeners.

pub mod dispatch;
pub mod translator;

use serde::Serialize;
use std::fmt;
use std::time::SystemTime;

use crate::catalog::{InterruptionType, RouteChangeReason};
use crate::priority::EvaluationOutcome;

pub use dispatch::{ListenerDispatch, Observer, SubscriptionId};
pub use translator::EventTranslator;

/// Event classes listeners can subscribe to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    RouteChange,
    Interruption,
    Routing,
}

impl EventKind {
    /// Event name used by the host bridge
    pub fn name(self) -> &'static str {
        match self {
            EventKind::RouteChange => "routeChanged",
            EventKind::Interruption => "interruption",
            EventKind::Routing => "routing",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "routeChanged" => Some(EventKind::RouteChange),
            "interruption" => Some(EventKind::Interruption),
            "routing" => Some(EventKind::Routing),
            _ => None,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteChangeEvent {
    pub reason: RouteChangeReason,
    #[serde(skip)]
    pub timestamp: SystemTime,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InterruptionEvent {
    #[serde(rename = "type")]
    pub interruption_type: InterruptionType,
    #[serde(skip)]
    pub timestamp: SystemTime,
}

/// Result of one routing evaluation pass
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoutingEvent {
    pub outcome: EvaluationOutcome,
    #[serde(skip)]
    pub timestamp: SystemTime,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SessionEvent {
    RouteChanged(RouteChangeEvent),
    Interruption(InterruptionEvent),
    Routing(RoutingEvent),
}

impl SessionEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            SessionEvent::RouteChanged(_) => EventKind::RouteChange,
            SessionEvent::Interruption(_) => EventKind::Interruption,
            SessionEvent::Routing(_) => EventKind::Routing,
        }
    }

    /// Human-readable reason or type carried by the event
    pub fn label(&self) -> String {
        match self {
            SessionEvent::RouteChanged(event) => event.reason.token().to_string(),
            SessionEvent::Interruption(event) => event.interruption_type.token().to_string(),
            SessionEvent::Routing(event) => event.outcome.to_string(),
        }
    }
}

impl fmt::Display for SessionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind(), self.label())
    }
}
