use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info, warn};

use crate::catalog::{Port, ResolvedPort};

/// Ordered, duplicate-free list of ports, most preferred first
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PriorityOrder(Vec<Port>);

impl PriorityOrder {
    /// Build from ports, keeping the first occurrence of any duplicate
    pub fn new(ports: impl IntoIterator<Item = Port>) -> Self {
        let mut order: Vec<Port> = Vec::new();
        for port in ports {
            if order.contains(&port) {
                debug!("Ignoring duplicate priority entry: {}", port);
                continue;
            }
            order.push(port);
        }
        Self(order)
    }

    /// Build from host tokens; unknown tokens are skipped without error
    pub fn from_tokens<S: AsRef<str>>(tokens: &[S]) -> Self {
        Self::new(tokens.iter().filter_map(|token| {
            let token = token.as_ref();
            let port = Port::from_token(token);
            if port.is_none() {
                warn!("Ignoring unknown port in priority order: '{}'", token);
            }
            port
        }))
    }

    pub fn ports(&self) -> &[Port] {
        &self.0
    }

    pub fn position(&self, port: Port) -> Option<usize> {
        self.0.iter().position(|p| *p == port)
    }

    pub fn tokens(&self) -> Vec<&'static str> {
        self.0.iter().map(|p| p.token()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl Default for PriorityOrder {
    fn default() -> Self {
        Self::new([
            Port::LineOut,
            Port::Headphones,
            Port::BluetoothA2dp,
            Port::BluetoothHfp,
            Port::BuiltinSpeaker,
        ])
    }
}

impl<'de> Deserialize<'de> for PriorityOrder {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let tokens = Vec::<String>::deserialize(deserializer)?;
        Ok(Self::from_tokens(&tokens))
    }
}

impl fmt::Display for PriorityOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.tokens().join(", "))
    }
}

/// Routing policy: priority order plus the auto-switch flag
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoutingPolicy {
    pub priority_order: PriorityOrder,
    pub auto_switch: bool,
}

impl RoutingPolicy {
    pub fn new(priority_order: PriorityOrder, auto_switch: bool) -> Self {
        info!(
            "Creating routing policy (auto-switch: {}, order: {})",
            auto_switch, priority_order
        );
        Self {
            priority_order,
            auto_switch,
        }
    }

    /// Pick the output port for the currently connected outputs
    ///
    /// Walks the priority order and returns the first connected port. Because
    /// the walk stops at the first hit, the built-in speaker is only reached
    /// when nothing ranked above it is connected. `None` means no entry
    /// matched and the route stays as is.
    pub fn select_target(&self, connected: &[ResolvedPort]) -> Option<Port> {
        let is_connected = |port: Port| connected.contains(&ResolvedPort::Known(port));
        let order = self.priority_order.ports();

        debug!(
            "Evaluating {} connected output(s) against {}",
            connected.len(),
            self.priority_order
        );

        for (rank, port) in order.iter().copied().enumerate() {
            if !is_connected(port) {
                debug!("  {} is not connected", port);
                continue;
            }

            debug!("  Selected {} (rank {})", port, rank);
            return Some(port);
        }

        debug!("No priority entry matches the connected outputs");
        None
    }
}
