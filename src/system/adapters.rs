use anyhow::Result;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

use crate::audio::{CategoryOptions, PortOverride, SessionCategory};
use crate::catalog::{Port, RouteChangeReason};
use crate::error::SessionError;
use crate::system::traits::{
    AudioSessionInterface, FileSystemInterface, NativeNotification, NotificationHandler,
    NotificationKind,
};

type HandlerMap = HashMap<NotificationKind, Vec<Arc<NotificationHandler>>>;

#[derive(Debug, Default)]
struct RouteState {
    connected: Vec<String>,
    port_override: Option<PortOverride>,
    category: Option<(SessionCategory, CategoryOptions)>,
    active: bool,
}

/// In-process stand-in for the OS audio session
///
/// Keeps a set of attached ports and derives the active output route from
/// them the way a phone does: the newest attached external port wins, and a
/// speaker override forces the built-in speaker until the next attach or
/// detach. Route changes raise the same notifications the OS would.
#[derive(Clone, Default)]
pub struct SimulatedAudioSession {
    state: Arc<Mutex<RouteState>>,
    handlers: Arc<Mutex<HandlerMap>>,
}

impl SimulatedAudioSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with the given ports attached, without raising notifications
    pub fn with_ports(ports: &[Port]) -> Self {
        let session = Self::new();
        if let Ok(mut state) = session.state.lock() {
            state.connected = ports.iter().map(|p| p.native_id().to_string()).collect();
        }
        session
    }

    /// Attach a port by native id (unknown hardware is allowed)
    pub fn attach(&self, native_id: &str) {
        if let Ok(mut state) = self.state.lock() {
            if state.connected.iter().any(|id| id == native_id) {
                return;
            }
            state.connected.push(native_id.to_string());
            state.port_override = None;
        }
        info!("Simulated port attached: {}", native_id);
        self.raise(NativeNotification::route_change(
            RouteChangeReason::NewDeviceAvailable.code(),
        ));
    }

    pub fn detach(&self, native_id: &str) {
        let removed = match self.state.lock() {
            Ok(mut state) => {
                let before = state.connected.len();
                state.connected.retain(|id| id != native_id);
                let removed = before != state.connected.len();
                if removed {
                    state.port_override = None;
                }
                removed
            }
            Err(_) => false,
        };

        if removed {
            info!("Simulated port detached: {}", native_id);
            self.raise(NativeNotification::route_change(
                RouteChangeReason::OldDeviceUnavailable.code(),
            ));
        }
    }

    pub fn interrupt(&self, type_code: u64) {
        self.raise(NativeNotification::interruption(type_code));
    }

    /// Deliver an arbitrary notification to the registered handlers
    pub fn raise(&self, notification: NativeNotification) {
        let handlers: Vec<Arc<NotificationHandler>> = match self.handlers.lock() {
            Ok(map) => map.get(&notification.kind).cloned().unwrap_or_default(),
            Err(_) => Vec::new(),
        };

        debug!(
            "Raising {:?} notification to {} handler(s)",
            notification.kind,
            handlers.len()
        );
        for handler in handlers {
            (**handler)(&notification);
        }
    }

    pub fn is_active(&self) -> bool {
        self.state.lock().map(|s| s.active).unwrap_or(false)
    }

    pub fn category(&self) -> Option<(SessionCategory, CategoryOptions)> {
        self.state.lock().ok().and_then(|s| s.category)
    }

    fn active_route(state: &RouteState) -> Vec<String> {
        let speaker = Port::BuiltinSpeaker.native_id();
        if state.port_override == Some(PortOverride::Speaker) {
            return vec![speaker.to_string()];
        }

        state
            .connected
            .iter()
            .rev()
            .find(|id| id.as_str() != speaker && id.as_str() != Port::BuiltinReceiver.native_id())
            .or_else(|| state.connected.iter().find(|id| id.as_str() == speaker))
            .or_else(|| state.connected.first())
            .map(|id| vec![id.clone()])
            .unwrap_or_default()
    }
}

impl AudioSessionInterface for SimulatedAudioSession {
    fn subscribe(
        &self,
        kind: NotificationKind,
        handler: NotificationHandler,
    ) -> std::result::Result<(), SessionError> {
        let mut handlers = self
            .handlers
            .lock()
            .map_err(|_| SessionError::Subscription("handler table poisoned".to_string()))?;
        handlers.entry(kind).or_default().push(Arc::new(handler));
        Ok(())
    }

    fn current_outputs(&self) -> std::result::Result<Vec<String>, SessionError> {
        let state = self
            .state
            .lock()
            .map_err(|_| SessionError::RouteQuery("route state poisoned".to_string()))?;
        Ok(Self::active_route(&state))
    }

    fn override_output(&self, port_override: PortOverride) -> std::result::Result<(), SessionError> {
        let changed = {
            let mut state = self
                .state
                .lock()
                .map_err(|_| SessionError::OverrideRejected("route state poisoned".to_string()))?;
            let previous = Self::active_route(&state);
            state.port_override = Some(port_override);
            previous != Self::active_route(&state)
        };

        if changed {
            self.raise(NativeNotification::route_change(
                RouteChangeReason::Override.code(),
            ));
        }
        Ok(())
    }

    fn set_category(
        &self,
        category: SessionCategory,
        options: CategoryOptions,
    ) -> std::result::Result<(), SessionError> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| SessionError::SessionSetup("route state poisoned".to_string()))?;
        debug!("Simulated category set to {:?} {}", category, options);
        state.category = Some((category, options));
        Ok(())
    }

    fn set_active(&self, active: bool) -> std::result::Result<(), SessionError> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| SessionError::SessionSetup("route state poisoned".to_string()))?;
        state.active = active;
        Ok(())
    }
}

/// Production implementation of FileSystemInterface using std::fs
pub struct StandardFileSystem;

impl FileSystemInterface for StandardFileSystem {
    fn read_config_file(&self, path: &Path) -> Result<String> {
        std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config file: {}", e))
    }

    fn write_config_file(&self, path: &Path, content: &str) -> Result<()> {
        std::fs::write(path, content)
            .map_err(|e| anyhow::anyhow!("Failed to write config file: {}", e))
    }

    fn config_file_exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn create_config_dir(&self, path: &Path) -> Result<()> {
        std::fs::create_dir_all(path)
            .map_err(|e| anyhow::anyhow!("Failed to create config directory: {}", e))
    }
}
