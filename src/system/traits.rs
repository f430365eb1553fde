use anyhow::Result;
use std::collections::HashMap;
use std::path::Path;

use crate::audio::{CategoryOptions, PortOverride, SessionCategory};
use crate::error::SessionError;

/// User-info key carrying the route change reason code
pub const ROUTE_CHANGE_REASON_KEY: &str = "AVAudioSessionRouteChangeReasonKey";

/// User-info key carrying the interruption type code
pub const INTERRUPTION_TYPE_KEY: &str = "AVAudioSessionInterruptionTypeKey";

/// Classes of OS notification the routing core listens to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationKind {
    RouteChange,
    Interruption,
}

/// Loosely typed user-info value as delivered by the OS
#[derive(Debug, Clone, PartialEq)]
pub enum NotificationValue {
    UInt(u64),
    Bool(bool),
    Text(String),
}

/// Raw OS notification before translation
#[derive(Debug, Clone, PartialEq)]
pub struct NativeNotification {
    pub kind: NotificationKind,
    pub user_info: Option<HashMap<String, NotificationValue>>,
}

impl NativeNotification {
    pub fn new(kind: NotificationKind) -> Self {
        Self {
            kind,
            user_info: None,
        }
    }

    pub fn route_change(reason_code: u64) -> Self {
        Self::new(NotificationKind::RouteChange).with_value(
            ROUTE_CHANGE_REASON_KEY,
            NotificationValue::UInt(reason_code),
        )
    }

    pub fn interruption(type_code: u64) -> Self {
        Self::new(NotificationKind::Interruption)
            .with_value(INTERRUPTION_TYPE_KEY, NotificationValue::UInt(type_code))
    }

    pub fn with_value(mut self, key: &str, value: NotificationValue) -> Self {
        self.user_info
            .get_or_insert_with(HashMap::new)
            .insert(key.to_string(), value);
        self
    }

    /// Read an unsigned integer from the payload, `None` when absent or mistyped
    pub fn uint(&self, key: &str) -> Option<u64> {
        match self.user_info.as_ref()?.get(key)? {
            NotificationValue::UInt(value) => Some(*value),
            _ => None,
        }
    }
}

pub type NotificationHandler = Box<dyn Fn(&NativeNotification) + Send + Sync>;

/// Trait for audio session operations - abstracts the OS audio subsystem
///
/// Every call may block for a noticeable time on real hardware, so the
/// routing core only invokes these from its session worker.
pub trait AudioSessionInterface: Send + Sync {
    /// Register a handler for one class of OS notification
    fn subscribe(
        &self,
        kind: NotificationKind,
        handler: NotificationHandler,
    ) -> std::result::Result<(), SessionError>;

    /// Native ids of the ports carrying output right now
    fn current_outputs(&self) -> std::result::Result<Vec<String>, SessionError>;

    /// Force output to the speaker or clear the override
    fn override_output(&self, port_override: PortOverride) -> std::result::Result<(), SessionError>;

    /// Set the session category together with its capability flags
    fn set_category(
        &self,
        category: SessionCategory,
        options: CategoryOptions,
    ) -> std::result::Result<(), SessionError>;

    /// Activate or deactivate the session
    fn set_active(&self, active: bool) -> std::result::Result<(), SessionError>;
}

/// Trait for file system operations - abstracts std::fs for testability
pub trait FileSystemInterface {
    /// Read the entire contents of a configuration file
    fn read_config_file(&self, path: &Path) -> Result<String>;

    /// Write configuration content to a file
    fn write_config_file(&self, path: &Path, content: &str) -> Result<()>;

    /// Check if a configuration file exists
    fn config_file_exists(&self, path: &Path) -> bool;

    /// Create the directory structure for config files
    fn create_config_dir(&self, path: &Path) -> Result<()>;
}
