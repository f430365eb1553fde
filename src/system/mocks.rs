use anyhow::Result;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::audio::{CategoryOptions, PortOverride, SessionCategory};
use crate::catalog::Port;
use crate::error::SessionError;
use crate::system::traits::{
    AudioSessionInterface, FileSystemInterface, NativeNotification, NotificationHandler,
    NotificationKind,
};

/// Hardware call recorded by [`MockAudioSession`]
#[derive(Debug, Clone, PartialEq)]
pub enum SessionCall {
    CurrentOutputs,
    Override(PortOverride),
    SetCategory(SessionCategory, CategoryOptions),
    SetActive(bool),
}

/// Mock audio session for testing - provides controllable route behavior
#[derive(Clone)]
pub struct MockAudioSession {
    pub outputs: Arc<Mutex<Vec<String>>>,
    pub calls: Arc<Mutex<Vec<SessionCall>>>,
    pub handlers: Arc<Mutex<Vec<(NotificationKind, Arc<NotificationHandler>)>>>,
    pub should_fail_query: Arc<Mutex<bool>>,
    pub should_fail_category: Arc<Mutex<bool>>,
    pub should_fail_activation: Arc<Mutex<bool>>,
    pub should_fail_override: Arc<Mutex<bool>>,
    pub should_fail_subscribe: Arc<Mutex<bool>>,
    pub subscribe_failure_kind: Arc<Mutex<Option<NotificationKind>>>,
    pub should_panic_query: Arc<Mutex<bool>>,
    pub override_delay: Arc<Mutex<Option<Duration>>>,
}

impl MockAudioSession {
    pub fn new() -> Self {
        Self {
            outputs: Arc::new(Mutex::new(Vec::new())),
            calls: Arc::new(Mutex::new(Vec::new())),
            handlers: Arc::new(Mutex::new(Vec::new())),
            should_fail_query: Arc::new(Mutex::new(false)),
            should_fail_category: Arc::new(Mutex::new(false)),
            should_fail_activation: Arc::new(Mutex::new(false)),
            should_fail_override: Arc::new(Mutex::new(false)),
            should_fail_subscribe: Arc::new(Mutex::new(false)),
            subscribe_failure_kind: Arc::new(Mutex::new(None)),
            should_panic_query: Arc::new(Mutex::new(false)),
            override_delay: Arc::new(Mutex::new(None)),
        }
    }

    /// Create a mock whose current route reports the given ports
    pub fn with_outputs(ports: &[Port]) -> Self {
        let mock = Self::new();
        mock.set_outputs(ports);
        mock
    }

    /// Replace the reported route with catalog ports
    pub fn set_outputs(&self, ports: &[Port]) {
        *self.outputs.lock().unwrap() = ports.iter().map(|p| p.native_id().to_string()).collect();
    }

    /// Replace the reported route with raw native ids
    pub fn set_native_outputs(&self, native_ids: &[&str]) {
        *self.outputs.lock().unwrap() = native_ids.iter().map(|id| id.to_string()).collect();
    }

    /// Deliver a notification to every handler registered for its kind
    pub fn emit(&self, notification: NativeNotification) {
        let handlers: Vec<Arc<NotificationHandler>> = self
            .handlers
            .lock()
            .unwrap()
            .iter()
            .filter(|(kind, _)| *kind == notification.kind)
            .map(|(_, handler)| handler.clone())
            .collect();

        for handler in handlers {
            (**handler)(&notification);
        }
    }

    /// Get all hardware calls that were made
    pub fn get_calls(&self) -> Vec<SessionCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Only the override commands that were issued
    pub fn get_override_calls(&self) -> Vec<PortOverride> {
        self.get_calls()
            .into_iter()
            .filter_map(|call| match call {
                SessionCall::Override(port_override) => Some(port_override),
                _ => None,
            })
            .collect()
    }

    /// Calls that touch the hardware session (everything except route queries)
    pub fn get_hardware_calls(&self) -> Vec<SessionCall> {
        self.get_calls()
            .into_iter()
            .filter(|call| *call != SessionCall::CurrentOutputs)
            .collect()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.lock().unwrap().len()
    }

    pub fn handler_count_for(&self, kind: NotificationKind) -> usize {
        self.handlers
            .lock()
            .unwrap()
            .iter()
            .filter(|(k, _)| *k == kind)
            .count()
    }

    pub fn set_query_failure(&self, should_fail: bool) {
        *self.should_fail_query.lock().unwrap() = should_fail;
    }

    pub fn set_category_failure(&self, should_fail: bool) {
        *self.should_fail_category.lock().unwrap() = should_fail;
    }

    pub fn set_activation_failure(&self, should_fail: bool) {
        *self.should_fail_activation.lock().unwrap() = should_fail;
    }

    pub fn set_override_failure(&self, should_fail: bool) {
        *self.should_fail_override.lock().unwrap() = should_fail;
    }

    pub fn set_subscribe_failure(&self, should_fail: bool) {
        *self.should_fail_subscribe.lock().unwrap() = should_fail;
    }

    /// Fail subscriptions for one notification kind only
    pub fn set_subscribe_failure_for(&self, kind: Option<NotificationKind>) {
        *self.subscribe_failure_kind.lock().unwrap() = kind;
    }

    /// Make route queries panic, as a misbehaving adapter would
    pub fn set_query_panic(&self, should_panic: bool) {
        *self.should_panic_query.lock().unwrap() = should_panic;
    }

    /// Make every override call sleep before returning
    pub fn set_override_delay(&self, delay: Option<Duration>) {
        *self.override_delay.lock().unwrap() = delay;
    }

    fn record(&self, call: SessionCall) {
        self.calls.lock().unwrap().push(call);
    }
}

impl AudioSessionInterface for MockAudioSession {
    fn subscribe(
        &self,
        kind: NotificationKind,
        handler: NotificationHandler,
    ) -> std::result::Result<(), SessionError> {
        let failing_kind = *self.subscribe_failure_kind.lock().unwrap();
        if *self.should_fail_subscribe.lock().unwrap() || failing_kind == Some(kind) {
            return Err(SessionError::Subscription(
                "Mock subscription failure".to_string(),
            ));
        }
        self.handlers
            .lock()
            .unwrap()
            .push((kind, Arc::new(handler)));
        Ok(())
    }

    fn current_outputs(&self) -> std::result::Result<Vec<String>, SessionError> {
        self.record(SessionCall::CurrentOutputs);
        let should_panic = *self.should_panic_query.lock().unwrap();
        if should_panic {
            panic!("Mock route query panic");
        }
        if *self.should_fail_query.lock().unwrap() {
            return Err(SessionError::RouteQuery("Mock route query failure".to_string()));
        }
        Ok(self.outputs.lock().unwrap().clone())
    }

    fn override_output(&self, port_override: PortOverride) -> std::result::Result<(), SessionError> {
        self.record(SessionCall::Override(port_override));

        let delay = *self.override_delay.lock().unwrap();
        if let Some(delay) = delay {
            std::thread::sleep(delay);
        }

        if *self.should_fail_override.lock().unwrap() {
            return Err(SessionError::OverrideRejected(
                "Mock override failure".to_string(),
            ));
        }
        Ok(())
    }

    fn set_category(
        &self,
        category: SessionCategory,
        options: CategoryOptions,
    ) -> std::result::Result<(), SessionError> {
        self.record(SessionCall::SetCategory(category, options));
        if *self.should_fail_category.lock().unwrap() {
            return Err(SessionError::SessionSetup(
                "Mock category failure".to_string(),
            ));
        }
        Ok(())
    }

    fn set_active(&self, active: bool) -> std::result::Result<(), SessionError> {
        self.record(SessionCall::SetActive(active));
        if *self.should_fail_activation.lock().unwrap() {
            return Err(SessionError::SessionSetup(
                "Mock activation failure".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for MockAudioSession {
    fn default() -> Self {
        Self::new()
    }
}

/// Mock file system for testing - provides controllable file operations
#[derive(Clone)]
pub struct MockFileSystem {
    pub files: Arc<Mutex<HashMap<PathBuf, String>>>,
    pub write_calls: Arc<Mutex<Vec<(PathBuf, String)>>>,
    pub directory_creation_calls: Arc<Mutex<Vec<PathBuf>>>,
    pub should_fail_read: Arc<Mutex<bool>>,
    pub should_fail_write: Arc<Mutex<bool>>,
    pub should_fail_create_dir: Arc<Mutex<bool>>,
}

impl MockFileSystem {
    pub fn new() -> Self {
        Self {
            files: Arc::new(Mutex::new(HashMap::new())),
            write_calls: Arc::new(Mutex::new(Vec::new())),
            directory_creation_calls: Arc::new(Mutex::new(Vec::new())),
            should_fail_read: Arc::new(Mutex::new(false)),
            should_fail_write: Arc::new(Mutex::new(false)),
            should_fail_create_dir: Arc::new(Mutex::new(false)),
        }
    }

    /// Add a file to the mock file system
    pub fn add_file<P: AsRef<Path>>(&self, path: P, content: String) {
        self.files
            .lock()
            .unwrap()
            .insert(path.as_ref().to_path_buf(), content);
    }

    /// Get all write calls that were made
    pub fn get_write_calls(&self) -> Vec<(PathBuf, String)> {
        self.write_calls.lock().unwrap().clone()
    }

    /// Get all directory creation calls that were made
    pub fn get_directory_creation_calls(&self) -> Vec<PathBuf> {
        self.directory_creation_calls.lock().unwrap().clone()
    }

    pub fn set_read_failure(&self, should_fail: bool) {
        *self.should_fail_read.lock().unwrap() = should_fail;
    }

    pub fn set_write_failure(&self, should_fail: bool) {
        *self.should_fail_write.lock().unwrap() = should_fail;
    }

    pub fn set_create_dir_failure(&self, should_fail: bool) {
        *self.should_fail_create_dir.lock().unwrap() = should_fail;
    }
}

impl FileSystemInterface for MockFileSystem {
    fn read_config_file(&self, path: &Path) -> Result<String> {
        if *self.should_fail_read.lock().unwrap() {
            return Err(anyhow::anyhow!("Mock read failure"));
        }

        self.files
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("File not found: {}", path.display()))
    }

    fn write_config_file(&self, path: &Path, content: &str) -> Result<()> {
        self.write_calls
            .lock()
            .unwrap()
            .push((path.to_path_buf(), content.to_string()));

        if *self.should_fail_write.lock().unwrap() {
            return Err(anyhow::anyhow!("Mock write failure"));
        }

        self.files
            .lock()
            .unwrap()
            .insert(path.to_path_buf(), content.to_string());
        Ok(())
    }

    fn config_file_exists(&self, path: &Path) -> bool {
        self.files.lock().unwrap().contains_key(path)
    }

    fn create_config_dir(&self, path: &Path) -> Result<()> {
        self.directory_creation_calls
            .lock()
            .unwrap()
            .push(path.to_path_buf());

        if *self.should_fail_create_dir.lock().unwrap() {
            return Err(anyhow::anyhow!("Mock create directory failure"));
        }

        Ok(())
    }
}

impl Default for MockFileSystem {
    fn default() -> Self {
        Self::new()
    }
}
