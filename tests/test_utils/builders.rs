//! Test utility builders for configurations, notifications and observers
//!
//! Individual helpers may not be used by all tests, so dead code warnings are suppressed.

#![allow(dead_code)]

use audio_session_router::catalog::Port;
use audio_session_router::config::Config;
use audio_session_router::events::{Observer, SessionEvent};
use audio_session_router::priority::PriorityOrder;
use audio_session_router::system::{
    INTERRUPTION_TYPE_KEY, NativeNotification, NotificationKind, NotificationValue,
    ROUTE_CHANGE_REASON_KEY,
};
use std::sync::{Arc, Mutex};

/// Builder for creating test Config instances
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn auto_switch(mut self) -> Self {
        self.config.routing.auto_switch_bluetooth = true;
        self
    }

    pub fn order(mut self, ports: &[Port]) -> Self {
        self.config.routing.priority_order = PriorityOrder::new(ports.iter().copied());
        self
    }

    pub fn command_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.config.general.command_timeout_ms = timeout_ms;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for raw OS notifications, including malformed ones
pub struct NotificationBuilder {
    notification: NativeNotification,
}

impl NotificationBuilder {
    pub fn route_change() -> Self {
        Self {
            notification: NativeNotification::new(NotificationKind::RouteChange),
        }
    }

    pub fn interruption() -> Self {
        Self {
            notification: NativeNotification::new(NotificationKind::Interruption),
        }
    }

    pub fn reason(mut self, code: u64) -> Self {
        self.notification = self
            .notification
            .with_value(ROUTE_CHANGE_REASON_KEY, NotificationValue::UInt(code));
        self
    }

    pub fn interruption_type(mut self, code: u64) -> Self {
        self.notification = self
            .notification
            .with_value(INTERRUPTION_TYPE_KEY, NotificationValue::UInt(code));
        self
    }

    pub fn value(mut self, key: &str, value: NotificationValue) -> Self {
        self.notification = self.notification.with_value(key, value);
        self
    }

    pub fn build(self) -> NativeNotification {
        self.notification
    }
}

/// Observer that records every event it receives
pub fn recording_observer() -> (Observer, Arc<Mutex<Vec<SessionEvent>>>) {
    let events = Arc::new(Mutex::new(Vec::new()));
    let seen = events.clone();
    let observer: Observer = Arc::new(move |event: &SessionEvent| -> anyhow::Result<()> {
        seen.lock().unwrap().push(event.clone());
        Ok(())
    });
    (observer, events)
}

/// Observer that always fails
pub fn failing_observer() -> Observer {
    Arc::new(|_: &SessionEvent| -> anyhow::Result<()> { anyhow::bail!("observer failed") })
}
