use std::sync::Arc;
use std::time::SystemTime;
use tracing::{debug, info};

use super::{InterruptionEvent, ListenerDispatch, RouteChangeEvent, SessionEvent};
use crate::catalog::{InterruptionType, RouteChangeReason};
use crate::priority::RoutingEngine;
use crate::system::{
    AudioSessionInterface, INTERRUPTION_TYPE_KEY, NativeNotification, NotificationKind,
    ROUTE_CHANGE_REASON_KEY,
};

/// Turns raw OS notifications into session events
///
/// Notifications without a usable payload are dropped without an event or an
/// error; the OS sends incomplete ones routinely.
pub struct EventTranslator<A: AudioSessionInterface + 'static> {
    dispatch: Arc<ListenerDispatch>,
    engine: Arc<RoutingEngine<A>>,
}

impl<A: AudioSessionInterface + 'static> EventTranslator<A> {
    pub fn new(dispatch: Arc<ListenerDispatch>, engine: Arc<RoutingEngine<A>>) -> Self {
        Self { dispatch, engine }
    }

    pub fn translate_route_change(notification: &NativeNotification) -> Option<RouteChangeEvent> {
        if notification.kind != NotificationKind::RouteChange {
            return None;
        }
        let code = notification.uint(ROUTE_CHANGE_REASON_KEY)?;
        Some(RouteChangeEvent {
            reason: RouteChangeReason::from_code(code),
            timestamp: SystemTime::now(),
        })
    }

    pub fn translate_interruption(notification: &NativeNotification) -> Option<InterruptionEvent> {
        if notification.kind != NotificationKind::Interruption {
            return None;
        }
        let code = notification.uint(INTERRUPTION_TYPE_KEY)?;
        Some(InterruptionEvent {
            interruption_type: InterruptionType::from_code(code),
            timestamp: SystemTime::now(),
        })
    }

    /// Translate, notify listeners and, with auto-switch on, queue a re-evaluation
    pub fn on_route_change(&self, notification: &NativeNotification) -> Option<RouteChangeEvent> {
        let Some(event) = Self::translate_route_change(notification) else {
            debug!("Dropping route change notification without a reason code");
            return None;
        };

        info!("Route changed: {}", event.reason);
        self.dispatch
            .emit(&SessionEvent::RouteChanged(event.clone()));

        if self.engine.auto_switch() {
            // Outcome arrives through routing listeners.
            let _ = self.engine.evaluate();
        }

        Some(event)
    }

    pub fn on_interruption(&self, notification: &NativeNotification) -> Option<InterruptionEvent> {
        let Some(event) = Self::translate_interruption(notification) else {
            debug!("Dropping interruption notification without a type code");
            return None;
        };

        info!("Audio interruption: {}", event.interruption_type);
        self.dispatch
            .emit(&SessionEvent::Interruption(event.clone()));

        Some(event)
    }

    pub fn handle(&self, notification: &NativeNotification) -> Option<SessionEvent> {
        match notification.kind {
            NotificationKind::RouteChange => self
                .on_route_change(notification)
                .map(SessionEvent::RouteChanged),
            NotificationKind::Interruption => self
                .on_interruption(notification)
                .map(SessionEvent::Interruption),
        }
    }
}
