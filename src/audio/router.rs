use anyhow::Result;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, Weak};
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{debug, info};

use super::controller::{OverrideController, OverrideOutcome, OverrideRequest};
use super::session::OverrideType;
use crate::catalog::{ResolvedPort, translate};
use crate::config::Config;
use crate::error::SessionError;
use crate::events::{EventKind, EventTranslator, ListenerDispatch, Observer, SessionEvent, SubscriptionId};
use crate::priority::{ConfigureOptions, EvaluationHandle, RoutingEngine, RoutingPolicy};
use crate::system::{AudioSessionInterface, NativeNotification, NotificationKind, SessionWorker};

const SETTLE_ROUNDS: usize = 16;

const OBSERVED_KINDS: [NotificationKind; 2] =
    [NotificationKind::RouteChange, NotificationKind::Interruption];

/// Host-facing entry point: commands, configuration and event subscriptions
/// for one audio session
pub struct AudioSessionRouter<A: AudioSessionInterface + 'static> {
    session: Arc<A>,
    worker: Arc<SessionWorker>,
    dispatch: Arc<ListenerDispatch>,
    engine: Arc<RoutingEngine<A>>,
    overrides: OverrideController<A>,
    translator: Arc<EventTranslator<A>>,
    // Kinds already registered with the adapter; a failed load keeps its partial progress.
    subscribed: Mutex<HashSet<NotificationKind>>,
}

impl<A: AudioSessionInterface + 'static> AudioSessionRouter<A> {
    pub fn new(session: A, config: &Config) -> Result<Self> {
        Self::with_policy(session, config, config.routing.policy())
    }

    pub fn with_policy(session: A, config: &Config, policy: RoutingPolicy) -> Result<Self> {
        let session = Arc::new(session);
        let worker = Arc::new(SessionWorker::spawn(
            "audio-session",
            config.general.command_timeout(),
        )?);
        let dispatch = Arc::new(ListenerDispatch::new());
        let engine = Arc::new(RoutingEngine::new(
            session.clone(),
            worker.clone(),
            dispatch.clone(),
            policy,
        ));
        let overrides = OverrideController::new(session.clone(), worker.clone());
        let translator = Arc::new(EventTranslator::new(dispatch.clone(), engine.clone()));

        info!("Created audio session router");

        Ok(Self {
            session,
            worker,
            dispatch,
            engine,
            overrides,
            translator,
            subscribed: Mutex::new(HashSet::new()),
        })
    }

    /// Start observing OS notifications. With auto-switch already enabled a
    /// corrective evaluation is queued and its handle returned.
    pub fn load(&self) -> std::result::Result<Option<EvaluationHandle>, SessionError> {
        let mut subscribed = self
            .subscribed
            .lock()
            .map_err(|_| SessionError::Subscription("subscription state poisoned".to_string()))?;

        if subscribed.len() == OBSERVED_KINDS.len() {
            debug!("Router already loaded");
            return Ok(None);
        }

        for kind in OBSERVED_KINDS {
            if subscribed.contains(&kind) {
                continue;
            }

            // The adapter keeps only a weak link so dropping the router ends delivery.
            let translator: Weak<EventTranslator<A>> = Arc::downgrade(&self.translator);
            self.session.subscribe(
                kind,
                Box::new(move |notification: &NativeNotification| {
                    if let Some(translator) = translator.upgrade() {
                        translator.handle(notification);
                    }
                }),
            )?;
            subscribed.insert(kind);
        }

        info!("Observing route change and interruption notifications");

        Ok(self.engine.auto_switch().then(|| self.engine.evaluate()))
    }

    /// Ports currently carrying output; unrecognized hardware shows up as `unknown`
    pub async fn current_outputs(&self) -> std::result::Result<Vec<ResolvedPort>, SessionError> {
        let session = self.session.clone();
        self.worker
            .submit(move || session.current_outputs())
            .wait()
            .await?
            .map(|outputs| outputs.iter().map(|id| translate(id)).collect())
    }

    /// Start an override; invalid and redundant requests complete immediately
    pub fn request_override(&self, requested: &str) -> OverrideRequest {
        self.overrides.request(requested)
    }

    pub async fn override_output(&self, requested: &str) -> OverrideOutcome {
        self.request_override(requested).outcome().await
    }

    pub fn current_override(&self) -> Option<OverrideType> {
        self.overrides.current_override()
    }

    pub fn configure(&self, options: ConfigureOptions) -> Option<EvaluationHandle> {
        self.engine.configure(options)
    }

    /// Queue a routing pass regardless of the auto-switch flag
    pub fn evaluate(&self) -> EvaluationHandle {
        self.engine.evaluate()
    }

    pub fn policy(&self) -> RoutingPolicy {
        self.engine.policy()
    }

    /// Wait until queued commands and any passes they triggered have run
    ///
    /// A pass can itself change the route and queue another, so this drains
    /// the worker repeatedly until no pass is outstanding.
    pub async fn settle(&self) {
        for _ in 0..SETTLE_ROUNDS {
            if let Err(e) = self.worker.submit(|| ()).wait().await {
                debug!("Worker did not settle: {}", e);
                return;
            }
            if self.engine.pending_passes() == 0 {
                return;
            }
        }
        debug!("Routing passes still pending after {} rounds", SETTLE_ROUNDS);
    }

    pub fn add_listener(&self, kind: EventKind, observer: Observer) -> SubscriptionId {
        self.dispatch.subscribe(kind, observer)
    }

    /// Register by bridge event name (`routeChanged`, `interruption`, `routing`)
    pub fn add_listener_by_name(
        &self,
        event_name: &str,
        observer: Observer,
    ) -> std::result::Result<SubscriptionId, SessionError> {
        let kind = EventKind::from_name(event_name).ok_or_else(|| {
            SessionError::InvalidInput(format!("unknown event name '{}'", event_name))
        })?;
        Ok(self.add_listener(kind, observer))
    }

    /// Single-slot registration replacing every listener of `kind`
    pub fn set_listener(&self, kind: EventKind, observer: Observer) -> SubscriptionId {
        self.dispatch.replace(kind, observer)
    }

    pub fn remove_listener(&self, id: SubscriptionId) -> bool {
        self.dispatch.unsubscribe(id)
    }

    pub fn events(&self, kind: EventKind) -> UnboundedReceiverStream<SessionEvent> {
        self.dispatch.stream(kind).1
    }

    /// Feed a notification as if the OS had delivered it
    pub fn handle_notification(&self, notification: &NativeNotification) -> Option<SessionEvent> {
        self.translator.handle(notification)
    }

    pub fn session(&self) -> &A {
        &self.session
    }
}
