use serde::{Deserialize, Serialize};
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use std::time::SystemTime;
use tracing::{debug, error, info, warn};

use super::manager::{PriorityOrder, RoutingPolicy};
use crate::audio::{CategoryOptions, PortOverride, SessionCategory};
use crate::catalog::{Port, ResolvedPort, translate};
use crate::error::SessionError;
use crate::events::{ListenerDispatch, RoutingEvent, SessionEvent};
use crate::system::{AudioSessionInterface, Completion, SessionWorker};

/// Options accepted by `configure`, as sent by the host bridge
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigureOptions {
    pub auto_switch_bluetooth: Option<bool>,
    pub priority_order: Option<Vec<String>>,
}

/// Terminal state of one evaluation pass
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "result", rename_all = "kebab-case")]
pub enum EvaluationOutcome {
    Applied { port: Port },
    NoMatch,
    Failed { error: SessionError },
}

impl fmt::Display for EvaluationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvaluationOutcome::Applied { port } => write!(f, "applied {}", port),
            EvaluationOutcome::NoMatch => write!(f, "no-match"),
            EvaluationOutcome::Failed { error } => write!(f, "failed ({})", error),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutingPhase {
    Idle,
    Evaluating,
}

/// Awaitable result of a queued evaluation
pub struct EvaluationHandle {
    completion: Completion<EvaluationOutcome>,
}

impl EvaluationHandle {
    pub async fn wait(self) -> EvaluationOutcome {
        self.completion
            .wait()
            .await
            .unwrap_or_else(|error| EvaluationOutcome::Failed { error })
    }
}

/// Applies the routing policy to the live audio session
///
/// Passes run on the session worker one at a time, so rapid route changes
/// are evaluated in order rather than racing each other.
pub struct RoutingEngine<A: AudioSessionInterface + 'static> {
    session: Arc<A>,
    worker: Arc<SessionWorker>,
    policy: Arc<RwLock<RoutingPolicy>>,
    dispatch: Arc<ListenerDispatch>,
    evaluating: Arc<AtomicBool>,
    pending: Arc<AtomicUsize>,
}

impl<A: AudioSessionInterface + 'static> RoutingEngine<A> {
    pub fn new(
        session: Arc<A>,
        worker: Arc<SessionWorker>,
        dispatch: Arc<ListenerDispatch>,
        policy: RoutingPolicy,
    ) -> Self {
        Self {
            session,
            worker,
            policy: Arc::new(RwLock::new(policy)),
            dispatch,
            evaluating: Arc::new(AtomicBool::new(false)),
            pending: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn policy(&self) -> RoutingPolicy {
        self.policy
            .read()
            .map(|policy| policy.clone())
            .unwrap_or_default()
    }

    pub fn auto_switch(&self) -> bool {
        self.policy
            .read()
            .map(|policy| policy.auto_switch)
            .unwrap_or(false)
    }

    pub fn phase(&self) -> RoutingPhase {
        if self.evaluating.load(Ordering::SeqCst) {
            RoutingPhase::Evaluating
        } else {
            RoutingPhase::Idle
        }
    }

    /// Passes queued or running on the worker
    pub fn pending_passes(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    /// Update the policy; with auto-switch on, queue one corrective pass
    ///
    /// The pass activates the session before evaluating, so it sees the
    /// route that results from activation instead of guessing a settle delay.
    pub fn configure(&self, options: ConfigureOptions) -> Option<EvaluationHandle> {
        let auto_switch = match self.policy.write() {
            Ok(mut policy) => {
                if let Some(auto_switch) = options.auto_switch_bluetooth {
                    policy.auto_switch = auto_switch;
                }
                if let Some(tokens) = options.priority_order.as_deref() {
                    policy.priority_order = PriorityOrder::from_tokens(tokens);
                }
                info!(
                    "Routing configured (auto-switch: {}, order: {})",
                    policy.auto_switch, policy.priority_order
                );
                policy.auto_switch
            }
            Err(_) => {
                error!("Routing policy lock poisoned, configuration ignored");
                return None;
            }
        };

        auto_switch.then(|| self.submit(true))
    }

    /// Queue one evaluation pass against the current route
    pub fn evaluate(&self) -> EvaluationHandle {
        self.submit(false)
    }

    fn submit(&self, activate_first: bool) -> EvaluationHandle {
        let session = self.session.clone();
        let policy = self.policy.clone();
        let dispatch = self.dispatch.clone();
        let evaluating = self.evaluating.clone();
        let pending = self.pending.clone();

        pending.fetch_add(1, Ordering::SeqCst);
        let completion = self.worker.submit(move || {
            evaluating.store(true, Ordering::SeqCst);

            let pass = catch_unwind(AssertUnwindSafe(|| {
                // Read at run time so a configure queued earlier is honored.
                let snapshot = policy.read().map(|p| p.clone()).unwrap_or_default();
                if activate_first {
                    if let Err(error) = activate_session(session.as_ref()) {
                        warn!("Session activation before evaluation failed: {}", error);
                        return EvaluationOutcome::Failed { error };
                    }
                }
                run_pass(session.as_ref(), &snapshot)
            }));
            let outcome = pass.unwrap_or_else(|_| {
                error!("Routing pass panicked in the audio session adapter");
                EvaluationOutcome::Failed {
                    error: SessionError::AdapterPanicked,
                }
            });

            evaluating.store(false, Ordering::SeqCst);

            dispatch.emit(&SessionEvent::Routing(RoutingEvent {
                outcome: outcome.clone(),
                timestamp: SystemTime::now(),
            }));
            pending.fetch_sub(1, Ordering::SeqCst);
            outcome
        });

        EvaluationHandle { completion }
    }
}

fn activate_session<A: AudioSessionInterface + ?Sized>(session: &A) -> Result<(), SessionError> {
    session.set_category(SessionCategory::PlayAndRecord, CategoryOptions::for_override())?;
    session.set_active(true)
}

/// One evaluation: query, select, apply. Attempts exactly one target.
fn run_pass<A: AudioSessionInterface + ?Sized>(
    session: &A,
    policy: &RoutingPolicy,
) -> EvaluationOutcome {
    debug!("Routing evaluation started");

    let connected: Vec<ResolvedPort> = match session.current_outputs() {
        Ok(outputs) => outputs.iter().map(|id| translate(id)).collect(),
        Err(error) => {
            warn!("Could not query current outputs: {}", error);
            return EvaluationOutcome::Failed { error };
        }
    };

    debug!(
        "Current outputs: [{}]",
        connected
            .iter()
            .map(|p| p.token())
            .collect::<Vec<_>>()
            .join(", ")
    );

    let Some(target) = policy.select_target(&connected) else {
        info!("No preferred output connected, leaving route unchanged");
        return EvaluationOutcome::NoMatch;
    };

    match apply_target(session, target) {
        Ok(()) => {
            info!("Routed output to {}", target);
            EvaluationOutcome::Applied { port: target }
        }
        Err(error) => {
            warn!("Switching output to {} failed: {}", target, error);
            EvaluationOutcome::Failed { error }
        }
    }
}

fn apply_target<A: AudioSessionInterface + ?Sized>(
    session: &A,
    target: Port,
) -> Result<(), SessionError> {
    let options = CategoryOptions::for_port(target);
    debug!("Applying {} with options {}", target, options);

    session.set_category(SessionCategory::PlayAndRecord, options)?;

    let port_override = if target == Port::BuiltinSpeaker {
        PortOverride::Speaker
    } else {
        PortOverride::None
    };
    session.override_output(port_override)?;

    session.set_active(true)
}
