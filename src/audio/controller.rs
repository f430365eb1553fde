use serde::Serialize;
use std::sync::{Arc, Mutex};
use tracing::{debug, error, info};

use super::session::{CategoryOptions, OverrideType, SessionCategory};
use crate::error::SessionError;
use crate::system::{AudioSessionInterface, Completion, SessionWorker};

/// Result delivered for every override request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverrideOutcome {
    pub success: bool,
    pub message: Option<String>,
    pub is_fatal: bool,
}

impl OverrideOutcome {
    pub fn succeeded() -> Self {
        Self {
            success: true,
            message: None,
            is_fatal: false,
        }
    }
}

impl From<&SessionError> for OverrideOutcome {
    fn from(error: &SessionError) -> Self {
        let message = match error {
            SessionError::InvalidInput(_) => "No valid output provided...".to_string(),
            SessionError::SessionSetup(detail) => {
                format!("Error setting session settings: {}", detail)
            }
            SessionError::OverrideRejected(detail) => {
                format!("Could not override output port: {}", detail)
            }
            other => other.to_string(),
        };

        Self {
            success: false,
            message: Some(message),
            is_fatal: error.is_fatal(),
        }
    }
}

/// An override request: either already answered or running on the worker
pub enum OverrideRequest {
    Completed(OverrideOutcome),
    Pending(Completion<OverrideOutcome>),
}

impl OverrideRequest {
    pub fn is_pending(&self) -> bool {
        matches!(self, OverrideRequest::Pending(_))
    }

    /// Resolve to the single outcome of this request
    pub async fn outcome(self) -> OverrideOutcome {
        match self {
            OverrideRequest::Completed(outcome) => outcome,
            OverrideRequest::Pending(completion) => match completion.wait().await {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!("Override did not complete: {}", e);
                    OverrideOutcome::from(&e)
                }
            },
        }
    }
}

/// Handles explicit "route output to speaker / default" requests
pub struct OverrideController<A: AudioSessionInterface + 'static> {
    session: Arc<A>,
    worker: Arc<SessionWorker>,
    current_override: Arc<Mutex<Option<OverrideType>>>,
}

impl<A: AudioSessionInterface + 'static> OverrideController<A> {
    pub fn new(session: Arc<A>, worker: Arc<SessionWorker>) -> Self {
        Self {
            session,
            worker,
            current_override: Arc::new(Mutex::new(None)),
        }
    }

    /// Last override applied through this controller. The OS may have moved
    /// the route since, so this is only used to skip redundant requests.
    pub fn current_override(&self) -> Option<OverrideType> {
        self.current_override.lock().ok().and_then(|current| *current)
    }

    pub fn request(&self, requested: &str) -> OverrideRequest {
        let requested = match requested.parse::<OverrideType>() {
            Ok(requested) => requested,
            Err(e) => {
                debug!("Rejecting override request: {}", e);
                return OverrideRequest::Completed(OverrideOutcome::from(&e));
            }
        };

        if self.current_override() == Some(requested) {
            debug!("Output already overridden to {}", requested);
            return OverrideRequest::Completed(OverrideOutcome::succeeded());
        }

        let session = self.session.clone();
        let current_override = self.current_override.clone();

        OverrideRequest::Pending(self.worker.submit(move || {
            match apply_override(session.as_ref(), requested) {
                Ok(()) => {
                    if let Ok(mut current) = current_override.lock() {
                        *current = Some(requested);
                    }
                    info!("Output override set to {}", requested);
                    OverrideOutcome::succeeded()
                }
                Err(e) => {
                    error!("Output override to {} failed: {}", requested, e);
                    OverrideOutcome::from(&e)
                }
            }
        }))
    }
}

fn apply_override<A: AudioSessionInterface + ?Sized>(
    session: &A,
    requested: OverrideType,
) -> Result<(), SessionError> {
    session.set_active(true)?;
    session.set_category(SessionCategory::PlayAndRecord, CategoryOptions::for_override())?;
    session.override_output(requested.port_override())
}
