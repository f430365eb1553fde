use std::panic::{AssertUnwindSafe, catch_unwind};
use std::thread;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info};

use crate::error::{Result, SessionError};

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Dedicated thread that runs every audio session command in submission order
///
/// Callers never block: `submit` queues the job and hands back a [`Completion`]
/// that resolves once the job has run.
pub struct SessionWorker {
    sender: mpsc::UnboundedSender<Job>,
    timeout: Duration,
}

impl SessionWorker {
    pub fn spawn(name: &str, timeout: Duration) -> anyhow::Result<Self> {
        let (sender, mut receiver) = mpsc::unbounded_channel::<Job>();

        thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                debug!("Session worker started");
                while let Some(job) = receiver.blocking_recv() {
                    if catch_unwind(AssertUnwindSafe(job)).is_err() {
                        error!("Session job panicked, worker continues");
                    }
                }
                debug!("Session worker stopped");
            })?;

        info!("Spawned session worker '{}' (timeout {:?})", name, timeout);
        Ok(Self { sender, timeout })
    }

    /// Queue a job; the result is delivered through the returned completion
    pub fn submit<T, F>(&self, job: F) -> Completion<T>
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let queued = self.sender.send(Box::new(move || {
            // Receiver may already be gone; the job still ran.
            let _ = tx.send(job());
        }));

        match queued {
            Ok(()) => Completion {
                receiver: Some(rx),
                timeout: self.timeout,
            },
            Err(_) => {
                error!("Session worker is not accepting jobs");
                Completion {
                    receiver: None,
                    timeout: self.timeout,
                }
            }
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

/// Pending result of a job submitted to the [`SessionWorker`]
pub struct Completion<T> {
    receiver: Option<oneshot::Receiver<T>>,
    timeout: Duration,
}

impl<T> Completion<T> {
    /// Wait for the job, bounded by the worker's command timeout
    pub async fn wait(self) -> Result<T> {
        let receiver = self.receiver.ok_or(SessionError::WorkerUnavailable)?;

        match tokio::time::timeout(self.timeout, receiver).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(_)) => Err(SessionError::WorkerUnavailable),
            Err(_) => Err(SessionError::Timeout(self.timeout)),
        }
    }
}
