use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::fmt;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

use crate::audio::AudioSessionRouter;
use crate::catalog::{InterruptionType, Port};
use crate::config::Config;
use crate::events::{EventKind, Observer, SessionEvent};
use crate::priority::ConfigureOptions;
use crate::system::SimulatedAudioSession;

/// A scripted sequence of hardware and host actions
///
/// ```toml
/// initial_ports = ["builtin-speaker"]
///
/// [[step]]
/// action = "configure"
/// auto_switch_bluetooth = true
///
/// [[step]]
/// action = "attach"
/// port = "headphones"
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub name: Option<String>,

    /// Ports present before the router starts observing
    #[serde(default)]
    pub initial_ports: Vec<String>,

    #[serde(default, rename = "step")]
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "action", rename_all = "kebab-case")]
pub enum Step {
    /// Plug in a port, by token or by native id for unrecognized hardware
    Attach { port: String },
    Detach { port: String },
    /// `began`, `ended` or a raw type code
    Interrupt { phase: String },
    Override { output: String },
    Configure {
        auto_switch_bluetooth: Option<bool>,
        priority_order: Option<Vec<String>>,
    },
    Evaluate,
    Outputs,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Attach { port } => write!(f, "attach {}", port),
            Step::Detach { port } => write!(f, "detach {}", port),
            Step::Interrupt { phase } => write!(f, "interrupt {}", phase),
            Step::Override { output } => write!(f, "override {}", output),
            Step::Configure {
                auto_switch_bluetooth,
                priority_order,
            } => {
                write!(f, "configure")?;
                if let Some(auto_switch) = auto_switch_bluetooth {
                    write!(f, " auto-switch={}", auto_switch)?;
                }
                if let Some(order) = priority_order {
                    write!(f, " order=[{}]", order.join(", "))?;
                }
                Ok(())
            }
            Step::Evaluate => write!(f, "evaluate"),
            Step::Outputs => write!(f, "outputs"),
        }
    }
}

impl Scenario {
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse scenario")
    }
}

/// Tokens name catalog ports; anything else is taken as a native id
pub fn native_id_for(port: &str) -> String {
    Port::from_token(port)
        .map(|p| p.native_id().to_string())
        .unwrap_or_else(|| port.to_string())
}

fn interruption_code(phase: &str) -> Result<u64> {
    match phase {
        "began" => Ok(1),
        "ended" => Ok(0),
        other => match other.parse::<u64>() {
            Ok(code) => Ok(code),
            Err(_) => bail!("Unknown interruption phase '{}'", other),
        },
    }
}

/// Replays a scenario against the simulated session, recording every event
/// and command result as one transcript line
pub struct ScenarioRunner {
    session: SimulatedAudioSession,
    router: AudioSessionRouter<SimulatedAudioSession>,
    transcript: Arc<Mutex<Vec<String>>>,
}

impl ScenarioRunner {
    pub fn new(scenario: &Scenario, config: &Config) -> Result<Self> {
        let session = SimulatedAudioSession::new();
        // No handlers are registered yet, so these attach silently.
        for port in &scenario.initial_ports {
            session.attach(&native_id_for(port));
        }

        let router = AudioSessionRouter::new(session.clone(), config)?;
        let transcript = Arc::new(Mutex::new(Vec::new()));

        for kind in [EventKind::RouteChange, EventKind::Interruption, EventKind::Routing] {
            let lines = transcript.clone();
            let observer: Observer = Arc::new(move |event: &SessionEvent| -> Result<()> {
                if let Ok(mut lines) = lines.lock() {
                    lines.push(format!("  event {}", event));
                }
                Ok(())
            });
            router.add_listener(kind, observer);
        }

        Ok(Self {
            session,
            router,
            transcript,
        })
    }

    pub fn router(&self) -> &AudioSessionRouter<SimulatedAudioSession> {
        &self.router
    }

    pub fn session(&self) -> &SimulatedAudioSession {
        &self.session
    }

    fn record(&self, line: String) {
        if let Ok(mut lines) = self.transcript.lock() {
            lines.push(line);
        }
    }

    /// Load the router, run every step to quiescence and return the transcript
    pub async fn run(&self, scenario: &Scenario) -> Result<Vec<String>> {
        if let Some(name) = &scenario.name {
            info!("Running scenario: {}", name);
        }

        self.record("load".to_string());
        if let Some(handle) = self.router.load()? {
            handle.wait().await;
        }
        self.router.settle().await;

        for (index, step) in scenario.steps.iter().enumerate() {
            debug!("Scenario step {}: {}", index + 1, step);
            self.record(format!("step {}: {}", index + 1, step));
            self.apply(step).await?;
            self.router.settle().await;
        }

        Ok(self
            .transcript
            .lock()
            .map(|lines| lines.clone())
            .unwrap_or_default())
    }

    async fn apply(&self, step: &Step) -> Result<()> {
        match step {
            Step::Attach { port } => self.session.attach(&native_id_for(port)),
            Step::Detach { port } => self.session.detach(&native_id_for(port)),
            Step::Interrupt { phase } => {
                let code = interruption_code(phase)?;
                if InterruptionType::from_code(code) == InterruptionType::Unknown {
                    debug!("Raising interruption with unrecognized code {}", code);
                }
                self.session.interrupt(code);
            }
            Step::Override { output } => {
                let outcome = self.router.override_output(output).await;
                match outcome.message {
                    Some(message) => self.record(format!(
                        "  override success={} fatal={} message={}",
                        outcome.success, outcome.is_fatal, message
                    )),
                    None => self.record(format!("  override success={}", outcome.success)),
                }
            }
            Step::Configure {
                auto_switch_bluetooth,
                priority_order,
            } => {
                let options = ConfigureOptions {
                    auto_switch_bluetooth: *auto_switch_bluetooth,
                    priority_order: priority_order.clone(),
                };
                if let Some(handle) = self.router.configure(options) {
                    handle.wait().await;
                }
                self.record(format!("  policy {}", self.router.policy().priority_order));
            }
            Step::Evaluate => {
                self.router.evaluate().wait().await;
            }
            Step::Outputs => {
                let outputs = self.router.current_outputs().await?;
                let tokens: Vec<&str> = outputs.iter().map(|p| p.token()).collect();
                self.record(format!("  outputs [{}]", tokens.join(", ")));
            }
        }
        Ok(())
    }
}
