use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::catalog::Port;
use crate::priority::{ConfigureOptions, PriorityOrder, RoutingPolicy};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub logging: LogSettings,

    #[serde(default)]
    pub routing: RoutingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub log_level: String,
    /// Upper bound for a single audio session command
    pub command_timeout_ms: u64,
    pub log_retention_days: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    pub console_output: bool,
    pub file_output: bool,
    pub json_format: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    pub auto_switch_bluetooth: bool,
    // Unknown tokens are dropped while parsing.
    pub priority_order: PriorityOrder,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            command_timeout_ms: 5000,
            log_retention_days: 7,
        }
    }
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            console_output: true,
            file_output: false,
            json_format: false,
        }
    }
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            auto_switch_bluetooth: false,
            priority_order: PriorityOrder::default(),
        }
    }
}

impl GeneralConfig {
    pub fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout_ms.max(1))
    }
}

impl RoutingConfig {
    pub fn policy(&self) -> RoutingPolicy {
        RoutingPolicy::new(self.priority_order.clone(), self.auto_switch_bluetooth)
    }

    /// The same settings expressed as a `configure` call
    pub fn to_options(&self) -> ConfigureOptions {
        ConfigureOptions {
            auto_switch_bluetooth: Some(self.auto_switch_bluetooth),
            priority_order: Some(
                self.priority_order
                    .tokens()
                    .into_iter()
                    .map(String::from)
                    .collect(),
            ),
        }
    }
}

impl Config {
    /// Non-fatal problems worth reporting to the user
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.general.command_timeout_ms == 0 {
            warnings.push("command_timeout_ms is 0, using 1ms".to_string());
        }

        if self.routing.priority_order.is_empty() {
            warnings.push("priority_order is empty, automatic switching never changes the route".to_string());
        } else if self
            .routing
            .priority_order
            .position(Port::BuiltinSpeaker)
            .is_none()
        {
            warnings.push("priority_order has no builtin-speaker fallback".to_string());
        }

        if !self.logging.console_output && !self.logging.file_output {
            warnings.push("all log outputs are disabled".to_string());
        }

        warnings
    }
}
