use crate::humanize::{ByteSize, HumanDuration};
use serde::{Deserialize, Serialize};

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub lifecycle: LifecycleConfig,
    #[serde(default)]
    pub demo: DemoConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Worker lifecycle timings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LifecycleConfig {
    /// Bound on `start`; absent means wait for readiness indefinitely.
    #[serde(default)]
    pub start_timeout: Option<HumanDuration>,
    #[serde(default = "default_wait_end_timeout")]
    pub wait_end_timeout: HumanDuration,
    #[serde(default = "default_exit_poll_attempts")]
    pub exit_poll_attempts: u32,
    #[serde(default = "default_exit_poll_interval")]
    pub exit_poll_interval: HumanDuration,
    #[serde(default)]
    pub stack_size: Option<ByteSize>,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            start_timeout: None,
            wait_end_timeout: default_wait_end_timeout(),
            exit_poll_attempts: default_exit_poll_attempts(),
            exit_poll_interval: default_exit_poll_interval(),
            stack_size: None,
        }
    }
}

fn default_wait_end_timeout() -> HumanDuration {
    HumanDuration::from_secs(2)
}

fn default_exit_poll_attempts() -> u32 {
    50
}

fn default_exit_poll_interval() -> HumanDuration {
    HumanDuration::from_millis(10)
}

/// Demo run settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DemoConfig {
    #[serde(default = "default_viewers")]
    pub viewers: usize,
    #[serde(default = "default_tick")]
    pub tick: HumanDuration,
    #[serde(default = "default_script")]
    pub script: Vec<String>,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            viewers: default_viewers(),
            tick: default_tick(),
            script: default_script(),
        }
    }
}

fn default_viewers() -> usize {
    1
}

fn default_tick() -> HumanDuration {
    HumanDuration::from_millis(16)
}

fn default_script() -> Vec<String> {
    ["show cube", "show sphere", "refresh", "clear", "show cone"]
        .into_iter()
        .map(String::from)
        .collect()
}

/// Telemetry configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TelemetryConfig {
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_filter: default_log_filter(),
        }
    }
}

fn default_log_filter() -> String {
    "info".to_string()
}
