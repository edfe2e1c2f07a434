//! Configuration management for lifeline
//!
//! This module provides a layered configuration system that loads settings from:
//! 1. Default values (embedded in structs)
//! 2. TOML configuration file
//! 3. Environment variables (highest priority)
//!
//! # Usage
//!
//! ```no_run
//! use lifeline::config::Config;
//!
//! let config = Config::load().expect("Failed to load configuration");
//! println!("wait_end timeout: {}", config.lifecycle.wait_end_timeout);
//! ```
//!
//! # Environment Variables
//!
//! Configuration can be overridden using environment variables with the pattern:
//! `LIFELINE__<section>__<key>`
//!
//! Examples:
//! - `LIFELINE__LIFECYCLE__WAIT_END_TIMEOUT=5s`
//! - `LIFELINE__DEMO__VIEWERS=4`
//! - `LIFELINE__TELEMETRY__LOG_FILTER=lifeline=debug`
//!
//! # Configuration File
//!
//! By default, the configuration is loaded from `config/lifeline.toml`.
//! This can be overridden using the `LIFELINE_CONFIG` environment variable.

mod models;
mod sources;
mod validation;

pub use crate::humanize::{ByteSize, HumanDuration};
pub use models::{Config, DemoConfig, LifecycleConfig, TelemetryConfig};
pub use validation::{MAX_STACK_SIZE, MAX_VIEWERS, MIN_STACK_SIZE, ValidationError};

use crate::observability::LifecycleMetrics;
use crate::worker::WorkerOptions;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Configuration validation failed: {0}")]
    ValidationError(#[from] ValidationError),

    #[error("Failed to render configuration: {0}")]
    RenderError(#[from] toml::ser::Error),
}

impl Config {
    /// Load configuration from all sources (file + environment)
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file is malformed or validation
    /// fails.
    pub fn load() -> Result<Self, ConfigError> {
        let config = sources::load()?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let config = sources::load_from_sources(path.as_ref())?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Re-check invariants after programmatic overrides (e.g. CLI flags)
    pub fn validate(&self) -> Result<(), ConfigError> {
        validation::validate(self)?;
        Ok(())
    }

    /// Effective configuration rendered back to TOML
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

impl LifecycleConfig {
    /// Spawn options for a worker named `name` reporting into `metrics`.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::StackTooLarge`] if `stack_size` does not fit
    /// the platform's address space.
    pub fn worker_options(
        &self,
        name: impl Into<String>,
        metrics: Arc<LifecycleMetrics>,
    ) -> Result<WorkerOptions, ValidationError> {
        let stack_size = self
            .stack_size
            .map(|s| validation::stack_bytes(s.as_u64()))
            .transpose()?;

        Ok(WorkerOptions::builder()
            .name(name)
            .maybe_stack_size(stack_size)
            .metrics(metrics)
            .build())
    }
}
