//! Pipeline configuration using Figment.
//!
//! Configuration is loaded from:
//! 1. `config/framepipe.toml` (or any path given to [`PipelineConfig::load_from`])
//! 2. Environment variables prefixed with `FRAMEPIPE_`
//!
//! Every field has a default, so an empty or missing file yields
//! [`PipelineConfig::default`].
//!
//! # Example
//! ```no_run
//! use framepipe::config::PipelineConfig;
//!
//! let config = PipelineConfig::load()?;
//! config.validate()?;
//! println!("slots: {}", config.slot_count);
//! # Ok::<(), framepipe::PipelineError>(())
//! ```

use crate::error::{PipelineError, PipelineResult};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default location of the configuration file.
pub const DEFAULT_CONFIG_PATH: &str = "config/framepipe.toml";

/// Prefix for environment overrides, e.g. `FRAMEPIPE_SLOT_COUNT=4`.
pub const ENV_PREFIX: &str = "FRAMEPIPE_";

const VALID_LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Tuning knobs for one pipeline instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Number of slots in the pool, fixed for the pipeline's lifetime
    #[serde(default = "default_slot_count")]
    pub slot_count: usize,
    /// Bound on each timed wait for `pending` or `ready`, in milliseconds
    #[serde(default = "default_wait_timeout")]
    pub wait_timeout_ms: u64,
    /// Pause between clearing the run state and waking workers on stop
    #[serde(default = "default_shutdown_grace")]
    pub shutdown_grace_ms: u64,
    /// Throughput measurement window in milliseconds
    #[serde(default = "default_rate_window")]
    pub rate_window_ms: u64,
    /// Logging level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

// Default value functions
fn default_slot_count() -> usize {
    8
}

fn default_wait_timeout() -> u64 {
    100
}

fn default_shutdown_grace() -> u64 {
    10
}

fn default_rate_window() -> u64 {
    1000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            slot_count: default_slot_count(),
            wait_timeout_ms: default_wait_timeout(),
            shutdown_grace_ms: default_shutdown_grace(),
            rate_window_ms: default_rate_window(),
            log_level: default_log_level(),
        }
    }
}

impl PipelineConfig {
    /// Load configuration from `config/framepipe.toml` and the environment.
    pub fn load() -> PipelineResult<Self> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    /// Load configuration from a specific file path.
    ///
    /// Environment variables override the file, e.g.
    /// `FRAMEPIPE_WAIT_TIMEOUT_MS=50`.
    pub fn load_from<P: AsRef<Path>>(path: P) -> PipelineResult<Self> {
        let config = Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed(ENV_PREFIX))
            .extract()?;
        Ok(config)
    }

    /// Validate configuration after loading.
    pub fn validate(&self) -> PipelineResult<()> {
        if self.slot_count == 0 {
            return Err(PipelineError::InvalidConfig(
                "slot_count must be at least 1".to_string(),
            ));
        }

        for (name, value) in [
            ("wait_timeout_ms", self.wait_timeout_ms),
            ("rate_window_ms", self.rate_window_ms),
        ] {
            if value == 0 {
                return Err(PipelineError::InvalidConfig(format!(
                    "{name} must be greater than 0"
                )));
            }
        }

        if !VALID_LOG_LEVELS.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(PipelineError::InvalidConfig(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.log_level,
                VALID_LOG_LEVELS.join(", ")
            )));
        }

        Ok(())
    }

    /// Pool size with a different slot count.
    #[must_use]
    pub fn with_slot_count(mut self, slot_count: usize) -> Self {
        self.slot_count = slot_count;
        self
    }

    /// Timed-wait bound for the transform worker and drain step.
    #[must_use]
    pub fn wait_timeout(&self) -> Duration {
        Duration::from_millis(self.wait_timeout_ms)
    }

    /// Grace interval used by `stop`.
    #[must_use]
    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }

    /// Throughput measurement window.
    #[must_use]
    pub fn rate_window(&self) -> Duration {
        Duration::from_millis(self.rate_window_ms)
    }
}
