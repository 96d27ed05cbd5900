#![forbid(unsafe_code)]

//! Roll tunables.
//!
//! A [`RollConfig`] gathers every knob the controller reads: spin timing,
//! cooldown, spin cadence, the outcome provider, and trigger labels. All
//! sections use `#[serde(default)]`, so a file only has to name the values
//! it changes:
//!
//! ```toml
//! [timing]
//! min_spin_duration_ms = 1500
//!
//! [provider]
//! url = "http://dice.local/roll"
//! timeout_ms = 3000
//! ```
//!
//! Loading never validates implicitly. Call [`RollConfig::validate`] (or
//! [`RollConfig::validated`]) once the final values, including command-line
//! overrides, are in place.

use std::path::{Path, PathBuf};
use std::time::Duration;

use dice_core::SpinCadence;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Upper bound for `spin.max_extra_spins`.
pub const MAX_EXTRA_SPINS: u32 = 16;

/// Errors that can occur when loading a roll configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid configuration: {}", .0.join("; "))]
    Validation(Vec<String>),
}

/// Complete controller configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RollConfig {
    pub timing: TimingConfig,
    pub spin: SpinConfig,
    pub provider: ProviderConfig,
    pub trigger: TriggerConfig,
}

/// Session timing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TimingConfig {
    /// Shortest time between `begin` and commit, even when the result is
    /// already known.
    pub min_spin_duration_ms: u64,
    /// Time from `begin` until the trigger is re-enabled. Independent of the
    /// animation.
    pub cooldown_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            min_spin_duration_ms: 1000,
            cooldown_ms: 2000,
        }
    }
}

/// Spin cadence and settle shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SpinConfig {
    pub min_delay_ms: u64,
    pub max_delay_ms: u64,
    pub delay_step_ms: u64,
    /// Probability that a tick turns 90° rather than 180°.
    pub quarter_turn_probability: f64,
    pub min_extra_spins: u32,
    pub max_extra_spins: u32,
}

impl Default for SpinConfig {
    fn default() -> Self {
        Self {
            min_delay_ms: 60,
            max_delay_ms: 240,
            delay_step_ms: 20,
            quarter_turn_probability: 0.6,
            min_extra_spins: 1,
            max_extra_spins: 2,
        }
    }
}

/// Outcome provider endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProviderConfig {
    pub url: String,
    /// Request timeout. `None` lets a hung request spin indefinitely.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:8080/roll".into(),
            timeout_ms: None,
        }
    }
}

/// Trigger labels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TriggerConfig {
    pub idle_label: String,
    pub rolling_label: String,
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            idle_label: "Roll".into(),
            rolling_label: "Rolling...".into(),
        }
    }
}

impl RollConfig {
    /// Load from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    /// Load from a TOML file on disk.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_toml_str(&read(path.as_ref())?)
    }

    /// Load from a JSON string.
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(s)?)
    }

    /// Load from a JSON file on disk.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_json_str(&read(path.as_ref())?)
    }

    /// Load a file, picking the format from its extension.
    ///
    /// `.json` is parsed as JSON; anything else as TOML.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            Self::from_json_file(path)
        } else {
            Self::from_toml_file(path)
        }
    }

    /// Validate all parameters are within acceptable ranges.
    ///
    /// Returns a list of validation errors. An empty list means the config
    /// is valid.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.timing.cooldown_ms == 0 {
            errors.push("timing.cooldown_ms must be > 0".into());
        }

        if self.spin.min_delay_ms == 0 {
            errors.push("spin.min_delay_ms must be > 0".into());
        }
        if self.spin.max_delay_ms == 0 {
            errors.push("spin.max_delay_ms must be > 0".into());
        }
        if self.spin.min_delay_ms > self.spin.max_delay_ms {
            errors.push(format!(
                "spin.min_delay_ms ({}) must not exceed spin.max_delay_ms ({})",
                self.spin.min_delay_ms, self.spin.max_delay_ms
            ));
        }

        let p = self.spin.quarter_turn_probability;
        if !(0.0..=1.0).contains(&p) {
            errors.push(format!(
                "spin.quarter_turn_probability must be in [0, 1], got {p}"
            ));
        }

        if self.spin.min_extra_spins > self.spin.max_extra_spins {
            errors.push(format!(
                "spin.min_extra_spins ({}) must not exceed spin.max_extra_spins ({})",
                self.spin.min_extra_spins, self.spin.max_extra_spins
            ));
        }
        if self.spin.max_extra_spins > MAX_EXTRA_SPINS {
            errors.push(format!(
                "spin.max_extra_spins must be <= {MAX_EXTRA_SPINS}, got {}",
                self.spin.max_extra_spins
            ));
        }

        let url = self.provider.url.trim();
        if url.is_empty() {
            errors.push("provider.url must not be empty".into());
        } else if !(url.starts_with("http://") || url.starts_with("https://")) {
            errors.push(format!(
                "provider.url must use http:// or https://, got {url:?}"
            ));
        }
        if self.provider.timeout_ms == Some(0) {
            errors.push("provider.timeout_ms must be > 0 when set".into());
        }

        if self.trigger.idle_label.trim().is_empty() {
            errors.push("trigger.idle_label must not be empty".into());
        }

        errors
    }

    /// Return `self` if [`validate`](Self::validate) reports nothing.
    pub fn validated(self) -> Result<Self, ConfigError> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(self)
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    #[must_use]
    pub fn min_spin_duration(&self) -> Duration {
        Duration::from_millis(self.timing.min_spin_duration_ms)
    }

    #[must_use]
    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.timing.cooldown_ms)
    }

    /// Spin cadence described by the `[spin]` section.
    #[must_use]
    pub fn cadence(&self) -> SpinCadence {
        SpinCadence {
            min_delay: Duration::from_millis(self.spin.min_delay_ms),
            max_delay: Duration::from_millis(self.spin.max_delay_ms),
            step: Duration::from_millis(self.spin.delay_step_ms),
        }
    }

    /// Inclusive extra-revolution range for commits, ordered low to high.
    #[must_use]
    pub fn extra_spins(&self) -> (u32, u32) {
        let lo = self.spin.min_extra_spins.min(self.spin.max_extra_spins);
        let hi = self.spin.min_extra_spins.max(self.spin.max_extra_spins);
        (lo, hi)
    }

    #[must_use]
    pub fn request_timeout(&self) -> Option<Duration> {
        self.provider.timeout_ms.map(Duration::from_millis)
    }
}

fn read(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}
