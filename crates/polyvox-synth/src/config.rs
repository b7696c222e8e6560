//! Engine construction settings, loadable from TOML.
//!
//! ```toml
//! sample_rate = 48000
//! polyphony = 16
//! fade_ms = 2.0
//!
//! [params]
//! filter_cutoff = 1200.0
//! osc1_waveform = "square"
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::params::{ParamId, ParamValue};
use crate::voice_manager::{MAX_POLYPHONY, StealPolicy};

/// Sample rates the engine accepts.
pub const SUPPORTED_SAMPLE_RATES: [u32; 4] = [22050, 44100, 48000, 96000];

/// Engine settings fixed at construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    /// Output sample rate in Hz.
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,

    /// Number of voices in the arena.
    #[serde(default = "default_polyphony")]
    pub polyphony: usize,

    /// Largest buffer a host will request.
    #[serde(default = "default_max_block_size")]
    pub max_block_size: usize,

    /// Capacity of the control → render event queue.
    #[serde(default = "default_event_queue_capacity")]
    pub event_queue_capacity: usize,

    /// Anti-click fade length for new and stolen voices, in milliseconds.
    #[serde(default = "default_fade_ms")]
    pub fade_ms: f32,

    /// How a new note picks a voice when all are busy.
    #[serde(default)]
    pub steal_policy: StealPolicy,

    /// Initial parameter values by name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub params: BTreeMap<String, ParamValue>,
}

fn default_sample_rate() -> u32 {
    44100
}

fn default_polyphony() -> usize {
    crate::voice_manager::DEFAULT_POLYPHONY
}

fn default_max_block_size() -> usize {
    512
}

fn default_event_queue_capacity() -> usize {
    crate::event::DEFAULT_QUEUE_CAPACITY
}

fn default_fade_ms() -> f32 {
    3.0
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: default_sample_rate(),
            polyphony: default_polyphony(),
            max_block_size: default_max_block_size(),
            event_queue_capacity: default_event_queue_capacity(),
            fade_ms: default_fade_ms(),
            steal_policy: StealPolicy::default(),
            params: BTreeMap::new(),
        }
    }
}

impl EngineConfig {
    /// Default settings at the given sample rate.
    pub fn with_sample_rate(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            ..Self::default()
        }
    }

    /// Set the polyphony.
    pub fn polyphony(mut self, polyphony: usize) -> Self {
        self.polyphony = polyphony;
        self
    }

    /// Set the voice steal policy.
    pub fn with_steal_policy(mut self, policy: StealPolicy) -> Self {
        self.steal_policy = policy;
        self
    }

    /// Set an initial parameter value.
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(toml_str: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
        Self::from_toml_str(&content)
    }

    /// Check every field against its accepted range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !SUPPORTED_SAMPLE_RATES.contains(&self.sample_rate) {
            return Err(ConfigError::validation(
                "sample_rate",
                format!(
                    "{} is not supported; use 22050, 44100, 48000 or 96000",
                    self.sample_rate
                ),
            ));
        }
        if !(1..=MAX_POLYPHONY).contains(&self.polyphony) {
            return Err(ConfigError::validation(
                "polyphony",
                format!("{} is outside 1..={MAX_POLYPHONY}", self.polyphony),
            ));
        }
        if !(64..=4096).contains(&self.max_block_size) {
            return Err(ConfigError::validation(
                "max_block_size",
                format!("{} is outside 64..=4096", self.max_block_size),
            ));
        }
        if !(1..=65536).contains(&self.event_queue_capacity) {
            return Err(ConfigError::validation(
                "event_queue_capacity",
                format!("{} is outside 1..=65536", self.event_queue_capacity),
            ));
        }
        if !(0.0..=50.0).contains(&self.fade_ms) {
            return Err(ConfigError::validation(
                "fade_ms",
                format!("{} is outside 0..=50", self.fade_ms),
            ));
        }
        for (name, value) in &self.params {
            let id = ParamId::from_name(name)
                .ok_or_else(|| ConfigError::validation(format!("params.{name}"), "unknown parameter"))?;
            id.descriptor()
                .to_raw(*value)
                .map_err(|e| ConfigError::validation(format!("params.{name}"), e.to_string()))?;
        }
        Ok(())
    }

    /// Anti-click fade length in samples.
    pub fn fade_samples(&self) -> u32 {
        (self.fade_ms.max(0.0) * 0.001 * self.sample_rate as f32).round() as u32
    }
}
