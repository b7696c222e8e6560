//! Error types for the control surface and configuration.

use std::path::PathBuf;
use thiserror::Error;

/// Errors returned by the control-side API.
///
/// The render path never produces these; out-of-range values are clamped
/// and non-finite output is counted as a fault instead.
#[derive(Debug, Error)]
pub enum SynthError {
    /// No parameter has this name
    #[error("unknown parameter: {0}")]
    UnknownParameter(String),

    /// Text that does not name a waveform
    #[error("invalid waveform '{0}': expected sine, sawtooth, square, triangle or pulse")]
    InvalidWaveform(String),

    /// Value of the wrong kind or not a finite number
    #[error("invalid value for '{param}': {reason}")]
    InvalidValue {
        /// Name of the parameter.
        param: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// MIDI note above 127
    #[error("invalid note {0}: must be 0..=127")]
    InvalidNote(u8),

    /// Event queue is full; the event was dropped
    #[error("event queue full, event dropped")]
    QueueFull,

    /// Render side has been dropped
    #[error("render engine disconnected")]
    Disconnected,

    /// Configuration problem
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Errors that can occur while loading or validating an engine config.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read a file
    #[error("failed to read file '{path}': {source}")]
    ReadFile {
        /// Path of the file that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// A field holds an unsupported value
    #[error("invalid config field '{field}': {reason}")]
    Validation {
        /// Name of the offending field.
        field: String,
        /// Description of the accepted values.
        reason: String,
    },
}

impl ConfigError {
    /// Create a read file error.
    pub fn read_file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConfigError::ReadFile {
            path: path.into(),
            source,
        }
    }

    /// Create a validation error.
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ConfigError::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }
}
