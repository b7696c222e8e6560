//! Polyvox Synth - real-time polyphonic synthesis engine
//!
//! Turns note events and continuous parameters into a mono sample stream,
//! sample-accurately and without blocking the render thread.
//!
//! # Signal Path
//!
//! Per voice: two [`Oscillator`]s → mix → [`LadderFilter`] → amplitude
//! envelope, with a filter envelope and a per-voice [`Lfo`] as modulation
//! sources. Voices are summed, passed through an optional [`EffectChain`],
//! scaled by master volume, and soft-clipped into [-1, 1].
//!
//! # Components
//!
//! - [`Oscillator`] - Naive phase-accumulator oscillator with pitch and PWM modulation
//! - [`AdsrEnvelope`] - Linear-attack, exponential decay/release envelope
//! - [`Voice`] - One note: oscillators, filter, envelopes, LFO, anti-click fades
//! - [`VoiceManager`] - Fixed voice arena with note map and voice stealing
//! - [`ParamId`] / [`ParamStore`] - Enumerated parameter table and lock-free store
//! - [`Synth`] / [`SynthHandle`] / [`SynthEngine`] - Public control and render surface
//! - [`EngineConfig`] - TOML-loadable construction settings
//!
//! # Example
//!
//! ```rust
//! use polyvox_synth::{Synth, Waveform};
//!
//! let mut synth = Synth::new(48000.0);
//! synth.set_parameter("osc1_waveform", Waveform::Square).unwrap();
//! synth.set_parameter("filter_cutoff", 1200.0).unwrap();
//!
//! synth.note_on(60, 100).unwrap();
//! synth.note_on(64, 100).unwrap();
//! let block = synth.generate(1024);
//!
//! synth.note_off(60).unwrap();
//! synth.note_off(64).unwrap();
//! let tail = synth.generate(1024);
//! # assert_eq!(block.len() + tail.len(), 2048);
//! ```

pub mod config;
pub mod engine;
pub mod envelope;
pub mod error;
pub mod event;
pub mod oscillator;
pub mod params;
pub mod voice;
pub mod voice_manager;

pub use config::{EngineConfig, SUPPORTED_SAMPLE_RATES};
pub use engine::{Synth, SynthEngine, SynthHandle, SynthState};
pub use envelope::{AdsrEnvelope, ENV_EPSILON, EnvelopeState};
pub use error::{ConfigError, SynthError};
pub use event::{DEFAULT_QUEUE_CAPACITY, EventSender, SynthEvent, event_queue};
pub use oscillator::Oscillator;
pub use params::{PARAMS, ParamDescriptor, ParamId, ParamKind, ParamStore, ParamValue};
pub use voice::{Voice, VoiceParams};
pub use voice_manager::{
    DEFAULT_POLYPHONY, MAX_POLYPHONY, NOTE_COUNT, ParseStealPolicyError, StealPolicy, VoiceManager,
};

// Re-export the core primitives the public API is built from
pub use polyvox_core::{
    Effect, EffectChain, LadderFilter, Lfo, Stage, Waveform, cents_to_ratio, midi_to_freq,
};
