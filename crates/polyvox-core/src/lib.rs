//! Polyvox Core - DSP primitives for the polyvox synthesizer
//!
//! This crate provides the allocation-free building blocks the synthesis
//! engine is made of. Everything here is safe to call from a real-time
//! render callback.
//!
//! # Core Abstractions
//!
//! ## Effect Stages
//!
//! - [`Effect`] - Object-safe, in-place stage contract (`process`, `reset`, `enabled`)
//! - [`Stage`] - Bypass wrapper adding an `enabled` flag to any effect
//! - [`EffectChain`] - Ordered runtime list of boxed stages (`std` only)
//!
//! ## Sources and Filters
//!
//! - [`Waveform`] - Naive periodic shapes shared by oscillators and LFOs
//! - [`Lfo`] - Free-running, depth-scaled modulation source
//! - [`LadderFilter`] - Four-pole resonant lowpass with per-sample cutoff modulation
//!
//! ## Parameter Smoothing
//!
//! - [`SmoothedParam`] - Exponential smoothing
//! - [`LinearRamp`] - Fixed-duration linear ramp
//!
//! ## Utilities
//!
//! - [`soft_clip`], [`saturate`], [`flush_denormal`]
//! - [`midi_to_freq`], [`cents_to_ratio`], [`semitones_to_ratio`]
//!
//! # no_std Support
//!
//! Disable the default `std` feature to use the primitives without the
//! standard library. [`EffectChain`] is unavailable in that configuration.
//!
//! ```toml
//! [dependencies]
//! polyvox-core = { version = "0.1", default-features = false }
//! ```
//!
//! # Example
//!
//! ```rust
//! use polyvox_core::{Effect, LadderFilter, Lfo, Waveform};
//!
//! let mut lfo = Lfo::new(44100.0, 2.0);
//! lfo.set_waveform(Waveform::Triangle);
//!
//! let mut filter = LadderFilter::new(44100.0);
//! filter.set_cutoff(1200.0);
//! filter.set_resonance(0.5);
//!
//! let mut block = [0.0f32; 64];
//! for (i, s) in block.iter_mut().enumerate() {
//!     let x = Waveform::Sawtooth.sample((i as f32 * 0.01) % 1.0, 0.5);
//!     *s = filter.process_sample_modulated(x, lfo.next());
//! }
//! ```

#![cfg_attr(not(feature = "std"), no_std)]

pub mod effect;
pub mod ladder;
pub mod lfo;
pub mod math;
pub mod param;
pub mod waveform;

// Re-export main types at crate root
#[cfg(feature = "std")]
pub use effect::EffectChain;
pub use effect::{Effect, Stage};
pub use ladder::{LadderFilter, MAX_CUTOFF, MAX_RESONANCE, MIN_CUTOFF};
pub use lfo::{LFO_MAX_RATE, LFO_MIN_RATE, Lfo};
pub use math::{
    cents_to_ratio, flush_denormal, midi_to_freq, saturate, semitones_to_ratio, soft_clip,
};
pub use param::{LinearRamp, SmoothedParam};
pub use waveform::{ParseWaveformError, Waveform};
