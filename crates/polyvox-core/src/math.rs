//! Mathematical utility functions for synthesis.
//!
//! All functions are allocation-free and suitable for `no_std`.
//!
//! # Saturation
//!
//! | Function | Shape | Use |
//! |----------|-------|-----|
//! | [`soft_clip`] | exact `tanh` | master output limiting |
//! | [`saturate`] | rational `tanh`, hard at ±3 | ladder stages and feedback |
//!
//! # Pitch
//!
//! - [`midi_to_freq`] - MIDI note to Hz (A4 = 440 Hz)
//! - [`cents_to_ratio`] / [`semitones_to_ratio`] - Interval to frequency ratio

use libm::{powf, tanhf};

/// Soft clip using hyperbolic tangent.
///
/// Output is bounded to `[-1.0, 1.0]` for every finite input.
#[inline]
pub fn soft_clip(x: f32) -> f32 {
    tanhf(x)
}

/// Rational approximation of `tanh`, used inside the ladder filter.
///
/// `x(27 + x²) / (27 + 9x²)` for `|x| <= 3`, saturating to ±1 beyond.
/// The curve meets ±1 exactly at ±3 with zero slope, so the join is smooth.
#[inline]
pub fn saturate(x: f32) -> f32 {
    if x > 3.0 {
        1.0
    } else if x < -3.0 {
        -1.0
    } else {
        let x2 = x * x;
        x * (27.0 + x2) / (27.0 + 9.0 * x2)
    }
}

/// Flush denormal (subnormal) floats to zero.
///
/// Replaces values below 1e-20 with zero, well before the IEEE 754
/// subnormal range. Use in recursive state that decays toward zero.
#[allow(clippy::inline_always)]
#[inline(always)]
pub fn flush_denormal(x: f32) -> f32 {
    if x.abs() < 1e-20 { 0.0 } else { x }
}

/// Convert MIDI note number to frequency in Hz.
///
/// Takes a signed note so octave offsets can push below note 0.
#[inline]
pub fn midi_to_freq(note: i32) -> f32 {
    440.0 * powf(2.0, (note - 69) as f32 / 12.0)
}

/// Convert cents to frequency ratio. 100 cents = 1 semitone.
#[inline]
pub fn cents_to_ratio(cents: f32) -> f32 {
    powf(2.0, cents / 1200.0)
}

/// Convert semitones to frequency ratio.
#[inline]
pub fn semitones_to_ratio(semitones: f32) -> f32 {
    powf(2.0, semitones / 12.0)
}
