//! Waveform selector shared by audio oscillators and LFOs.
//!
//! The shapes are naive (not band-limited). Each one is a pure function of
//! a normalized phase in `[0.0, 1.0)`, so any phase accumulator can use them.

use core::f32::consts::TAU;
use core::fmt;
use core::str::FromStr;
use libm::sinf;

/// Periodic waveform shape.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Waveform {
    /// `sin(2π·phase)`
    Sine,
    /// `2·phase − 1`
    #[default]
    Sawtooth,
    /// `sign(phase − 0.5)`
    Square,
    /// Symmetric triangle, −1 at phase 0, +1 at phase 0.5.
    Triangle,
    /// +1 while `phase < pulse_width`, else −1.
    Pulse,
}

impl Waveform {
    /// All variants in table order.
    pub const ALL: [Waveform; 5] = [
        Waveform::Sine,
        Waveform::Sawtooth,
        Waveform::Square,
        Waveform::Triangle,
        Waveform::Pulse,
    ];

    /// Canonical lowercase name, as used in parameter maps.
    pub const fn name(self) -> &'static str {
        match self {
            Waveform::Sine => "sine",
            Waveform::Sawtooth => "sawtooth",
            Waveform::Square => "square",
            Waveform::Triangle => "triangle",
            Waveform::Pulse => "pulse",
        }
    }

    /// Position of this variant in [`Waveform::ALL`].
    pub const fn index(self) -> usize {
        match self {
            Waveform::Sine => 0,
            Waveform::Sawtooth => 1,
            Waveform::Square => 2,
            Waveform::Triangle => 3,
            Waveform::Pulse => 4,
        }
    }

    /// Inverse of [`index`](Self::index). Out-of-range indices return `None`.
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Evaluate the waveform at `phase` (expected in `[0.0, 1.0)`).
    ///
    /// `pulse_width` is only read by [`Waveform::Pulse`] and must already be
    /// clamped by the caller.
    #[inline]
    pub fn sample(self, phase: f32, pulse_width: f32) -> f32 {
        match self {
            Waveform::Sine => sinf(phase * TAU),
            Waveform::Sawtooth => 2.0 * phase - 1.0,
            Waveform::Square => {
                if phase < 0.5 {
                    -1.0
                } else {
                    1.0
                }
            }
            Waveform::Triangle => {
                if phase < 0.5 {
                    4.0 * phase - 1.0
                } else {
                    3.0 - 4.0 * phase
                }
            }
            Waveform::Pulse => {
                if phase < pulse_width {
                    1.0
                } else {
                    -1.0
                }
            }
        }
    }
}

impl fmt::Display for Waveform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when a string does not name a [`Waveform`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseWaveformError;

impl fmt::Display for ParseWaveformError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("expected one of: sine, sawtooth, square, triangle, pulse")
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ParseWaveformError {}

impl FromStr for Waveform {
    type Err = ParseWaveformError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("saw") {
            return Ok(Waveform::Sawtooth);
        }
        Self::ALL
            .iter()
            .copied()
            .find(|w| w.name().eq_ignore_ascii_case(s))
            .ok_or(ParseWaveformError)
    }
}
