//! Low Frequency Oscillator for modulation.
//!
//! A free-running phase accumulator that produces depth-scaled modulation
//! signals. It has no gate and no envelope. Once created, the phase keeps
//! advancing regardless of note activity.

use crate::waveform::Waveform;
use libm::floorf;

/// Lowest LFO rate in Hz.
pub const LFO_MIN_RATE: f32 = 0.1;
/// Highest LFO rate in Hz.
pub const LFO_MAX_RATE: f32 = 50.0;

/// Duty cycle used when the LFO runs the pulse shape.
const LFO_PULSE_WIDTH: f32 = 0.25;

/// Low Frequency Oscillator for generating modulation signals.
///
/// Output is `depth * waveform(phase)` (bipolar) or
/// `depth * (waveform(phase) + 1) / 2` (unipolar).
///
/// # Example
///
/// ```rust
/// use polyvox_core::{Lfo, Waveform};
///
/// let mut lfo = Lfo::new(44100.0, 5.0);
/// lfo.set_waveform(Waveform::Triangle);
/// lfo.set_depth(0.5);
///
/// let value = lfo.next(); // in [-0.5, 0.5]
/// assert!(value.abs() <= 0.5);
/// ```
#[derive(Debug, Clone)]
pub struct Lfo {
    /// Current phase position [0.0, 1.0)
    phase: f32,
    /// Phase increment per sample
    phase_inc: f32,
    /// Rate in Hz (clamped)
    rate: f32,
    /// Output scale (0.0 to 1.0)
    depth: f32,
    sample_rate: f32,
    waveform: Waveform,
}

impl Default for Lfo {
    fn default() -> Self {
        Self::new(44100.0, 5.0)
    }
}

impl Lfo {
    /// Create a new LFO at full depth with a sine shape.
    pub fn new(sample_rate: f32, rate_hz: f32) -> Self {
        let mut lfo = Self {
            phase: 0.0,
            phase_inc: 0.0,
            rate: LFO_MIN_RATE,
            depth: 1.0,
            sample_rate,
            waveform: Waveform::Sine,
        };
        lfo.set_rate(rate_hz);
        lfo
    }

    /// Set rate in Hz, clamped to 0.1..=50.0.
    pub fn set_rate(&mut self, rate_hz: f32) {
        self.rate = rate_hz.clamp(LFO_MIN_RATE, LFO_MAX_RATE);
        self.phase_inc = self.rate / self.sample_rate;
    }

    /// Current rate in Hz.
    pub fn rate(&self) -> f32 {
        self.rate
    }

    /// Set depth, clamped to 0.0..=1.0.
    pub fn set_depth(&mut self, depth: f32) {
        self.depth = depth.clamp(0.0, 1.0);
    }

    /// Current depth.
    pub fn depth(&self) -> f32 {
        self.depth
    }

    /// Set waveform
    pub fn set_waveform(&mut self, waveform: Waveform) {
        self.waveform = waveform;
    }

    /// Get current waveform
    pub fn waveform(&self) -> Waveform {
        self.waveform
    }

    /// Set sample rate, preserving the rate in Hz.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        self.phase_inc = self.rate / sample_rate;
    }

    /// Reset phase to 0
    pub fn reset(&mut self) {
        self.phase = 0.0;
    }

    /// Get current phase (0.0 - 1.0)
    pub fn phase(&self) -> f32 {
        self.phase
    }

    /// Next bipolar value in `[-depth, depth]`.
    #[inline]
    pub fn next(&mut self) -> f32 {
        let shape = self.waveform.sample(self.phase, LFO_PULSE_WIDTH);
        self.phase += self.phase_inc;
        if self.phase >= 1.0 {
            self.phase -= 1.0;
        }
        self.depth * shape
    }

    /// Advance the phase by `samples` without producing output.
    pub fn skip(&mut self, samples: usize) {
        let advanced = self.phase + self.phase_inc * samples as f32;
        self.phase = advanced - floorf(advanced);
        if self.phase >= 1.0 {
            self.phase = 0.0;
        }
    }

    /// Next unipolar value in `[0, depth]`.
    #[inline]
    pub fn next_unipolar(&mut self) -> f32 {
        (self.next() + self.depth) * 0.5
    }

    /// Fill `out` with bipolar values.
    pub fn generate(&mut self, out: &mut [f32]) {
        for sample in out.iter_mut() {
            *sample = self.next();
        }
    }

    /// Fill `out` with unipolar values.
    pub fn generate_unipolar(&mut self, out: &mut [f32]) {
        for sample in out.iter_mut() {
            *sample = self.next_unipolar();
        }
    }
}
