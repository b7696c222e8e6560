//! Four-pole resonant ladder lowpass filter.
//!
//! A Huovilainen-style model of the transistor ladder. The discretization
//! is a topology-preserving transform (TPT).
//!
//! ```text
//!  x ──(−)── sat ── [1P] ── [1P] ── [1P] ── [1P] ──┬── y
//!       ▲                                          │
//!       └──────────── k · sat(s3) ◄────────────────┘
//! ```
//!
//! Each one-pole stage computes
//!
//! ```text
//! v  = g · (sat(in) − s)
//! lp = v + s
//! s  = lp + v
//! ```
//!
//! where `g = G / (1 + G)` and `G = tan(π·fc/fs)`. Feedback is
//! `k = 4 · resonance`.
//!
//! Resonance is clamped strictly below 1.0, and every stage input passes
//! through the bounded [`saturate`] curve. Together these keep the state
//! finite even at self-oscillation.

use crate::effect::Effect;
use crate::math::{flush_denormal, saturate};
use core::f32::consts::PI;
use libm::{powf, tanf};

/// Lowest settable cutoff in Hz.
pub const MIN_CUTOFF: f32 = 20.0;
/// Highest settable cutoff in Hz.
pub const MAX_CUTOFF: f32 = 20000.0;
/// Highest resonance; the feedback loop self-oscillates close to it.
pub const MAX_RESONANCE: f32 = 0.95;

/// Effective cutoff never exceeds this fraction of the sample rate.
const CUTOFF_NYQUIST_FRACTION: f32 = 0.45;

/// Four-pole resonant ladder lowpass.
///
/// ## Parameters
/// - `cutoff`: Corner frequency (20.0 to 20000.0 Hz, default 1000.0)
/// - `resonance`: Feedback amount (0.0 to 0.95, default 0.0)
///
/// # Example
///
/// ```rust
/// use polyvox_core::LadderFilter;
///
/// let mut filter = LadderFilter::new(44100.0);
/// filter.set_cutoff(800.0);
/// filter.set_resonance(0.6);
///
/// let y = filter.process_sample(0.5);
/// assert!(y.is_finite());
///
/// // Sweep up one octave per sample from an envelope
/// let mut buf = [0.5; 4];
/// let sweep = [0.0, 1.0, 2.0, 3.0];
/// filter.process(&mut buf, Some(&sweep));
/// ```
#[derive(Debug, Clone)]
pub struct LadderFilter {
    stage: [f32; 4],
    cutoff: f32,
    resonance: f32,
    sample_rate: f32,
    /// One-pole gain for `coeff_cutoff`
    g: f32,
    /// Feedback gain (4 · resonance)
    k: f32,
    /// Effective cutoff `g` was last computed for
    coeff_cutoff: f32,
}

impl Default for LadderFilter {
    fn default() -> Self {
        Self::new(44100.0)
    }
}

impl LadderFilter {
    /// Create a filter at 1 kHz with no resonance.
    pub fn new(sample_rate: f32) -> Self {
        let mut filter = Self {
            stage: [0.0; 4],
            cutoff: 1000.0,
            resonance: 0.0,
            sample_rate,
            g: 0.0,
            k: 0.0,
            coeff_cutoff: 0.0,
        };
        filter.update_coefficient(filter.cutoff);
        filter
    }

    /// Set cutoff in Hz, clamped to 20.0..=20000.0.
    pub fn set_cutoff(&mut self, cutoff_hz: f32) {
        self.cutoff = cutoff_hz.clamp(MIN_CUTOFF, MAX_CUTOFF);
        self.update_coefficient(self.cutoff);
    }

    /// Base cutoff in Hz.
    pub fn cutoff(&self) -> f32 {
        self.cutoff
    }

    /// Set resonance, clamped to 0.0..=0.95.
    pub fn set_resonance(&mut self, resonance: f32) {
        self.resonance = resonance.clamp(0.0, MAX_RESONANCE);
        self.k = 4.0 * self.resonance;
    }

    /// Current resonance.
    pub fn resonance(&self) -> f32 {
        self.resonance
    }

    /// Set sample rate and recompute the stage coefficient.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        self.coeff_cutoff = 0.0;
        self.update_coefficient(self.cutoff);
    }

    /// Zero all four stage states.
    pub fn reset(&mut self) {
        self.stage = [0.0; 4];
    }

    /// Cutoff after applying `octaves` of modulation, clamped to the
    /// settable range and below Nyquist.
    #[inline]
    pub fn effective_cutoff(&self, octaves: f32) -> f32 {
        let modulated = if octaves == 0.0 {
            self.cutoff
        } else {
            self.cutoff * powf(2.0, octaves)
        };
        let ceiling = MAX_CUTOFF.min(self.sample_rate * CUTOFF_NYQUIST_FRACTION);
        modulated.clamp(MIN_CUTOFF, ceiling)
    }

    /// Filter one sample at the base cutoff.
    #[inline]
    pub fn process_sample(&mut self, input: f32) -> f32 {
        self.update_coefficient(self.cutoff);
        self.tick(input)
    }

    /// Filter one sample with the cutoff shifted by `octaves`.
    ///
    /// The coefficient is recomputed only when the effective cutoff moves.
    #[inline]
    pub fn process_sample_modulated(&mut self, input: f32, octaves: f32) -> f32 {
        let fc = self.effective_cutoff(octaves);
        self.update_coefficient(fc);
        self.tick(input)
    }

    /// Filter a buffer in place, with optional per-sample cutoff modulation
    /// in octaves.
    ///
    /// If `cutoff_mod` is shorter than `buffer`, the remaining samples use
    /// the base cutoff.
    pub fn process(&mut self, buffer: &mut [f32], cutoff_mod: Option<&[f32]>) {
        match cutoff_mod {
            Some(mods) => {
                for (i, sample) in buffer.iter_mut().enumerate() {
                    let octaves = mods.get(i).copied().unwrap_or(0.0);
                    *sample = self.process_sample_modulated(*sample, octaves);
                }
            }
            None => {
                for sample in buffer.iter_mut() {
                    *sample = self.process_sample(*sample);
                }
            }
        }
    }

    #[inline]
    fn tick(&mut self, input: f32) -> f32 {
        let g = self.g;
        let feedback = self.k * saturate(self.stage[3]);
        let mut x = input - feedback;

        for s in &mut self.stage {
            let v = g * (saturate(x) - *s);
            let lp = v + *s;
            *s = flush_denormal(lp + v);
            x = lp;
        }

        x
    }

    #[inline]
    fn update_coefficient(&mut self, cutoff_hz: f32) {
        if cutoff_hz == self.coeff_cutoff {
            return;
        }
        let fc = cutoff_hz.min(self.sample_rate * CUTOFF_NYQUIST_FRACTION);
        let big_g = tanf(PI * fc / self.sample_rate);
        self.g = big_g / (1.0 + big_g);
        self.coeff_cutoff = cutoff_hz;
    }
}

impl Effect for LadderFilter {
    #[inline]
    fn process_sample(&mut self, input: f32) -> f32 {
        LadderFilter::process_sample(self, input)
    }

    fn process(&mut self, buffer: &mut [f32]) {
        LadderFilter::process(self, buffer, None);
    }

    fn reset(&mut self) {
        LadderFilter::reset(self);
    }

    fn set_sample_rate(&mut self, sample_rate: f32) {
        LadderFilter::set_sample_rate(self, sample_rate);
    }
}
