//! Per-sample parameter smoothing.
//!
//! - [`SmoothedParam`]: one-pole exponential approach, used for master volume
//!   so control-rate changes do not produce zipper noise.
//! - [`LinearRamp`]: constant-rate ramp that lands exactly on its target,
//!   used for the voice anti-click fades.
//!
//! ```rust
//! use polyvox_core::SmoothedParam;
//!
//! let mut gain = SmoothedParam::with_config(1.0, 48000.0, 10.0);
//! gain.set_target(0.5);
//! for _ in 0..480 {
//!     let _g = gain.advance();
//! }
//! assert!(gain.get() < 1.0);
//! ```

use libm::expf;

/// A parameter with one-pole exponential smoothing.
#[derive(Debug, Clone)]
pub struct SmoothedParam {
    current: f32,
    target: f32,
    /// Smoothing coefficient (1 = instant, ~0 = very slow)
    coeff: f32,
    sample_rate: f32,
    smoothing_time_ms: f32,
}

impl SmoothedParam {
    /// Create an unsmoothed parameter (changes apply instantly).
    pub fn new(initial: f32) -> Self {
        Self {
            current: initial,
            target: initial,
            coeff: 1.0,
            sample_rate: 44100.0,
            smoothing_time_ms: 0.0,
        }
    }

    /// Create a parameter with a time constant of `smoothing_time_ms`.
    pub fn with_config(initial: f32, sample_rate: f32, smoothing_time_ms: f32) -> Self {
        let mut param = Self::new(initial);
        param.sample_rate = sample_rate;
        param.smoothing_time_ms = smoothing_time_ms;
        param.recalculate_coeff();
        param
    }

    /// Set the value to approach.
    #[inline]
    pub fn set_target(&mut self, target: f32) {
        self.target = target;
    }

    /// Set target and jump to it.
    #[inline]
    pub fn set_immediate(&mut self, value: f32) {
        self.target = value;
        self.current = value;
    }

    /// Advance one sample and return the smoothed value.
    #[inline]
    pub fn advance(&mut self) -> f32 {
        self.current += self.coeff * (self.target - self.current);
        self.current
    }

    /// Current value without advancing.
    #[inline]
    pub fn get(&self) -> f32 {
        self.current
    }

    /// Value being approached.
    #[inline]
    pub fn target(&self) -> f32 {
        self.target
    }

    /// `coeff = 1 - exp(-1 / (tau * fs))`; about 63% of the way after one
    /// time constant and settled after five.
    fn recalculate_coeff(&mut self) {
        if self.smoothing_time_ms <= 0.0 || self.sample_rate <= 0.0 {
            self.coeff = 1.0;
        } else {
            let samples = self.smoothing_time_ms / 1000.0 * self.sample_rate;
            self.coeff = 1.0 - expf(-1.0 / samples);
        }
    }
}

impl Default for SmoothedParam {
    fn default() -> Self {
        Self::new(0.0)
    }
}

/// Linear ramp with a fixed duration.
///
/// Every call to [`set_target`](Self::set_target) starts a new ramp of
/// `duration` samples from the current value.
#[derive(Debug, Clone)]
pub struct LinearRamp {
    current: f32,
    target: f32,
    increment: f32,
    samples_remaining: u32,
    duration_samples: u32,
}

impl LinearRamp {
    /// Ramp resting at `initial`, with transitions of `duration_samples`.
    pub fn new(initial: f32, duration_samples: u32) -> Self {
        Self {
            current: initial,
            target: initial,
            increment: 0.0,
            samples_remaining: 0,
            duration_samples,
        }
    }

    /// Start ramping toward `target`.
    pub fn set_target(&mut self, target: f32) {
        self.target = target;
        if self.duration_samples == 0 {
            self.current = target;
            self.increment = 0.0;
            self.samples_remaining = 0;
        } else {
            self.increment = (target - self.current) / self.duration_samples as f32;
            self.samples_remaining = self.duration_samples;
        }
    }

    /// Jump to `value` with no ramp.
    pub fn set_immediate(&mut self, value: f32) {
        self.current = value;
        self.target = value;
        self.increment = 0.0;
        self.samples_remaining = 0;
    }

    /// Advance one sample and return the value *before* the step, so a ramp
    /// from 0 starts exactly at 0.
    #[inline]
    pub fn advance(&mut self) -> f32 {
        let out = self.current;
        if self.samples_remaining > 0 {
            self.samples_remaining -= 1;
            self.current = if self.samples_remaining == 0 {
                self.target
            } else {
                self.current + self.increment
            };
        }
        out
    }

    /// Current value.
    #[inline]
    pub fn get(&self) -> f32 {
        self.current
    }

    /// Whether the ramp has reached its target.
    #[inline]
    pub fn is_settled(&self) -> bool {
        self.samples_remaining == 0
    }
}
