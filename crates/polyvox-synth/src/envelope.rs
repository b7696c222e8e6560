//! ADSR envelope generator for synthesis.
//!
//! Attack is a linear ramp. Decay and release are exponential curves whose
//! coefficients are chosen when the stage begins, so that each stage ends
//! within its configured time no matter what level it starts from.

use libm::{expf, logf};

/// Shortest stage time in seconds.
pub const MIN_STAGE_TIME: f32 = 0.001;
/// Longest stage time in seconds.
pub const MAX_STAGE_TIME: f32 = 10.0;
/// Distance at which decay snaps to sustain and release snaps to idle.
pub const ENV_EPSILON: f32 = 0.001;

/// ADSR envelope states
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EnvelopeState {
    /// Envelope is inactive and outputs zero.
    #[default]
    Idle,
    /// Output ramps linearly toward 1.0.
    Attack,
    /// Output falls from 1.0 toward the sustain level.
    Decay,
    /// Output holds at the sustain level while the gate is held.
    Sustain,
    /// Output decays toward zero after the gate is released.
    Release,
}

/// ADSR envelope generator.
///
/// Invariants: `level` stays in `[0.0, 1.0]`. Stages only move forward
/// through idle → attack → decay → sustain → release → idle, except that
/// `gate_off` may enter release from any non-idle stage and `gate_on`
/// re-enters attack from the current level.
///
/// # Example
///
/// ```rust
/// use polyvox_synth::{AdsrEnvelope, EnvelopeState};
///
/// let mut env = AdsrEnvelope::new(44100.0);
/// env.set_attack(0.01);
/// env.set_decay(0.1);
/// env.set_sustain(0.7);
/// env.set_release(0.3);
///
/// env.gate_on();
/// for _ in 0..441 {
///     env.advance();
/// }
/// assert_eq!(env.state(), EnvelopeState::Decay);
///
/// env.gate_off();
/// assert_eq!(env.state(), EnvelopeState::Release);
/// ```
#[derive(Debug, Clone)]
pub struct AdsrEnvelope {
    state: EnvelopeState,
    level: f32,
    sample_rate: f32,

    // Stage times in seconds
    attack: f32,
    decay: f32,
    release: f32,
    sustain: f32,

    /// Per-sample attack increment
    attack_inc: f32,
    /// Multiplier for the current decay/release stage, set on stage entry
    stage_coeff: f32,
}

impl Default for AdsrEnvelope {
    fn default() -> Self {
        Self::new(44100.0)
    }
}

impl AdsrEnvelope {
    /// Create a new ADSR envelope with default settings.
    ///
    /// Default values:
    /// - Attack: 0.01 s
    /// - Decay: 0.1 s
    /// - Sustain: 0.7
    /// - Release: 0.3 s
    pub fn new(sample_rate: f32) -> Self {
        let mut env = Self {
            state: EnvelopeState::Idle,
            level: 0.0,
            sample_rate,
            attack: 0.01,
            decay: 0.1,
            release: 0.3,
            sustain: 0.7,
            attack_inc: 0.0,
            stage_coeff: 0.0,
        };
        env.recalculate_attack_inc();
        env
    }

    /// Set attack time in seconds, clamped to 0.001..=10.0.
    pub fn set_attack(&mut self, seconds: f32) {
        self.attack = clamp_time(seconds);
        self.recalculate_attack_inc();
    }

    /// Attack time in seconds.
    pub fn attack(&self) -> f32 {
        self.attack
    }

    /// Set decay time in seconds, clamped to 0.001..=10.0.
    ///
    /// Takes effect the next time the decay stage begins.
    pub fn set_decay(&mut self, seconds: f32) {
        self.decay = clamp_time(seconds);
    }

    /// Decay time in seconds.
    pub fn decay(&self) -> f32 {
        self.decay
    }

    /// Set sustain level, clamped to 0.0..=1.0.
    pub fn set_sustain(&mut self, level: f32) {
        self.sustain = level.clamp(0.0, 1.0);
    }

    /// Sustain level.
    pub fn sustain(&self) -> f32 {
        self.sustain
    }

    /// Set release time in seconds, clamped to 0.001..=10.0.
    ///
    /// Takes effect the next time the release stage begins.
    pub fn set_release(&mut self, seconds: f32) {
        self.release = clamp_time(seconds);
    }

    /// Release time in seconds.
    pub fn release(&self) -> f32 {
        self.release
    }

    /// Set sample rate.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        self.recalculate_attack_inc();
    }

    /// Trigger the envelope (note on). Attack resumes from the current
    /// level, so retriggering never clicks.
    pub fn gate_on(&mut self) {
        self.state = EnvelopeState::Attack;
    }

    /// Release the envelope (note off), starting from the current level.
    pub fn gate_off(&mut self) {
        if self.state != EnvelopeState::Idle {
            self.enter_release();
        }
    }

    /// Force envelope to idle state.
    pub fn reset(&mut self) {
        self.state = EnvelopeState::Idle;
        self.level = 0.0;
    }

    /// Get current state.
    pub fn state(&self) -> EnvelopeState {
        self.state
    }

    /// Get current level without advancing.
    pub fn level(&self) -> f32 {
        self.level
    }

    /// Check if envelope is active (not idle).
    pub fn is_active(&self) -> bool {
        self.state != EnvelopeState::Idle
    }

    /// Advance envelope by one sample and return the new level.
    #[inline]
    pub fn advance(&mut self) -> f32 {
        match self.state {
            EnvelopeState::Idle => {
                self.level = 0.0;
            }

            EnvelopeState::Attack => {
                self.level += self.attack_inc;
                if self.level >= 1.0 {
                    self.level = 1.0;
                    self.enter_decay();
                }
            }

            EnvelopeState::Decay => {
                self.level = self.sustain + (self.level - self.sustain) * self.stage_coeff;
                if (self.level - self.sustain).abs() < ENV_EPSILON {
                    self.level = self.sustain;
                    self.state = EnvelopeState::Sustain;
                }
            }

            EnvelopeState::Sustain => {
                self.level = self.sustain;
            }

            EnvelopeState::Release => {
                self.level *= self.stage_coeff;
                if self.level <= ENV_EPSILON {
                    self.level = 0.0;
                    self.state = EnvelopeState::Idle;
                }
            }
        }

        self.level
    }

    /// Fill `out` with consecutive envelope levels.
    pub fn generate(&mut self, out: &mut [f32]) {
        for sample in out.iter_mut() {
            *sample = self.advance();
        }
    }

    fn enter_decay(&mut self) {
        let distance = self.level - self.sustain;
        if distance.abs() < ENV_EPSILON {
            self.level = self.sustain;
            self.state = EnvelopeState::Sustain;
        } else {
            self.stage_coeff = self.exp_coeff(distance.abs(), self.decay);
            self.state = EnvelopeState::Decay;
        }
    }

    fn enter_release(&mut self) {
        if self.level <= ENV_EPSILON {
            self.level = 0.0;
            self.state = EnvelopeState::Idle;
        } else {
            self.stage_coeff = self.exp_coeff(self.level, self.release);
            self.state = EnvelopeState::Release;
        }
    }

    /// Multiplier that shrinks `distance` to [`ENV_EPSILON`] in `seconds`.
    fn exp_coeff(&self, distance: f32, seconds: f32) -> f32 {
        let samples = (seconds * self.sample_rate).max(1.0);
        expf(logf(ENV_EPSILON / distance) / samples)
    }

    fn recalculate_attack_inc(&mut self) {
        let samples = (self.attack * self.sample_rate).max(1.0);
        self.attack_inc = 1.0 / samples;
    }
}

#[inline]
fn clamp_time(seconds: f32) -> f32 {
    if seconds.is_nan() {
        MIN_STAGE_TIME
    } else {
        seconds.clamp(MIN_STAGE_TIME, MAX_STAGE_TIME)
    }
}
