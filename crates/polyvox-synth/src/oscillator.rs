//! Audio-rate oscillator.
//!
//! A phase accumulator driving one of the naive [`Waveform`] shapes. Supports
//! per-sample pitch modulation (in semitones) and pulse-width modulation.

use polyvox_core::{Waveform, semitones_to_ratio};

/// Lowest oscillator frequency in Hz.
pub const MIN_FREQUENCY: f32 = 1.0;
/// Highest oscillator frequency as a fraction of the sample rate.
const MAX_FREQUENCY_RATIO: f32 = 0.49;

/// Audio-rate oscillator.
///
/// The phase is owned exclusively by the oscillator. After `k` unmodulated
/// samples it equals `(initial + f·k/sr) mod 1`.
///
/// ## Parameters
/// - `frequency`: Hz (1.0 to 0.49 × sample rate, default 440.0)
/// - `pulse_width`: duty cycle for [`Waveform::Pulse`] (0.05 to 0.95, default 0.5)
///
/// # Example
///
/// ```rust
/// use polyvox_synth::{Oscillator, Waveform};
///
/// let mut osc = Oscillator::new(44100.0);
/// osc.set_frequency(440.0);
/// osc.set_waveform(Waveform::Sawtooth);
///
/// let mut block = [0.0f32; 256];
/// osc.generate(&mut block, None, None);
/// ```
#[derive(Debug, Clone)]
pub struct Oscillator {
    /// Current phase position [0.0, 1.0)
    phase: f32,
    /// Phase increment per sample at the unmodulated frequency
    phase_inc: f32,
    sample_rate: f32,
    frequency: f32,
    pulse_width: f32,
    waveform: Waveform,
}

impl Default for Oscillator {
    fn default() -> Self {
        Self::new(44100.0)
    }
}

impl Oscillator {
    /// Create a new sine oscillator at 440 Hz.
    pub fn new(sample_rate: f32) -> Self {
        let mut osc = Self {
            phase: 0.0,
            phase_inc: 0.0,
            sample_rate,
            frequency: 440.0,
            pulse_width: 0.5,
            waveform: Waveform::Sine,
        };
        osc.set_frequency(440.0);
        osc
    }

    /// Set frequency in Hz. Out-of-range values are clamped, not rejected.
    pub fn set_frequency(&mut self, freq_hz: f32) {
        let max = self.sample_rate * MAX_FREQUENCY_RATIO;
        self.frequency = freq_hz.clamp(MIN_FREQUENCY, max);
        self.phase_inc = self.frequency / self.sample_rate;
    }

    /// Get current frequency in Hz.
    pub fn frequency(&self) -> f32 {
        self.frequency
    }

    /// Set pulse width, clamped to 0.05..=0.95.
    pub fn set_pulse_width(&mut self, width: f32) {
        self.pulse_width = width.clamp(0.05, 0.95);
    }

    /// Current base pulse width.
    pub fn pulse_width(&self) -> f32 {
        self.pulse_width
    }

    /// Set waveform type.
    pub fn set_waveform(&mut self, waveform: Waveform) {
        self.waveform = waveform;
    }

    /// Get current waveform.
    pub fn waveform(&self) -> Waveform {
        self.waveform
    }

    /// Set sample rate, keeping the frequency in Hz.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        self.set_frequency(self.frequency);
    }

    /// Reset phase to 0.
    pub fn reset(&mut self) {
        self.phase = 0.0;
    }

    /// Get current phase.
    pub fn phase(&self) -> f32 {
        self.phase
    }

    /// Generate next sample at the base frequency.
    #[inline]
    pub fn advance(&mut self) -> f32 {
        self.next_modulated(1.0, 0.0)
    }

    /// Generate next sample with the phase increment scaled by `freq_ratio`
    /// and the pulse width offset by `pw_mod`.
    ///
    /// The modulated pulse width is clamped to 0.01..=0.99.
    #[inline]
    pub fn next_modulated(&mut self, freq_ratio: f32, pw_mod: f32) -> f32 {
        let width = (self.pulse_width + pw_mod).clamp(0.01, 0.99);
        let output = self.waveform.sample(self.phase, width);

        let inc = (self.phase_inc * freq_ratio).min(MAX_FREQUENCY_RATIO);
        self.phase += inc;
        if self.phase >= 1.0 {
            self.phase -= 1.0;
        }

        output
    }

    /// Fill `out` with samples.
    ///
    /// `freq_mod` is a per-sample pitch offset in semitones and `pw_mod` a
    /// per-sample pulse-width offset. Missing or short modulation slices
    /// read as zero.
    pub fn generate(&mut self, out: &mut [f32], freq_mod: Option<&[f32]>, pw_mod: Option<&[f32]>) {
        for (i, sample) in out.iter_mut().enumerate() {
            let ratio = match freq_mod.and_then(|m| m.get(i)) {
                Some(&semitones) if semitones != 0.0 => semitones_to_ratio(semitones),
                _ => 1.0,
            };
            let pw = pw_mod.and_then(|m| m.get(i)).copied().unwrap_or(0.0);
            *sample = self.next_modulated(ratio, pw);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn count_rising_crossings(osc: &mut Oscillator, samples: usize) -> i32 {
        let mut crossings = 0;
        let mut prev = 0.0;
        for _ in 0..samples {
            let sample = osc.advance();
            if prev <= 0.0 && sample > 0.0 {
                crossings += 1;
            }
            prev = sample;
        }
        crossings
    }

    #[test]
    fn test_oscillator_frequency_440hz() {
        let mut osc = Oscillator::new(44100.0);
        osc.set_frequency(440.0);

        let crossings = count_rising_crossings(&mut osc, 44100);
        assert!(
            (crossings - 440).abs() <= 2,
            "Expected ~440 zero crossings, got {}",
            crossings
        );
    }

    #[test]
    fn test_oscillator_frequency_clamped() {
        let mut osc = Oscillator::new(44100.0);
        osc.set_frequency(30000.0);
        assert!((osc.frequency() - 44100.0 * 0.49).abs() < 1e-2);
        osc.set_frequency(-5.0);
        assert_eq!(osc.frequency(), MIN_FREQUENCY);
    }

    #[test]
    fn test_oscillator_phase_invariant() {
        let sr = 44100.0;
        let f = 261.63;
        let mut osc = Oscillator::new(sr);
        osc.set_frequency(f);

        let k = 4410;
        for _ in 0..k {
            osc.advance();
        }
        let expected = (f * k as f32 / sr).fract();
        assert!(
            (osc.phase() - expected).abs() < 1e-3,
            "phase {} expected {}",
            osc.phase(),
            expected
        );
    }

    #[test]
    fn test_oscillator_output_range() {
        let mut osc = Oscillator::new(44100.0);
        osc.set_frequency(1234.0);
        for waveform in Waveform::ALL {
            osc.set_waveform(waveform);
            let mut buf = [0.0; 1000];
            osc.generate(&mut buf, None, None);
            for s in buf {
                assert!((-1.0..=1.0).contains(&s), "{waveform:?}: {s}");
            }
        }
    }

    #[test]
    fn test_pulse_duty_cycle() {
        let mut osc = Oscillator::new(44100.0);
        osc.set_frequency(441.0);
        osc.set_waveform(Waveform::Pulse);
        osc.set_pulse_width(0.25);

        let mut buf = [0.0; 4410];
        osc.generate(&mut buf, None, None);
        let high = buf.iter().filter(|&&s| s > 0.0).count() as f32 / buf.len() as f32;
        assert!((high - 0.25).abs() < 0.02, "duty {high}");
    }

    #[test]
    fn test_pulse_width_modulation_clamped() {
        let mut osc = Oscillator::new(44100.0);
        osc.set_frequency(433.0);
        osc.set_waveform(Waveform::Pulse);
        osc.set_pulse_width(0.9);

        // 0.9 + 0.4 clamps to 0.99: nearly always high, never stuck
        let pw = [0.4; 4410];
        let mut buf = [0.0; 4410];
        osc.generate(&mut buf, None, Some(&pw));
        let low = buf.iter().filter(|&&s| s < 0.0).count();
        assert!(low > 0, "clamped width still has a low segment");
        assert!(low < 100);
    }

    #[test]
    fn test_freq_mod_octave_up_doubles_rate() {
        let mut plain = Oscillator::new(44100.0);
        plain.set_frequency(220.0);
        let mut modded = plain.clone();

        let mods = [12.0; 100];
        let mut buf = [0.0; 100];
        modded.generate(&mut buf, Some(&mods), None);
        for _ in 0..200 {
            plain.advance();
        }
        assert!((plain.phase() - modded.phase()).abs() < 1e-3);
    }

    #[test]
    fn test_reset_zeroes_phase() {
        let mut osc = Oscillator::new(44100.0);
        for _ in 0..37 {
            osc.advance();
        }
        assert!(osc.phase() > 0.0);
        osc.reset();
        assert_eq!(osc.phase(), 0.0);
    }
}
