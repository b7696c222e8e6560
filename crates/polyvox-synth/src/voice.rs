//! A single synthesizer voice.
//!
//! Two oscillators mixed into a ladder filter, shaped by an amplitude
//! envelope, with a filter envelope and a free-running LFO as modulation
//! sources. Voices are created once by the [`VoiceManager`](crate::VoiceManager)
//! and reused for every note they play.

use polyvox_core::{
    LadderFilter, Lfo, LinearRamp, Waveform, cents_to_ratio, midi_to_freq, semitones_to_ratio,
};

use crate::envelope::{AdsrEnvelope, EnvelopeState};
use crate::oscillator::Oscillator;
use crate::params::{ParamId, waveform_from_raw};

/// LFO to pitch at full amount, in semitones.
pub const LFO_PITCH_RANGE: f32 = 2.0;
/// LFO to pulse width at full amount.
pub const LFO_PW_RANGE: f32 = 0.4;
/// Filter modulation at full amount, in octaves.
pub const FILTER_MOD_OCTAVES: f32 = 4.0;

/// Voice-level parameter values, read once per buffer.
#[derive(Debug, Clone, Copy, PartialEq)]
#[allow(missing_docs)]
pub struct VoiceParams {
    pub osc1_waveform: Waveform,
    pub osc1_level: f32,
    pub osc1_detune: f32,
    pub osc1_octave: i32,
    pub osc1_pulse_width: f32,
    pub osc2_waveform: Waveform,
    pub osc2_level: f32,
    pub osc2_detune: f32,
    pub osc2_octave: i32,
    pub osc2_pulse_width: f32,
    pub filter_cutoff: f32,
    pub filter_resonance: f32,
    pub filter_env_amount: f32,
    pub amp_attack: f32,
    pub amp_decay: f32,
    pub amp_sustain: f32,
    pub amp_release: f32,
    pub filter_attack: f32,
    pub filter_decay: f32,
    pub filter_sustain: f32,
    pub filter_release: f32,
    pub lfo_waveform: Waveform,
    pub lfo_rate: f32,
    pub lfo_depth: f32,
    pub lfo_to_pitch: f32,
    pub lfo_to_filter: f32,
    pub lfo_to_pw: f32,
}

impl VoiceParams {
    /// Build from a raw-value lookup, as stored in [`ParamStore`](crate::ParamStore).
    pub fn from_fn(get: impl Fn(ParamId) -> f32) -> Self {
        Self {
            osc1_waveform: waveform_from_raw(get(ParamId::Osc1Waveform)),
            osc1_level: get(ParamId::Osc1Level),
            osc1_detune: get(ParamId::Osc1Detune),
            osc1_octave: get(ParamId::Osc1Octave) as i32,
            osc1_pulse_width: get(ParamId::Osc1PulseWidth),
            osc2_waveform: waveform_from_raw(get(ParamId::Osc2Waveform)),
            osc2_level: get(ParamId::Osc2Level),
            osc2_detune: get(ParamId::Osc2Detune),
            osc2_octave: get(ParamId::Osc2Octave) as i32,
            osc2_pulse_width: get(ParamId::Osc2PulseWidth),
            filter_cutoff: get(ParamId::FilterCutoff),
            filter_resonance: get(ParamId::FilterResonance),
            filter_env_amount: get(ParamId::FilterEnvAmount),
            amp_attack: get(ParamId::AmpAttack),
            amp_decay: get(ParamId::AmpDecay),
            amp_sustain: get(ParamId::AmpSustain),
            amp_release: get(ParamId::AmpRelease),
            filter_attack: get(ParamId::FilterAttack),
            filter_decay: get(ParamId::FilterDecay),
            filter_sustain: get(ParamId::FilterSustain),
            filter_release: get(ParamId::FilterRelease),
            lfo_waveform: waveform_from_raw(get(ParamId::LfoWaveform)),
            lfo_rate: get(ParamId::LfoRate),
            lfo_depth: get(ParamId::LfoDepth),
            lfo_to_pitch: get(ParamId::LfoToPitch),
            lfo_to_filter: get(ParamId::LfoToFilter),
            lfo_to_pw: get(ParamId::LfoToPw),
        }
    }
}

impl Default for VoiceParams {
    fn default() -> Self {
        Self::from_fn(|id| id.descriptor().default)
    }
}

/// A note waiting for a stolen voice to finish fading out.
#[derive(Debug, Clone, Copy)]
struct PendingNote {
    note: u8,
    velocity: u8,
}

/// A single synthesizer voice.
///
/// ## Lifecycle
///
/// - [`note_on`](Self::note_on) on an idle voice resets the oscillator phases
///   and fades in over the anti-click time. On a voice already playing the
///   same note it retriggers the envelopes from their current level.
/// - [`steal`](Self::steal) on an audible voice fades the old note out, then
///   starts the new one with a cleared filter. [`note`](Self::note) reports
///   the new note from the moment of the steal.
/// - [`note_off`](Self::note_off) releases both envelopes.
///
/// # Example
///
/// ```rust
/// use polyvox_synth::{Voice, VoiceParams};
///
/// let mut voice = Voice::new(44100.0, 132);
/// voice.set_params(&VoiceParams::default());
/// voice.note_on(60, 100, 1);
///
/// let mut block = [0.0f32; 256];
/// voice.generate(&mut block);
/// assert!(voice.is_active());
///
/// voice.note_off();
/// assert!(voice.is_releasing());
/// ```
#[derive(Debug, Clone)]
pub struct Voice {
    osc1: Oscillator,
    osc2: Oscillator,
    lfo: Lfo,
    filter: LadderFilter,
    amp_env: AdsrEnvelope,
    filter_env: AdsrEnvelope,

    params: VoiceParams,

    note: Option<u8>,
    velocity: u8,
    /// Trigger order, larger is newer
    order: u64,

    /// Anti-click gain
    fade: LinearRamp,
    fade_samples: u32,
    pending: Option<PendingNote>,
}

impl Voice {
    /// Create an idle voice. `fade_samples` is the anti-click ramp length.
    pub fn new(sample_rate: f32, fade_samples: u32) -> Self {
        let params = VoiceParams::default();
        let mut voice = Self {
            osc1: Oscillator::new(sample_rate),
            osc2: Oscillator::new(sample_rate),
            lfo: Lfo::new(sample_rate, params.lfo_rate),
            filter: LadderFilter::new(sample_rate),
            amp_env: AdsrEnvelope::new(sample_rate),
            filter_env: AdsrEnvelope::new(sample_rate),
            params,
            note: None,
            velocity: 0,
            order: 0,
            fade: LinearRamp::new(1.0, fade_samples),
            fade_samples,
            pending: None,
        };
        voice.set_params(&params);
        voice
    }

    /// Apply a parameter snapshot to every sub-component.
    ///
    /// Oscillator tuning follows the current note, so octave and detune
    /// changes reach held notes.
    pub fn set_params(&mut self, params: &VoiceParams) {
        self.params = *params;

        self.osc1.set_waveform(params.osc1_waveform);
        self.osc1.set_pulse_width(params.osc1_pulse_width);
        self.osc2.set_waveform(params.osc2_waveform);
        self.osc2.set_pulse_width(params.osc2_pulse_width);

        self.filter.set_cutoff(params.filter_cutoff);
        self.filter.set_resonance(params.filter_resonance);

        self.amp_env.set_attack(params.amp_attack);
        self.amp_env.set_decay(params.amp_decay);
        self.amp_env.set_sustain(params.amp_sustain);
        self.amp_env.set_release(params.amp_release);
        self.filter_env.set_attack(params.filter_attack);
        self.filter_env.set_decay(params.filter_decay);
        self.filter_env.set_sustain(params.filter_sustain);
        self.filter_env.set_release(params.filter_release);

        self.lfo.set_waveform(params.lfo_waveform);
        self.lfo.set_rate(params.lfo_rate);
        self.lfo.set_depth(params.lfo_depth);

        // A pending note is tuned when it starts.
        if let (Some(note), None) = (self.note, self.pending) {
            self.tune(note);
        }
    }

    /// Start `note`, or retrigger it if this voice is already playing it.
    pub fn note_on(&mut self, note: u8, velocity: u8, order: u64) {
        self.order = order;

        if let Some(pending) = self.pending.as_mut() {
            pending.note = note;
            pending.velocity = velocity;
            self.note = Some(note);
            return;
        }

        if self.is_active() && self.note == Some(note) {
            self.velocity = velocity;
            self.amp_env.gate_on();
            self.filter_env.gate_on();
            return;
        }

        self.start(note, velocity);
    }

    /// Take this voice over for a new note.
    ///
    /// An audible voice fades out first; a silent one switches at once.
    pub fn steal(&mut self, note: u8, velocity: u8, order: u64) {
        self.order = order;
        self.note = Some(note);

        if self.fade_samples == 0 || !self.is_audible() {
            self.pending = None;
            self.restart(note, velocity);
            return;
        }

        self.pending = Some(PendingNote { note, velocity });
        self.fade.set_target(0.0);
    }

    /// Release both envelopes.
    pub fn note_off(&mut self) {
        if self.pending.take().is_some() {
            // The new note never started; let the old one finish fading.
            self.note = None;
        }
        self.amp_env.gate_off();
        self.filter_env.gate_off();
    }

    /// Silence immediately and clear all state.
    pub fn reset(&mut self) {
        self.osc1.reset();
        self.osc2.reset();
        self.filter.reset();
        self.amp_env.reset();
        self.filter_env.reset();
        self.fade.set_immediate(1.0);
        self.pending = None;
        self.note = None;
        self.velocity = 0;
    }

    /// Whether the voice is producing (or about to produce) sound.
    pub fn is_active(&self) -> bool {
        self.amp_env.is_active() || self.pending.is_some()
    }

    /// Whether the note has been released and is dying away.
    pub fn is_releasing(&self) -> bool {
        self.pending.is_none() && self.amp_env.state() == EnvelopeState::Release
    }

    /// Current (or pending) note.
    pub fn note(&self) -> Option<u8> {
        self.note
    }

    /// Trigger velocity.
    pub fn velocity(&self) -> u8 {
        self.pending.map_or(self.velocity, |p| p.velocity)
    }

    /// Trigger order assigned by the manager.
    pub fn order(&self) -> u64 {
        self.order
    }

    /// Amplitude envelope level.
    pub fn amp_level(&self) -> f32 {
        self.amp_env.level()
    }

    /// Amplitude envelope stage.
    pub fn amp_state(&self) -> EnvelopeState {
        self.amp_env.state()
    }

    /// Oscillator 1, for inspection.
    pub fn osc1(&self) -> &Oscillator {
        &self.osc1
    }

    /// Oscillator 2, for inspection.
    pub fn osc2(&self) -> &Oscillator {
        &self.osc2
    }

    /// Modulation LFO, for inspection.
    pub fn lfo(&self) -> &Lfo {
        &self.lfo
    }

    /// Render into `out`, overwriting it.
    pub fn generate(&mut self, out: &mut [f32]) {
        if !self.is_active() {
            self.lfo.skip(out.len());
            out.fill(0.0);
            return;
        }

        let p = self.params;
        let level_sum = p.osc1_level + p.osc2_level;
        let mix_norm = 1.0 / level_sum.max(1.0);

        for sample in out.iter_mut() {
            let lfo = self.lfo.next();

            let pitch_mod = lfo * p.lfo_to_pitch * LFO_PITCH_RANGE;
            let ratio = if pitch_mod != 0.0 {
                semitones_to_ratio(pitch_mod)
            } else {
                1.0
            };
            let pw_mod = lfo * p.lfo_to_pw * LFO_PW_RANGE;

            let o1 = self.osc1.next_modulated(ratio, pw_mod);
            let o2 = self.osc2.next_modulated(ratio, pw_mod);
            let mixed = (o1 * p.osc1_level + o2 * p.osc2_level) * mix_norm;

            let filter_env = self.filter_env.advance();
            let amp = self.amp_env.advance();
            let octaves = FILTER_MOD_OCTAVES * (filter_env * p.filter_env_amount + lfo * p.lfo_to_filter);
            let filtered = self.filter.process_sample_modulated(mixed, octaves);

            let fade = self.fade.advance();
            *sample = filtered * amp * (self.velocity as f32 / 127.0) * fade;

            if self.pending.is_some() && self.fade.is_settled() {
                self.start_pending();
            }
        }
    }

    fn is_audible(&self) -> bool {
        self.amp_env.is_active() && self.amp_env.level() > 0.0 && self.fade.get() > 0.0
    }

    fn start_pending(&mut self) {
        if let Some(PendingNote { note, velocity }) = self.pending.take() {
            self.restart(note, velocity);
        }
    }

    /// Start from a cleared filter and envelopes, as a fresh voice would.
    fn restart(&mut self, note: u8, velocity: u8) {
        self.filter.reset();
        self.amp_env.reset();
        self.filter_env.reset();
        self.start(note, velocity);
    }

    fn start(&mut self, note: u8, velocity: u8) {
        self.note = Some(note);
        self.velocity = velocity;
        self.tune(note);
        self.osc1.reset();
        self.osc2.reset();
        if !self.amp_env.is_active() {
            self.filter.reset();
        }
        self.fade.set_immediate(0.0);
        self.fade.set_target(1.0);
        self.amp_env.gate_on();
        self.filter_env.gate_on();
    }

    fn tune(&mut self, note: u8) {
        let p = &self.params;
        let note = i32::from(note);
        self.osc1
            .set_frequency(midi_to_freq(note + 12 * p.osc1_octave) * cents_to_ratio(p.osc1_detune));
        self.osc2
            .set_frequency(midi_to_freq(note + 12 * p.osc2_octave) * cents_to_ratio(p.osc2_detune));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SR: f32 = 44100.0;

    fn voice() -> Voice {
        Voice::new(SR, 132)
    }

    fn render(voice: &mut Voice, samples: usize) -> Vec<f32> {
        let mut buf = vec![0.0; samples];
        voice.generate(&mut buf);
        buf
    }

    #[test]
    fn test_voice_idle_is_silent() {
        let mut v = voice();
        assert!(!v.is_active());
        assert!(render(&mut v, 256).iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_voice_note_on_tunes_oscillators() {
        let mut v = voice();
        v.note_on(69, 100, 1);
        assert!((v.osc1().frequency() - 440.0).abs() < 1e-3);
        // osc2 default detune is +5 cents
        assert!((v.osc2().frequency() - 440.0 * cents_to_ratio(5.0)).abs() < 1e-3);

        let mut params = VoiceParams::default();
        params.osc1_octave = 1;
        params.osc2_octave = -1;
        params.osc2_detune = 0.0;
        v.set_params(&params);
        assert!((v.osc1().frequency() - 880.0).abs() < 1e-2);
        assert!((v.osc2().frequency() - 220.0).abs() < 1e-2);
    }

    #[test]
    fn test_voice_fresh_note_fades_in() {
        let mut v = voice();
        v.note_on(60, 127, 1);
        let out = render(&mut v, 2048);
        assert_eq!(out[0], 0.0);
        assert!(out.iter().any(|&s| s.abs() > 0.01));
        assert!(out.iter().all(|s| s.is_finite()));
    }

    #[test]
    fn test_voice_retrigger_keeps_phase() {
        let mut v = voice();
        v.note_on(60, 100, 1);
        render(&mut v, 1000);
        let phase = v.osc1().phase();
        let level = v.amp_level();
        v.note_on(60, 90, 2);
        assert_eq!(v.osc1().phase(), phase);
        assert_eq!(v.amp_level(), level);
        assert_eq!(v.amp_state(), EnvelopeState::Attack);
        assert_eq!(v.order(), 2);
    }

    #[test]
    fn test_voice_note_off_releases() {
        let mut v = voice();
        v.note_on(60, 100, 1);
        render(&mut v, 4410);
        v.note_off();
        assert!(v.is_releasing());

        // default release 0.3 s
        render(&mut v, (0.3 * SR) as usize + 256);
        assert!(!v.is_active());
    }

    #[test]
    fn test_voice_steal_fades_then_switches() {
        let mut v = voice();
        v.note_on(60, 100, 1);
        render(&mut v, 4410);

        v.steal(72, 80, 5);
        assert_eq!(v.note(), Some(72));
        assert_eq!(v.velocity(), 80);
        assert!(v.is_active());

        // Fade-out output shrinks toward zero without jumping
        let out = render(&mut v, 132);
        for pair in out.windows(2) {
            assert!((pair[1] - pair[0]).abs() < 0.2);
        }
        assert!(out[131].abs() < 0.02);

        // New note now running at its own pitch
        render(&mut v, 16);
        let expected = midi_to_freq(72);
        assert!((v.osc1().frequency() - expected).abs() < 1e-2);
        assert_eq!(v.amp_state(), EnvelopeState::Attack);
    }

    #[test]
    fn test_voice_steal_silent_switches_immediately() {
        let mut v = voice();
        v.steal(64, 100, 3);
        assert_eq!(v.amp_state(), EnvelopeState::Attack);
        assert!((v.osc1().frequency() - midi_to_freq(64)).abs() < 1e-2);
    }

    #[test]
    fn test_voice_steal_inaudible_matches_fresh() {
        let mut params = VoiceParams::default();
        params.amp_sustain = 0.0;
        params.amp_decay = 0.001;
        params.filter_resonance = 0.9;
        params.filter_cutoff = 300.0;

        let mut stolen = voice();
        stolen.set_params(&params);
        stolen.note_on(40, 100, 1);
        render(&mut stolen, 4410);
        assert_eq!(stolen.amp_state(), EnvelopeState::Sustain);
        assert_eq!(stolen.amp_level(), 0.0);

        let mut fresh = voice();
        fresh.set_params(&params);

        stolen.steal(64, 100, 2);
        fresh.note_on(64, 100, 2);

        let a = render(&mut stolen, 512);
        let b = render(&mut fresh, 512);
        let max_diff = a
            .iter()
            .zip(&b)
            .map(|(x, y)| (x - y).abs())
            .fold(0.0f32, f32::max);
        assert!(max_diff < 1e-7, "stolen voice differs from fresh: {max_diff}");
    }

    #[test]
    fn test_voice_lfo_runs_while_idle() {
        let mut v = voice();
        v.note_on(60, 100, 1);
        render(&mut v, 4410);
        v.reset();

        let before = v.lfo().phase();
        render(&mut v, 4410);
        let after = v.lfo().phase();

        // default rate 5 Hz: 0.1 s is half a cycle
        let moved = (after - before).rem_euclid(1.0);
        assert!((moved - 0.5).abs() < 1e-3, "lfo moved {moved}");
    }

    #[test]
    fn test_voice_note_off_during_steal_fade() {
        let mut v = voice();
        v.note_on(60, 100, 1);
        render(&mut v, 4410);
        v.steal(72, 100, 2);
        v.note_off();
        assert_eq!(v.note(), None);
        render(&mut v, (0.3 * SR) as usize + 512);
        assert!(!v.is_active());
    }

    #[test]
    fn test_voice_lfo_pitch_modulation_changes_output() {
        let mut plain = voice();
        let mut modded = voice();
        let mut params = VoiceParams::default();
        params.lfo_depth = 1.0;
        params.lfo_to_pitch = 1.0;
        modded.set_params(&params);

        plain.note_on(60, 100, 1);
        modded.note_on(60, 100, 1);
        let a = render(&mut plain, 4410);
        let b = render(&mut modded, 4410);
        assert!(a.iter().zip(&b).any(|(x, y)| (x - y).abs() > 1e-3));
    }

    #[test]
    fn test_voice_reset_silences() {
        let mut v = voice();
        v.note_on(60, 100, 1);
        render(&mut v, 512);
        v.reset();
        assert!(!v.is_active());
        assert_eq!(v.note(), None);
        assert!(render(&mut v, 64).iter().all(|&s| s == 0.0));
    }
}
