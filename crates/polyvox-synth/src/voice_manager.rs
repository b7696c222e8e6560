//! Voice allocation and mixing.
//!
//! The [`VoiceManager`] owns a fixed arena of [`Voice`]s allocated once at
//! construction and a 128-entry note map pointing into it. When every voice
//! is busy a new note steals one, chosen by the [`StealPolicy`]. The default
//! takes:
//!
//! 1. the releasing voice with the lowest amplitude, if any voice is releasing;
//! 2. otherwise the voice triggered longest ago.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::voice::{Voice, VoiceParams};

/// Largest supported polyphony.
pub const MAX_POLYPHONY: usize = 32;
/// Polyphony used when none is configured.
pub const DEFAULT_POLYPHONY: usize = 8;
/// Number of MIDI notes.
pub const NOTE_COUNT: usize = 128;

/// Stack buffer length used when summing voices.
const SCRATCH_LEN: usize = 256;

/// Which voice a new note takes when every voice is busy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StealPolicy {
    /// Quietest releasing voice, else the oldest trigger.
    #[default]
    ReleaseThenOldest,
    /// Lowest amplitude, releasing or not.
    Quietest,
    /// Lowest note.
    Lowest,
    /// Highest note.
    Highest,
}

impl StealPolicy {
    /// All policies.
    pub const ALL: [StealPolicy; 4] = [
        StealPolicy::ReleaseThenOldest,
        StealPolicy::Quietest,
        StealPolicy::Lowest,
        StealPolicy::Highest,
    ];

    /// Config and CLI name.
    pub const fn name(self) -> &'static str {
        match self {
            StealPolicy::ReleaseThenOldest => "release_then_oldest",
            StealPolicy::Quietest => "quietest",
            StealPolicy::Lowest => "lowest",
            StealPolicy::Highest => "highest",
        }
    }
}

impl fmt::Display for StealPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when a steal policy name is not recognized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseStealPolicyError(String);

impl fmt::Display for ParseStealPolicyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown steal policy '{}' (expected release_then_oldest, quietest, lowest or highest)",
            self.0
        )
    }
}

impl std::error::Error for ParseStealPolicyError {}

impl FromStr for StealPolicy {
    type Err = ParseStealPolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|p| p.name() == lower)
            .ok_or_else(|| ParseStealPolicyError(s.to_string()))
    }
}

/// Polyphonic voice pool with note tracking and voice stealing.
///
/// Invariants:
/// - the arena length never changes after construction;
/// - every mapped note points at an active voice whose current note is that
///   note (pruned after each [`generate`](Self::generate));
/// - at most `polyphony` voices are active.
///
/// # Example
///
/// ```rust
/// use polyvox_synth::VoiceManager;
///
/// let mut manager = VoiceManager::new(44100.0, 8, 132);
///
/// manager.note_on(60, 100);
/// manager.note_on(64, 100);
/// manager.note_on(67, 100);
///
/// let mut block = [0.0f32; 512];
/// manager.generate(&mut block);
/// assert_eq!(manager.active_voice_count(), 3);
/// ```
#[derive(Debug)]
pub struct VoiceManager {
    voices: Box<[Voice]>,
    note_map: [Option<usize>; NOTE_COUNT],
    /// Global trigger counter
    order_counter: u64,
    sample_rate: f32,
    steal_policy: StealPolicy,
}

impl VoiceManager {
    /// Create a manager with `polyphony` voices (clamped to 1..=32).
    pub fn new(sample_rate: f32, polyphony: usize, fade_samples: u32) -> Self {
        let polyphony = polyphony.clamp(1, MAX_POLYPHONY);
        let voices = (0..polyphony)
            .map(|_| Voice::new(sample_rate, fade_samples))
            .collect::<Vec<_>>()
            .into_boxed_slice();
        Self {
            voices,
            note_map: [None; NOTE_COUNT],
            order_counter: 0,
            sample_rate,
            steal_policy: StealPolicy::default(),
        }
    }

    /// Choose how busy voices are stolen. Applies to the next steal.
    pub fn set_steal_policy(&mut self, policy: StealPolicy) {
        self.steal_policy = policy;
    }

    /// Current steal policy.
    pub fn steal_policy(&self) -> StealPolicy {
        self.steal_policy
    }

    /// Sample rate the voices were built for.
    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Number of voices in the arena.
    pub fn polyphony(&self) -> usize {
        self.voices.len()
    }

    /// Number of voices currently sounding.
    pub fn active_voice_count(&self) -> usize {
        self.voices.iter().filter(|v| v.is_active()).count()
    }

    /// Read access to all voices.
    pub fn voices(&self) -> &[Voice] {
        &self.voices
    }

    /// The voice a note is mapped to, if any.
    pub fn voice_for_note(&self, note: u8) -> Option<&Voice> {
        self.note_map
            .get(note as usize)
            .copied()
            .flatten()
            .map(|idx| &self.voices[idx])
    }

    /// Apply a parameter snapshot to every voice.
    pub fn set_params(&mut self, params: &VoiceParams) {
        for voice in self.voices.iter_mut() {
            voice.set_params(params);
        }
    }

    /// Trigger a note. Velocity 0 releases it instead.
    ///
    /// Returns the index of the voice that took the note, or `None` for a
    /// release or a note outside 0..=127.
    pub fn note_on(&mut self, note: u8, velocity: u8) -> Option<usize> {
        if note as usize >= NOTE_COUNT {
            return None;
        }
        if velocity == 0 {
            self.note_off(note);
            return None;
        }
        let velocity = velocity.min(127);

        self.order_counter += 1;
        let order = self.order_counter;

        if let Some(idx) = self.note_map[note as usize]
            && self.voices[idx].is_active()
        {
            self.voices[idx].note_on(note, velocity, order);
            return Some(idx);
        }

        let idx = if let Some(free) = self.voices.iter().position(|v| !v.is_active()) {
            self.unmap(free);
            self.voices[free].note_on(note, velocity, order);
            free
        } else {
            let victim = self.steal_candidate();
            self.unmap(victim);
            self.voices[victim].steal(note, velocity, order);
            victim
        };

        self.note_map[note as usize] = Some(idx);
        Some(idx)
    }

    /// Release a note. Unmapped notes are ignored.
    pub fn note_off(&mut self, note: u8) {
        let Some(slot) = self.note_map.get_mut(note as usize) else {
            return;
        };
        if let Some(idx) = slot.take() {
            self.voices[idx].note_off();
        }
    }

    /// Release every active voice and clear the note map.
    pub fn all_notes_off(&mut self) {
        for voice in self.voices.iter_mut().filter(|v| v.is_active()) {
            voice.note_off();
        }
        self.note_map = [None; NOTE_COUNT];
    }

    /// Silence every voice immediately.
    pub fn panic(&mut self) {
        for voice in self.voices.iter_mut() {
            voice.reset();
        }
        self.note_map = [None; NOTE_COUNT];
    }

    /// Mapped notes in ascending order.
    pub fn playing_notes(&self) -> impl Iterator<Item = u8> + '_ {
        self.note_map
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.is_some())
            .map(|(note, _)| note as u8)
    }

    /// Mapped notes as a 128-bit set, bit `n` for note `n`.
    pub fn note_bitmap(&self) -> [u64; 2] {
        let mut bits = [0u64; 2];
        for note in self.playing_notes() {
            bits[note as usize / 64] |= 1 << (note % 64);
        }
        bits
    }

    /// Sum every active voice into `out`, overwriting it.
    pub fn generate(&mut self, out: &mut [f32]) {
        out.fill(0.0);
        let mut scratch = [0.0f32; SCRATCH_LEN];

        for chunk in out.chunks_mut(SCRATCH_LEN) {
            let buf = &mut scratch[..chunk.len()];
            for voice in self.voices.iter_mut().filter(|v| v.is_active()) {
                voice.generate(buf);
                for (acc, &s) in chunk.iter_mut().zip(buf.iter()) {
                    *acc += s;
                }
            }
        }

        self.prune();
    }

    fn steal_candidate(&self) -> usize {
        let voices = self.voices.iter().enumerate();
        let picked = match self.steal_policy {
            StealPolicy::ReleaseThenOldest => voices
                .clone()
                .filter(|(_, v)| v.is_releasing())
                .min_by(|(_, a), (_, b)| a.amp_level().total_cmp(&b.amp_level()))
                .or_else(|| voices.min_by_key(|(_, v)| v.order())),
            StealPolicy::Quietest => {
                voices.min_by(|(_, a), (_, b)| a.amp_level().total_cmp(&b.amp_level()))
            }
            // Ties go to the oldest trigger
            StealPolicy::Lowest => voices.min_by_key(|(_, v)| (v.note(), v.order())),
            StealPolicy::Highest => {
                voices.max_by_key(|(_, v)| (v.note(), core::cmp::Reverse(v.order())))
            }
        };
        picked.map_or(0, |(i, _)| i)
    }

    /// Drop the map entry pointing at voice `idx`, if any.
    fn unmap(&mut self, idx: usize) {
        if let Some(old) = self.voices[idx].note()
            && self.note_map[old as usize] == Some(idx)
        {
            self.note_map[old as usize] = None;
        }
    }

    fn prune(&mut self) {
        for (note, slot) in self.note_map.iter_mut().enumerate() {
            if let Some(idx) = *slot {
                let voice = &self.voices[idx];
                if !voice.is_active() || voice.note() != Some(note as u8) {
                    *slot = None;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::EnvelopeState;

    const SR: f32 = 44100.0;

    fn manager(polyphony: usize) -> VoiceManager {
        VoiceManager::new(SR, polyphony, 132)
    }

    fn run(manager: &mut VoiceManager, samples: usize) {
        let mut buf = vec![0.0; samples];
        manager.generate(&mut buf);
    }

    #[test]
    fn test_manager_polyphony_clamped() {
        assert_eq!(manager(0).polyphony(), 1);
        assert_eq!(manager(100).polyphony(), MAX_POLYPHONY);
        assert_eq!(manager(DEFAULT_POLYPHONY).polyphony(), 8);
    }

    #[test]
    fn test_manager_allocates_free_voices() {
        let mut m = manager(4);
        assert_eq!(m.note_on(60, 100), Some(0));
        assert_eq!(m.note_on(64, 100), Some(1));
        assert_eq!(m.active_voice_count(), 2);
        assert_eq!(m.playing_notes().collect::<Vec<_>>(), vec![60, 64]);
    }

    #[test]
    fn test_manager_retrigger_reuses_voice() {
        let mut m = manager(4);
        let first = m.note_on(60, 100);
        run(&mut m, 256);
        let second = m.note_on(60, 110);
        assert_eq!(first, second);
        assert_eq!(m.active_voice_count(), 1);
    }

    #[test]
    fn test_manager_steals_oldest() {
        let mut m = manager(8);
        for note in 60..68 {
            m.note_on(note, 100);
        }
        let oldest = m.voice_for_note(60).map(|v| v.order());
        assert_eq!(oldest, Some(1));

        let idx = m.note_on(68, 100);
        assert_eq!(idx, Some(0));
        assert_eq!(m.active_voice_count(), 8);
        assert!(m.voice_for_note(60).is_none());
        assert_eq!(m.voice_for_note(68).and_then(|v| v.note()), Some(68));
    }

    #[test]
    fn test_manager_prefers_quietest_releasing_voice() {
        let mut m = manager(3);
        m.note_on(60, 100);
        m.note_on(62, 100);
        m.note_on(64, 100);
        run(&mut m, 4410);

        m.note_off(64);
        run(&mut m, 2000);
        m.note_off(62);
        run(&mut m, 10);

        // 64 has been releasing longer, so it is quieter
        let idx = m.note_on(70, 100);
        assert_eq!(idx, Some(2));
    }

    /// Three busy voices: 60 oldest and loudest, 48 mid-attack, 72 just started.
    fn busy_manager(policy: StealPolicy) -> VoiceManager {
        let mut m = manager(3);
        m.set_steal_policy(policy);
        m.note_on(60, 100);
        run(&mut m, 4410);
        m.note_on(48, 100);
        run(&mut m, 100);
        m.note_on(72, 100);
        run(&mut m, 10);
        m
    }

    #[test]
    fn test_manager_steal_policy_per_variant() {
        let cases = [
            (StealPolicy::ReleaseThenOldest, 0, 60),
            (StealPolicy::Quietest, 2, 72),
            (StealPolicy::Lowest, 1, 48),
            (StealPolicy::Highest, 2, 72),
        ];
        for (policy, expected_idx, victim) in cases {
            let mut m = busy_manager(policy);
            assert_eq!(m.note_on(80, 100), Some(expected_idx), "{policy}");
            assert!(m.voice_for_note(victim).is_none(), "{policy}");
            assert_eq!(m.voice_for_note(80).and_then(|v| v.note()), Some(80));
            assert_eq!(m.active_voice_count(), 3);
        }
    }

    #[test]
    fn test_manager_default_steal_policy() {
        let m = manager(2);
        assert_eq!(m.steal_policy(), StealPolicy::ReleaseThenOldest);
        assert_eq!(StealPolicy::default(), StealPolicy::ReleaseThenOldest);
    }

    #[test]
    fn test_steal_policy_parse() {
        for policy in StealPolicy::ALL {
            assert_eq!(policy.name().parse::<StealPolicy>(), Ok(policy));
        }
        assert_eq!("Release-Then-Oldest".parse(), Ok(StealPolicy::ReleaseThenOldest));
        assert!("newest".parse::<StealPolicy>().is_err());
    }

    #[test]
    fn test_manager_velocity_zero_is_note_off() {
        let mut m = manager(4);
        m.note_on(60, 100);
        run(&mut m, 4410);
        assert_eq!(m.note_on(60, 0), None);
        assert!(m.voice_for_note(60).is_none());
        assert!(m.voices()[0].is_releasing());
    }

    #[test]
    fn test_manager_note_off_unmapped_is_noop() {
        let mut m = manager(2);
        m.note_off(42);
        m.note_off(200);
        assert_eq!(m.active_voice_count(), 0);
    }

    #[test]
    fn test_manager_all_notes_off_releases() {
        let mut m = manager(4);
        for note in [60, 64, 67] {
            m.note_on(note, 100);
        }
        run(&mut m, 4410);
        m.all_notes_off();
        assert_eq!(m.playing_notes().count(), 0);
        for voice in m.voices().iter().filter(|v| v.is_active()) {
            assert_eq!(voice.amp_state(), EnvelopeState::Release);
        }
        assert_eq!(m.active_voice_count(), 3);
    }

    #[test]
    fn test_manager_panic_silences() {
        let mut m = manager(4);
        m.note_on(60, 100);
        run(&mut m, 512);
        m.panic();
        assert_eq!(m.active_voice_count(), 0);
        let mut buf = [1.0f32; 300];
        m.generate(&mut buf);
        assert!(buf.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_manager_prunes_finished_voices() {
        let mut m = manager(2);
        m.note_on(60, 100);
        run(&mut m, 1000);
        m.voices.iter_mut().for_each(Voice::reset);
        run(&mut m, 16);
        assert!(m.voice_for_note(60).is_none());
    }

    #[test]
    fn test_manager_note_bitmap() {
        let mut m = manager(4);
        m.note_on(0, 100);
        m.note_on(64, 100);
        m.note_on(127, 100);
        let bits = m.note_bitmap();
        assert_eq!(bits[0], 1);
        assert_eq!(bits[1], 1 | (1 << 63));
    }

    #[test]
    fn test_manager_generate_longer_than_scratch() {
        let mut m = manager(2);
        m.note_on(48, 127);
        let mut buf = vec![0.0; SCRATCH_LEN * 3 + 17];
        m.generate(&mut buf);
        assert!(buf[SCRATCH_LEN * 3..].iter().any(|&s| s != 0.0));
        assert!(buf.iter().all(|s| s.is_finite()));
    }
}
