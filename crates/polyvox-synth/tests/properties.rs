//! Property-based tests for the polyvox-synth engine.
//!
//! Random note sequences and parameter settings must never push the voice
//! count past polyphony or the output outside [-1, 1].

use proptest::prelude::*;
use polyvox_synth::{AdsrEnvelope, EngineConfig, ParamId, Synth, VoiceManager};

#[derive(Debug, Clone)]
enum Op {
    On(u8, u8),
    Off(u8),
    AllOff,
    Render(usize),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (0u8..128, 0u8..128).prop_map(|(n, v)| Op::On(n, v)),
        2 => (0u8..128).prop_map(Op::Off),
        1 => Just(Op::AllOff),
        3 => (1usize..600).prop_map(Op::Render),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// The manager never has more active voices than its arena.
    #[test]
    fn active_voices_bounded_by_polyphony(
        polyphony in 1usize..12,
        ops in prop::collection::vec(op(), 1..80),
    ) {
        let mut manager = VoiceManager::new(44100.0, polyphony, 132);
        let mut buf = vec![0.0f32; 600];
        for op in ops {
            match op {
                Op::On(n, v) => { manager.note_on(n, v); }
                Op::Off(n) => manager.note_off(n),
                Op::AllOff => manager.all_notes_off(),
                Op::Render(len) => manager.generate(&mut buf[..len]),
            }
            prop_assert!(manager.active_voice_count() <= polyphony);
            for note in manager.playing_notes() {
                let voice = manager.voice_for_note(note).unwrap();
                prop_assert_eq!(voice.note(), Some(note));
            }
        }
    }

    /// Engine output stays inside [-1, 1] for any parameter values.
    #[test]
    fn output_always_in_unit_range(
        raw in prop::collection::vec(-100.0f32..30000.0, ParamId::COUNT),
        notes in prop::collection::vec((0u8..128, 1u8..128), 1..10),
    ) {
        let config = EngineConfig::default().polyphony(6);
        let mut synth = Synth::with_config(&config).unwrap();
        for (id, value) in ParamId::ALL.iter().zip(raw) {
            synth.handle().set_param(*id, value);
        }
        for (note, velocity) in notes {
            synth.note_on(note, velocity).unwrap();
        }
        let out = synth.generate(2048);
        prop_assert_eq!(out.len(), 2048);
        for s in out {
            prop_assert!((-1.0..=1.0).contains(&s), "sample {}", s);
        }
    }

    /// Envelope level stays in [0, 1] through any gate pattern.
    #[test]
    fn envelope_level_in_unit_range(
        attack in 0.0f32..0.05,
        decay in 0.0f32..0.05,
        sustain in -0.5f32..1.5,
        release in 0.0f32..0.05,
        gates in prop::collection::vec((any::<bool>(), 1usize..400), 1..20),
    ) {
        let mut env = AdsrEnvelope::new(44100.0);
        env.set_attack(attack);
        env.set_decay(decay);
        env.set_sustain(sustain);
        env.set_release(release);
        for (on, len) in gates {
            if on { env.gate_on() } else { env.gate_off() }
            for _ in 0..len {
                let level = env.advance();
                prop_assert!((0.0..=1.0).contains(&level), "level {}", level);
            }
        }
    }
}
