//! Property-based tests for polyvox-core DSP primitives.
//!
//! Tests ladder stability, LFO bounds, and smoothing convergence using
//! proptest for randomized input generation.

use proptest::prelude::*;
use polyvox_core::{LadderFilter, Lfo, SmoothedParam, Waveform};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(300))]

    /// For any cutoff and resonance, including out-of-range requests that
    /// get clamped, the ladder produces finite, bounded output for random
    /// finite input.
    #[test]
    fn ladder_stability(
        cutoff in 1.0f32..40000.0f32,
        resonance in 0.0f32..2.0f32,
        modulation in -8.0f32..8.0f32,
        input in prop::array::uniform32(-4.0f32..=4.0f32),
    ) {
        let mut filter = LadderFilter::new(44100.0);
        filter.set_cutoff(cutoff);
        filter.set_resonance(resonance);

        for _ in 0..32 {
            for &sample in &input {
                let out = filter.process_sample_modulated(sample, modulation);
                prop_assert!(
                    out.is_finite() && out.abs() < 4.0,
                    "ladder (fc={}, res={}, mod={}) produced {} for input {}",
                    cutoff, resonance, modulation, out, sample
                );
            }
        }
    }

    /// LFO output never exceeds its depth, for any shape and rate.
    #[test]
    fn lfo_bounded_by_depth(
        rate in 0.0f32..100.0f32,
        depth in 0.0f32..1.5f32,
        shape in 0usize..5,
    ) {
        let mut lfo = Lfo::new(44100.0, rate);
        lfo.set_depth(depth);
        let waveform = Waveform::from_index(shape).unwrap();
        lfo.set_waveform(waveform);
        let limit = lfo.depth() + 1e-6;

        for _ in 0..4096 {
            let bi = lfo.next();
            prop_assert!(bi.abs() <= limit, "{:?} bipolar {} > {}", waveform, bi, limit);
            let uni = lfo.next_unipolar();
            prop_assert!((-1e-6..=limit).contains(&uni), "{:?} unipolar {}", waveform, uni);
        }
    }

    /// SmoothedParam converges toward any target within ten time constants.
    #[test]
    fn smoothed_param_converges(
        start in -10.0f32..10.0f32,
        target in -10.0f32..10.0f32,
        time_ms in 1.0f32..50.0f32,
    ) {
        let mut param = SmoothedParam::with_config(start, 48000.0, time_ms);
        param.set_target(target);
        let samples = (time_ms * 48.0 * 10.0) as usize;
        for _ in 0..samples {
            param.advance();
        }
        prop_assert!((param.get() - target).abs() < 0.01 * (1.0 + (target - start).abs()));
    }
}
