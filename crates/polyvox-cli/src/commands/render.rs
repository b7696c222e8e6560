//! Offline render command.
//!
//! Plays a chord through the engine block by block, releases it, and reports
//! level and voice statistics for each phase. No audio is written.

use anyhow::Context;
use clap::Args;
use polyvox_synth::{EngineConfig, StealPolicy, Synth};
use serde::Serialize;
use std::path::PathBuf;

use super::parse_key_val;

#[derive(Args)]
pub struct RenderArgs {
    /// MIDI notes to hold, comma-separated
    #[arg(short, long, value_delimiter = ',', default_value = "60,64,67")]
    notes: Vec<u8>,

    /// Note-on velocity (1-127)
    #[arg(short, long, default_value = "100")]
    velocity: u8,

    /// Seconds to hold the notes
    #[arg(long, default_value = "1.0")]
    hold_secs: f32,

    /// Seconds to render after note-off
    #[arg(long, default_value = "1.0")]
    release_secs: f32,

    /// Samples per generate call
    #[arg(short, long, default_value = "256")]
    block_size: usize,

    /// Override the config's polyphony
    #[arg(short, long)]
    polyphony: Option<usize>,

    /// Override the config's steal policy
    /// (release_then_oldest, quietest, lowest, highest)
    #[arg(long)]
    steal_policy: Option<StealPolicy>,

    /// Override the config's sample rate
    #[arg(long)]
    sample_rate: Option<u32>,

    /// Engine config file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Parameter override (name=value), may be repeated
    #[arg(long = "param", value_parser = parse_key_val)]
    params: Vec<(String, String)>,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,
}

/// Statistics for one render phase.
#[derive(Debug, Default, Serialize)]
struct PhaseStats {
    samples: usize,
    peak: f32,
    rms: f32,
    max_voices: usize,
    final_voices: usize,
}

#[derive(Debug, Serialize)]
struct RenderReport {
    sample_rate: u32,
    polyphony: usize,
    steal_policy: StealPolicy,
    notes: Vec<u8>,
    velocity: u8,
    hold: PhaseStats,
    release: PhaseStats,
    faults: u64,
}

pub fn run(args: RenderArgs) -> anyhow::Result<()> {
    if args.notes.is_empty() {
        anyhow::bail!("No notes given");
    }
    if args.block_size == 0 {
        anyhow::bail!("Block size must be at least 1");
    }
    if !(args.hold_secs >= 0.0 && args.release_secs >= 0.0) {
        anyhow::bail!("Durations must be non-negative");
    }

    let mut config = match &args.config {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => EngineConfig::default(),
    };
    if let Some(polyphony) = args.polyphony {
        config.polyphony = polyphony;
    }
    if let Some(policy) = args.steal_policy {
        config.steal_policy = policy;
    }
    if let Some(sample_rate) = args.sample_rate {
        config.sample_rate = sample_rate;
    }

    let mut synth = Synth::with_config(&config).context("Invalid engine settings")?;

    for (name, value) in &args.params {
        synth
            .handle()
            .set_parameter_str(name, value)
            .with_context(|| format!("Invalid parameter '{}={}'", name, value))?;
    }

    tracing::info!(
        notes = ?args.notes,
        velocity = args.velocity,
        sample_rate = config.sample_rate,
        "rendering"
    );

    for &note in &args.notes {
        synth
            .note_on(note, args.velocity)
            .with_context(|| format!("Rejected note {}", note))?;
    }

    let sr = config.sample_rate as f32;
    let hold_samples = (args.hold_secs * sr).round() as usize;
    let release_samples = (args.release_secs * sr).round() as usize;

    let hold = render_phase(&mut synth, hold_samples, args.block_size);

    for &note in &args.notes {
        synth.note_off(note)?;
    }
    let release = render_phase(&mut synth, release_samples, args.block_size);

    let report = RenderReport {
        sample_rate: config.sample_rate,
        polyphony: config.polyphony,
        steal_policy: config.steal_policy,
        notes: args.notes,
        velocity: args.velocity,
        hold,
        release,
        faults: synth.fault_count(),
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    Ok(())
}

fn render_phase(synth: &mut Synth, total: usize, block_size: usize) -> PhaseStats {
    let mut stats = PhaseStats::default();
    let mut buf = vec![0.0f32; block_size];
    let mut sum_sq = 0.0f64;
    let mut remaining = total;

    while remaining > 0 {
        let len = remaining.min(block_size);
        let block = &mut buf[..len];
        synth.generate_into(block);

        for &s in block.iter() {
            stats.peak = stats.peak.max(s.abs());
            sum_sq += f64::from(s) * f64::from(s);
        }
        stats.max_voices = stats.max_voices.max(synth.active_voice_count());
        remaining -= len;
    }

    stats.samples = total;
    if total > 0 {
        stats.rms = (sum_sq / total as f64).sqrt() as f32;
    }
    stats.final_voices = synth.active_voice_count();
    stats
}

fn print_report(report: &RenderReport) {
    let notes: Vec<String> = report.notes.iter().map(|n| n.to_string()).collect();

    println!("Render Summary");
    println!("==============");
    println!();
    println!("  Sample rate: {} Hz", report.sample_rate);
    println!("  Polyphony:   {}", report.polyphony);
    println!("  Stealing:    {}", report.steal_policy);
    println!("  Notes:       {}", notes.join(", "));
    println!("  Velocity:    {}", report.velocity);
    println!();
    print_phase("Hold", &report.hold, report.sample_rate);
    print_phase("Release", &report.release, report.sample_rate);
    println!("  Faults:      {}", report.faults);
}

fn print_phase(label: &str, stats: &PhaseStats, sample_rate: u32) {
    println!(
        "  {} ({:.2}s, {} samples)",
        label,
        stats.samples as f32 / sample_rate as f32,
        stats.samples
    );
    println!("    Peak:         {:.4} ({:.1} dBFS)", stats.peak, to_db(stats.peak));
    println!("    RMS:          {:.4} ({:.1} dBFS)", stats.rms, to_db(stats.rms));
    println!("    Max voices:   {}", stats.max_voices);
    println!("    Final voices: {}", stats.final_voices);
    println!();
}

fn to_db(level: f32) -> f32 {
    if level <= 1e-10 {
        -200.0
    } else {
        20.0 * level.log10()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_phase_stats() {
        let mut synth = Synth::new(44100.0);
        synth.note_on(60, 100).unwrap();
        let stats = render_phase(&mut synth, 4410, 256);
        assert_eq!(stats.samples, 4410);
        assert!(stats.peak > 0.0 && stats.peak <= 1.0);
        assert!(stats.rms > 0.0 && stats.rms <= stats.peak);
        assert_eq!(stats.max_voices, 1);
    }

    #[test]
    fn test_render_phase_empty() {
        let mut synth = Synth::new(44100.0);
        let stats = render_phase(&mut synth, 0, 64);
        assert_eq!(stats.samples, 0);
        assert_eq!(stats.rms, 0.0);
        assert_eq!(stats.peak, 0.0);
    }

    #[test]
    fn test_to_db() {
        assert!((to_db(1.0)).abs() < 1e-6);
        assert!((to_db(0.5) + 6.02).abs() < 0.01);
        assert_eq!(to_db(0.0), -200.0);
    }
}
