//! Config validation command.

use anyhow::Context;
use clap::Args;
use polyvox_synth::{EngineConfig, PARAMS, ParamId};
use std::path::PathBuf;

#[derive(Args)]
pub struct CheckConfigArgs {
    /// Engine config file (TOML)
    config: PathBuf,

    /// Print the resolved config as JSON
    #[arg(long)]
    json: bool,
}

pub fn run(args: CheckConfigArgs) -> anyhow::Result<()> {
    let config = EngineConfig::load(&args.config)
        .with_context(|| format!("Invalid config {}", args.config.display()))?;

    tracing::debug!(path = %args.config.display(), "config validated");

    if args.json {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    println!("Config OK: {}", args.config.display());
    println!();
    println!("  Sample rate:     {} Hz", config.sample_rate);
    println!("  Polyphony:       {}", config.polyphony);
    println!("  Max block size:  {}", config.max_block_size);
    println!("  Queue capacity:  {}", config.event_queue_capacity);
    println!("  Steal policy:    {}", config.steal_policy);
    println!(
        "  Fade:            {} ms ({} samples)",
        config.fade_ms,
        config.fade_samples()
    );
    println!();

    if config.params.is_empty() {
        println!("  No parameter overrides ({} parameters at defaults)", PARAMS.len());
    } else {
        println!("  Parameter overrides:");
        for (name, value) in &config.params {
            let unit = ParamId::from_name(name)
                .map(|id| id.descriptor().unit)
                .unwrap_or("");
            println!("    {:18} {} {}", name, value, unit);
        }
    }

    Ok(())
}
