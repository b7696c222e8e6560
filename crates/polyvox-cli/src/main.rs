//! Polyvox CLI - Command-line interface for the polyvox synthesizer engine.

mod commands;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "polyvox")]
#[command(author, version, about = "Polyvox polyphonic synthesizer CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List synthesizer parameters and their ranges
    Params(commands::params::ParamsArgs),

    /// Render notes offline and print level diagnostics
    Render(commands::render::RenderArgs),

    /// Validate an engine config file
    CheckConfig(commands::check_config::CheckConfigArgs),
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Params(args) => commands::params::run(args),
        Commands::Render(args) => commands::render::run(args),
        Commands::CheckConfig(args) => commands::check_config::run(args),
    }
}
