//! Parameter listing and information command.

#![allow(clippy::print_literal)] // Table headers use literal strings intentionally

use clap::Args;
use polyvox_synth::{PARAMS, ParamDescriptor, ParamId, ParamKind, Waveform};

#[derive(Args)]
pub struct ParamsArgs {
    /// Show details for a specific parameter
    #[arg(value_name = "NAME")]
    name: Option<String>,
}

pub fn run(args: ParamsArgs) -> anyhow::Result<()> {
    if let Some(name) = &args.name {
        let id = ParamId::from_name(name)
            .ok_or_else(|| anyhow::anyhow!("Unknown parameter: {}", name))?;
        let desc = id.descriptor();

        println!("{}", desc.name);
        println!("{}", "=".repeat(desc.name.len()));
        println!();
        println!("{}", desc.description);
        println!();
        println!("  Kind:     {}", desc.kind.label());
        println!("  Default:  {}", default_text(desc));
        println!("  Range:    {}", range_text(desc));
        if !desc.unit.is_empty() {
            println!("  Unit:     {}", desc.unit);
        }
        println!();
        println!("Example usage:");
        println!();
        println!(
            "  polyvox render --notes 60,64,67 --param {}={}",
            desc.name,
            default_text(desc)
        );
    } else {
        println!("Synth Parameters");
        println!("================");
        println!();
        println!(
            "  {:18}  {:10}  {:24}  {}",
            "Name", "Default", "Range", "Description"
        );
        println!(
            "  {:18}  {:10}  {:24}  {}",
            "----", "-------", "-----", "-----------"
        );

        for desc in &PARAMS {
            println!(
                "  {:18}  {:10}  {:24}  {}",
                desc.name,
                default_text(desc),
                range_text(desc),
                desc.description
            );
        }

        println!();
        println!("Use 'polyvox params <name>' for details on one parameter.");
    }

    Ok(())
}

fn default_text(desc: &ParamDescriptor) -> String {
    desc.to_value(desc.default).to_string()
}

fn range_text(desc: &ParamDescriptor) -> String {
    match desc.kind {
        ParamKind::Waveform => Waveform::ALL
            .iter()
            .map(|w| w.name())
            .collect::<Vec<_>>()
            .join("|"),
        ParamKind::Integer => format!("{}..{} {}", desc.min, desc.max, desc.unit),
        ParamKind::Number => format!("{} to {} {}", desc.min, desc.max, desc.unit),
    }
    .trim_end()
    .to_string()
}
