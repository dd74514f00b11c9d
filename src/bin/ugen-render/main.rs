//! ugen-render - render a graph definition offline and report on it
//!
//! Run with: cargo run --bin ugen-render -- voice.json --seconds 2

mod analysis;
mod render;

use std::path::PathBuf;

use clap::Parser;
use color_eyre::eyre::{eyre, Result as EyreResult, WrapErr};
use saavy_ugen::{registry::Registry, EngineConfig, UGenDef};

use analysis::ChannelReport;
use render::{Assignment, Renderer};

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    /// JSON graph definition
    #[arg(required_unless_present = "kinds")]
    definition: Option<PathBuf>,

    /// List the registered type identifiers and exit
    #[arg(long)]
    kinds: bool,

    /// Seconds of audio to render
    #[arg(short, long, default_value_t = 1.0)]
    seconds: f64,

    /// Sample rate in Hz
    #[arg(short = 'r', long, default_value_t = 44_100.0)]
    sample_rate: f32,

    /// Samples per block
    #[arg(short, long, default_value_t = 64)]
    block_size: usize,

    /// Output channels
    #[arg(short, long, default_value_t = 1)]
    channels: usize,

    /// Rebind before rendering, e.g. `lead.freq=220` or
    /// `lead.freq={"type":"line","inputs":{"end":880}}`
    #[arg(long = "set", value_name = "PATH=VALUE")]
    sets: Vec<Assignment>,
}

fn main() -> EyreResult<()> {
    color_eyre::install()?;
    env_logger::init();

    let cli = Cli::parse();

    if cli.kinds {
        let registry = Registry::default();
        let mut names: Vec<_> = registry.names().collect();
        names.sort_unstable();
        for name in names {
            println!("{name}");
        }
        return Ok(());
    }

    let Some(definition) = cli.definition else {
        return Err(eyre!("no graph definition given"));
    };
    let json = std::fs::read_to_string(&definition)
        .wrap_err_with(|| format!("reading {}", definition.display()))?;
    let def = UGenDef::from_json(&json).wrap_err("parsing graph definition")?;
    let config = EngineConfig::new(cli.sample_rate, cli.block_size, cli.channels);

    let mut renderer = Renderer::new(&def, config).wrap_err("building graph")?;
    for assignment in &cli.sets {
        renderer
            .apply(assignment)
            .wrap_err_with(|| format!("applying --set {assignment}"))?;
    }

    let channels = renderer.render(cli.seconds);
    println!(
        "{} nodes, {} channel(s), {} samples per channel",
        renderer.node_count(),
        channels.len(),
        channels.first().map_or(0, Vec::len)
    );
    for (index, samples) in channels.iter().enumerate() {
        let report = ChannelReport::analyze(samples, cli.sample_rate);
        println!("channel {index}: {report}");
    }

    Ok(())
}
