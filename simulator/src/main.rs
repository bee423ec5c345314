//! # Simulator
//!
//! Writes a raw frame stream, as read by the heart-rate component, from a JSON description
//! of a pulsing fingertip. Useful for exercising the pipeline without a camera.
//!
mod elements;
mod simulation;

use clap::Parser;
use heart_rate_common::tracer::{TracerOptions, init_tracer};
use miette::IntoDiagnostic;
use simulation::Simulation;
use std::{
    fs::File,
    io::{BufReader, BufWriter, Write},
    path::PathBuf,
};
use tracing::info;

#[derive(Clone, Parser)]
#[clap(author, version = heart_rate_common::version!(), about)]
struct Cli {
    /// Path to the json settings file
    #[clap(long)]
    config: PathBuf,

    /// File to write frames to. If absent, frames are written to stdout
    #[clap(long)]
    output: Option<PathBuf>,
}

fn main() -> miette::Result<()> {
    let cli = Cli::parse();

    init_tracer(&TracerOptions::default()).into_diagnostic()?;

    let simulation: Simulation =
        serde_json::from_reader(BufReader::new(File::open(&cli.config).into_diagnostic()?))
            .into_diagnostic()?;
    let mut generator = simulation.generator().into_diagnostic()?;

    let mut writer: BufWriter<Box<dyn Write>> = BufWriter::new(match &cli.output {
        Some(path) => Box::new(File::create(path).into_diagnostic()?),
        None => Box::new(std::io::stdout().lock()),
    });
    let written = generator.write_all(&mut writer).into_diagnostic()?;
    info!("Wrote {written} frames");
    Ok(())
}
