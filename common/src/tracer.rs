//! Installs the global tracing subscriber used by the binaries.
//!
//! Output goes to stderr so that stdout remains free for data streams.
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Error)]
pub enum TracerError {
    #[error("Cannot install tracing subscriber: {0}")]
    Install(String),
}

#[derive(Debug, Clone)]
pub struct TracerOptions {
    /// Level used when `RUST_LOG` is absent or does not mention a target.
    level: LevelFilter,
    /// Emit ANSI colour codes.
    ansi: bool,
}

impl TracerOptions {
    pub fn new(level: LevelFilter, ansi: bool) -> Self {
        Self { level, ansi }
    }
}

impl Default for TracerOptions {
    fn default() -> Self {
        Self::new(LevelFilter::INFO, true)
    }
}

pub fn init_tracer(options: &TracerOptions) -> Result<(), TracerError> {
    let filter = EnvFilter::builder()
        .with_default_directive(options.level.into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(options.ansi)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| TracerError::Install(e.to_string()))
}
