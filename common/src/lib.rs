//! Types, metric names and tracing setup shared by the heart rate components.
pub mod metrics;
pub mod tracer;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

#[doc(hidden)]
pub use const_format;
#[doc(hidden)]
pub use git_version;

/// Scalar type used throughout the signal chain.
pub type Real = f64;

/// Milliseconds elapsed since the pipeline session started.
pub type Timestamp = u64;

/// Channel order of a raw pixel buffer. Channels are interleaved, eight bits each.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PixelLayout {
    /// Three bytes per pixel, ordered R, G, B.
    Rgb,
    /// Four bytes per pixel, ordered R, G, B, A. The alpha channel is ignored.
    #[default]
    Rgba,
}

impl PixelLayout {
    /// Number of interleaved bytes per pixel.
    pub const fn channels(self) -> usize {
        match self {
            PixelLayout::Rgb => 3,
            PixelLayout::Rgba => 4,
        }
    }
}

/// Expands to the crate version, followed by the git revision it was built from.
#[macro_export]
macro_rules! version {
    () => {
        $crate::const_format::concatcp!(
            ::core::env!("CARGO_PKG_VERSION"),
            " (",
            $crate::git_version::git_version!(args = ["--always", "--dirty=-modified"], fallback = "unknown"),
            ")"
        )
    };
}
