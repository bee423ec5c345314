//! Infinite impulse response filters applied to the colour channel, one sample at a time.
//!
//! # Example
//!
//! ```rust
//! # use heart_rate::filter::{BandpassFilter, Filter, FilterDesign};
//! # use heart_rate::frame::ColorSample;
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! # let sample = ColorSample::default();
//!     let mut filter = BandpassFilter::new(&FilterDesign::default())?;
//!     let filtered = filter.step(sample.r);
//! # let _ = filtered;
//! # Ok(())
//! # }
//! ```
mod bandpass;
mod biquad;

use heart_rate_common::Real;

pub use bandpass::{BandpassFilter, Characteristic, FilterDesign, FilterDesignError};

/// Consumes one sample per call and returns one filtered sample.
///
/// Implementors keep their delay line between calls, so samples must be supplied in
/// chronological order.
pub trait Filter {
    fn step(&mut self, input: Real) -> Real;
}
