//! Estimates the heart rate from the dominant frequency of the history window.
//!
//! The window is zero padded to the transform size before a rectangular (un-windowed)
//! forward FFT, which interpolates the spectrum to a finer resolution than the window's
//! native length would give. Only the non-negative half of the spectrum is searched.
use crate::history::HistoryWindow;
use heart_rate_common::Real;
use rustfft::{Fft, FftPlanner, num_complex::Complex};
use serde::Serialize;
use std::sync::Arc;
use tracing::trace;

/// The dominant spectral component of a window, expressed in beats per minute.
#[derive(Default, Clone, Copy, Debug, PartialEq, Serialize)]
pub struct HeartRateEstimate {
    /// Beats per minute.
    pub bpm: Real,
    /// Index of the selected bin.
    pub bin: usize,
    /// Magnitude of the selected bin.
    pub magnitude: Real,
}

pub struct SpectralEstimator {
    fft: Arc<dyn Fft<Real>>,
    /// Padded transform input; overwritten with the spectrum by each transform.
    buffer: Vec<Complex<Real>>,
    scratch: Vec<Complex<Real>>,
    /// Magnitudes of bins `0..fft_size / 2` from the latest estimate.
    magnitudes: Vec<Real>,
    /// Number of zeros preceding the window in the transform input.
    leading_zeros: usize,
    sample_rate: Real,
}

impl SpectralEstimator {
    /// Plans a transform of `fft_size` points for windows of `window_len` samples.
    ///
    /// The padding is split as `floor((fft_size - window_len) / 2)` zeros before the window,
    /// with the remainder after it. The window must be shorter than the transform.
    pub fn new(fft_size: usize, window_len: usize, sample_rate: Real) -> Self {
        debug_assert!(
            window_len < fft_size,
            "window of {window_len} samples does not fit a {fft_size} point transform"
        );
        let fft = FftPlanner::new().plan_fft_forward(fft_size);
        let scratch = vec![Complex::default(); fft.get_inplace_scratch_len()];
        Self {
            fft,
            buffer: vec![Complex::default(); fft_size],
            scratch,
            magnitudes: vec![0.0; fft_size / 2],
            leading_zeros: fft_size.saturating_sub(window_len) / 2,
            sample_rate,
        }
    }

    pub fn fft_size(&self) -> usize {
        self.buffer.len()
    }

    pub fn leading_zeros(&self) -> usize {
        self.leading_zeros
    }

    /// Width of one bin, in beats per minute.
    pub fn bin_resolution(&self) -> Real {
        self.sample_rate * 60.0 / self.fft_size() as Real
    }

    /// Magnitudes of the non-negative frequency bins from the latest estimate.
    pub fn spectrum(&self) -> &[Real] {
        &self.magnitudes
    }

    /// Transforms the padded window and selects the bin of greatest magnitude.
    ///
    /// Ties resolve to the lowest bin, so a flat spectrum (e.g. an all-zero window) yields
    /// bin zero and `0` bpm.
    pub fn estimate(&mut self, window: &HistoryWindow) -> HeartRateEstimate {
        self.buffer.fill(Complex::default());
        for (slot, value) in self
            .buffer
            .iter_mut()
            .skip(self.leading_zeros)
            .zip(window.iter())
        {
            *slot = Complex::new(value, 0.0);
        }

        self.fft.process_with_scratch(&mut self.buffer, &mut self.scratch);

        for (magnitude, bin) in self.magnitudes.iter_mut().zip(self.buffer.iter()) {
            *magnitude = bin.norm();
        }

        let (bin, magnitude) = self.magnitudes.iter().copied().enumerate().fold(
            (0, 0.0),
            |(max_bin, max_magnitude), (bin, magnitude)| {
                if magnitude > max_magnitude {
                    (bin, magnitude)
                } else {
                    (max_bin, max_magnitude)
                }
            },
        );

        let estimate = HeartRateEstimate {
            bpm: bin as Real * self.bin_resolution(),
            bin,
            magnitude,
        };
        trace!("Spectral peak {estimate:?}");
        estimate
    }
}
