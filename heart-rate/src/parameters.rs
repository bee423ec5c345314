//! Defines the parameters of a pipeline session, and the buffer sizes derived from them.
use crate::filter::{Characteristic, FilterDesign, FilterDesignError};
use clap::Args;
use heart_rate_common::Real;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Frame rate {0} must be finite and positive")]
    InvalidFrameRate(Real),
    #[error("History window of {0} samples is too short, at least two are required")]
    HistoryTooShort(usize),
    #[error("Beat window of {beat_window} samples must be between 2 and the history length {history}")]
    InvalidBeatWindow { beat_window: usize, history: usize },
    #[error("FFT size {fft_size} must exceed the history length {history}")]
    FftTooSmall { fft_size: usize, history: usize },
    #[error("Beat threshold {0} must lie strictly between 0 and 1")]
    InvalidBeatThreshold(Real),
    #[error("Invalid bandpass filter: {0}")]
    Filter(#[from] FilterDesignError),
}

/// User facing parameters of the pipeline. The defaults are the domain constants.
#[derive(Clone, Debug, Args)]
pub struct PipelineSettings {
    /// Rate at which frames arrive and ticks run, in Hz.
    #[clap(long, default_value = "30")]
    pub frame_rate: Real,

    /// Number of points in the spectral transform.
    /// Must exceed the history length, and should be a power of two.
    #[clap(long, default_value = "4096")]
    pub fft_size: usize,

    /// Length of the history window, in seconds.
    #[clap(long, default_value = "10")]
    pub history_duration: Real,

    /// Length of the trailing window searched for beats, in seconds.
    #[clap(long, default_value = "4")]
    pub beat_window_duration: Real,

    /// Number of cascaded second order sections in the bandpass filter.
    #[clap(long, default_value = "4")]
    pub filter_order: usize,

    /// Prototype of the bandpass filter.
    #[clap(long, value_enum, default_value_t = Characteristic::Butterworth)]
    pub filter_characteristic: Characteristic,

    /// Centre of the passband, in beats per minute.
    #[clap(long, default_value = "80")]
    pub centre_bpm: Real,

    /// Width of the passband, in beats per minute.
    #[clap(long, default_value = "160")]
    pub bandwidth_bpm: Real,

    /// Fraction of the way from the trailing minimum to maximum at which beats trigger.
    #[clap(long, default_value = "0.7")]
    pub beat_threshold: Real,

    /// If set, each measurement carries the raw frame it was computed from.
    #[clap(long)]
    pub include_frame: bool,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            frame_rate: 30.0,
            fft_size: 4096,
            history_duration: 10.0,
            beat_window_duration: 4.0,
            filter_order: 4,
            filter_characteristic: Characteristic::Butterworth,
            centre_bpm: 80.0,
            bandwidth_bpm: 160.0,
            beat_threshold: 0.7,
            include_frame: false,
        }
    }
}

/// Validated sizes and designs from which a session's stages are built.
#[derive(Clone, Debug, PartialEq)]
pub struct SessionLayout {
    pub sample_rate: Real,
    /// Capacity of the history window, in samples.
    pub history_len: usize,
    /// Length of the trailing beat detection window, in samples.
    pub beat_window_len: usize,
    pub fft_size: usize,
    pub beat_threshold: Real,
    pub filter: FilterDesign,
    pub include_frame: bool,
}

impl PipelineSettings {
    fn samples_in(&self, seconds: Real) -> usize {
        // Saturating cast: negative and NaN durations give zero samples.
        (self.frame_rate * seconds).round() as usize
    }

    pub fn layout(&self) -> Result<SessionLayout, ConfigError> {
        if !(self.frame_rate.is_finite() && self.frame_rate > 0.0) {
            return Err(ConfigError::InvalidFrameRate(self.frame_rate));
        }

        let history_len = self.samples_in(self.history_duration);
        if history_len < 2 {
            return Err(ConfigError::HistoryTooShort(history_len));
        }

        let beat_window_len = self.samples_in(self.beat_window_duration);
        if !(2..=history_len).contains(&beat_window_len) {
            return Err(ConfigError::InvalidBeatWindow {
                beat_window: beat_window_len,
                history: history_len,
            });
        }

        if self.fft_size <= history_len {
            return Err(ConfigError::FftTooSmall {
                fft_size: self.fft_size,
                history: history_len,
            });
        }
        if !self.fft_size.is_power_of_two() {
            warn!(
                "FFT size {} is not a power of two, transforms will be slower",
                self.fft_size
            );
        }

        if !(self.beat_threshold > 0.0 && self.beat_threshold < 1.0) {
            return Err(ConfigError::InvalidBeatThreshold(self.beat_threshold));
        }

        let filter = FilterDesign {
            order: self.filter_order,
            characteristic: self.filter_characteristic,
            sample_rate: self.frame_rate,
            centre: self.centre_bpm / 60.0,
            bandwidth: self.bandwidth_bpm / 60.0,
        };
        filter.validate()?;

        Ok(SessionLayout {
            sample_rate: self.frame_rate,
            history_len,
            beat_window_len,
            fft_size: self.fft_size,
            beat_threshold: self.beat_threshold,
            filter,
            include_frame: self.include_frame,
        })
    }
}
