//! Detectors inspect the history window after each push and register discrete beats.
pub mod threshold_crossing;

use crate::{history::HistoryWindow, spectrum::HeartRateEstimate};
use heart_rate_common::Timestamp;
use serde::Serialize;

pub use threshold_crossing::ThresholdCrossingDetector;

/// A single detected heart beat.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct BeatEvent {
    /// Time of the tick on which the beat was detected.
    pub time: Timestamp,
}

/// Implement for detectors, which take in the history window and possibly output a beat.
pub trait BeatDetector {
    /// Called once per tick, after the newest filtered sample has been pushed.
    ///
    /// # Parameters
    /// - time: timestamp of the current tick.
    /// - window: the history window, including the current sample.
    /// - heart_rate: the spectral estimate for the current tick.
    fn signal(
        &mut self,
        time: Timestamp,
        window: &HistoryWindow,
        heart_rate: &HeartRateEstimate,
    ) -> Option<BeatEvent>;
}
