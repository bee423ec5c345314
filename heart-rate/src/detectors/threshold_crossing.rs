use super::{BeatDetector, BeatEvent};
use crate::{history::HistoryWindow, spectrum::HeartRateEstimate};
use heart_rate_common::{Real, Timestamp};
use tracing::trace;

/// Registers a beat when the newest sample rises through an adaptive threshold.
///
/// The threshold sits at a fixed fraction of the way from the minimum to the maximum of
/// the trailing sub-window. Extremes are recomputed on every tick, so the threshold follows
/// baseline drift and amplitude changes; nothing is carried between ticks.
#[derive(Clone, Debug, PartialEq)]
pub struct ThresholdCrossingDetector {
    /// Number of trailing samples the extremes are taken over.
    window_len: usize,
    /// Position of the threshold between the minimum (0) and maximum (1).
    fraction: Real,
}

impl ThresholdCrossingDetector {
    pub fn new(window_len: usize, fraction: Real) -> Self {
        Self {
            window_len,
            fraction,
        }
    }

    /// True iff the last sample is above the threshold and the one before it is not.
    pub fn is_rising_edge(&self, window: &HistoryWindow) -> bool {
        let trailing = window.latest(self.window_len);
        if trailing.len() < 2 {
            return false;
        }
        let (lo, hi) = trailing.fold((Real::INFINITY, Real::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
        let threshold = lo + self.fraction * (hi - lo);

        let mut newest = window.latest(2);
        match (newest.next(), newest.next()) {
            (Some(previous), Some(current)) => current > threshold && previous <= threshold,
            _ => false,
        }
    }
}

impl BeatDetector for ThresholdCrossingDetector {
    /// The heart rate estimate does not take part in the decision.
    fn signal(
        &mut self,
        time: Timestamp,
        window: &HistoryWindow,
        _heart_rate: &HeartRateEstimate,
    ) -> Option<BeatEvent> {
        self.is_rising_edge(window).then(|| {
            trace!("Beat at {time}");
            BeatEvent { time }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sawtooth(i: usize) -> Real {
        (i % 11) as Real / 10.0
    }

    #[test]
    fn silence_never_beats() {
        let mut detector = ThresholdCrossingDetector::new(120, 0.7);
        let mut window = HistoryWindow::new(300);
        for t in 0..1000 {
            window.push(0.0);
            assert_eq!(detector.signal(t, &window, &Default::default()), None);
        }
    }

    #[test]
    fn one_beat_per_sawtooth_cycle() {
        let mut detector = ThresholdCrossingDetector::new(120, 0.7);
        let mut window = HistoryWindow::new(300);
        let mut beats = Vec::new();
        for i in 0..1100 {
            window.push(sawtooth(i));
            if i >= 120 && detector.signal(i as Timestamp, &window, &Default::default()).is_some() {
                beats.push(i);
            }
        }
        // Beats fall on the first sample above 0.7, i.e. the value 0.8.
        assert!(beats.iter().all(|&i| i % 11 == 8));
        assert_eq!(beats.len(), (120..1100).filter(|i| i % 11 == 8).count());
    }

    #[test]
    fn first_sample_after_silence_beats() {
        let detector = ThresholdCrossingDetector::new(120, 0.7);
        let mut window = HistoryWindow::new(300);
        window.push(1.0);
        assert!(detector.is_rising_edge(&window));
        window.push(1.0);
        assert!(!detector.is_rising_edge(&window));
    }

    #[test]
    fn falling_through_threshold_is_not_a_beat() {
        let detector = ThresholdCrossingDetector::new(4, 0.7);
        let mut window = HistoryWindow::new(10);
        for v in [0.0, 1.0, 0.9, 0.1] {
            window.push(v);
        }
        assert!(!detector.is_rising_edge(&window));
    }

    #[test]
    fn extremes_outside_trailing_window_are_ignored() {
        let detector = ThresholdCrossingDetector::new(4, 0.7);
        let mut window = HistoryWindow::new(10);
        // The spike of 100 is older than the last four samples.
        for v in [100.0, 0.0, 0.0, 0.5, 1.0] {
            window.push(v);
        }
        assert!(detector.is_rising_edge(&window));
    }

    #[test]
    fn heart_rate_does_not_gate_detection() {
        let mut detector = ThresholdCrossingDetector::new(120, 0.7);
        let mut window = HistoryWindow::new(300);
        window.push(1.0);
        let estimates = [
            HeartRateEstimate::default(),
            HeartRateEstimate {
                bpm: 250.0,
                bin: 569,
                magnitude: 1.0,
            },
        ];
        for estimate in &estimates {
            assert_eq!(
                detector.signal(42, &window, estimate),
                Some(BeatEvent { time: 42 })
            );
        }
    }

    #[test]
    fn short_window_never_beats() {
        let detector = ThresholdCrossingDetector::new(120, 0.7);
        let mut window = HistoryWindow::new(1);
        window.push(1.0);
        assert!(!detector.is_rising_edge(&window));
    }
}
