//! Fixed capacity window of the most recent filtered samples.
use heart_rate_common::Real;
use std::collections::VecDeque;

/// A FIFO of filtered samples which always holds exactly `capacity` values.
///
/// The window starts full of zeros; every push evicts the oldest value.
/// Iteration order is chronological, oldest first.
#[derive(Clone, Debug)]
pub struct HistoryWindow {
    samples: VecDeque<Real>,
}

impl HistoryWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: std::iter::repeat_n(0.0, capacity).collect(),
        }
    }

    /// Appends `value` and evicts the oldest sample.
    pub fn push(&mut self, value: Real) {
        if self.samples.pop_front().is_some() {
            self.samples.push_back(value);
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// The whole window, as two contiguous runs which concatenate in chronological order.
    pub fn as_slices(&self) -> (&[Real], &[Real]) {
        self.samples.as_slices()
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = Real> + ExactSizeIterator + '_ {
        self.samples.iter().copied()
    }

    /// The last `count` samples, oldest first. Saturates at the window's length.
    pub fn latest(
        &self,
        count: usize,
    ) -> impl DoubleEndedIterator<Item = Real> + ExactSizeIterator + '_ {
        let start = self.samples.len().saturating_sub(count);
        self.samples.range(start..).copied()
    }
}
