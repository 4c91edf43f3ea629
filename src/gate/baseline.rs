/// REST reference mean. Single slot: each closed REST segment overwrites it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Baseline {
    pub mean: f64,
    pub ready: bool,
}

impl Baseline {
    pub fn not_ready() -> Self {
        Self {
            mean: 0.0,
            ready: false,
        }
    }

    pub fn ready(mean: f64) -> Self {
        Self { mean, ready: true }
    }

    pub fn value(&self) -> Option<f64> {
        self.ready.then_some(self.mean)
    }
}

impl Default for Baseline {
    fn default() -> Self {
        Self::not_ready()
    }
}

/// Collects REST window means for the open segment.
#[derive(Clone, Debug, Default)]
pub struct BaselineTracker {
    windows: Vec<f64>,
}

impl BaselineTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn accumulate(&mut self, window_mean: f64) {
        self.windows.push(window_mean);
    }

    pub fn window_count(&self) -> usize {
        self.windows.len()
    }

    pub fn clear(&mut self) {
        self.windows.clear();
    }

    /// Mean of the accumulated windows, or not-ready when none were collected.
    /// Drains the accumulator.
    pub fn finalize(&mut self) -> Baseline {
        let baseline = if self.windows.is_empty() {
            Baseline::not_ready()
        } else {
            let sum: f64 = self.windows.iter().sum();
            Baseline::ready(sum / self.windows.len() as f64)
        };
        self.windows.clear();
        baseline
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finalize_averages_window_means() {
        let mut tracker = BaselineTracker::new();
        tracker.accumulate(4.0);
        tracker.accumulate(6.0);
        tracker.accumulate(5.0);
        assert_eq!(tracker.window_count(), 3);
        let baseline = tracker.finalize();
        assert_eq!(baseline.value(), Some(5.0));
        assert_eq!(tracker.window_count(), 0);
    }

    #[test]
    fn empty_tracker_is_not_ready() {
        let mut tracker = BaselineTracker::new();
        let baseline = tracker.finalize();
        assert!(!baseline.ready);
        assert_eq!(baseline.value(), None);
    }
}
