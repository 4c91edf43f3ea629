use std::collections::VecDeque;

/// One validity-tagged theta sample.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sample {
    pub timestamp: f64,
    pub value: f64,
    pub is_valid: bool,
}

/// Time-bounded sample queue. Entries older than `retention_secs` behind
/// the caller's current time are dropped.
pub struct SampleBuffer {
    data: VecDeque<Sample>,
    retention_secs: f64,
}

impl SampleBuffer {
    pub fn new(retention_secs: f64, capacity: usize) -> Self {
        Self {
            data: VecDeque::with_capacity(capacity),
            retention_secs,
        }
    }

    pub fn push(&mut self, sample: Sample, now: f64) {
        self.data.push_back(sample);
        self.prune(now);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Sample> {
        self.data.iter()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn clear(&mut self) {
        self.data.clear();
    }

    fn prune(&mut self, now: f64) {
        let threshold = now - self.retention_secs;
        // Late arrivals can sit behind newer samples, so scan the whole queue
        // rather than stopping at the first fresh entry.
        let before = self.data.len();
        self.data.retain(|s| s.timestamp >= threshold);
        let dropped = before - self.data.len();
        if dropped > 0 {
            log::trace!("pruned {dropped} samples older than {threshold:.3}");
        }
    }
}

/// What one hop produced.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum WindowOutcome {
    Mean { mean: f64, count: usize },
    /// No valid sample fell inside the window.
    Skip,
}

/// Fixed-size, fixed-hop sliding window over a pruned sample buffer.
pub struct SlidingWindowAggregator {
    buffer: SampleBuffer,
    window_secs: f64,
    hop_secs: f64,
    next_hop: Option<f64>,
}

impl SlidingWindowAggregator {
    pub fn new(window_secs: f64, hop_secs: f64, retention_secs: f64) -> Self {
        Self {
            buffer: SampleBuffer::new(retention_secs, 64),
            window_secs,
            hop_secs,
            next_hop: None,
        }
    }

    /// Empties the buffer and schedules the first hop one hop after `now`.
    pub fn reset(&mut self, now: f64) {
        self.buffer.clear();
        self.next_hop = Some(now + self.hop_secs);
    }

    /// Empties the buffer and disarms hop scheduling.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.next_hop = None;
    }

    pub fn is_armed(&self) -> bool {
        self.next_hop.is_some()
    }

    pub fn next_hop(&self) -> Option<f64> {
        self.next_hop
    }

    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Appends a sample and prunes against the clock reading `now`, not the
    /// sample's own stamp. Ignored while disarmed (no open segment).
    pub fn on_sample(&mut self, timestamp: f64, value: f64, is_masked: bool, now: f64) {
        if !self.is_armed() {
            return;
        }
        self.buffer.push(
            Sample {
                timestamp,
                value,
                is_valid: !is_masked,
            },
            now,
        );
    }

    /// Fires at most one window if the hop deadline has passed. Shared by the
    /// sample path and the periodic tick.
    pub fn poll(&mut self, now: f64) -> Option<WindowOutcome> {
        let deadline = self.next_hop?;
        if now < deadline {
            return None;
        }
        let mut next = deadline + self.hop_secs;
        if next <= now {
            // Several hops were missed; keep the phase but don't replay a
            // backlog of identical windows.
            let missed = ((now - next) / self.hop_secs).floor() + 1.0;
            next += missed * self.hop_secs;
            log::debug!("skipped {missed} stale hop deadline(s) at t={now:.3}");
        }
        self.next_hop = Some(next);
        Some(self.compute_window(now))
    }

    /// Mean of the valid samples with timestamp in `[now - window, now]`.
    pub fn compute_window(&self, now: f64) -> WindowOutcome {
        let from = now - self.window_secs;
        let (sum, count) = self
            .buffer
            .iter()
            .filter(|s| s.is_valid && s.timestamp >= from && s.timestamp <= now)
            .fold((0.0f64, 0usize), |(sum, n), s| (sum + s.value, n + 1));
        if count == 0 {
            WindowOutcome::Skip
        } else {
            WindowOutcome::Mean {
                mean: sum / count as f64,
                count,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(timestamp: f64, value: f64) -> Sample {
        Sample {
            timestamp,
            value,
            is_valid: true,
        }
    }

    #[test]
    fn buffer_prunes_beyond_retention() {
        let mut buffer = SampleBuffer::new(3.0, 8);
        buffer.push(sample(0.0, 1.0), 0.0);
        buffer.push(sample(1.0, 1.0), 1.0);
        buffer.push(sample(3.5, 1.0), 3.5);
        assert_eq!(buffer.len(), 2);
        assert!(buffer.iter().all(|s| s.timestamp >= 0.5));
    }

    #[test]
    fn prune_follows_clock_not_sample_stamp() {
        let mut buffer = SampleBuffer::new(3.0, 8);
        buffer.push(sample(0.5, 1.0), 0.5);
        // A sample stamped far ahead must not evict entries the clock still needs.
        buffer.push(sample(9.0, 1.0), 0.6);
        assert_eq!(buffer.len(), 2);
        buffer.push(sample(0.7, 1.0), 4.0);
        assert_eq!(buffer.len(), 2);
        assert!(buffer.iter().all(|s| s.timestamp >= 1.0));
    }

    #[test]
    fn disarmed_aggregator_drops_samples() {
        let mut agg = SlidingWindowAggregator::new(2.0, 1.0, 3.0);
        agg.on_sample(0.1, 5.0, false, 0.1);
        assert_eq!(agg.buffered(), 0);
        assert_eq!(agg.poll(10.0), None);
    }

    #[test]
    fn window_excludes_old_future_and_masked_samples() {
        let mut agg = SlidingWindowAggregator::new(2.0, 1.0, 3.0);
        agg.reset(0.0);
        agg.on_sample(0.5, 100.0, false, 0.5); // outside [1, 3]
        agg.on_sample(1.5, 4.0, false, 1.5);
        agg.on_sample(2.0, 50.0, true, 2.0); // masked
        agg.on_sample(2.5, 6.0, false, 2.5);
        agg.on_sample(3.5, 100.0, false, 3.5); // after `now`
        assert_eq!(
            agg.compute_window(3.0),
            WindowOutcome::Mean { mean: 5.0, count: 2 }
        );
    }

    #[test]
    fn late_sample_is_still_counted_when_inside_window() {
        let mut agg = SlidingWindowAggregator::new(2.0, 1.0, 3.0);
        agg.reset(0.0);
        agg.on_sample(1.8, 2.0, false, 1.8);
        agg.on_sample(1.2, 4.0, false, 1.2);
        assert_eq!(
            agg.compute_window(2.0),
            WindowOutcome::Mean { mean: 3.0, count: 2 }
        );
    }

    #[test]
    fn all_masked_window_skips() {
        let mut agg = SlidingWindowAggregator::new(2.0, 1.0, 3.0);
        agg.reset(0.0);
        agg.on_sample(0.5, 5.0, true, 0.5);
        agg.on_sample(0.9, 5.0, true, 0.9);
        assert_eq!(agg.poll(1.0), Some(WindowOutcome::Skip));
    }

    #[test]
    fn deadline_advances_by_exactly_one_hop() {
        let mut agg = SlidingWindowAggregator::new(2.0, 1.0, 3.0);
        agg.reset(0.0);
        assert_eq!(agg.poll(0.99), None);
        assert!(agg.poll(1.25).is_some());
        assert_eq!(agg.next_hop(), Some(2.0));
        // Same instant from the tick path must not fire twice.
        assert_eq!(agg.poll(1.25), None);
        assert!(agg.poll(2.0).is_some());
        assert_eq!(agg.next_hop(), Some(3.0));
    }

    #[test]
    fn long_gap_clamps_without_backlog() {
        let mut agg = SlidingWindowAggregator::new(2.0, 1.0, 3.0);
        agg.reset(0.0);
        assert!(agg.poll(4.5).is_some());
        assert_eq!(agg.next_hop(), Some(5.0));
        assert_eq!(agg.poll(4.9), None);
    }

    #[test]
    fn clear_disarms() {
        let mut agg = SlidingWindowAggregator::new(2.0, 1.0, 3.0);
        agg.reset(0.0);
        agg.on_sample(0.5, 1.0, false, 0.5);
        agg.clear();
        assert!(!agg.is_armed());
        assert_eq!(agg.buffered(), 0);
    }
}
