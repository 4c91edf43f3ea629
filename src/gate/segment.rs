use std::sync::Arc;

use crate::clock::Clock;
use crate::config::GateConfig;
use crate::gate::baseline::{Baseline, BaselineTracker};
use crate::gate::delta::{compute_delta, DeltaReport};
use crate::gate::error::GateError;
use crate::gate::mask::BlinkMaskGate;
use crate::gate::sink::{Marker, MarkerRecord, Sink, StateRecord};
use crate::gate::window::{SlidingWindowAggregator, WindowOutcome};
use crate::types::{ControlCommand, GateEvent, SegmentKind, SensorEvent};

pub const AUTO_END_ON_START: &str = "start received while segment open";

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OpenSegment {
    /// Increments on every open, forced or not.
    pub id: u64,
    pub trial: u32,
    pub kind: SegmentKind,
    pub started_at: f64,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SegmentState {
    Closed,
    Open(OpenSegment),
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum CloseCause {
    Explicit,
    Forced(&'static str),
}

/// Everything the gate mutates, owned in one place.
pub struct GateState {
    segment: SegmentState,
    last_segment_id: u64,
    mask: BlinkMaskGate,
    window: SlidingWindowAggregator,
    rest: BaselineTracker,
    baseline: Baseline,
}

impl GateState {
    pub fn new(config: &GateConfig) -> Self {
        Self {
            segment: SegmentState::Closed,
            last_segment_id: 0,
            mask: BlinkMaskGate::new(config.blink_threshold, config.post_mask_secs),
            window: SlidingWindowAggregator::new(
                config.window_secs,
                config.hop_secs,
                config.retention_secs(),
            ),
            rest: BaselineTracker::new(),
            baseline: Baseline::not_ready(),
        }
    }

    fn open_segment(&self) -> Option<OpenSegment> {
        match self.segment {
            SegmentState::Open(seg) => Some(seg),
            SegmentState::Closed => None,
        }
    }
}

/// REST/TASK segment state machine. Owns the mask, window, baseline and
/// sink; reads time from a shared clock. Every operation is infallible:
/// out-of-order commands become marker records.
pub struct SegmentController<K: Sink> {
    state: GateState,
    clock: Arc<dyn Clock>,
    sink: K,
}

impl<K: Sink> SegmentController<K> {
    pub fn new(config: &GateConfig, clock: Arc<dyn Clock>, sink: K) -> Result<Self, GateError> {
        config.validate()?;
        Ok(Self {
            state: GateState::new(config),
            clock,
            sink,
        })
    }

    pub fn handle(&mut self, event: GateEvent) {
        match event {
            GateEvent::Sensor(SensorEvent::SampleArrived {
                timestamp,
                theta_power,
                signal_quality,
            }) => self.on_sample(timestamp, theta_power, signal_quality),
            GateEvent::Sensor(SensorEvent::BlinkDetected { strength }) => self.on_blink(strength),
            GateEvent::Control(ControlCommand::StartSegment { trial, kind }) => {
                self.start_segment(trial, kind)
            }
            GateEvent::Control(ControlCommand::EndSegment { trial }) => self.end_segment(trial),
            GateEvent::Tick => self.tick(),
            GateEvent::Shutdown => {}
        }
    }

    pub fn on_blink(&mut self, strength: u32) {
        let now = self.clock.now_secs();
        let outcome = self.state.mask.on_blink(strength, now);
        log::trace!(
            "blink strength={strength} ratio={:.3} masking={}",
            outcome.ratio,
            outcome.masking
        );
        if !outcome.masking {
            return;
        }
        // Artifacts outside a trial carry no experimental meaning.
        if let Some(seg) = self.state.open_segment() {
            self.emit(
                seg.trial,
                Some(seg.kind),
                Some(seg.id),
                Marker::Blink {
                    strength,
                    ratio: outcome.ratio,
                },
            );
        }
    }

    /// Masking follows the sample's own stamp; pruning and the hop deadline
    /// follow the clock, same as `tick`.
    pub fn on_sample(&mut self, timestamp: f64, theta: f64, signal_quality: u8) {
        let now = self.clock.now_secs();
        let masked = self.state.mask.is_masked(timestamp);
        let open = self.state.open_segment();
        let state = StateRecord {
            t: now,
            unix_ms: self.clock.unix_millis(),
            timestamp,
            theta,
            signal_quality,
            masked,
            segment_id: open.map(|s| s.id),
        };
        self.sink.state(&state);
        let Some(seg) = open else {
            return;
        };
        if timestamp < seg.started_at {
            log::trace!(
                "segment {}: dropped sample stamped {timestamp:.3} before start {:.3}",
                seg.id,
                seg.started_at
            );
            return;
        }
        self.state.window.on_sample(timestamp, theta, masked, now);
        self.poll_hop(now);
    }

    /// Periodic deadline check for when samples are sparse.
    pub fn tick(&mut self) {
        let now = self.clock.now_secs();
        self.poll_hop(now);
    }

    pub fn start_segment(&mut self, trial: u32, kind: SegmentKind) {
        if self.state.open_segment().is_some() {
            self.close(CloseCause::Forced(AUTO_END_ON_START));
        }
        let now = self.clock.now_secs();
        self.state.last_segment_id += 1;
        let seg = OpenSegment {
            id: self.state.last_segment_id,
            trial,
            kind,
            started_at: now,
        };
        self.state.window.reset(now);
        self.state.rest.clear();
        self.state.segment = SegmentState::Open(seg);
        log::info!("segment {} opened: trial={trial} kind={}", seg.id, kind.as_str());
        self.emit(trial, Some(kind), Some(seg.id), Marker::SegStart);
    }

    pub fn end_segment(&mut self, trial: u32) {
        if self.state.open_segment().is_none() {
            log::warn!("end for trial {trial} ignored: no open segment");
            self.emit(trial, None, None, Marker::SegEndIgnored);
            return;
        }
        self.close(CloseCause::Explicit);
    }

    pub fn segment(&self) -> Option<OpenSegment> {
        self.state.open_segment()
    }

    pub fn last_segment_id(&self) -> u64 {
        self.state.last_segment_id
    }

    pub fn baseline(&self) -> Baseline {
        self.state.baseline
    }

    pub fn is_masked(&self, now: f64) -> bool {
        self.state.mask.is_masked(now)
    }

    pub fn buffered_samples(&self) -> usize {
        self.state.window.buffered()
    }

    pub fn sink(&self) -> &K {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut K {
        &mut self.sink
    }

    pub fn into_sink(self) -> K {
        self.sink
    }

    fn poll_hop(&mut self, now: f64) {
        let Some(seg) = self.state.open_segment() else {
            return;
        };
        let Some(outcome) = self.state.window.poll(now) else {
            return;
        };
        log::debug!("segment {} hop at t={now:.3}: {outcome:?}", seg.id);
        let marker = match (outcome, seg.kind) {
            (WindowOutcome::Skip, _) => Marker::ThetaSkip,
            (WindowOutcome::Mean { mean, count }, SegmentKind::Rest) => {
                self.state.rest.accumulate(mean);
                Marker::RestTheta {
                    window_mean: mean,
                    count,
                }
            }
            (WindowOutcome::Mean { mean, count }, SegmentKind::Task) => {
                match compute_delta(mean, &self.state.baseline) {
                    DeltaReport::WaitingForBaseline { window_mean } => {
                        Marker::DthetaWaitRest { window_mean, count }
                    }
                    DeltaReport::Delta {
                        delta,
                        window_mean,
                        baseline_mean,
                    } => Marker::Dtheta {
                        delta,
                        window_mean,
                        baseline_mean,
                        count,
                    },
                }
            }
        };
        self.emit(seg.trial, Some(seg.kind), Some(seg.id), marker);
    }

    fn close(&mut self, cause: CloseCause) {
        let SegmentState::Open(seg) =
            std::mem::replace(&mut self.state.segment, SegmentState::Closed)
        else {
            return;
        };
        let duration_secs = self.clock.now_secs() - seg.started_at;
        let (marker, forced) = match cause {
            CloseCause::Explicit => (Marker::SegEnd { duration_secs }, false),
            CloseCause::Forced(reason) => {
                log::warn!("segment {} auto-closed: {reason}", seg.id);
                (
                    Marker::AutoEnd {
                        duration_secs,
                        reason: reason.to_owned(),
                    },
                    true,
                )
            }
        };
        log::info!("segment {} closed after {duration_secs:.2}s", seg.id);
        self.emit(seg.trial, Some(seg.kind), Some(seg.id), marker);

        if seg.kind == SegmentKind::Rest {
            let windows = self.state.rest.window_count();
            let baseline = self.state.rest.finalize();
            self.state.baseline = baseline;
            let marker = match baseline.value() {
                Some(mean) => {
                    log::info!("REST baseline updated: {mean:.3} over {windows} windows");
                    Marker::RestBaseline {
                        mean,
                        windows,
                        forced,
                    }
                }
                None => {
                    log::warn!("segment {} closed without valid REST windows", seg.id);
                    Marker::RestBaselineFail { forced }
                }
            };
            self.emit(seg.trial, Some(seg.kind), Some(seg.id), marker);
        }

        self.state.window.clear();
        self.state.rest.clear();
    }

    fn emit(
        &mut self,
        trial: u32,
        condition: Option<SegmentKind>,
        segment_id: Option<u64>,
        marker: Marker,
    ) {
        self.sink.marker(MarkerRecord {
            t: self.clock.now_secs(),
            unix_ms: self.clock.unix_millis(),
            trial,
            condition,
            segment_id,
            marker,
        });
    }
}
