use std::fmt;
use std::sync::mpsc::Sender;

use serde::Serialize;

use crate::types::SegmentKind;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MarkerType {
    SegStart,
    SegEnd,
    AutoEnd,
    SegEndIgnored,
    Blink,
    ThetaSkip,
    RestTheta,
    DthetaWaitRest,
    Dtheta,
    RestBaseline,
    RestBaselineFail,
}

impl MarkerType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SegStart => "SEG_START",
            Self::SegEnd => "SEG_END",
            Self::AutoEnd => "AUTO_END",
            Self::SegEndIgnored => "SEG_END_IGNORED",
            Self::Blink => "BLINK",
            Self::ThetaSkip => "THETA_SKIP",
            Self::RestTheta => "REST_THETA",
            Self::DthetaWaitRest => "DTHETA_WAIT_REST",
            Self::Dtheta => "DTHETA",
            Self::RestBaseline => "REST_BASELINE",
            Self::RestBaselineFail => "REST_BASELINE_FAIL",
        }
    }
}

impl fmt::Display for MarkerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Marker payload with the numeric details for that marker type.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Marker {
    SegStart,
    SegEnd {
        duration_secs: f64,
    },
    AutoEnd {
        duration_secs: f64,
        reason: String,
    },
    SegEndIgnored,
    Blink {
        strength: u32,
        ratio: f64,
    },
    ThetaSkip,
    RestTheta {
        window_mean: f64,
        count: usize,
    },
    DthetaWaitRest {
        window_mean: f64,
        count: usize,
    },
    Dtheta {
        delta: f64,
        window_mean: f64,
        baseline_mean: f64,
        count: usize,
    },
    RestBaseline {
        mean: f64,
        windows: usize,
        /// Committed by a forced close rather than an explicit end.
        forced: bool,
    },
    RestBaselineFail {
        forced: bool,
    },
}

impl Marker {
    pub fn kind(&self) -> MarkerType {
        match self {
            Self::SegStart => MarkerType::SegStart,
            Self::SegEnd { .. } => MarkerType::SegEnd,
            Self::AutoEnd { .. } => MarkerType::AutoEnd,
            Self::SegEndIgnored => MarkerType::SegEndIgnored,
            Self::Blink { .. } => MarkerType::Blink,
            Self::ThetaSkip => MarkerType::ThetaSkip,
            Self::RestTheta { .. } => MarkerType::RestTheta,
            Self::DthetaWaitRest { .. } => MarkerType::DthetaWaitRest,
            Self::Dtheta { .. } => MarkerType::Dtheta,
            Self::RestBaseline { .. } => MarkerType::RestBaseline,
            Self::RestBaselineFail { .. } => MarkerType::RestBaselineFail,
        }
    }
}

/// One outbound marker. Subscribers get owned copies, never live state.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MarkerRecord {
    /// Engine clock seconds.
    pub t: f64,
    pub unix_ms: i64,
    pub trial: u32,
    /// `None` for records not tied to an open segment (ignored end).
    pub condition: Option<SegmentKind>,
    pub segment_id: Option<u64>,
    pub marker: Marker,
}

impl MarkerRecord {
    pub fn marker_type(&self) -> MarkerType {
        self.marker.kind()
    }

    pub fn condition_label(&self) -> &'static str {
        self.condition.map(|k| k.as_str()).unwrap_or("END")
    }

    /// Human-readable detail line, e.g. `seg=3, theta_win=5.000, n=20`.
    pub fn note(&self) -> String {
        let seg = self
            .segment_id
            .map(|id| id.to_string())
            .unwrap_or_else(|| "-".to_owned());
        let auto = |forced: bool| if forced { " (AUTO_END)" } else { "" };
        match &self.marker {
            Marker::SegStart => format!("seg={seg}, type={}", self.condition_label()),
            Marker::SegEnd { duration_secs } => format!("seg={seg}, dur={duration_secs:.2}s"),
            Marker::AutoEnd {
                duration_secs,
                reason,
            } => format!("seg={seg}, reason={reason}, dur={duration_secs:.2}s"),
            Marker::SegEndIgnored => "no open segment".to_owned(),
            Marker::Blink { strength, ratio } => {
                format!("seg={seg}, strength={strength}, ratio={ratio:.3}")
            }
            Marker::ThetaSkip => format!("seg={seg}, no valid samples (blink masked)"),
            Marker::RestTheta { window_mean, count } => {
                format!("seg={seg}, theta_win={window_mean:.3}, n={count}")
            }
            Marker::DthetaWaitRest { window_mean, count } => format!(
                "seg={seg}, theta_win={window_mean:.3}, n={count} (REST baseline not ready)"
            ),
            Marker::Dtheta {
                delta,
                window_mean,
                baseline_mean,
                count,
            } => format!(
                "seg={seg}, dtheta={delta:.3}, theta_win={window_mean:.3}, rest_mean={baseline_mean:.3}, n={count}"
            ),
            Marker::RestBaseline {
                mean,
                windows,
                forced,
            } => format!(
                "seg={seg}, rest_mean={mean:.3}, windows={windows}{}",
                auto(*forced)
            ),
            Marker::RestBaselineFail { forced } => format!(
                "seg={seg}, no valid REST windows (too much blink?){}",
                auto(*forced)
            ),
        }
    }
}

/// Every incoming sample, before gating. Telemetry only.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct StateRecord {
    pub t: f64,
    pub unix_ms: i64,
    pub timestamp: f64,
    pub theta: f64,
    pub signal_quality: u8,
    pub masked: bool,
    pub segment_id: Option<u64>,
}

/// Outbound record consumer. The core only writes to it.
pub trait Sink {
    fn marker(&mut self, record: MarkerRecord);

    fn state(&mut self, _record: &StateRecord) {}
}

impl<S: Sink + ?Sized> Sink for Box<S> {
    fn marker(&mut self, record: MarkerRecord) {
        (**self).marker(record)
    }

    fn state(&mut self, record: &StateRecord) {
        (**self).state(record)
    }
}

impl<A: Sink, B: Sink> Sink for (A, B) {
    fn marker(&mut self, record: MarkerRecord) {
        self.0.marker(record.clone());
        self.1.marker(record);
    }

    fn state(&mut self, record: &StateRecord) {
        self.0.state(record);
        self.1.state(record);
    }
}

/// Forwards markers to a subscriber channel. A hung-up receiver is ignored.
impl Sink for Sender<MarkerRecord> {
    fn marker(&mut self, record: MarkerRecord) {
        self.send(record).ok();
    }
}

/// Keeps every record in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub markers: Vec<MarkerRecord>,
    pub states: Vec<StateRecord>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn of_type(&self, kind: MarkerType) -> impl Iterator<Item = &MarkerRecord> {
        self.markers.iter().filter(move |r| r.marker_type() == kind)
    }

    pub fn count(&self, kind: MarkerType) -> usize {
        self.of_type(kind).count()
    }

    pub fn kinds(&self) -> Vec<MarkerType> {
        self.markers.iter().map(|r| r.marker_type()).collect()
    }
}

impl Sink for MemorySink {
    fn marker(&mut self, record: MarkerRecord) {
        self.markers.push(record);
    }

    fn state(&mut self, record: &StateRecord) {
        self.states.push(*record);
    }
}

/// Writes each marker to the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl Sink for LogSink {
    fn marker(&mut self, record: MarkerRecord) {
        log::info!(
            "[{}] trial={} cond={} {}",
            record.marker_type(),
            record.trial,
            record.condition_label(),
            record.note()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc::channel;

    fn record(marker: Marker) -> MarkerRecord {
        MarkerRecord {
            t: 1.0,
            unix_ms: 0,
            trial: 2,
            condition: Some(SegmentKind::Task),
            segment_id: Some(7),
            marker,
        }
    }

    #[test]
    fn note_carries_numeric_details() {
        let r = record(Marker::Dtheta {
            delta: 3.0,
            window_mean: 8.0,
            baseline_mean: 5.0,
            count: 10,
        });
        assert_eq!(r.marker_type().as_str(), "DTHETA");
        assert_eq!(
            r.note(),
            "seg=7, dtheta=3.000, theta_win=8.000, rest_mean=5.000, n=10"
        );
    }

    #[test]
    fn forced_baseline_is_tagged() {
        let r = record(Marker::RestBaseline {
            mean: 5.0,
            windows: 2,
            forced: true,
        });
        assert!(r.note().ends_with("(AUTO_END)"));
    }

    #[test]
    fn ignored_end_uses_end_label() {
        let mut r = record(Marker::SegEndIgnored);
        r.condition = None;
        r.segment_id = None;
        assert_eq!(r.condition_label(), "END");
        assert_eq!(r.note(), "no open segment");
    }

    #[test]
    fn serializes_with_screaming_marker_tag() {
        let r = record(Marker::RestTheta {
            window_mean: 5.0,
            count: 4,
        });
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["marker"]["type"], "REST_THETA");
        assert_eq!(json["condition"], "TASK");
        assert_eq!(json["segment_id"], 7);
    }

    #[test]
    fn fan_out_and_channel_receive_copies() {
        let (tx, rx) = channel();
        let mut sink = (MemorySink::new(), tx);
        sink.marker(record(Marker::ThetaSkip));
        assert_eq!(sink.0.count(MarkerType::ThetaSkip), 1);
        assert_eq!(rx.try_recv().unwrap().marker, Marker::ThetaSkip);
    }
}
