// src/gate/mod.rs
pub mod baseline;
pub mod delta;
pub mod error;
pub mod mask;
pub mod segment;
pub mod sink;
pub mod source;
pub mod window;
pub use baseline::{Baseline, BaselineTracker};
pub use delta::{compute_delta, DeltaReport};
pub use error::GateError;
pub use mask::{BlinkMaskGate, BlinkOutcome, BLINK_STRENGTH_MAX};
pub use segment::{GateState, OpenSegment, SegmentController, SegmentState, AUTO_END_ON_START};
pub use sink::{LogSink, Marker, MarkerRecord, MarkerType, MemorySink, Sink, StateRecord};
pub use source::{EventSource, ManualSource};
pub use window::{Sample, SampleBuffer, SlidingWindowAggregator, WindowOutcome};
