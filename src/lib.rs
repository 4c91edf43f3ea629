//! Blink-gated theta analysis for alternating REST/TASK trial segments.
//!
//! Sensor events and operator commands flow through one queue into a
//! [`gate::SegmentController`], which emits marker records to a [`gate::Sink`].
pub mod clock;
pub mod config;
pub mod engine;
pub mod gate;
pub mod hotkeys;
pub mod recorder;
pub mod sim;
pub mod types;
