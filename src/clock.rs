//! Time sources for the gate.
//!
//! The engine never owns time; it queries a shared [`Clock`]. Production
//! code uses [`SystemClock`], tests drive a [`ManualClock`] by hand.

use std::sync::Mutex;
use std::time::{Instant, SystemTime};

pub trait Clock: Send + Sync {
    /// Monotonic seconds since the clock's origin. Sample timestamps use
    /// the same timebase.
    fn now_secs(&self) -> f64;

    /// Wall-clock milliseconds since the UNIX epoch.
    fn unix_millis(&self) -> i64;
}

fn system_unix_millis() -> i64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_secs(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }

    fn unix_millis(&self) -> i64 {
        system_unix_millis()
    }
}

/// Clock with manually controlled time. Wall time moves in lockstep with
/// the monotonic reading.
pub struct ManualClock {
    state: Mutex<ManualTime>,
}

struct ManualTime {
    secs: f64,
    unix_origin_ms: i64,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::starting_at(0.0)
    }

    pub fn starting_at(secs: f64) -> Self {
        Self {
            state: Mutex::new(ManualTime {
                secs,
                unix_origin_ms: system_unix_millis(),
            }),
        }
    }

    pub fn set(&self, secs: f64) {
        if let Ok(mut t) = self.state.lock() {
            t.secs = secs;
        }
    }

    pub fn advance(&self, secs: f64) {
        if let Ok(mut t) = self.state.lock() {
            t.secs += secs;
        }
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now_secs(&self) -> f64 {
        self.state.lock().map(|t| t.secs).unwrap_or(0.0)
    }

    fn unix_millis(&self) -> i64 {
        self.state
            .lock()
            .map(|t| t.unix_origin_ms + (t.secs * 1000.0).round() as i64)
            .unwrap_or(0)
    }
}
