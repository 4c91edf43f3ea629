// src/sim.rs
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::clock::Clock;
use crate::config::SimConfig;
use crate::engine::GateHandle;
use crate::gate::{EventSource, GateError, BLINK_STRENGTH_MAX};

/// One simulated headset reading.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SimReading {
    pub theta: f64,
    pub signal_quality: u8,
    pub blink: Option<u32>,
}

/// Slow sine plus uniform noise, with random blinks.
pub struct SignalModel {
    config: SimConfig,
    rng: StdRng,
}

impl SignalModel {
    pub fn new(config: SimConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { config, rng }
    }

    pub fn read(&mut self, timestamp: f64) -> SimReading {
        let c = &self.config;
        let wave = (timestamp * 0.1 * std::f64::consts::TAU).sin() * c.theta_amplitude;
        let noise = if c.noise > 0.0 {
            self.rng.gen_range(-c.noise..=c.noise)
        } else {
            0.0
        };
        let blink = self
            .rng
            .gen_bool(c.blink_probability.clamp(0.0, 1.0))
            .then(|| self.rng.gen_range(0..=BLINK_STRENGTH_MAX));
        SimReading {
            theta: (c.theta_base + wave + noise).max(0.0),
            signal_quality: self.rng.gen_range(0..=25),
            blink,
        }
    }
}

/// Stands in for the headset: pushes readings at `sample_rate_hz` on a
/// background thread until detached.
pub struct SimulatedHeadset {
    config: SimConfig,
    clock: Arc<dyn Clock>,
    running: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl SimulatedHeadset {
    pub fn new(config: SimConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            clock,
            running: Arc::new(AtomicBool::new(false)),
            worker: None,
        }
    }
}

impl EventSource for SimulatedHeadset {
    fn attach(&mut self, handle: GateHandle) -> Result<(), GateError> {
        if self.worker.is_some() {
            return Ok(());
        }
        let period = Duration::from_secs_f64(1.0 / self.config.sample_rate_hz.max(1e-3));
        let mut model = SignalModel::new(self.config.clone());
        let clock = Arc::clone(&self.clock);
        let running = Arc::clone(&self.running);
        running.store(true, Ordering::SeqCst);
        self.worker = Some(thread::spawn(move || {
            log::info!("simulated headset streaming every {:?}", period);
            while running.load(Ordering::SeqCst) {
                thread::sleep(period);
                let timestamp = clock.now_secs();
                let reading = model.read(timestamp);
                let sent = reading
                    .blink
                    .map_or(Ok(()), |strength| handle.blink(strength))
                    .and_then(|_| handle.sample(timestamp, reading.theta, reading.signal_quality));
                if sent.is_err() {
                    log::debug!("engine queue closed; simulated headset exits");
                    break;
                }
            }
        }));
        Ok(())
    }

    fn detach(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(worker) = self.worker.take() {
            worker.join().ok();
        }
    }
}
