// src/engine.rs
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::config::EngineConfig;
use crate::gate::{EventSource, GateError, SegmentController, Sink};
use crate::types::{ControlCommand, GateEvent, SegmentKind, SensorEvent};

/// Cloneable sender side of the engine's single delivery queue.
#[derive(Clone, Debug)]
pub struct GateHandle {
    tx: Sender<GateEvent>,
}

impl GateHandle {
    pub fn send(&self, event: impl Into<GateEvent>) -> Result<(), GateError> {
        self.tx
            .send(event.into())
            .map_err(|_| GateError::QueueClosed)
    }

    pub fn sample(&self, timestamp: f64, theta_power: f64, signal_quality: u8) -> Result<(), GateError> {
        self.send(SensorEvent::SampleArrived {
            timestamp,
            theta_power,
            signal_quality,
        })
    }

    pub fn blink(&self, strength: u32) -> Result<(), GateError> {
        self.send(SensorEvent::BlinkDetected { strength })
    }

    pub fn start_segment(&self, trial: u32, kind: SegmentKind) -> Result<(), GateError> {
        self.send(ControlCommand::StartSegment { trial, kind })
    }

    pub fn end_segment(&self, trial: u32) -> Result<(), GateError> {
        self.send(ControlCommand::EndSegment { trial })
    }

    pub fn tick(&self) -> Result<(), GateError> {
        self.send(GateEvent::Tick)
    }
}

/// Runs a [`SegmentController`] on its own thread, fed by one event source
/// plus any number of [`GateHandle`] clones (operator input).
pub struct GateEngine<K, E>
where
    K: Sink + Send + 'static,
    E: EventSource,
{
    handle: GateHandle,
    worker: Option<JoinHandle<SegmentController<K>>>,
    source: E,
}

impl<K, E> GateEngine<K, E>
where
    K: Sink + Send + 'static,
    E: EventSource,
{
    /// Spawns the worker and attaches `source` to it.
    pub fn start(
        controller: SegmentController<K>,
        mut source: E,
        config: &EngineConfig,
    ) -> Result<Self, GateError> {
        let (tx, rx) = channel();
        let tick = Duration::from_millis(config.tick_interval_ms.max(1));
        let worker = spawn_thread(controller, rx, tick);
        let handle = GateHandle { tx };
        if let Err(e) = source.attach(handle.clone()) {
            log::error!("event source failed to attach: {e}");
            handle.send(GateEvent::Shutdown).ok();
            worker.join().ok();
            return Err(e);
        }
        Ok(Self {
            handle,
            worker: Some(worker),
            source,
        })
    }

    pub fn handle(&self) -> GateHandle {
        self.handle.clone()
    }

    /// Detaches the source, drains the queue and returns the controller.
    pub fn stop(mut self) -> Result<SegmentController<K>, GateError> {
        self.source.detach();
        self.handle.send(GateEvent::Shutdown).ok();
        let worker = self.worker.take().ok_or(GateError::WorkerPanicked)?;
        worker.join().map_err(|_| GateError::WorkerPanicked)
    }
}

impl<K, E> Drop for GateEngine<K, E>
where
    K: Sink + Send + 'static,
    E: EventSource,
{
    fn drop(&mut self) {
        if let Some(worker) = self.worker.take() {
            self.source.detach();
            self.handle.send(GateEvent::Shutdown).ok();
            worker.join().ok();
        }
    }
}

fn spawn_thread<K: Sink + Send + 'static>(
    mut controller: SegmentController<K>,
    rx: Receiver<GateEvent>,
    tick: Duration,
) -> JoinHandle<SegmentController<K>> {
    thread::spawn(move || {
        log::info!("gate engine ready (tick {}ms)", tick.as_millis());
        let mut last_tick = Instant::now();
        loop {
            // 1. 消息处理: 事件严格串行
            let wait = tick.saturating_sub(last_tick.elapsed());
            match rx.recv_timeout(wait) {
                Ok(GateEvent::Shutdown) => break,
                Ok(event) => controller.handle(event),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }
            // 2. 周期检查: 稀疏采样时也要按时出窗
            if last_tick.elapsed() >= tick {
                controller.tick();
                last_tick = Instant::now();
            }
        }
        log::info!("gate engine stopped");
        controller
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::config::GateConfig;
    use crate::gate::{Baseline, ManualSource, MarkerType, MemorySink};
    use std::sync::Arc;

    fn rest_script(start: f64, samples: u32, value: f64) -> Vec<GateEvent> {
        let mut events = vec![GateEvent::Control(ControlCommand::StartSegment {
            trial: 1,
            kind: SegmentKind::Rest,
        })];
        for i in 0..samples {
            events.push(GateEvent::Sensor(SensorEvent::SampleArrived {
                timestamp: start + i as f64 / 10.0,
                theta_power: value,
                signal_quality: 0,
            }));
        }
        events
    }

    #[test]
    fn replays_source_through_worker() {
        let clock = Arc::new(ManualClock::new());
        let controller =
            SegmentController::new(&GateConfig::default(), clock.clone(), MemorySink::new())
                .unwrap();
        let source = ManualSource::new(rest_script(0.0, 10, 5.0));
        let engine = GateEngine::start(controller, source, &EngineConfig::default()).unwrap();
        let handle = engine.handle();
        // Hops follow the engine clock, so nothing fires until it moves.
        thread::sleep(Duration::from_millis(50));
        clock.set(1.0);
        handle.tick().unwrap();
        handle.end_segment(1).unwrap();
        let controller = engine.stop().unwrap();

        assert_eq!(controller.baseline(), Baseline::ready(5.0));
        let sink = controller.sink();
        let windows: Vec<_> = sink.of_type(MarkerType::RestTheta).collect();
        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0].t, 1.0);
        assert_eq!(sink.count(MarkerType::RestBaseline), 1);
        assert_eq!(sink.states.len(), 10);
    }

    #[test]
    fn operator_handle_shares_the_queue() {
        let clock = Arc::new(ManualClock::new());
        let controller =
            SegmentController::new(&GateConfig::default(), clock, MemorySink::new()).unwrap();
        let engine =
            GateEngine::start(controller, ManualSource::default(), &EngineConfig::default())
                .unwrap();
        let handle = engine.handle();
        handle.end_segment(4).unwrap();
        handle.start_segment(5, SegmentKind::Task).unwrap();
        handle.blink(90).unwrap();
        handle.tick().unwrap();
        let controller = engine.stop().unwrap();

        assert_eq!(
            controller.sink().kinds(),
            vec![MarkerType::SegEndIgnored, MarkerType::SegStart, MarkerType::Blink]
        );
        assert!(matches!(handle.tick(), Err(GateError::QueueClosed)));
    }

    #[test]
    fn periodic_tick_fires_hop_between_samples() {
        let clock = Arc::new(ManualClock::new());
        let controller =
            SegmentController::new(&GateConfig::default(), clock.clone(), MemorySink::new())
                .unwrap();
        let config = EngineConfig {
            tick_interval_ms: 5,
        };
        let engine = GateEngine::start(controller, ManualSource::default(), &config).unwrap();
        let handle = engine.handle();
        handle.start_segment(1, SegmentKind::Rest).unwrap();
        handle.sample(0.5, 5.0, 0).unwrap();
        thread::sleep(Duration::from_millis(30));
        clock.set(1.2);
        thread::sleep(Duration::from_millis(50));
        let controller = engine.stop().unwrap();

        assert_eq!(controller.sink().count(MarkerType::RestTheta), 1);
    }
}
