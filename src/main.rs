// src/main.rs
use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use thetagate::clock::{Clock, SystemClock};
use thetagate::config::AppConfig;
use thetagate::engine::GateEngine;
use thetagate::gate::{LogSink, SegmentController, Sink};
use thetagate::hotkeys::{OperatorAction, OperatorKeys};
use thetagate::recorder::CsvRecorder;
use thetagate::sim::SimulatedHeadset;

// 入口函数: [config.json]
fn main() -> Result<()> {
    env_logger::init();
    let config = match std::env::args_os().nth(1).map(PathBuf::from) {
        Some(path) => AppConfig::load(&path)?,
        None => AppConfig::default(),
    };
    log::info!("gate config: {:?}", config.gate);

    let clock: Arc<dyn Clock> = Arc::new(SystemClock::new());
    let sink: Box<dyn Sink + Send> = match &config.output_csv {
        Some(path) => Box::new((
            LogSink,
            CsvRecorder::create(path)
                .with_context(|| format!("cannot create session CSV {}", path.display()))?,
        )),
        None => Box::new(LogSink),
    };
    let controller = SegmentController::new(&config.gate, Arc::clone(&clock), sink)?;
    let headset = SimulatedHeadset::new(config.sim.clone(), Arc::clone(&clock));
    let engine = GateEngine::start(controller, headset, &config.engine)?;
    let handle = engine.handle();

    println!("⚙️ thetagate ready. c = REST start, v = TASK start, b = end, q = quit (Enter to send)");
    let mut keys = OperatorKeys::default();
    'input: for line in std::io::stdin().lock().lines() {
        let line = line.context("failed to read operator input")?;
        for key in line.chars() {
            match keys.press(key) {
                Some(OperatorAction::Command(command)) => handle.send(command)?,
                Some(OperatorAction::Quit) => break 'input,
                None => {}
            }
        }
    }

    let controller = engine.stop()?;
    match controller.baseline().value() {
        Some(mean) => println!("🛑 Stopped. Last REST baseline: {mean:.3}"),
        None => println!("🛑 Stopped. No REST baseline was committed."),
    }
    Ok(())
}
