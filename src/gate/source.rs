use std::collections::VecDeque;

use crate::engine::GateHandle;
use crate::gate::GateError;
use crate::types::GateEvent;

/// Something that pushes events into the engine once attached.
pub trait EventSource: Send {
    fn attach(&mut self, handle: GateHandle) -> Result<(), GateError>;
    fn detach(&mut self);
}

/// In-memory source useful for tests and deterministic playback. Everything
/// queued is delivered on attach.
#[derive(Debug, Default)]
pub struct ManualSource {
    queue: VecDeque<GateEvent>,
}

impl ManualSource {
    pub fn new(events: impl IntoIterator<Item = GateEvent>) -> Self {
        Self {
            queue: events.into_iter().collect(),
        }
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }
}

impl EventSource for ManualSource {
    fn attach(&mut self, handle: GateHandle) -> Result<(), GateError> {
        while let Some(event) = self.queue.pop_front() {
            handle.send(event)?;
        }
        Ok(())
    }

    fn detach(&mut self) {}
}
