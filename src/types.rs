// src/types.rs
use serde::Serialize;

// 试次条件
#[derive(PartialEq, Eq, Clone, Copy, Debug, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SegmentKind {
    Rest,
    Task,
}

impl SegmentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rest => "REST",
            Self::Task => "TASK",
        }
    }
}

// 操作员发给核心的命令
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ControlCommand {
    StartSegment { trial: u32, kind: SegmentKind },
    EndSegment { trial: u32 },
}

// 采集层发给核心的事件
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SensorEvent {
    /// `timestamp` is in the engine clock's timebase (seconds).
    SampleArrived {
        timestamp: f64,
        theta_power: f64,
        signal_quality: u8,
    },
    BlinkDetected { strength: u32 },
}

// 单一投递队列上的所有事件
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum GateEvent {
    Sensor(SensorEvent),
    Control(ControlCommand),
    Tick,
    Shutdown,
}

impl From<SensorEvent> for GateEvent {
    fn from(value: SensorEvent) -> Self {
        GateEvent::Sensor(value)
    }
}

impl From<ControlCommand> for GateEvent {
    fn from(value: ControlCommand) -> Self {
        GateEvent::Control(value)
    }
}
