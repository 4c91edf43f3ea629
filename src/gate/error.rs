use thiserror::Error;
#[derive(Debug, Error)]
pub enum GateError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("event queue closed; the engine is no longer running")]
    QueueClosed,
    #[error("engine worker thread panicked")]
    WorkerPanicked,
    #[error("sink i/o failed: {0}")]
    Io(#[from] std::io::Error),
}
