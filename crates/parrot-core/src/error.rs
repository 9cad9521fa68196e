//! Engine error taxonomy.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, EngineError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// Capture was started with every source disabled.
    #[error("no capture source selected")]
    NoSourceSelected,

    /// Capture was started while a capture session is already active.
    #[error("capture is already active")]
    AlreadyCapturing,

    /// Playback was started while a loop is already running.
    #[error("playback is already running")]
    AlreadyRunning,

    /// The log was asked to change while a capture or playback session is
    /// using it. The log is left untouched.
    #[error("log is in use by an active capture or playback session")]
    ConcurrentMutation,

    /// A text line could not be parsed into an action.
    #[error("unrecognized action line: {0:?}")]
    MalformedLine(String),
}
