use motion_control::MotionError;
use thiserror::Error;

pub type Result<T, E = RoutineError> = core::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum RoutineError {
    #[error("unknown device: {0}")]
    UnknownDevice(String),
    #[error("bad parameter: {0}")]
    InvalidParams(String),
    #[error(transparent)]
    Motion(#[from] MotionError),
    #[error("run log error: {0}")]
    Sink(#[from] std::io::Error),
}
