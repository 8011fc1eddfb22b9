use thiserror::Error;

pub type Result<T, E = MotionError> = core::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum MotionError {
    /// The commanded target cannot be reached from the current
    /// configuration. Reported, not fatal to the calling routine.
    #[error("target pose unreachable: {0}")]
    Unreachable(String),
    #[error("backend fault: {0}")]
    Backend(String),
    #[error("not connected")]
    NotConnected,
}
