//! motion-control: pose math and the motion-backend seam
//!
//! The rig commands its arm through the [`MotionBackend`] trait; the
//! vendor binding lives behind it and is not part of this workspace. What
//! is here is everything the routines need to reason about motion: the
//! six-component pose, the tool-frame geometry used to step along the
//! tool Z axis, and a scriptable mock arm for tests and `--mock` runs.

mod pose;
pub use pose::Pose;

mod tool;
pub use tool::{pose_along_tool_z, rotation_matrix};

mod error;
pub use error::{MotionError, Result};

mod traits;
pub use traits::{AsyncStatus, MotionBackend, MoveParams};

#[cfg(feature = "mock")]
mod mock;

#[cfg(feature = "mock")]
pub use mock::{MockArm, MotionEvent};
