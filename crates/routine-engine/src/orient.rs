use crate::{OperatorPrompt, Outcome, Result, Routine, RoutineContext};
use motion_control::{MotionError, MoveParams};
use tracing::{info, warn};

/// Rotate the tool to a caller-supplied orientation while holding
/// position. One motion command; an unreachable target is reported as its
/// own outcome, not treated as a routine failure.
pub struct OrientRoutine {
    pub rotation: [f64; 3],
    pub params: MoveParams,
}

impl OrientRoutine {
    pub fn new(rotation: [f64; 3]) -> Self {
        Self {
            rotation,
            params: MoveParams::slow(),
        }
    }
}

impl Routine for OrientRoutine {
    fn name(&self) -> &str {
        "orient"
    }

    fn run(
        &mut self,
        ctx: &mut RoutineContext,
        _prompt: &mut dyn OperatorPrompt,
    ) -> Result<Outcome> {
        let current = ctx.robot.current_pose()?;
        let target = current.with_rotation(self.rotation);
        info!(
            rx = self.rotation[0],
            ry = self.rotation[1],
            rz = self.rotation[2],
            "rotating tool"
        );

        match ctx.robot.move_linear(&target, self.params) {
            Ok(()) => Ok(Outcome::Completed),
            Err(MotionError::Unreachable(msg)) => {
                warn!(%msg, "target orientation unreachable");
                Ok(Outcome::Unreachable)
            }
            Err(e) => Err(e.into()),
        }
    }
}
