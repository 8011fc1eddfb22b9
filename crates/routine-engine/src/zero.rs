use crate::{OperatorPrompt, Outcome, Result, Routine, RoutineContext, RoutineError};
use motion_control::{pose_along_tool_z, MoveParams};
use tracing::info;

/// Contact detection: step the tool forward along its Z axis until the
/// monitored sensor field reaches a threshold, then back off one step to
/// unload the applied force. Running out of travel before the threshold
/// is a distinct terminal state, reported without any corrective step.
pub struct ZeroRoutine {
    pub device: String,
    pub field: String,
    pub threshold: f64,
    pub step_size_mm: f64,
    pub max_size_mm: f64,
    pub params: MoveParams,
}

impl ZeroRoutine {
    pub fn new(device: &str, field: &str, threshold: f64) -> Self {
        Self {
            device: device.to_string(),
            field: field.to_string(),
            threshold,
            step_size_mm: 1.0,
            max_size_mm: 10.0,
            params: MoveParams::slow(),
        }
    }
}

impl Routine for ZeroRoutine {
    fn name(&self) -> &str {
        "zero"
    }

    fn run(
        &mut self,
        ctx: &mut RoutineContext,
        _prompt: &mut dyn OperatorPrompt,
    ) -> Result<Outcome> {
        if self.step_size_mm <= 0.0 {
            return Err(RoutineError::InvalidParams(
                "step size must be positive".to_string(),
            ));
        }
        if self.max_size_mm <= 0.0 {
            return Err(RoutineError::InvalidParams(
                "max travel must be positive".to_string(),
            ));
        }
        let buffer = ctx.device(&self.device)?.buffer();
        info!(
            field = %self.field,
            threshold = self.threshold,
            step_mm = self.step_size_mm,
            max_mm = self.max_size_mm,
            "zeroing"
        );

        let mut travelled = 0.0;
        loop {
            if ctx.interrupt.interrupted() {
                ctx.robot.stop()?;
                info!("zeroing interrupted, motion stopped");
                return Ok(Outcome::Cancelled);
            }

            let current = ctx.robot.current_pose()?;
            let target = pose_along_tool_z(&current, self.step_size_mm);
            ctx.robot.move_linear(&target, self.params)?;
            travelled += self.step_size_mm;

            // Sensor may still be warming up: absent reads as zero
            let value = buffer.latest(&self.field).unwrap_or(0.0);
            info!(value, threshold = self.threshold, travelled_mm = travelled, "probe step");

            if value >= self.threshold {
                let current = ctx.robot.current_pose()?;
                let back = pose_along_tool_z(&current, -self.step_size_mm);
                ctx.robot.move_linear(&back, self.params)?;
                return Ok(Outcome::ThresholdReached {
                    depth_mm: travelled,
                });
            }

            if travelled >= self.max_size_mm {
                return Ok(Outcome::MaxDistanceReached {
                    travelled_mm: travelled,
                });
            }
        }
    }
}
