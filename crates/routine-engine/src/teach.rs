use crate::{OperatorPrompt, Outcome, Result, Routine, RoutineContext};
use tracing::info;

/// Unlock the arm for hand guiding, wait for the operator, re-lock.
///
/// No sensor interaction; terminal on operator confirmation. The re-lock
/// is issued even if the backend misbehaved while unlocked.
pub struct TeachRoutine;

impl Routine for TeachRoutine {
    fn name(&self) -> &str {
        "teach"
    }

    fn run(
        &mut self,
        ctx: &mut RoutineContext,
        prompt: &mut dyn OperatorPrompt,
    ) -> Result<Outcome> {
        ctx.robot.set_freedrive(true)?;
        info!("freedrive enabled, arm is backdrivable");

        prompt.confirm("Move the arm by hand; confirm to re-lock");

        let relock = ctx.robot.set_freedrive(false);
        info!("freedrive disabled, arm locked");
        relock?;
        Ok(Outcome::Completed)
    }
}
