//! routine-engine: the orchestration layer of the rig
//!
//! A routine is one operator-initiated procedure (zeroing against a
//! surface, an indentation sweep, a reorientation, ...) that reads sensor
//! buffers and issues motion commands in a loop until its termination
//! condition fires. All routines share one execution contract: a readiness
//! gate in front, and a catch-and-reconnect boundary around the routine
//! logic so a motion-backend fault aborts the invocation instead of
//! tearing down the process.

mod context;
pub use context::{InterruptFlag, RoutineContext};

mod error;
pub use error::{Result, RoutineError};

mod recorder;
pub use recorder::{CsvSink, MemorySink, RowValue, RunSink};

mod teach;
pub use teach::TeachRoutine;

mod orient;
pub use orient::OrientRoutine;

mod zero;
pub use zero::ZeroRoutine;

mod indent_discrete;
pub use indent_discrete::DiscreteIndent;

mod indent_continuous;
pub use indent_continuous::ContinuousIndent;

use tracing::{error, info, warn};

/// Terminal state of a routine invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Completed,
    /// Zeroing hit its sensor threshold after `depth_mm` of travel.
    ThresholdReached { depth_mm: f64 },
    /// Zeroing ran out of travel without hitting the threshold.
    MaxDistanceReached { travelled_mm: f64 },
    /// The commanded target was reported unreachable.
    Unreachable,
    /// Operator cancelled (readiness gate or interrupt).
    Cancelled,
    /// Routine logic faulted; the backend was reconnected.
    Aborted,
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::Completed => write!(f, "completed"),
            Outcome::ThresholdReached { depth_mm } => {
                write!(f, "threshold reached after {depth_mm:.2} mm")
            }
            Outcome::MaxDistanceReached { travelled_mm } => {
                write!(f, "max distance reached ({travelled_mm:.2} mm), threshold not hit")
            }
            Outcome::Unreachable => write!(f, "target unreachable"),
            Outcome::Cancelled => write!(f, "cancelled"),
            Outcome::Aborted => write!(f, "aborted"),
        }
    }
}

/// Operator-facing decision points. The CLI answers these on stdin; tests
/// script them.
pub trait OperatorPrompt {
    /// Backend is not ready. `true` = try again (after a reconnect),
    /// `false` = cancel the pending routine.
    fn retry_ready(&mut self) -> bool;

    /// Block until the operator acknowledges `message` (teach-mode
    /// re-lock confirmation).
    fn confirm(&mut self, message: &str);
}

/// One closed-loop rig procedure.
pub trait Routine {
    fn name(&self) -> &str;

    fn run(
        &mut self,
        ctx: &mut RoutineContext,
        prompt: &mut dyn OperatorPrompt,
    ) -> Result<Outcome>;
}

/// Run a routine behind the common readiness gate and fault boundary.
///
/// The gate blocks until the backend reports ready or the operator
/// cancels; a cancel aborts before any routine logic runs. An error out
/// of the routine itself is logged and answered with one backend
/// reconnect attempt — the routine is not retried.
pub fn execute(
    routine: &mut dyn Routine,
    ctx: &mut RoutineContext,
    prompt: &mut dyn OperatorPrompt,
) -> Outcome {
    while !ctx.robot.is_ready() {
        warn!(routine = routine.name(), "motion backend not ready");
        if !prompt.retry_ready() {
            info!(routine = routine.name(), "cancelled at readiness gate");
            return Outcome::Cancelled;
        }
        if let Err(e) = ctx.robot.reconnect() {
            warn!(error = %e, "reconnect failed, will re-check readiness");
        }
    }

    match routine.run(ctx, prompt) {
        Ok(outcome) => {
            info!(routine = routine.name(), outcome = %outcome, "routine finished");
            outcome
        }
        Err(e) => {
            error!(routine = routine.name(), error = %e, "routine failed, reconnecting backend");
            if let Err(e) = ctx.robot.reconnect() {
                error!(error = %e, "backend reconnect failed");
            }
            Outcome::Aborted
        }
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use motion_control::{MockArm, MotionEvent, Pose};

    #[test]
    fn test_readiness_gate_cancel_runs_no_logic() {
        let arm = MockArm::new(Pose::default());
        arm.set_ready(false);
        let mut ctx = context_with(&arm, "dev", silent_worker());
        let mut prompt = ScriptedPrompt::new(); // first answer: cancel
        let mut routine = ZeroRoutine::new("dev", "force", 10.0);

        let outcome = execute(&mut routine, &mut ctx, &mut prompt);
        assert_eq!(outcome, Outcome::Cancelled);
        assert!(arm.events().is_empty());
    }

    #[test]
    fn test_readiness_gate_retry_reconnects_then_runs() {
        let arm = MockArm::new(Pose::default());
        arm.set_ready(false);
        let mut ctx = context_with(&arm, "dev", seeded_worker("force", 12.0));
        let mut prompt = ScriptedPrompt::new();
        prompt.retry_answers = vec![true];
        prompt.make_ready = Some(arm.clone());
        let mut routine = ZeroRoutine::new("dev", "force", 10.0);

        let outcome = execute(&mut routine, &mut ctx, &mut prompt);
        assert_eq!(outcome, Outcome::ThresholdReached { depth_mm: 1.0 });
        assert_eq!(arm.events()[0], MotionEvent::Reconnect);
    }

    #[test]
    fn test_routine_fault_triggers_reconnect_and_aborts() {
        let arm = MockArm::new(Pose::default());
        arm.fail_current_pose(true);
        let mut ctx = context_with(&arm, "dev", seeded_worker("force", 0.0));
        let mut prompt = ScriptedPrompt::new();
        let mut routine = ZeroRoutine::new("dev", "force", 10.0);

        let outcome = execute(&mut routine, &mut ctx, &mut prompt);
        assert_eq!(outcome, Outcome::Aborted);
        assert_eq!(arm.events(), vec![MotionEvent::Reconnect]);
    }

    #[test]
    fn test_unknown_device_aborts() {
        let arm = MockArm::new(Pose::default());
        let mut ctx = context_with(&arm, "dev", silent_worker());
        let mut prompt = ScriptedPrompt::new();
        let mut routine = ZeroRoutine::new("other", "force", 10.0);

        let outcome = execute(&mut routine, &mut ctx, &mut prompt);
        assert_eq!(outcome, Outcome::Aborted);
    }
}
