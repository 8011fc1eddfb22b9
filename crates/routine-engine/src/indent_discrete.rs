use crate::{OperatorPrompt, Outcome, Result, Routine, RoutineContext, RoutineError, RowValue, RunSink};
use motion_control::{pose_along_tool_z, MoveParams};
use sensor_link::epoch_seconds;
use std::time::Duration;
use tracing::info;

/// Readings averaged per step. The acquisition loop runs on its own
/// schedule, so these are not guaranteed to be distinct underlying
/// samples — an accepted approximation of the rig's behavior.
const SAMPLES_PER_STEP: u32 = 10;
const INTER_SAMPLE_DELAY: Duration = Duration::from_micros(100);

/// Step-pause-measure indentation: move one step along tool Z, let the
/// mechanics settle, average the sensor, record a row; repeat for the full
/// depth and return to the start pose.
pub struct DiscreteIndent {
    pub device: String,
    pub field: String,
    pub step_size_mm: f64,
    pub total_dist_mm: f64,
    pub settle_time: Duration,
    pub params: MoveParams,
    pub sink: Box<dyn RunSink>,
}

impl DiscreteIndent {
    pub fn new(
        device: &str,
        field: &str,
        step_size_mm: f64,
        total_dist_mm: f64,
        settle_time: Duration,
        sink: Box<dyn RunSink>,
    ) -> Self {
        Self {
            device: device.to_string(),
            field: field.to_string(),
            step_size_mm,
            total_dist_mm,
            settle_time,
            params: MoveParams::new(0.1, 0.5),
            sink,
        }
    }
}

impl Routine for DiscreteIndent {
    fn name(&self) -> &str {
        "indent_discrete"
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
        let buffer = ctx.device(&self.device)?.buffer();

        let steps = (self.total_dist_mm / self.step_size_mm).floor() as u64;
        info!(steps, step_mm = self.step_size_mm, "starting discrete indent");

        self.sink.header(&[
            "step",
            "timestamp",
            "x",
            "y",
            "z",
            "distance_mm",
            self.field.as_str(),
        ])?;

        let start = ctx.robot.current_pose()?;

        for step in 0..steps {
            if ctx.interrupt.interrupted() {
                ctx.robot.stop()?;
                info!("indent interrupted, returning to start");
                ctx.robot.move_linear(&start, MoveParams::transit())?;
                return Ok(Outcome::Cancelled);
            }

            let current = ctx.robot.current_pose()?;
            let target = pose_along_tool_z(&current, self.step_size_mm);
            ctx.robot.move_linear(&target, self.params)?;

            std::thread::sleep(self.settle_time);

            let mut sum = 0.0;
            for _ in 0..SAMPLES_PER_STEP {
                sum += buffer.latest(&self.field).unwrap_or(0.0);
                std::thread::sleep(INTER_SAMPLE_DELAY);
            }
            let value = sum / f64::from(SAMPLES_PER_STEP);

            let tcp = ctx.robot.current_pose()?;
            let distance_mm = tcp.distance_to(&start) * 1000.0;

            self.sink.row(&[
                RowValue::Int(step as i64),
                RowValue::Float(epoch_seconds()),
                RowValue::Float(tcp.position[0]),
                RowValue::Float(tcp.position[1]),
                RowValue::Float(tcp.position[2]),
                RowValue::Float(distance_mm),
                RowValue::Float(value),
            ])?;

            info!(step = step + 1, steps, value, distance_mm, "indent step");
        }

        info!("discrete indent complete, returning to start");
        ctx.robot.move_linear(&start, MoveParams::transit())?;
        Ok(Outcome::Completed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::*;
    use crate::{execute, MemorySink};
    use motion_control::{MockArm, Pose};

    fn routine_with_sink(sink: MemorySink) -> DiscreteIndent {
        DiscreteIndent::new(
            "dev",
            "force",
            1.0,
            5.0,
            Duration::from_millis(1),
            Box::new(sink),
        )
    }

    #[test]
    fn test_records_one_row_per_step_and_returns_to_start() {
        let start = Pose::new([0.1, 0.0, 0.2], [0.0; 3]);
        let arm = MockArm::new(start);
        let mut ctx = context_with(&arm, "dev", seeded_worker("force", 2.0));
        let mut prompt = ScriptedPrompt::new();

        let sink = MemorySink::new();
        let mut routine = routine_with_sink(sink.clone());
        let outcome = execute(&mut routine, &mut ctx, &mut prompt);
        assert_eq!(outcome, Outcome::Completed);

        let rows = sink.rows();
        assert_eq!(rows.len(), 5);
        // Constant seeded reading averages to itself
        assert_eq!(rows[0][6], RowValue::Float(2.0));
        // Distance of the final sample: 5 mm from start
        match rows[4][5] {
            RowValue::Float(d) => assert!((d - 5.0).abs() < 1e-9),
            ref other => panic!("expected float distance, got {other:?}"),
        }

        // Last move restores the start pose
        let targets = arm.move_targets();
        assert_eq!(targets.len(), 6);
        assert_eq!(targets[5], start);
        assert_eq!(arm.pose(), start);
    }

    #[test]
    fn test_missing_field_averages_to_zero() {
        let arm = MockArm::new(Pose::default());
        let mut ctx = context_with(&arm, "dev", silent_worker());
        let mut prompt = ScriptedPrompt::new();

        let sink = MemorySink::new();
        let mut routine = routine_with_sink(sink.clone());
        let outcome = execute(&mut routine, &mut ctx, &mut prompt);
        assert_eq!(outcome, Outcome::Completed);
        assert!(sink
            .rows()
            .iter()
            .all(|row| row[6] == RowValue::Float(0.0)));
    }

    #[test]
    fn test_floor_of_partial_step() {
        let arm = MockArm::new(Pose::default());
        let mut ctx = context_with(&arm, "dev", seeded_worker("force", 1.0));
        let mut prompt = ScriptedPrompt::new();

        let sink = MemorySink::new();
        let mut routine = DiscreteIndent::new(
            "dev",
            "force",
            2.0,
            5.0, // floor(5/2) = 2 steps
            Duration::from_millis(1),
            Box::new(sink.clone()),
        );
        let outcome = execute(&mut routine, &mut ctx, &mut prompt);
        assert_eq!(outcome, Outcome::Completed);
        assert_eq!(sink.rows().len(), 2);
    }

    #[test]
    fn test_interrupt_stops_and_returns_to_start() {
        let start = Pose::new([0.0, 0.0, 0.5], [0.0; 3]);
        let arm = MockArm::new(start);
        let mut ctx = context_with(&arm, "dev", seeded_worker("force", 1.0));
        ctx.interrupt.set();
        let mut prompt = ScriptedPrompt::new();

        let sink = MemorySink::new();
        let mut routine = routine_with_sink(sink.clone());
        let outcome = execute(&mut routine, &mut ctx, &mut prompt);
        assert_eq!(outcome, Outcome::Cancelled);
        assert!(sink.rows().is_empty());
        assert_eq!(arm.pose(), start);
    }

    #[test]
    fn test_zero_step_size_rejected() {
        let arm = MockArm::new(Pose::default());
        let mut ctx = context_with(&arm, "dev", seeded_worker("force", 1.0));
        let mut prompt = ScriptedPrompt::new();

        let mut routine = DiscreteIndent::new(
            "dev",
            "force",
            0.0,
            5.0,
            Duration::from_millis(1),
            Box::new(MemorySink::new()),
        );
        let outcome = execute(&mut routine, &mut ctx, &mut prompt);
        assert_eq!(outcome, Outcome::Aborted);
    }
}
