use crate::{OperatorPrompt, Outcome, Result, Routine, RoutineContext, RowValue, RunSink};
use motion_control::{pose_along_tool_z, AsyncStatus, MoveParams};
use sensor_link::epoch_seconds;
use std::time::Instant;
use tracing::info;

/// Smooth indentation scan: one non-blocking move over the full depth,
/// sampled at the host's natural loop rate while the backend reports the
/// move in progress. Terminal on move completion; an interrupt issues an
/// immediate stop. Either way the tool returns to the start pose.
pub struct ContinuousIndent {
    pub device: String,
    pub field: String,
    pub total_dist_mm: f64,
    pub params: MoveParams,
    pub sink: Box<dyn RunSink>,
}

impl ContinuousIndent {
    pub fn new(device: &str, field: &str, total_dist_mm: f64, sink: Box<dyn RunSink>) -> Self {
        Self {
            device: device.to_string(),
            field: field.to_string(),
            total_dist_mm,
            // Scan speed is deliberately slow; the high accel keeps the
            // velocity profile flat over the stroke.
            params: MoveParams::new(1.2, 0.01),
            sink,
        }
    }
}

impl Routine for ContinuousIndent {
    fn name(&self) -> &str {
        "indent_continuous"
    }

    fn run(
        &mut self,
        ctx: &mut RoutineContext,
        _prompt: &mut dyn OperatorPrompt,
    ) -> Result<Outcome> {
        let buffer = ctx.device(&self.device)?.buffer();

        info!(
            depth_mm = self.total_dist_mm,
            speed = self.params.speed,
            "starting continuous indent"
        );

        self.sink.header(&[
            "timestamp",
            "elapsed_s",
            "x",
            "y",
            "z",
            "distance_mm",
            self.field.as_str(),
        ])?;

        let start = ctx.robot.current_pose()?;
        let target = pose_along_tool_z(&start, self.total_dist_mm);
        ctx.robot.move_linear_async(&target, self.params)?;
        let t0 = Instant::now();

        let mut cancelled = false;
        loop {
            if ctx.interrupt.interrupted() {
                ctx.robot.stop()?;
                info!("continuous indent interrupted, motion stopped");
                cancelled = true;
                break;
            }
            if ctx.robot.async_status()? == AsyncStatus::Done {
                break;
            }

            let tcp = ctx.robot.current_pose()?;
            let value = buffer.latest(&self.field).unwrap_or(0.0);
            let distance_mm = tcp.distance_to(&start) * 1000.0;

            self.sink.row(&[
                RowValue::Float(epoch_seconds()),
                RowValue::Float(t0.elapsed().as_secs_f64()),
                RowValue::Float(tcp.position[0]),
                RowValue::Float(tcp.position[1]),
                RowValue::Float(tcp.position[2]),
                RowValue::Float(distance_mm),
                RowValue::Float(value),
            ])?;
        }

        info!("returning to start");
        ctx.robot.move_linear(&start, MoveParams::transit())?;
        Ok(if cancelled {
            Outcome::Cancelled
        } else {
            Outcome::Completed
        })
    }
}
