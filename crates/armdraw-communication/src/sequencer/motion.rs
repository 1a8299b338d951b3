//! Drawing run: homing, per-point moves, smoothed travel, and wind-down

use super::RunContext;
use crate::device::DeviceSession;
use crate::pause;
use armdraw_core::{
    ArmGeometry, JointAngles, PenState, Point2D, RobotPoint, RunMode, RunOutcome, RunReport,
    SequencerEvent, SequencerState, ThreadSafe, TransportError,
};
use tracing::{debug, error, info, warn};

/// Whether the run should keep going
pub(super) enum Flow {
    Continue,
    Cancelled,
}

/// Percent done after processing point or line `index` of `total`
pub(super) fn percent(index: usize, total: usize) -> f64 {
    (index + 1) as f64 / total as f64 * 100.0
}

/// Worker body for a drawing run
pub(super) fn run_drawing(
    ctx: &RunContext,
    arm: ArmGeometry,
    session: Option<ThreadSafe<DeviceSession>>,
    path: &[RobotPoint],
) -> RunReport {
    let mut guard = session.as_ref().map(|s| s.lock());
    let device = guard.as_deref_mut();
    let missed_before = device.as_ref().map_or(0, |d| d.missed_responses());

    let mut run = DrawRun {
        ctx,
        arm,
        device,
        report: RunReport::new(ctx.run_id, ctx.mode, path.len()),
    };
    let result = run.home().and_then(|flow| match flow {
        Flow::Continue => run.draw(path),
        Flow::Cancelled => Ok(Flow::Cancelled),
    });
    run.finish(result, missed_before)
}

struct DrawRun<'a> {
    ctx: &'a RunContext,
    arm: ArmGeometry,
    device: Option<&'a mut DeviceSession>,
    report: RunReport,
}

impl DrawRun<'_> {
    fn home(&mut self) -> Result<Flow, TransportError> {
        let ctx = self.ctx;
        info!(run_id = %ctx.run_id, points = self.report.total, "homing");
        if let Some(device) = self.device.as_deref_mut() {
            device.home()?;
            device.pen_up()?;
            pause(ctx.params.homing_settle);
        }
        if ctx.is_cancelled() {
            return Ok(Flow::Cancelled);
        }
        ctx.cell().transition(SequencerState::Running);
        Ok(Flow::Continue)
    }

    fn draw(&mut self, path: &[RobotPoint]) -> Result<Flow, TransportError> {
        let ctx = self.ctx;
        let total = path.len();
        let mut prev = RobotPoint::new(0.0, 0.0, PenState::Up);
        let mut prev_angles = JointAngles::default();

        for (index, point) in path.iter().enumerate() {
            if ctx.is_cancelled() {
                debug!(run_id = %ctx.run_id, index, "run cancelled");
                return Ok(Flow::Cancelled);
            }

            let angles = match self.arm.inverse(point.x, point.y) {
                Ok(angles) => angles,
                Err(err) => {
                    self.report.skipped_unreachable += 1;
                    warn!(run_id = %ctx.run_id, index, "skipping point: {}", err);
                    ctx.publish(SequencerEvent::Warning(format!(
                        "Point {} skipped: {}",
                        index, err
                    )));
                    ctx.publish(SequencerEvent::Progress(percent(index, total)));
                    continue;
                }
            };

            let long_travel = !prev.pen.is_down()
                && !point.pen.is_down()
                && prev.position().distance_to(&point.position()) > ctx.params.long_move_threshold;

            if long_travel {
                let flow = self.travel(prev.position(), prev_angles, point.position(), angles)?;
                if let Flow::Cancelled = flow {
                    return Ok(Flow::Cancelled);
                }
            } else if let Some(device) = self.device.as_deref_mut() {
                device.move_to(point.pen, angles)?;
            }

            ctx.publish(SequencerEvent::Frame { index });
            ctx.publish(SequencerEvent::Angles(angles));
            self.report.processed += 1;
            prev = *point;
            prev_angles = angles;
            ctx.publish(SequencerEvent::Progress(percent(index, total)));

            match ctx.mode {
                RunMode::Device if point.pen.is_down() => pause(ctx.params.draw_point_delay),
                RunMode::Simulation => pause(ctx.params.simulation_point_delay),
                RunMode::Device => {}
            }
        }
        Ok(Flow::Continue)
    }

    /// Interpolate a pen-up travel, commanding the device on a subsample of steps
    fn travel(
        &mut self,
        from: Point2D,
        from_angles: JointAngles,
        to: Point2D,
        to_angles: JointAngles,
    ) -> Result<Flow, TransportError> {
        let ctx = self.ctx;
        let steps = ctx.params.travel_substeps.max(1);
        let every = ctx.params.command_every.max(1);
        debug!(run_id = %ctx.run_id, %from, %to, steps, "smoothed travel");

        for step in 0..=steps {
            if ctx.is_cancelled() {
                return Ok(Flow::Cancelled);
            }
            let t = step as f64 / steps as f64;
            let point = from.lerp(&to, t);
            let pose = from_angles.lerp(&to_angles, t);
            ctx.publish(SequencerEvent::InterimPose {
                point,
                theta1: pose.theta1,
                theta2: pose.theta2,
            });

            if step % every == 0 || step == steps {
                if let Some(device) = self.device.as_deref_mut() {
                    device.travel_to(pose)?;
                }
            }
            pause(ctx.params.substep_delay);
        }
        Ok(Flow::Continue)
    }

    fn finish(mut self, result: Result<Flow, TransportError>, missed_before: usize) -> RunReport {
        let ctx = self.ctx;
        let outcome = match result {
            Ok(Flow::Continue) => self.complete(),
            Ok(Flow::Cancelled) => self.wind_down(),
            Err(err) => self.fault(err),
        };

        self.report.outcome = outcome;
        if let Some(device) = self.device.as_deref() {
            self.report.missed_responses = device.missed_responses().saturating_sub(missed_before);
        }
        ctx.cell().transition(SequencerState::Idle);

        info!(
            run_id = %ctx.run_id,
            outcome = %self.report.outcome,
            processed = self.report.processed,
            skipped = self.report.skipped_unreachable,
            missed = self.report.missed_responses,
            "run finished"
        );
        ctx.publish(SequencerEvent::Finished(self.report.clone()));
        self.report
    }

    /// Final pen-up and home after the last point
    fn complete(&mut self) -> RunOutcome {
        let ctx = self.ctx;
        if let Some(device) = self.device.as_deref_mut() {
            if let Err(err) = device.pen_up().and_then(|_| device.home().map(|_| ())) {
                return self.fault(err);
            }
        }
        ctx.cell().transition(SequencerState::Completed);
        ctx.publish(SequencerEvent::Progress(100.0));
        RunOutcome::Completed
    }

    /// Lift the pen after a stop; home only when the stop was not an emergency
    fn wind_down(&mut self) -> RunOutcome {
        let ctx = self.ctx;
        let emergency = ctx.control.is_emergency();
        ctx.cell().transition(SequencerState::Stopping);
        info!(run_id = %ctx.run_id, emergency, "stopping run");

        if let Some(device) = self.device.as_deref_mut() {
            let lifted = device.pen_up().and_then(|_| {
                if emergency {
                    Ok(())
                } else {
                    device.home().map(|_| ())
                }
            });
            if let Err(err) = lifted {
                return self.fault(err);
            }
        }
        ctx.cell().transition(SequencerState::Completed);
        RunOutcome::StoppedEarly { emergency }
    }

    fn fault(&mut self, err: TransportError) -> RunOutcome {
        let ctx = self.ctx;
        error!(run_id = %ctx.run_id, "run faulted: {}", err);
        ctx.cell().transition(SequencerState::Faulted);

        if let Some(device) = self.device.as_deref_mut() {
            if let Err(lift) = device.pen_up() {
                warn!(run_id = %ctx.run_id, "could not lift pen after fault: {}", lift);
            }
            if let Err(close) = device.close() {
                warn!(run_id = %ctx.run_id, "error closing transport: {}", close);
            }
        }
        RunOutcome::Faulted(err.to_string())
    }
}
