//! G-code streaming run
//!
//! Sends each executable line and reads one response before the next.
//! Comment and blank lines are skipped but still count toward progress.

use super::motion::{percent, Flow};
use super::RunContext;
use crate::device::DeviceSession;
use crate::pause;
use armdraw_core::{
    GcodeProgram, RunOutcome, RunReport, SequencerEvent, SequencerState, ThreadSafe,
    TransportError,
};
use tracing::{debug, error, info, warn};

/// Worker body for a G-code stream
pub(super) fn run_stream(
    ctx: &RunContext,
    session: Option<ThreadSafe<DeviceSession>>,
    program: &GcodeProgram,
) -> RunReport {
    let mut report = RunReport::new(ctx.run_id, ctx.mode, program.executable_lines().count());
    let Some(session) = session else {
        report.outcome = RunOutcome::Faulted(TransportError::NotConnected.to_string());
        ctx.cell().transition(SequencerState::Faulted);
        ctx.cell().transition(SequencerState::Idle);
        ctx.publish(SequencerEvent::Finished(report.clone()));
        return report;
    };

    let mut device = session.lock();
    let missed_before = device.missed_responses();
    info!(run_id = %ctx.run_id, lines = report.total, "streaming G-code");
    ctx.cell().transition(SequencerState::Running);

    report.outcome = match stream_lines(ctx, &mut device, program, &mut report) {
        Ok(Flow::Continue) => {
            ctx.cell().transition(SequencerState::Completed);
            ctx.publish(SequencerEvent::Progress(100.0));
            RunOutcome::Completed
        }
        Ok(Flow::Cancelled) => {
            let emergency = ctx.control.is_emergency();
            ctx.cell().transition(SequencerState::Stopping);
            match device.send_line(&ctx.params.gcode_lift_line) {
                Ok(_) => {
                    ctx.cell().transition(SequencerState::Completed);
                    RunOutcome::StoppedEarly { emergency }
                }
                Err(err) => fault(ctx, &mut device, err),
            }
        }
        Err(err) => fault(ctx, &mut device, err),
    };
    report.missed_responses = device.missed_responses().saturating_sub(missed_before);
    ctx.cell().transition(SequencerState::Idle);

    info!(
        run_id = %ctx.run_id,
        outcome = %report.outcome,
        sent = report.processed,
        "stream finished"
    );
    ctx.publish(SequencerEvent::Finished(report.clone()));
    report
}

fn stream_lines(
    ctx: &RunContext,
    device: &mut DeviceSession,
    program: &GcodeProgram,
    report: &mut RunReport,
) -> Result<Flow, TransportError> {
    let total = program.len();
    for (index, raw) in program.lines().iter().enumerate() {
        if ctx.is_cancelled() {
            debug!(run_id = %ctx.run_id, index, "stream cancelled");
            return Ok(Flow::Cancelled);
        }

        let line = raw.trim();
        if line.is_empty() || line.starts_with(';') {
            continue;
        }

        device.send_line(line)?;
        report.processed += 1;
        ctx.publish(SequencerEvent::Progress(percent(index, total)));
        pause(ctx.params.gcode_line_delay);
    }
    Ok(Flow::Continue)
}

fn fault(ctx: &RunContext, device: &mut DeviceSession, err: TransportError) -> RunOutcome {
    error!(run_id = %ctx.run_id, "stream faulted: {}", err);
    ctx.cell().transition(SequencerState::Faulted);
    if let Err(lift) = device.send_line(&ctx.params.gcode_lift_line) {
        warn!(run_id = %ctx.run_id, "could not lift pen after fault: {}", lift);
    }
    if let Err(close) = device.close() {
        warn!(run_id = %ctx.run_id, "error closing transport: {}", close);
    }
    RunOutcome::Faulted(err.to_string())
}
