//! Event channel from a sequencer worker to its owning context
//!
//! Provides:
//! - Event types for state changes, frames, interim poses, and progress
//! - Run reports delivered when a run ends
//! - An unbounded channel so the worker never blocks on the consumer

use crate::data::state::{RunMode, SequencerState};
use crate::data::{JointAngles, Point2D};
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::mpsc;
use uuid::Uuid;

/// How a run ended
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RunOutcome {
    /// Every point or line was processed
    Completed,
    /// Cancelled before the end
    StoppedEarly {
        /// True when the stop came from an emergency stop
        emergency: bool,
    },
    /// A transport failure aborted the run
    Faulted(String),
}

impl RunOutcome {
    /// True for completed and stopped runs
    pub fn is_success(&self) -> bool {
        !matches!(self, RunOutcome::Faulted(_))
    }
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunOutcome::Completed => write!(f, "completed"),
            RunOutcome::StoppedEarly { emergency: true } => write!(f, "emergency stopped"),
            RunOutcome::StoppedEarly { emergency: false } => write!(f, "stopped early"),
            RunOutcome::Faulted(reason) => write!(f, "faulted: {}", reason),
        }
    }
}

/// Summary of a finished run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    /// Identifier tagging this run's log lines
    pub run_id: Uuid,
    /// Device or simulation
    pub mode: RunMode,
    /// How the run ended
    pub outcome: RunOutcome,
    /// Points or lines in the input
    pub total: usize,
    /// Points or lines fully processed
    pub processed: usize,
    /// Points skipped as unreachable
    pub skipped_unreachable: usize,
    /// Commands that got no response within the window
    pub missed_responses: usize,
}

impl RunReport {
    /// Start an empty report
    pub fn new(run_id: Uuid, mode: RunMode, total: usize) -> Self {
        Self {
            run_id,
            mode,
            outcome: RunOutcome::Completed,
            total,
            processed: 0,
            skipped_unreachable: 0,
            missed_responses: 0,
        }
    }
}

/// Events published by a running sequencer
#[derive(Debug, Clone, PartialEq)]
pub enum SequencerEvent {
    /// Lifecycle state changed
    StateChanged(SequencerState),
    /// The pen reached robot path point `index`
    Frame {
        /// Index into the robot path
        index: usize,
    },
    /// Intermediate pose during smoothed travel
    InterimPose {
        /// Interpolated workspace position
        point: Point2D,
        /// Interpolated shoulder angle in degrees
        theta1: f64,
        /// Interpolated elbow angle in degrees
        theta2: f64,
    },
    /// Joint angles of the latest reached point
    Angles(JointAngles),
    /// Progress in percent, 0 to 100
    Progress(f64),
    /// Recoverable problem worth showing to the user
    Warning(String),
    /// Run ended
    Finished(RunReport),
}

impl fmt::Display for SequencerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SequencerEvent::StateChanged(state) => write!(f, "State: {}", state),
            SequencerEvent::Frame { index } => write!(f, "Frame {}", index),
            SequencerEvent::InterimPose {
                point,
                theta1,
                theta2,
            } => write!(f, "Travel {} θ1={:.2} θ2={:.2}", point, theta1, theta2),
            SequencerEvent::Angles(angles) => write!(f, "Angles {}", angles),
            SequencerEvent::Progress(pct) => write!(f, "Progress {:.1}%", pct),
            SequencerEvent::Warning(msg) => write!(f, "Warning: {}", msg),
            SequencerEvent::Finished(report) => write!(f, "Finished: {}", report.outcome),
        }
    }
}

/// Sending half held by the worker
pub type EventSender = mpsc::UnboundedSender<SequencerEvent>;

/// Sending half kept by stop controls; it does not hold the channel open
pub type WeakEventSender = mpsc::WeakUnboundedSender<SequencerEvent>;

/// Receiving half drained by the owning context
pub type EventReceiver = mpsc::UnboundedReceiver<SequencerEvent>;

/// Create a new event channel
pub fn event_channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}

/// Drain every event currently queued without blocking
pub fn drain_events(rx: &mut EventReceiver) -> Vec<SequencerEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
