//! # armdraw core
//!
//! Core types, kinematics, and run plumbing for armdraw.
//! Provides the data model shared by the image pipeline and the motion
//! sequencer, the inverse kinematics engine, and the error taxonomy.

pub mod core;
pub mod data;
pub mod error;
pub mod kinematics;
pub mod types;

pub use core::{
    drain_events, event_channel, CancelToken, EventReceiver, EventSender, RunOutcome, RunReport,
    SequencerEvent, WeakEventSender,
};

pub use data::{
    state::{RunMode, SequencerState},
    DrawingPath, GcodeProgram, JointAngles, PathItem, PenState, Point2D, RobotPath, RobotPoint,
};

pub use error::{ExtractionError, KinematicsError, SequencerError, TransportError};

pub use kinematics::{ArmGeometry, ArmPose};

pub use types::{thread_safe, ThreadSafe};
