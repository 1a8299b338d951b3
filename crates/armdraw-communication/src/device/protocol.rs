//! Arm controller command set
//!
//! Commands are single ASCII lines. The firmware answers every command with
//! at least one line; joint moves end with a line containing [`MOVE_ACK`].

use armdraw_core::{JointAngles, PenState};
use std::fmt;

/// Substring the firmware prints once a joint move has finished
pub const MOVE_ACK: &str = "Moved to angle";

/// Commands understood by the arm firmware
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DeviceCommand {
    /// Drive both joints to their home position
    Home,
    /// Lift the pen servo
    PenUp,
    /// Lower the pen servo
    PenDown,
    /// Halt all motion immediately
    Stop,
    /// Report controller status
    Status,
    /// Move both joints to absolute angles in degrees
    Goto(JointAngles),
}

impl DeviceCommand {
    /// Servo command for a pen state
    pub fn pen(state: PenState) -> Self {
        match state {
            PenState::Up => DeviceCommand::PenUp,
            PenState::Down => DeviceCommand::PenDown,
        }
    }
}

impl fmt::Display for DeviceCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceCommand::Home => write!(f, "HOME"),
            DeviceCommand::PenUp => write!(f, "PU"),
            DeviceCommand::PenDown => write!(f, "PD"),
            DeviceCommand::Stop => write!(f, "STOP"),
            DeviceCommand::Status => write!(f, "STATUS"),
            DeviceCommand::Goto(angles) => {
                write!(f, "GOTO {:.2} {:.2}", angles.theta1, angles.theta2)
            }
        }
    }
}

/// True when a response line acknowledges a finished joint move
pub fn is_move_ack(line: &str) -> bool {
    line.contains(MOVE_ACK)
}
