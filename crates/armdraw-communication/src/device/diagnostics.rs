//! Motor test sequence
//!
//! Exercises the pen servo and both joints through a fixed set of poses,
//! querying status after every move.

use super::protocol::DeviceCommand;
use super::session::DeviceSession;
use crate::pause;
use armdraw_core::{JointAngles, TransportError};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::info;

/// Poses visited by the motor test, in degrees
pub const TEST_POSES: [(f64, f64); 4] = [(10.0, 10.0), (30.0, 15.0), (45.0, 30.0), (0.0, 0.0)];

/// Pauses between motor test steps
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotorTestTiming {
    /// After homing
    pub after_home: Duration,
    /// After each pen command
    pub after_pen: Duration,
    /// After each joint move
    pub after_move: Duration,
    /// After each status query
    pub after_status: Duration,
}

impl Default for MotorTestTiming {
    fn default() -> Self {
        Self {
            after_home: Duration::from_secs(1),
            after_pen: Duration::from_millis(500),
            after_move: Duration::from_secs(1),
            after_status: Duration::from_millis(500),
        }
    }
}

impl MotorTestTiming {
    /// No pauses
    pub fn immediate() -> Self {
        Self {
            after_home: Duration::ZERO,
            after_pen: Duration::ZERO,
            after_move: Duration::ZERO,
            after_status: Duration::ZERO,
        }
    }
}

/// One command and its first response line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandExchange {
    /// Command text as sent
    pub command: String,
    /// First response line, if any arrived
    pub response: Option<String>,
}

/// Everything the motor test sent and heard back
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MotorTestReport {
    /// Exchanges in send order
    pub exchanges: Vec<CommandExchange>,
}

impl MotorTestReport {
    /// Commands that got no response
    pub fn unanswered(&self) -> usize {
        self.exchanges.iter().filter(|e| e.response.is_none()).count()
    }
}

/// Run the motor test: home, cycle the pen, then visit [`TEST_POSES`]
pub fn run_motor_test(
    session: &mut DeviceSession,
    timing: &MotorTestTiming,
) -> Result<MotorTestReport, TransportError> {
    info!(port = session.port_name(), "starting motor test");
    let mut report = MotorTestReport::default();
    let mut exchange = |session: &mut DeviceSession,
                        command: DeviceCommand,
                        wait: Duration|
     -> Result<(), TransportError> {
        let response = session.send(command)?;
        report.exchanges.push(CommandExchange {
            command: command.to_string(),
            response,
        });
        pause(wait);
        Ok(())
    };

    exchange(session, DeviceCommand::Home, timing.after_home)?;
    for pen in [DeviceCommand::PenUp, DeviceCommand::PenDown, DeviceCommand::PenUp] {
        exchange(session, pen, timing.after_pen)?;
    }
    for (theta1, theta2) in TEST_POSES {
        let angles = JointAngles::new(theta1, theta2);
        exchange(session, DeviceCommand::Goto(angles), timing.after_move)?;
        exchange(session, DeviceCommand::Status, timing.after_status)?;
    }

    info!(
        commands = report.exchanges.len(),
        unanswered = report.unanswered(),
        "motor test finished"
    );
    Ok(report)
}
