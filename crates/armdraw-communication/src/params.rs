//! Connection and timing parameters

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Serial connection settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionParams {
    /// Port name (e.g., "COM14", "/dev/ttyUSB0")
    pub port: String,
    /// Baud rate
    pub baud_rate: u32,
    /// Wait after opening the port for the board to reset
    pub settle: Duration,
}

impl Default for ConnectionParams {
    fn default() -> Self {
        Self {
            port: "COM14".to_string(),
            baud_rate: 115_200,
            settle: Duration::from_secs(2),
        }
    }
}

/// Timing and smoothing parameters for device commands and runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MotionParams {
    /// Pen-up travel longer than this is interpolated (workspace units)
    pub long_move_threshold: f64,
    /// Interpolation sub-steps for one long travel
    pub travel_substeps: usize,
    /// Send a device command on every Nth sub-step
    pub command_every: usize,
    /// Pause per interpolation sub-step
    pub substep_delay: Duration,
    /// Base servo settle time; pen changes wait three times this
    pub servo_delay: Duration,
    /// Base motor settle time; joint moves wait twice this
    pub motor_delay: Duration,
    /// Pause between writing a command and reading its response
    pub command_delay: Duration,
    /// How long to wait for a command's first response line
    pub read_timeout: Duration,
    /// How long to wait for a joint move acknowledgment
    pub ack_timeout: Duration,
    /// Poll interval while waiting for an acknowledgment
    pub ack_poll: Duration,
    /// Pause after homing before drawing starts
    pub homing_settle: Duration,
    /// Pause after each pen-down point on the device
    pub draw_point_delay: Duration,
    /// Pause after each point in simulation
    pub simulation_point_delay: Duration,
    /// Pause after each streamed G-code line
    pub gcode_line_delay: Duration,
    /// Line sent to lift the pen when a G-code stream stops early
    pub gcode_lift_line: String,
}

impl Default for MotionParams {
    fn default() -> Self {
        Self {
            long_move_threshold: 20.0,
            travel_substeps: 20,
            command_every: 4,
            substep_delay: Duration::from_millis(50),
            servo_delay: Duration::from_millis(20),
            motor_delay: Duration::from_millis(10),
            command_delay: Duration::from_millis(10),
            read_timeout: Duration::from_secs(1),
            ack_timeout: Duration::from_secs(1),
            ack_poll: Duration::from_millis(100),
            homing_settle: Duration::from_secs(1),
            draw_point_delay: Duration::from_millis(50),
            simulation_point_delay: Duration::from_millis(50),
            gcode_line_delay: Duration::from_millis(100),
            gcode_lift_line: "G0 Z5".to_string(),
        }
    }
}

impl MotionParams {
    /// Same smoothing with every pause and wait set to zero
    pub fn immediate() -> Self {
        Self {
            substep_delay: Duration::ZERO,
            servo_delay: Duration::ZERO,
            motor_delay: Duration::ZERO,
            command_delay: Duration::ZERO,
            read_timeout: Duration::ZERO,
            ack_timeout: Duration::ZERO,
            ack_poll: Duration::ZERO,
            homing_settle: Duration::ZERO,
            draw_point_delay: Duration::ZERO,
            simulation_point_delay: Duration::ZERO,
            gcode_line_delay: Duration::ZERO,
            ..Self::default()
        }
    }

    /// Wait after a pen servo command
    pub fn pen_settle(&self) -> Duration {
        self.servo_delay * 3
    }

    /// Wait after a joint move command
    pub fn move_settle(&self) -> Duration {
        self.motor_delay * 2
    }
}
