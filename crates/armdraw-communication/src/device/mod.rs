//! Arm controller device layer
//!
//! - [`protocol`]: command set and acknowledgment matching
//! - [`session`]: command/response session with pen bookkeeping
//! - [`diagnostics`]: motor test sequence

pub mod diagnostics;
pub mod protocol;
pub mod session;

pub use diagnostics::{run_motor_test, CommandExchange, MotorTestReport, MotorTestTiming};
pub use protocol::{is_move_ack, DeviceCommand, MOVE_ACK};
pub use session::DeviceSession;
