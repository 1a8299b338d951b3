//! # armdraw communication
//!
//! Everything between a finished robot path and the arm controller:
//! - Serial transport with line framing and port discovery
//! - Arm controller command set, session, and motor diagnostics
//! - Motion sequencer running drawings and G-code streams on a worker thread

pub mod communication;
pub mod device;
pub mod params;
pub mod sequencer;

pub use communication::{
    list_ports, open_serial, serial::is_candidate_port, shared_transport, LineTransport,
    SerialPortInfo, SharedTransport, Transport,
};
pub use device::{
    is_move_ack, run_motor_test, CommandExchange, DeviceCommand, DeviceSession, MotorTestReport,
    MotorTestTiming, MOVE_ACK,
};
pub use params::{ConnectionParams, MotionParams};
pub use sequencer::{MotionSequencer, RunHandle, StopControl};

use std::time::Duration;

/// Sleep unless the duration is zero
pub(crate) fn pause(duration: Duration) {
    if !duration.is_zero() {
        std::thread::sleep(duration);
    }
}
