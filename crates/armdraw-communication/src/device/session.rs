//! Command/response session with the arm controller
//!
//! Tracks the pen state and the last commanded joint angles so pen servo
//! commands are only sent on actual changes. Locks the shared transport per
//! write and per read poll, leaving room for an out-of-band `STOP`.

use super::protocol::{is_move_ack, DeviceCommand};
use crate::communication::{open_serial, shared_transport, SharedTransport};
use crate::params::{ConnectionParams, MotionParams};
use crate::pause;
use armdraw_core::{JointAngles, PenState, TransportError};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Shortest slice a response poll holds the transport lock for
const MIN_POLL_SLICE: Duration = Duration::from_millis(1);

/// Open connection to the arm controller
pub struct DeviceSession {
    transport: SharedTransport,
    port_name: String,
    params: MotionParams,
    connected: bool,
    pen: PenState,
    last_angles: JointAngles,
    missed_responses: usize,
}

impl DeviceSession {
    /// Open the serial port, wait for the board to reset, and home the arm
    pub fn open(
        connection: &ConnectionParams,
        params: MotionParams,
    ) -> Result<Self, TransportError> {
        let transport = open_serial(&connection.port, connection.baud_rate)?;
        Self::connect(shared_transport(transport), connection.settle, params)
    }

    /// Connect over an already opened transport
    pub fn connect(
        transport: SharedTransport,
        settle: Duration,
        params: MotionParams,
    ) -> Result<Self, TransportError> {
        let mut session = Self::from_transport(transport, params);
        info!(port = %session.port_name, "waiting for controller reset");
        pause(settle);
        session.home()?;
        info!(port = %session.port_name, "connected to arm controller");
        Ok(session)
    }

    /// Wrap a transport without settling or homing
    pub fn from_transport(transport: SharedTransport, params: MotionParams) -> Self {
        let port_name = transport.lock().name();
        Self {
            transport,
            port_name,
            params,
            connected: true,
            pen: PenState::Up,
            last_angles: JointAngles::default(),
            missed_responses: 0,
        }
    }

    /// Handle to the underlying transport for out-of-band writes
    pub fn transport_handle(&self) -> SharedTransport {
        self.transport.clone()
    }

    /// Port or endpoint name
    pub fn port_name(&self) -> &str {
        &self.port_name
    }

    /// Timing parameters
    pub fn params(&self) -> &MotionParams {
        &self.params
    }

    /// True until [`DeviceSession::close`] or a fault
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Last pen state sent to the device
    pub fn pen(&self) -> PenState {
        self.pen
    }

    /// Last joint angles commanded
    pub fn last_angles(&self) -> JointAngles {
        self.last_angles
    }

    /// Response windows that closed without the expected line
    pub fn missed_responses(&self) -> usize {
        self.missed_responses
    }

    /// Send a command and return its first response line
    pub fn send(&mut self, command: DeviceCommand) -> Result<Option<String>, TransportError> {
        self.send_line(&command.to_string())
    }

    /// Send a raw line and return its first response line
    pub fn send_line(&mut self, line: &str) -> Result<Option<String>, TransportError> {
        if !self.connected {
            return Err(TransportError::NotConnected);
        }

        self.transport.lock().write_line(line)?;
        pause(self.params.command_delay);

        let response = self.read_response(self.params.read_timeout)?;
        match &response {
            Some(text) => debug!(command = line, response = %text, "device response"),
            None => {
                self.missed_responses += 1;
                warn!(command = line, "no response from device");
            }
        }
        Ok(response)
    }

    /// Drive both joints home
    pub fn home(&mut self) -> Result<Option<String>, TransportError> {
        self.send(DeviceCommand::Home)
    }

    /// Halt all motion
    pub fn stop(&mut self) -> Result<Option<String>, TransportError> {
        self.send(DeviceCommand::Stop)
    }

    /// Query controller status
    pub fn status(&mut self) -> Result<Option<String>, TransportError> {
        self.send(DeviceCommand::Status)
    }

    /// Lift the pen and wait for the servo
    pub fn pen_up(&mut self) -> Result<(), TransportError> {
        self.set_pen(PenState::Up)
    }

    /// Lower the pen and wait for the servo
    pub fn pen_down(&mut self) -> Result<(), TransportError> {
        self.set_pen(PenState::Down)
    }

    fn set_pen(&mut self, pen: PenState) -> Result<(), TransportError> {
        self.send(DeviceCommand::pen(pen))?;
        pause(self.params.pen_settle());
        self.pen = pen;
        Ok(())
    }

    /// Move to `angles` and leave the pen in `target_pen`
    ///
    /// Stale input is discarded first. A pen that must come up is lifted
    /// before the move; a pen that must go down is lowered after it. A
    /// missing acknowledgment is logged and counted, never fatal.
    pub fn move_to(
        &mut self,
        target_pen: PenState,
        angles: JointAngles,
    ) -> Result<(), TransportError> {
        if !self.connected {
            return Err(TransportError::NotConnected);
        }

        let stale = self.transport.lock().clear_input()?;
        if !stale.is_empty() {
            debug!(bytes = stale.len(), "discarded stale device output");
        }

        if self.pen.is_down() && !target_pen.is_down() {
            self.set_pen(PenState::Up)?;
        }

        let response = self.send(DeviceCommand::Goto(angles))?;
        pause(self.params.move_settle());

        let acked = match response.as_deref() {
            Some(line) if is_move_ack(line) => true,
            _ => self.wait_for_ack()?,
        };
        if !acked {
            self.missed_responses += 1;
            warn!(%angles, "no move acknowledgment within {:?}", self.params.ack_timeout);
        }
        self.last_angles = angles;

        if !self.pen.is_down() && target_pen.is_down() {
            self.set_pen(PenState::Down)?;
        }
        Ok(())
    }

    /// Pen-up joint move without waiting for an acknowledgment
    pub fn travel_to(&mut self, angles: JointAngles) -> Result<(), TransportError> {
        if self.pen.is_down() {
            self.set_pen(PenState::Up)?;
        }
        self.send(DeviceCommand::Goto(angles))?;
        self.last_angles = angles;
        Ok(())
    }

    fn wait_for_ack(&mut self) -> Result<bool, TransportError> {
        let deadline = Instant::now() + self.params.ack_timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.poll_line(remaining)? {
                Some(line) if is_move_ack(&line) => return Ok(true),
                Some(line) => debug!(response = %line, "device output while waiting for move"),
                None => {}
            }
            if Instant::now() >= deadline {
                return Ok(false);
            }
        }
    }

    fn read_response(&mut self, timeout: Duration) -> Result<Option<String>, TransportError> {
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if let Some(line) = self.poll_line(remaining)? {
                return Ok(Some(line));
            }
            if Instant::now() >= deadline {
                return Ok(None);
            }
        }
    }

    fn poll_line(&mut self, remaining: Duration) -> Result<Option<String>, TransportError> {
        let slice = self.params.ack_poll.max(MIN_POLL_SLICE).min(remaining);
        self.transport.lock().read_line(slice)
    }

    /// Mark the session disconnected and release the transport
    pub fn close(&mut self) -> Result<(), TransportError> {
        if self.connected {
            info!(port = %self.port_name, "disconnecting from arm controller");
        }
        self.connected = false;
        self.transport.lock().close()
    }
}

impl std::fmt::Debug for DeviceSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceSession")
            .field("port_name", &self.port_name)
            .field("connected", &self.connected)
            .field("pen", &self.pen)
            .field("last_angles", &self.last_angles)
            .field("missed_responses", &self.missed_responses)
            .finish()
    }
}
