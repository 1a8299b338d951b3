//! Line-oriented transport to the arm controller
//!
//! - [`Transport`]: the contract the device session depends on
//! - [`serial`]: serial port discovery and a byte-stream implementation

pub mod serial;

use armdraw_core::{thread_safe, ThreadSafe, TransportError};
use std::time::Duration;

pub use serial::{list_ports, open_serial, LineTransport, SerialPortInfo};

/// Request/response byte stream carrying newline-terminated ASCII lines
pub trait Transport: Send {
    /// Write one line, appending `\n` when absent
    fn write_line(&mut self, line: &str) -> Result<(), TransportError>;

    /// Read one non-blank line, trimmed.
    ///
    /// Returns `Ok(None)` when nothing arrives within `timeout`.
    fn read_line(&mut self, timeout: Duration) -> Result<Option<String>, TransportError>;

    /// Discard buffered input, returning the discarded bytes
    ///
    /// Reads a bounded amount from the stream per call.
    fn clear_input(&mut self) -> Result<Vec<u8>, TransportError>;

    /// Human-readable endpoint name
    fn name(&self) -> String;

    /// Release the underlying stream; later calls fail with [`TransportError::Closed`]
    fn close(&mut self) -> Result<(), TransportError>;
}

/// Transport shared between a run's worker and the emergency-stop path
pub type SharedTransport = ThreadSafe<Box<dyn Transport>>;

/// Box and share a transport
pub fn shared_transport<T: Transport + 'static>(transport: T) -> SharedTransport {
    thread_safe(Box::new(transport))
}
