//! Serial port communication implementation
//!
//! Provides low-level serial port operations for direct connection to the
//! arm controller via USB or RS-232.
//!
//! Supports:
//! - Port enumeration and discovery
//! - Line framing over any blocking `Read + Write` stream
//! - Read deadlines independent of the port's own timeout

use super::Transport;
use armdraw_core::TransportError;
use std::io::{self, Read, Write};
use std::time::{Duration, Instant};
use tracing::{debug, error, trace};

/// OS-level read timeout; longer waits are built from repeated reads
const PORT_POLL_TIMEOUT: Duration = Duration::from_millis(10);

/// Pause between reads when the stream reports no data without blocking
const IDLE_BACKOFF: Duration = Duration::from_millis(1);

/// Most bytes one `clear_input` call drains from the stream
const CLEAR_INPUT_BUDGET: usize = 4096;

/// Information about an available serial port
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialPortInfo {
    /// Port name (e.g., "/dev/ttyUSB0", "COM3")
    pub port_name: String,

    /// Port description (e.g., "USB Serial Port")
    pub description: String,

    /// Manufacturer name if available
    pub manufacturer: Option<String>,

    /// USB vendor ID if applicable
    pub vid: Option<u16>,

    /// USB product ID if applicable
    pub pid: Option<u16>,
}

impl SerialPortInfo {
    /// Create a new port info
    pub fn new(port_name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            port_name: port_name.into(),
            description: description.into(),
            manufacturer: None,
            vid: None,
            pid: None,
        }
    }

    /// Set manufacturer
    pub fn with_manufacturer(mut self, manufacturer: impl Into<String>) -> Self {
        self.manufacturer = Some(manufacturer.into());
        self
    }

    /// Set USB IDs
    pub fn with_usb_ids(mut self, vid: u16, pid: u16) -> Self {
        self.vid = Some(vid);
        self.pid = Some(pid);
        self
    }
}

/// List serial ports that look like a microcontroller board
///
/// Filters to:
/// - Windows: COM* (e.g., COM3, COM14)
/// - Linux: /dev/ttyUSB*, /dev/ttyACM*
/// - macOS: /dev/cu.usbserial-*, /dev/cu.usbmodem*
pub fn list_ports() -> Result<Vec<SerialPortInfo>, TransportError> {
    let ports = serialport::available_ports().map_err(|e| {
        error!("Failed to enumerate serial ports: {}", e);
        TransportError::Enumeration {
            reason: e.to_string(),
        }
    })?;

    Ok(ports
        .iter()
        .filter(|port| is_candidate_port(&port.port_name))
        .map(|port| {
            let info = SerialPortInfo::new(&port.port_name, port_description(port));
            match &port.port_type {
                serialport::SerialPortType::UsbPort(usb) => {
                    let info = info.with_usb_ids(usb.vid, usb.pid);
                    match &usb.manufacturer {
                        Some(mfg) => info.with_manufacturer(mfg),
                        None => info,
                    }
                }
                _ => info,
            }
        })
        .collect())
}

/// Check if a port name matches a board's serial device pattern
pub fn is_candidate_port(port_name: &str) -> bool {
    if let Some(number) = port_name.strip_prefix("COM") {
        return !number.is_empty() && number.chars().all(|c| c.is_ascii_digit());
    }

    port_name.starts_with("/dev/ttyUSB")
        || port_name.starts_with("/dev/ttyACM")
        || port_name.starts_with("/dev/cu.usbserial-")
        || port_name.starts_with("/dev/cu.usbmodem")
}

fn port_description(port: &serialport::SerialPortInfo) -> String {
    match &port.port_type {
        serialport::SerialPortType::UsbPort(usb) => format!(
            "USB {} {}",
            usb.manufacturer.as_deref().unwrap_or("Device"),
            usb.product.as_deref().unwrap_or("Serial Port")
        ),
        serialport::SerialPortType::BluetoothPort => "Bluetooth Serial".to_string(),
        serialport::SerialPortType::PciPort => "PCI Serial".to_string(),
        _ => "Serial Port".to_string(),
    }
}

/// Open a serial port as a line transport
pub fn open_serial(
    port: &str,
    baud_rate: u32,
) -> Result<LineTransport<Box<dyn serialport::SerialPort>>, TransportError> {
    let stream = serialport::new(port, baud_rate)
        .timeout(PORT_POLL_TIMEOUT)
        .open()
        .map_err(|e| TransportError::FailedToOpen {
            port: port.to_string(),
            reason: e.to_string(),
        })?;
    debug!(port, baud_rate, "serial port opened");
    Ok(LineTransport::new(stream, port))
}

/// Newline framing over a blocking byte stream
///
/// Bytes that arrive after a complete line stay buffered for the next read.
pub struct LineTransport<S> {
    stream: Option<S>,
    name: String,
    pending: Vec<u8>,
}

impl<S: Read + Write + Send> LineTransport<S> {
    /// Wrap a stream
    pub fn new(stream: S, name: impl Into<String>) -> Self {
        Self {
            stream: Some(stream),
            name: name.into(),
            pending: Vec::new(),
        }
    }

    /// Access the wrapped stream, if still open
    pub fn stream_mut(&mut self) -> Option<&mut S> {
        self.stream.as_mut()
    }

    fn take_line(&mut self) -> Option<String> {
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let raw: Vec<u8> = self.pending.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&raw).trim().to_string();
            if !line.is_empty() {
                return Some(line);
            }
        }
        None
    }
}

impl<S: Read + Write + Send> Transport for LineTransport<S> {
    fn write_line(&mut self, line: &str) -> Result<(), TransportError> {
        let stream = self.stream.as_mut().ok_or(TransportError::Closed)?;
        let mut data = line.as_bytes().to_vec();
        if !line.ends_with('\n') {
            data.push(b'\n');
        }
        stream
            .write_all(&data)
            .and_then(|_| stream.flush())
            .map_err(|e| TransportError::WriteFailed {
                reason: e.to_string(),
            })?;
        trace!(port = %self.name, line = line.trim_end(), "sent");
        Ok(())
    }

    fn read_line(&mut self, timeout: Duration) -> Result<Option<String>, TransportError> {
        let deadline = Instant::now() + timeout;
        let mut buf = [0u8; 256];

        loop {
            if let Some(line) = self.take_line() {
                return Ok(Some(line));
            }

            let stream = self.stream.as_mut().ok_or(TransportError::Closed)?;
            match stream.read(&mut buf) {
                Ok(0) => std::thread::sleep(IDLE_BACKOFF),
                Ok(n) => {
                    self.pending.extend_from_slice(&buf[..n]);
                    continue;
                }
                Err(e) if e.kind() == io::ErrorKind::TimedOut => {}
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    std::thread::sleep(IDLE_BACKOFF)
                }
                Err(e) => {
                    return Err(TransportError::ReadFailed {
                        reason: e.to_string(),
                    })
                }
            }

            if Instant::now() >= deadline {
                return Ok(None);
            }
        }
    }

    fn clear_input(&mut self) -> Result<Vec<u8>, TransportError> {
        let mut discarded = std::mem::take(&mut self.pending);
        let stream = self.stream.as_mut().ok_or(TransportError::Closed)?;
        let mut buf = [0u8; 256];
        let mut drained = 0;
        while drained < CLEAR_INPUT_BUDGET {
            match stream.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => {
                    drained += n;
                    discarded.extend_from_slice(&buf[..n]);
                }
                Err(e)
                    if matches!(
                        e.kind(),
                        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock
                    ) =>
                {
                    break
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    return Err(TransportError::ReadFailed {
                        reason: e.to_string(),
                    })
                }
            }
        }
        Ok(discarded)
    }

    fn name(&self) -> String {
        self.name.clone()
    }

    fn close(&mut self) -> Result<(), TransportError> {
        if self.stream.take().is_some() {
            debug!(port = %self.name, "transport closed");
        }
        self.pending.clear();
        Ok(())
    }
}
