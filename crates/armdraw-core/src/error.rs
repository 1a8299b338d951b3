//! Error handling for armdraw
//!
//! Provides the error taxonomy shared by every layer:
//! - Extraction errors (no usable contours in an image)
//! - Kinematics errors (target outside the arm's reach, always recoverable)
//! - Transport errors (serial open/write/read failures, fatal to a run)
//! - Sequencer errors (run lifecycle violations)
//!
//! All error types use `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Image vectorization error type
///
/// Raised by the contour extractor when an image cannot be turned into a
/// drawing path. These errors block any path generation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExtractionError {
    /// No polyline survived filtering, even after lowering the threshold
    #[error("No drawable contours found (method {method}, threshold {threshold}); adjust the threshold or method")]
    NoContours {
        /// The extraction method that was used last.
        method: String,
        /// The threshold in effect when extraction gave up.
        threshold: u8,
    },

    /// Unknown extraction method name
    #[error("Unknown extraction method: {name}")]
    UnknownMethod {
        /// The rejected method name.
        name: String,
    },

    /// The source image has no pixels
    #[error("Image is empty ({width}x{height})")]
    EmptyImage {
        /// Image width in pixels.
        width: u32,
        /// Image height in pixels.
        height: u32,
    },

    /// A parameter was outside its valid range
    #[error("Invalid extraction parameter '{name}': {reason}")]
    InvalidParameter {
        /// The parameter name.
        name: String,
        /// Why the value was rejected.
        reason: String,
    },
}

/// Kinematics error type
///
/// An unreachable target is an expected outcome, not a fault: callers skip
/// the point and continue.
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum KinematicsError {
    /// Target lies outside the annulus the arm can reach
    #[error("Point ({x:.2}, {y:.2}) is outside the arm's reach")]
    Unreachable {
        /// Target X in workspace units.
        x: f64,
        /// Target Y in workspace units.
        y: f64,
    },
}

/// Transport error type
///
/// Represents failures of the byte stream to the device. Any transport
/// error during a run aborts the run.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransportError {
    /// Failed to open port
    #[error("Failed to open port {port}: {reason}")]
    FailedToOpen {
        /// The name of the port that failed to open.
        port: String,
        /// The reason the port failed to open.
        reason: String,
    },

    /// Write failed
    #[error("Write failed: {reason}")]
    WriteFailed {
        /// The reason for the write failure.
        reason: String,
    },

    /// Read failed
    #[error("Read failed: {reason}")]
    ReadFailed {
        /// The reason for the read failure.
        reason: String,
    },

    /// Transport was already closed
    #[error("Transport is closed")]
    Closed,

    /// Device is not connected
    #[error("Device not connected")]
    NotConnected,

    /// Failed to enumerate ports
    #[error("Failed to enumerate ports: {reason}")]
    Enumeration {
        /// The reason enumeration failed.
        reason: String,
    },
}

/// Sequencer error type
///
/// Represents violations of the single-run state machine.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SequencerError {
    /// A run is already active
    #[error("A drawing run is already in progress")]
    AlreadyRunning,

    /// Nothing to draw
    #[error("Robot path is empty; process an image first")]
    EmptyPath,

    /// Nothing to stream
    #[error("G-code program has no executable lines")]
    EmptyProgram,

    /// Device run requested without an open session
    #[error("Device not connected; connect before drawing")]
    NotConnected,

    /// Invalid state transition
    #[error("Invalid state transition from {current} to {requested}")]
    InvalidStateTransition {
        /// The current state name.
        current: String,
        /// The requested state name.
        requested: String,
    },

    /// The worker thread could not be started or joined
    #[error("Worker thread error: {reason}")]
    Worker {
        /// The reason for the worker failure.
        reason: String,
    },
}
