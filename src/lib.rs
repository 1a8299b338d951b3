//! # armdraw
//!
//! Turns raster images into pen drawings on a two-link serial robot arm:
//! - Contour extraction with threshold, Canny, or adaptive binarization
//! - Path closing and densification, workspace mapping, G-code export
//! - Elbow-down inverse kinematics with reachability checks
//! - A single-run motion sequencer driving the arm over a serial line
//!
//! ## Architecture
//!
//! armdraw is organized as a workspace with multiple crates:
//!
//! 1. **armdraw-core** - Data model, kinematics, sequencer states and events, errors
//! 2. **armdraw-camtools** - Image-to-path pipeline and G-code emitter
//! 3. **armdraw-communication** - Serial transport, device session, motion sequencer
//! 4. **armdraw-settings** - Configuration with validation and persistence
//! 5. **armdraw** - Command-line binary that integrates all crates

pub use armdraw_camtools::{
    process_image, ContourExtractor, DrawingStats, ExtractionMethod, ExtractionParams,
    GcodeEmitter, GcodeParams, OptimizerParams, PathOptimizer, PipelineParams, ProcessedDrawing,
    WorkspaceMapper, WorkspaceParams, WorkspaceTransform,
};

pub use armdraw_communication::{
    list_ports, run_motor_test, ConnectionParams, DeviceCommand, DeviceSession, MotionParams,
    MotionSequencer, MotorTestReport, MotorTestTiming, RunHandle, SerialPortInfo, StopControl,
    Transport,
};

pub use armdraw_core::{
    ArmGeometry, ArmPose, DrawingPath, ExtractionError, GcodeProgram, JointAngles, PathItem,
    PenState, Point2D, RobotPath, RobotPoint, RunMode, RunOutcome, RunReport, SequencerError,
    SequencerEvent, SequencerState, TransportError,
};

pub use armdraw_settings::{Config, ConfigError, SettingsError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build date (set at compile time)
pub const BUILD_DATE: &str = env!("BUILD_DATE");

/// Initialize logging with the default configuration
///
/// Sets up structured logging with:
/// - Pretty output on stderr, keeping stdout free for program text
/// - RUST_LOG environment variable support, `info` when unset
/// - Thread names, so sequencer worker lines stand out
pub fn init_logging() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_line_number(true)
        .pretty();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}
