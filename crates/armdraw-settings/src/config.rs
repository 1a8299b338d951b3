//! Configuration and settings management for armdraw
//!
//! Provides configuration file handling and range validation.
//! Supports JSON and TOML file formats stored in platform-specific directories.
//!
//! Configuration is organized into logical sections:
//! - Arm geometry
//! - Image extraction, path, workspace, and G-code generation
//! - Serial connection
//! - Motion timing and travel smoothing
//!
//! Each component receives a plain parameter struct built from its section.

use crate::error::{ConfigError, ConfigResult, SettingsError, SettingsResult};
use armdraw_camtools::{
    ExtractionParams, GcodeParams, OptimizerParams, PipelineParams, WorkspaceParams,
};
use armdraw_communication::{ConnectionParams, MotionParams};
use armdraw_core::ArmGeometry;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Config file name inside the per-user config directory
const CONFIG_FILE_NAME: &str = "config.toml";

/// Connection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionSettings {
    /// Serial port name
    pub port: String,
    /// Baud rate
    pub baud_rate: u32,
    /// Wait for a command's first response line, in milliseconds
    pub read_timeout_ms: u64,
    /// Wait after opening the port for the board to reset, in milliseconds
    pub settle_ms: u64,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            port: "COM14".to_string(),
            baud_rate: 115200,
            read_timeout_ms: 1000,
            settle_ms: 2000,
        }
    }
}

/// Motion timing settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionSettings {
    /// Pen-up travel longer than this is interpolated
    pub long_move_threshold: f64,
    /// Interpolation sub-steps per long travel
    pub travel_substeps: usize,
    /// Command the device on every Nth sub-step
    pub command_every: usize,
    pub substep_delay_ms: u64,
    pub servo_delay_ms: u64,
    pub motor_delay_ms: u64,
    pub command_delay_ms: u64,
    pub ack_timeout_ms: u64,
    pub homing_settle_ms: u64,
    pub draw_point_delay_ms: u64,
    pub simulation_point_delay_ms: u64,
    pub gcode_line_delay_ms: u64,
}

impl Default for MotionSettings {
    fn default() -> Self {
        Self {
            long_move_threshold: 20.0,
            travel_substeps: 20,
            command_every: 4,
            substep_delay_ms: 50,
            servo_delay_ms: 20,
            motor_delay_ms: 10,
            command_delay_ms: 10,
            ack_timeout_ms: 1000,
            homing_settle_ms: 1000,
            draw_point_delay_ms: 50,
            simulation_point_delay_ms: 50,
            gcode_line_delay_ms: 100,
        }
    }
}

/// Complete application configuration
///
/// Aggregates all settings sections and provides file I/O operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Arm link lengths
    pub arm: ArmGeometry,
    /// Contour extraction
    pub extraction: ExtractionParams,
    /// Path densification
    pub path: OptimizerParams,
    /// Workspace placement
    pub workspace: WorkspaceParams,
    /// G-code generation
    pub gcode: GcodeParams,
    /// Serial connection
    pub connection: ConnectionSettings,
    /// Motion timing
    pub motion: MotionSettings,
}

impl Config {
    /// Create new config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Per-user config file location
    pub fn default_path() -> SettingsResult<PathBuf> {
        dirs::config_dir()
            .map(|dir| dir.join("armdraw").join(CONFIG_FILE_NAME))
            .ok_or_else(|| {
                SettingsError::ConfigDirectory("no config directory on this platform".to_string())
            })
    }

    /// Load `path` if given, else the per-user file if it exists, else defaults
    pub fn load_or_default(path: Option<&Path>) -> SettingsResult<Self> {
        if let Some(path) = path {
            return Self::load_from_file(path);
        }
        match Self::default_path() {
            Ok(path) if path.exists() => Self::load_from_file(&path),
            _ => {
                debug!("using default configuration");
                Ok(Self::default())
            }
        }
    }

    /// Load config from file (JSON or TOML)
    pub fn load_from_file(path: &Path) -> SettingsResult<Self> {
        let format = ConfigFormat::from_path(path)?;
        let content = std::fs::read_to_string(path)?;

        let config: Self = match format {
            ConfigFormat::Json => serde_json::from_str(&content)?,
            ConfigFormat::Toml => toml::from_str(&content)?,
        };

        config.validate()?;
        info!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Save config to file (JSON or TOML), creating parent directories
    pub fn save_to_file(&self, path: &Path) -> SettingsResult<()> {
        self.validate()?;
        let format = ConfigFormat::from_path(path)?;

        let content = match format {
            ConfigFormat::Json => serde_json::to_string_pretty(self)?,
            ConfigFormat::Toml => toml::to_string_pretty(self)?,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        info!(path = %path.display(), "saved configuration");
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> ConfigResult<()> {
        positive("arm.link1", self.arm.link1)?;
        positive("arm.link2", self.arm.link2)?;

        if self.extraction.validate().is_err() {
            return Err(ConfigError::out_of_range(
                "extraction.detail_level",
                self.extraction.detail_level,
            ));
        }

        positive("path.step_size", self.path.step_size)?;
        positive("workspace.extent", self.workspace.extent)?;
        finite("workspace.offset_x", self.workspace.offset_x)?;
        finite("workspace.offset_y", self.workspace.offset_y)?;

        positive("gcode.travel_speed", self.gcode.travel_speed)?;
        positive("gcode.drawing_speed", self.gcode.drawing_speed)?;
        finite("gcode.pen_up_z", self.gcode.pen_up_z)?;
        finite("gcode.pen_down_z", self.gcode.pen_down_z)?;

        if self.connection.baud_rate == 0 {
            return Err(ConfigError::out_of_range("connection.baud_rate", 0));
        }

        positive("motion.long_move_threshold", self.motion.long_move_threshold)?;
        if self.motion.travel_substeps == 0 {
            return Err(ConfigError::out_of_range("motion.travel_substeps", 0));
        }
        if self.motion.command_every == 0 {
            return Err(ConfigError::out_of_range("motion.command_every", 0));
        }

        Ok(())
    }

    /// Parameters for the image pipeline
    pub fn pipeline_params(&self) -> PipelineParams {
        PipelineParams {
            extraction: self.extraction.clone(),
            optimizer: self.path,
            workspace: self.workspace,
            gcode: self.gcode,
        }
    }

    /// Serial connection parameters
    pub fn connection_params(&self) -> ConnectionParams {
        ConnectionParams {
            port: self.connection.port.clone(),
            baud_rate: self.connection.baud_rate,
            settle: Duration::from_millis(self.connection.settle_ms),
        }
    }

    /// Device and sequencer timing parameters
    pub fn motion_params(&self) -> MotionParams {
        let m = &self.motion;
        MotionParams {
            long_move_threshold: m.long_move_threshold,
            travel_substeps: m.travel_substeps,
            command_every: m.command_every,
            substep_delay: Duration::from_millis(m.substep_delay_ms),
            servo_delay: Duration::from_millis(m.servo_delay_ms),
            motor_delay: Duration::from_millis(m.motor_delay_ms),
            command_delay: Duration::from_millis(m.command_delay_ms),
            read_timeout: Duration::from_millis(self.connection.read_timeout_ms),
            ack_timeout: Duration::from_millis(m.ack_timeout_ms),
            homing_settle: Duration::from_millis(m.homing_settle_ms),
            draw_point_delay: Duration::from_millis(m.draw_point_delay_ms),
            simulation_point_delay: Duration::from_millis(m.simulation_point_delay_ms),
            gcode_line_delay: Duration::from_millis(m.gcode_line_delay_ms),
            gcode_lift_line: format!("G0 Z{}", self.gcode.pen_up_z),
            ..MotionParams::default()
        }
    }

    /// Workspace parameters, exposed separately for callers that only map paths
    pub fn workspace_params(&self) -> WorkspaceParams {
        self.workspace
    }

    /// Path optimizer parameters
    pub fn optimizer_params(&self) -> OptimizerParams {
        self.path
    }

    /// G-code emitter parameters
    pub fn gcode_params(&self) -> GcodeParams {
        self.gcode
    }
}

/// On-disk config format, chosen by file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConfigFormat {
    Json,
    Toml,
}

impl ConfigFormat {
    fn from_path(path: &Path) -> ConfigResult<Self> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Ok(ConfigFormat::Json),
            Some("toml") => Ok(ConfigFormat::Toml),
            other => Err(ConfigError::UnsupportedFormat(
                other.unwrap_or("<none>").to_string(),
            )),
        }
    }
}

fn positive(key: &str, value: f64) -> ConfigResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::out_of_range(key, value))
    }
}

fn finite(key: &str, value: f64) -> ConfigResult<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::out_of_range(key, value))
    }
}
