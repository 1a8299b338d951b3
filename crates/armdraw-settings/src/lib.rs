//! armdraw Settings Crate
//!
//! Handles application configuration, validation, and persistence.

pub mod config;
pub mod error;

pub use config::{Config, ConnectionSettings, MotionSettings};
pub use error::{ConfigError, ConfigResult, SettingsError, SettingsResult};
