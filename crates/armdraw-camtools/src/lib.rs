//! # armdraw CAM tools
//!
//! Turns raster images into drawing programs for a two-link pen arm.
//!
//! ## Stages
//!
//! - **Contour Extractor**: blur, sharpen, binarize, trace, and simplify image regions
//! - **Path Optimizer**: close polylines and densify long edges
//! - **Workspace Mapper**: scale pixels into arm coordinates and bracket pen moves
//! - **G-code Emitter**: export the robot path as millimetre G-code
//!
//! [`pipeline::process_image`] runs all four in order.

pub mod contour_extractor;
pub mod gcode_emitter;
pub mod path_optimizer;
pub mod pipeline;
pub mod simplify;
pub mod workspace_mapper;

// Re-export commonly used items
pub use contour_extractor::{ContourExtractor, Extraction, ExtractionMethod, ExtractionParams};
pub use gcode_emitter::{GcodeEmitter, GcodeParams};
pub use path_optimizer::{OptimizerParams, PathOptimizer};
pub use pipeline::{process_image, DrawingStats, PipelineParams, ProcessedDrawing};
pub use workspace_mapper::{WorkspaceMapper, WorkspaceParams, WorkspaceTransform};
