//! Image-to-program pipeline
//!
//! Runs extraction, optimization, workspace mapping, and G-code emission in
//! one call. Every artifact is regenerated from scratch on each call.

use crate::contour_extractor::{ContourExtractor, ExtractionParams};
use crate::gcode_emitter::{GcodeEmitter, GcodeParams};
use crate::path_optimizer::{OptimizerParams, PathOptimizer};
use crate::workspace_mapper::{WorkspaceMapper, WorkspaceParams};
use armdraw_core::{DrawingPath, ExtractionError, GcodeProgram, RobotPath};
use image::GrayImage;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Parameters for every pipeline stage
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineParams {
    /// Contour extraction
    pub extraction: ExtractionParams,
    /// Path optimization
    pub optimizer: OptimizerParams,
    /// Workspace placement
    pub workspace: WorkspaceParams,
    /// G-code generation
    pub gcode: GcodeParams,
}

/// Every artifact produced from one image
#[derive(Debug, Clone)]
pub struct ProcessedDrawing {
    /// Source image
    pub source: GrayImage,
    /// Binary mask the contours came from
    pub binary: GrayImage,
    /// Threshold that produced the path
    pub threshold_used: u8,
    /// Extracted path in pixel space
    pub drawing_path: DrawingPath,
    /// Closed and densified path in pixel space
    pub optimized_path: DrawingPath,
    /// Pen-annotated path in workspace units
    pub robot_path: RobotPath,
    /// Exportable program
    pub gcode: GcodeProgram,
}

/// Summary counts for display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrawingStats {
    /// Polylines in the drawing
    pub polylines: usize,
    /// Points in the robot path
    pub robot_points: usize,
    /// Robot path points drawn with the pen down
    pub pen_down_points: usize,
    /// Lines in the G-code program
    pub gcode_lines: usize,
}

impl ProcessedDrawing {
    /// Counts describing the processed drawing
    pub fn stats(&self) -> DrawingStats {
        DrawingStats {
            polylines: self.optimized_path.segment_count(),
            robot_points: self.robot_path.len(),
            pen_down_points: self.robot_path.iter().filter(|p| p.pen.is_down()).count(),
            gcode_lines: self.gcode.len(),
        }
    }
}

/// Run the full pipeline on a grayscale image
pub fn process_image(
    gray: &GrayImage,
    params: &PipelineParams,
) -> Result<ProcessedDrawing, ExtractionError> {
    let extraction = ContourExtractor::new(params.extraction.clone()).extract(gray)?;
    let optimized_path = PathOptimizer::new(params.optimizer).optimize(&extraction.path);

    let (width, height) = gray.dimensions();
    let robot_path =
        WorkspaceMapper::for_image(width, height, &params.workspace).map(&optimized_path);
    let gcode = GcodeEmitter::new(params.gcode).emit(&robot_path);

    let processed = ProcessedDrawing {
        source: extraction.source,
        binary: extraction.binary,
        threshold_used: extraction.threshold_used,
        drawing_path: extraction.path,
        optimized_path,
        robot_path,
        gcode,
    };

    let stats = processed.stats();
    info!(
        polylines = stats.polylines,
        robot_points = stats.robot_points,
        pen_down = stats.pen_down_points,
        gcode_lines = stats.gcode_lines,
        "processed image"
    );
    Ok(processed)
}
