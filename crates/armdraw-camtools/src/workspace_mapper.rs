//! Workspace Mapper
//!
//! Converts pixel-space drawing paths into pen-annotated workspace paths.
//! Every polyline becomes `UP(first), DOWN(first), DOWN(rest)…, UP(last)`,
//! so the pen never touches the surface while repositioning.

use armdraw_core::{DrawingPath, PenState, Point2D, RobotPath, RobotPoint};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Fraction of the workspace extent the image's longer side fills
pub const FILL_RATIO: f64 = 0.8;

/// Workspace placement parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceParams {
    /// Side length of the square drawing area, in workspace units
    pub extent: f64,
    /// Workspace X of the image centre
    pub offset_x: f64,
    /// Workspace Y of the image centre
    pub offset_y: f64,
}

impl Default for WorkspaceParams {
    fn default() -> Self {
        Self {
            extent: 300.0,
            offset_x: 150.0,
            offset_y: 100.0,
        }
    }
}

/// Affine pixel-to-workspace transform
///
/// `x' = (x - center_x) * scale + offset_x`, and
/// `y' = ±(y - center_y) * scale + offset_y` with the sign negated when
/// `flip_y` is set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceTransform {
    /// Workspace units per pixel
    pub scale: f64,
    /// Pixel X mapped onto `offset_x`
    pub center_x: f64,
    /// Pixel Y mapped onto `offset_y`
    pub center_y: f64,
    /// Workspace X of the centre
    pub offset_x: f64,
    /// Workspace Y of the centre
    pub offset_y: f64,
    /// Image rows grow downward, workspace Y grows upward
    pub flip_y: bool,
}

impl WorkspaceTransform {
    /// Transform fitting a `width × height` image into the workspace with a 20% margin
    pub fn for_image(width: u32, height: u32, params: &WorkspaceParams) -> Self {
        let longest = f64::from(width.max(height).max(1));
        Self {
            scale: params.extent / longest * FILL_RATIO,
            center_x: f64::from(width) / 2.0,
            center_y: f64::from(height) / 2.0,
            offset_x: params.offset_x,
            offset_y: params.offset_y,
            flip_y: true,
        }
    }

    /// Plain scale and translation, no centring and no flip
    pub fn uniform(scale: f64, offset_x: f64, offset_y: f64) -> Self {
        Self {
            scale,
            center_x: 0.0,
            center_y: 0.0,
            offset_x,
            offset_y,
            flip_y: false,
        }
    }

    /// Map one pixel-space point
    pub fn apply(&self, p: &Point2D) -> Point2D {
        let dy = if self.flip_y {
            self.center_y - p.y
        } else {
            p.y - self.center_y
        };
        Point2D::new(
            (p.x - self.center_x) * self.scale + self.offset_x,
            dy * self.scale + self.offset_y,
        )
    }
}

/// Maps drawing paths into robot paths
#[derive(Debug, Clone, Copy)]
pub struct WorkspaceMapper {
    transform: WorkspaceTransform,
}

impl WorkspaceMapper {
    /// Mapper using an explicit transform
    pub fn new(transform: WorkspaceTransform) -> Self {
        Self { transform }
    }

    /// Mapper fitting an image of the given size
    pub fn for_image(width: u32, height: u32, params: &WorkspaceParams) -> Self {
        Self::new(WorkspaceTransform::for_image(width, height, params))
    }

    /// The transform in use
    pub fn transform(&self) -> &WorkspaceTransform {
        &self.transform
    }

    /// Map every polyline and bracket it with pen transitions
    pub fn map(&self, path: &DrawingPath) -> RobotPath {
        let mut robot_path =
            RobotPath::with_capacity(path.point_count() + 3 * path.segment_count());
        for segment in path.segments() {
            let mapped: Vec<Point2D> = segment.iter().map(|p| self.transform.apply(p)).collect();
            bracket_segment(&mapped, &mut robot_path);
        }
        debug!(
            points = robot_path.len(),
            scale = self.transform.scale,
            "mapped path to workspace"
        );
        robot_path
    }
}

fn bracket_segment(segment: &[Point2D], out: &mut RobotPath) {
    let (Some(first), Some(last)) = (segment.first(), segment.last()) else {
        return;
    };
    out.push(RobotPoint::new(first.x, first.y, PenState::Up));
    out.push(RobotPoint::new(first.x, first.y, PenState::Down));
    out.extend(
        segment[1..]
            .iter()
            .map(|p| RobotPoint::new(p.x, p.y, PenState::Down)),
    );
    out.push(RobotPoint::new(last.x, last.y, PenState::Up));
}
