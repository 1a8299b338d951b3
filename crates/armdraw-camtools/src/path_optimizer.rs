//! Path Optimizer
//!
//! Closes every polyline and densifies long edges so consecutive points are
//! never more than twice the step size apart. Geometry is unchanged: only
//! collinear points are added.

use armdraw_core::{DrawingPath, Point2D};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Path optimization parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OptimizerParams {
    /// Target spacing between consecutive points, in the path's units
    pub step_size: f64,
}

impl Default for OptimizerParams {
    fn default() -> Self {
        Self { step_size: 5.0 }
    }
}

/// Closes and densifies drawing paths
#[derive(Debug, Clone, Default)]
pub struct PathOptimizer {
    params: OptimizerParams,
}

impl PathOptimizer {
    /// Create an optimizer with the given parameters
    pub fn new(params: OptimizerParams) -> Self {
        Self { params }
    }

    /// Close each polyline, then interpolate edges longer than `2 × step_size`
    pub fn optimize(&self, path: &DrawingPath) -> DrawingPath {
        let step = self.params.step_size;
        let densify = step.is_finite() && step > 0.0;
        if !densify {
            warn!(step, "step size must be positive, skipping interpolation");
        }

        let optimized = DrawingPath::from_polylines(path.segments().map(|mut polyline| {
            close_polyline(&mut polyline);
            if densify {
                densify_polyline(&polyline, step)
            } else {
                polyline
            }
        }));

        debug!(
            before = path.point_count(),
            after = optimized.point_count(),
            polylines = optimized.segment_count(),
            "optimized path"
        );
        optimized
    }
}

/// Append the first point when a polyline with several points is open
pub fn close_polyline(polyline: &mut Vec<Point2D>) {
    if polyline.len() > 1 && polyline.first() != polyline.last() {
        let first = polyline[0];
        polyline.push(first);
    }
}

/// Insert `floor(d / step) - 1` evenly spaced points into every edge longer than `2 × step`
pub fn densify_polyline(polyline: &[Point2D], step: f64) -> Vec<Point2D> {
    let Some(first) = polyline.first() else {
        return Vec::new();
    };

    let mut out = Vec::with_capacity(polyline.len());
    out.push(*first);
    for pair in polyline.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        let dist = a.distance_to(&b);
        if dist > 2.0 * step {
            let inserts = (dist / step).floor() as usize - 1;
            let divisions = (inserts + 1) as f64;
            out.extend((1..=inserts).map(|j| a.lerp(&b, j as f64 / divisions)));
        }
        out.push(b);
    }
    out
}
