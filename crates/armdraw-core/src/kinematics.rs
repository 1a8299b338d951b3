//! Two-link planar arm kinematics
//!
//! Closed-form inverse kinematics with the elbow-down branch fixed, plus the
//! forward solution used to check results and to place the elbow for
//! visualization.

use crate::data::{JointAngles, Point2D};
use crate::error::KinematicsError;
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Link lengths of a two-link planar arm, in workspace units
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ArmGeometry {
    /// Shoulder-to-elbow length
    pub link1: f64,
    /// Elbow-to-pen length
    pub link2: f64,
}

impl Default for ArmGeometry {
    fn default() -> Self {
        Self {
            link1: 140.0,
            link2: 120.0,
        }
    }
}

/// Elbow and pen-tip positions for a joint configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ArmPose {
    /// Elbow joint position
    pub elbow: Point2D,
    /// Pen tip position
    pub tip: Point2D,
}

impl ArmGeometry {
    /// Create a new geometry
    pub const fn new(link1: f64, link2: f64) -> Self {
        Self { link1, link2 }
    }

    /// Inner and outer radius of the reachable annulus
    pub fn reach(&self) -> (f64, f64) {
        ((self.link1 - self.link2).abs(), self.link1 + self.link2)
    }

    /// Solve joint angles for a workspace target.
    ///
    /// Returns [`KinematicsError::Unreachable`] when `|d| > 1`. The boundary
    /// `|d| == 1` (fully stretched or fully folded) is accepted.
    pub fn inverse(&self, x: f64, y: f64) -> Result<JointAngles, KinematicsError> {
        let (l1, l2) = (self.link1, self.link2);
        let d = (x * x + y * y - l1 * l1 - l2 * l2) / (2.0 * l1 * l2);
        if !d.is_finite() || d.abs() > 1.0 {
            trace!(x, y, d, "target outside reach");
            return Err(KinematicsError::Unreachable { x, y });
        }

        // Elbow-down: theta2 is never positive.
        let theta2 = -d.acos();
        let theta1 = y.atan2(x) - (l2 * theta2.sin()).atan2(l1 + l2 * theta2.cos());

        Ok(JointAngles::new(theta1.to_degrees(), theta2.to_degrees()))
    }

    /// Convenience wrapper over [`ArmGeometry::inverse`] for a point
    pub fn inverse_point(&self, target: &Point2D) -> Result<JointAngles, KinematicsError> {
        self.inverse(target.x, target.y)
    }

    /// Elbow and tip positions for the given angles (degrees)
    pub fn forward(&self, angles: &JointAngles) -> ArmPose {
        let t1 = angles.theta1.to_radians();
        let t12 = t1 + angles.theta2.to_radians();
        let elbow = Point2D::new(self.link1 * t1.cos(), self.link1 * t1.sin());
        let tip = Point2D::new(
            elbow.x + self.link2 * t12.cos(),
            elbow.y + self.link2 * t12.sin(),
        );
        ArmPose { elbow, tip }
    }

    /// True when `inverse` would return a solution
    pub fn is_reachable(&self, x: f64, y: f64) -> bool {
        self.inverse(x, y).is_ok()
    }
}
