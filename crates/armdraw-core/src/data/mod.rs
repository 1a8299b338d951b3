//! Data models for drawing paths, robot motion, and generated programs
//!
//! This module provides:
//! - 2-D points in pixel or workspace space
//! - Marker-delimited drawing paths produced by vectorization
//! - Pen-annotated robot paths consumed by the emitter and sequencer
//! - Joint angle pairs
//! - Generated G-code programs

pub mod state;

use serde::{Deserialize, Serialize};
use std::fmt;

/// A 2-D coordinate
///
/// Whether the point lives in pixel space or workspace space depends on the
/// stage that produced it. Conversion happens only through the workspace
/// mapper.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point2D {
    /// X coordinate
    pub x: f64,
    /// Y coordinate
    pub y: f64,
}

impl Point2D {
    /// Create a new point
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point
    pub fn distance_to(&self, other: &Point2D) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }

    /// Linear interpolation towards `other`; `t = 0` yields `self`, `t = 1` yields `other`
    pub fn lerp(&self, other: &Point2D, t: f64) -> Point2D {
        Point2D {
            x: self.x + (other.x - self.x) * t,
            y: self.y + (other.y - self.y) * t,
        }
    }
}

impl From<(f64, f64)> for Point2D {
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for Point2D {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.2}, {:.2})", self.x, self.y)
    }
}

/// Pen contact state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PenState {
    /// Lifted off the surface
    #[default]
    Up,
    /// In contact with the surface
    Down,
}

impl PenState {
    /// True when the pen touches the surface
    pub fn is_down(&self) -> bool {
        matches!(self, PenState::Down)
    }
}

impl fmt::Display for PenState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PenState::Up => write!(f, "UP"),
            PenState::Down => write!(f, "DOWN"),
        }
    }
}

/// One element of a raw drawing path
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PathItem {
    /// A point on the current polyline
    Point(Point2D),
    /// Boundary between two polylines
    Marker,
}

impl PathItem {
    /// Returns the point, or `None` for a marker
    pub fn point(&self) -> Option<Point2D> {
        match self {
            PathItem::Point(p) => Some(*p),
            PathItem::Marker => None,
        }
    }

    /// True for the polyline boundary marker
    pub fn is_marker(&self) -> bool {
        matches!(self, PathItem::Marker)
    }
}

/// Ordered sequence of points and polyline markers
///
/// Built only through [`DrawingPath::from_polylines`] or [`DrawingPath::push_polyline`],
/// which guarantee a marker never leads the path, never trails it, and never
/// repeats.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DrawingPath {
    items: Vec<PathItem>,
}

impl DrawingPath {
    /// Create an empty path
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a path from polylines, skipping empty ones
    pub fn from_polylines<I, P>(polylines: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: IntoIterator<Item = Point2D>,
    {
        let mut path = Self::new();
        for polyline in polylines {
            path.push_polyline(polyline);
        }
        path
    }

    /// Append a polyline, inserting a marker if the path already holds points
    pub fn push_polyline<P: IntoIterator<Item = Point2D>>(&mut self, polyline: P) {
        let mut points = polyline.into_iter().peekable();
        if points.peek().is_none() {
            return;
        }
        if !self.items.is_empty() {
            self.items.push(PathItem::Marker);
        }
        self.items.extend(points.map(PathItem::Point));
    }

    /// Raw items in draw order
    pub fn items(&self) -> &[PathItem] {
        &self.items
    }

    /// Iterate over the marker-delimited polylines
    pub fn segments(&self) -> impl Iterator<Item = Vec<Point2D>> + '_ {
        self.items
            .split(|item| item.is_marker())
            .map(|chunk| chunk.iter().filter_map(PathItem::point).collect::<Vec<_>>())
            .filter(|segment| !segment.is_empty())
    }

    /// Number of polylines
    pub fn segment_count(&self) -> usize {
        self.segments().count()
    }

    /// Number of points, markers excluded
    pub fn point_count(&self) -> usize {
        self.items.iter().filter(|item| !item.is_marker()).count()
    }

    /// Total number of items, markers included
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// True when the path has no items
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// A workspace point annotated with the pen state to hold while reaching it
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RobotPoint {
    /// X in workspace units
    pub x: f64,
    /// Y in workspace units
    pub y: f64,
    /// Pen state at this point
    pub pen: PenState,
}

impl RobotPoint {
    /// Create a new robot point
    pub const fn new(x: f64, y: f64, pen: PenState) -> Self {
        Self { x, y, pen }
    }

    /// Position without the pen state
    pub fn position(&self) -> Point2D {
        Point2D::new(self.x, self.y)
    }
}

/// Canonical motion artifact consumed by the emitter and the sequencer
pub type RobotPath = Vec<RobotPoint>;

/// Joint angle pair in degrees
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct JointAngles {
    /// Shoulder angle in degrees
    pub theta1: f64,
    /// Elbow angle in degrees
    pub theta2: f64,
}

impl JointAngles {
    /// Create a new angle pair
    pub const fn new(theta1: f64, theta2: f64) -> Self {
        Self { theta1, theta2 }
    }

    /// Linear interpolation of both joints
    pub fn lerp(&self, other: &JointAngles, t: f64) -> JointAngles {
        JointAngles {
            theta1: self.theta1 + (other.theta1 - self.theta1) * t,
            theta2: self.theta2 + (other.theta2 - self.theta2) * t,
        }
    }
}

impl fmt::Display for JointAngles {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "θ1={:.2}° θ2={:.2}°", self.theta1, self.theta2)
    }
}

/// Ordered G-code text lines
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GcodeProgram {
    lines: Vec<String>,
}

impl GcodeProgram {
    /// Create an empty program
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse program text into lines, trimming trailing carriage returns
    pub fn from_text(text: &str) -> Self {
        Self {
            lines: text
                .lines()
                .map(|line| line.trim_end_matches('\r').to_string())
                .collect(),
        }
    }

    /// Append one line
    pub fn push(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }

    /// All lines, comments included
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Lines a receiver should execute: blank lines and `;` comments are skipped
    pub fn executable_lines(&self) -> impl Iterator<Item = &str> + '_ {
        self.lines
            .iter()
            .map(|line| line.trim())
            .filter(|line| !line.is_empty() && !line.starts_with(';'))
    }

    /// Number of lines
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// True when the program has no lines
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

impl fmt::Display for GcodeProgram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in &self.lines {
            writeln!(f, "{}", line)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pts(coords: &[(f64, f64)]) -> Vec<Point2D> {
        coords.iter().copied().map(Point2D::from).collect()
    }

    #[test]
    fn test_drawing_path_markers_between_polylines() {
        let path = DrawingPath::from_polylines(vec![
            pts(&[(0.0, 0.0), (1.0, 0.0)]),
            Vec::new(),
            pts(&[(5.0, 5.0)]),
        ]);

        assert_eq!(path.len(), 4);
        assert!(!path.items()[0].is_marker());
        assert!(path.items()[2].is_marker());
        assert!(!path.items().last().is_some_and(|i| i.is_marker()));
        assert_eq!(path.segment_count(), 2);
        assert_eq!(path.point_count(), 3);
    }

    #[test]
    fn test_segments_roundtrip() {
        let square = pts(&[(0.0, 0.0), (10.0, 0.0), (10.0, 10.0)]);
        let path = DrawingPath::from_polylines(vec![square.clone(), square.clone()]);
        let segments: Vec<_> = path.segments().collect();
        assert_eq!(segments, vec![square.clone(), square]);
    }

    #[test]
    fn test_point_helpers() {
        let a = Point2D::new(0.0, 0.0);
        let b = Point2D::new(3.0, 4.0);
        assert_eq!(a.distance_to(&b), 5.0);
        assert_eq!(a.lerp(&b, 0.5), Point2D::new(1.5, 2.0));
    }

    #[test]
    fn test_gcode_program_executable_lines() {
        let program = GcodeProgram::from_text("; header\r\nG21\n\n  ; indented\nG0 X1.00 Y2.00\n");
        let exec: Vec<_> = program.executable_lines().collect();
        assert_eq!(exec, vec!["G21", "G0 X1.00 Y2.00"]);
        assert_eq!(program.len(), 5);
        assert!(program.to_string().starts_with("; header\nG21\n"));
    }

    #[test]
    fn test_robot_point_serializes() {
        let point = RobotPoint::new(1.5, -2.0, PenState::Down);
        let json = serde_json::to_string(&point).unwrap();
        assert_eq!(json, r#"{"x":1.5,"y":-2.0,"pen":"Down"}"#);
        let back: RobotPoint = serde_json::from_str(&json).unwrap();
        assert_eq!(back, point);
    }

    #[test]
    fn test_pen_state_display() {
        assert_eq!(PenState::Up.to_string(), "UP");
        assert_eq!(PenState::Down.to_string(), "DOWN");
        assert_eq!(PenState::default(), PenState::Up);
    }
}
