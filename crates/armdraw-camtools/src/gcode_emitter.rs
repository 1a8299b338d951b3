//! G-code Emitter
//!
//! Translates a robot path into millimetre, absolute-coordinate G-code.
//! Pen changes become Z moves paired with a feed-rate directive; XY moves
//! are rapid (`G0`) with the pen up and linear (`G1`) with the pen down.
//! Output depends only on the path and parameters, so repeated calls are
//! byte-identical.

use armdraw_core::{GcodeProgram, PenState, RobotPoint};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Z height used by the fixed preamble and postamble
const SAFE_Z: f64 = 5.0;

/// G-code generation parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GcodeParams {
    /// Feed rate for pen-up travel (mm/min)
    pub travel_speed: f64,
    /// Feed rate for pen-down drawing (mm/min)
    pub drawing_speed: f64,
    /// Z height with the pen lifted
    pub pen_up_z: f64,
    /// Z height with the pen on the surface
    pub pen_down_z: f64,
}

impl Default for GcodeParams {
    fn default() -> Self {
        Self {
            travel_speed: 3000.0,
            drawing_speed: 4000.0,
            pen_up_z: 5.0,
            pen_down_z: 0.0,
        }
    }
}

/// Robot path to G-code translator
#[derive(Debug, Clone, Default)]
pub struct GcodeEmitter {
    params: GcodeParams,
}

impl GcodeEmitter {
    /// Create an emitter with the given parameters
    pub fn new(params: GcodeParams) -> Self {
        Self { params }
    }

    /// Current parameters
    pub fn params(&self) -> &GcodeParams {
        &self.params
    }

    /// Generate the full program for `path`
    pub fn emit(&self, path: &[RobotPoint]) -> GcodeProgram {
        let mut program = GcodeProgram::new();

        program.push("; Generated G-code for drawing");
        program.push("; Created by armdraw");
        program.push("G21 ; Set units to millimeters");
        program.push("G90 ; Use absolute coordinates");
        program.push("G92 X0 Y0 Z0 ; Reset position");
        program.push(format!("G0 Z{} ; Lift pen to safe height", fmt_num(SAFE_Z)));
        program.push("G0 X0 Y0 ; Move to home position");

        let mut prev_pen = PenState::Up;
        for point in path {
            if point.pen != prev_pen {
                self.push_pen_change(&mut program, point.pen);
                prev_pen = point.pen;
            }
            let motion = match point.pen {
                PenState::Down => "G1",
                PenState::Up => "G0",
            };
            program.push(format!("{} X{:.2} Y{:.2}", motion, point.x, point.y));
        }

        program.push(format!("G0 Z{} ; Lift pen to safe height", fmt_num(SAFE_Z)));
        program.push("G0 X0 Y0 ; Return to home position");

        debug!(points = path.len(), lines = program.len(), "generated G-code");
        program
    }

    fn push_pen_change(&self, program: &mut GcodeProgram, pen: PenState) {
        match pen {
            PenState::Down => {
                program.push(format!("G0 Z{} ; Lower pen", fmt_num(self.params.pen_down_z)));
                program.push(format!(
                    "G1 F{} ; Set drawing speed",
                    fmt_num(self.params.drawing_speed)
                ));
            }
            PenState::Up => {
                program.push(format!("G0 Z{} ; Lift pen", fmt_num(self.params.pen_up_z)));
                program.push(format!(
                    "G0 F{} ; Set travel speed",
                    fmt_num(self.params.travel_speed)
                ));
            }
        }
    }
}

/// Integers print without a fractional part, everything else with two decimals
fn fmt_num(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{:.2}", value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use PenState::{Down, Up};

    #[test]
    fn test_empty_path_has_preamble_and_postamble() {
        let program = GcodeEmitter::default().emit(&[]);
        assert_eq!(
            program.lines(),
            &[
                "; Generated G-code for drawing",
                "; Created by armdraw",
                "G21 ; Set units to millimeters",
                "G90 ; Use absolute coordinates",
                "G92 X0 Y0 Z0 ; Reset position",
                "G0 Z5 ; Lift pen to safe height",
                "G0 X0 Y0 ; Move to home position",
                "G0 Z5 ; Lift pen to safe height",
                "G0 X0 Y0 ; Return to home position",
            ]
        );
    }

    #[test]
    fn test_pen_changes_bracket_moves() {
        let path = vec![
            RobotPoint::new(1.0, 2.0, Up),
            RobotPoint::new(1.0, 2.0, Down),
            RobotPoint::new(3.456, -4.0, Down),
            RobotPoint::new(3.456, -4.0, Up),
        ];
        let program = GcodeEmitter::default().emit(&path);
        let body = &program.lines()[7..program.len() - 2];
        assert_eq!(
            body,
            &[
                "G0 X1.00 Y2.00",
                "G0 Z0 ; Lower pen",
                "G1 F4000 ; Set drawing speed",
                "G1 X1.00 Y2.00",
                "G1 X3.46 Y-4.00",
                "G0 Z5 ; Lift pen",
                "G0 F3000 ; Set travel speed",
                "G0 X3.46 Y-4.00",
            ]
        );
    }

    #[test]
    fn test_fractional_parameters() {
        let emitter = GcodeEmitter::new(GcodeParams {
            pen_down_z: -0.5,
            ..Default::default()
        });
        let program = emitter.emit(&[RobotPoint::new(0.0, 0.0, Down)]);
        assert!(program.lines().iter().any(|l| l == "G0 Z-0.50 ; Lower pen"));
    }

    #[test]
    fn test_deterministic() {
        let path = vec![
            RobotPoint::new(10.0, 10.0, Up),
            RobotPoint::new(10.0, 10.0, Down),
            RobotPoint::new(20.0, 10.0, Down),
            RobotPoint::new(20.0, 10.0, Up),
        ];
        let emitter = GcodeEmitter::default();
        assert_eq!(emitter.emit(&path).to_string(), emitter.emit(&path).to_string());
    }
}
