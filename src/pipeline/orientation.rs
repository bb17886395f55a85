use crate::diagnostics::{DiagnosticSink, Stage};
use crate::error::Result;
use crate::pipeline::types::{LineSegment, Orientation, Quadrant};
use crate::pipeline::PipelineStage;

/// Angles are snapped to 1e-9 degrees so integer diagonals hit 45/135 exactly
const ANGLE_SNAP: f64 = 1e9;

/// Turns the notch chord into the rotation that normalises it
#[derive(Debug, Default, Clone, Copy)]
pub struct OrientationCalculator;

impl OrientationCalculator {
    /// Correction angle in degrees, before the rotation-direction convention is applied.
    ///
    /// `θ' = 45` takes the side branch and `θ' = 135` the top/bottom branch.
    pub fn orient(segment: &LineSegment) -> Orientation {
        let raw_degrees = (segment.dy() as f64).atan2(segment.dx() as f64).to_degrees();
        let normalized = (((raw_degrees + 360.0) % 360.0) * ANGLE_SNAP).round() / ANGLE_SNAP;
        // 359.9999999999 can round up to 360
        let normalized_degrees = if normalized >= 360.0 { normalized - 360.0 } else { normalized };

        let deviation = 90.0 - normalized_degrees;
        let (quadrant, correction_degrees) = if normalized_degrees > 45.0 && normalized_degrees <= 135.0 {
            (Quadrant::TopBottom, deviation - 90.0)
        } else {
            (Quadrant::Side, deviation + 90.0)
        };

        Orientation {
            raw_degrees,
            normalized_degrees,
            quadrant,
            correction_degrees,
        }
    }
}

impl PipelineStage for OrientationCalculator {
    type Input<'a> = &'a LineSegment;
    type Output = Orientation;

    fn execute(&self, segment: &LineSegment, sink: &mut dyn DiagnosticSink) -> Result<Orientation> {
        let orientation = Self::orient(segment);
        sink.emit(
            Stage::Orientation,
            &format!(
                "Original angle: {:.3}, Adjusted rotation angle: {:.3} ({:?})",
                orientation.normalized_degrees, orientation.correction_degrees, orientation.quadrant
            ),
        );
        Ok(orientation)
    }

    fn stage(&self) -> Stage {
        Stage::Orientation
    }
}
