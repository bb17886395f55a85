use crate::config::{BoundaryConfig, CircleSelection};
use crate::diagnostics::{DiagnosticSink, Stage};
use crate::error::{AlignError, Result};
use crate::pipeline::types::{BoundaryEstimate, Circle, Point2};
use crate::pipeline::PipelineStage;
use opencv::core::{Mat, Vec3f, Vector};
use opencv::imgproc;
use opencv::prelude::*;

/// Finds the wafer's enclosing circle with a gradient circular Hough search
pub struct BoundaryDetector {
    config: BoundaryConfig,
}

impl Default for BoundaryDetector {
    fn default() -> Self {
        Self::new(BoundaryConfig::default())
    }
}

impl BoundaryDetector {
    pub fn new(config: BoundaryConfig) -> Self {
        Self { config }
    }

    /// Whole pixels, like an integer division of the row count, never below one
    pub fn min_center_distance(&self, rows: i32) -> f64 {
        (rows as f64 / self.config.min_dist_divisor).trunc().max(1.0)
    }

    /// All candidates in the order the search reports them
    pub fn find_candidates(&self, intensity: &Mat) -> Result<Vec<Circle>> {
        if intensity.empty() || intensity.channels() != 1 {
            return Err(AlignError::InvalidInput(
                "boundary search needs a non-empty single-channel intensity map".to_string(),
            ));
        }

        let min_dist = self.min_center_distance(intensity.rows());
        let mut circles = Vector::<Vec3f>::new();
        imgproc::hough_circles(
            intensity,
            &mut circles,
            imgproc::HOUGH_GRADIENT,
            self.config.dp,
            min_dist,
            self.config.canny_high_threshold,
            self.config.accumulator_threshold,
            self.config.min_radius,
            self.config.max_radius,
        )
        .map_err(AlignError::detection(Stage::BoundaryDetection))?;

        // Circles with a non-positive radius carry no boundary information
        Ok(circles
            .iter()
            .filter_map(|c| Circle::new(Point2::new(c[0], c[1]), c[2]).ok())
            .collect())
    }

    /// Apply the configured selection policy
    pub fn select(&self, candidates: &[Circle], image_size: (i32, i32)) -> Option<Circle> {
        match self.config.selection {
            CircleSelection::First => candidates.first().copied(),
            CircleSelection::LargestRadius => candidates.iter().copied().fold(None, |best, c| match best {
                Some(b) if b.radius >= c.radius => Some(b),
                _ => Some(c),
            }),
            CircleSelection::ClosestToCenter => {
                let middle = Point2::new(image_size.0 as f32 / 2.0, image_size.1 as f32 / 2.0);
                candidates.iter().copied().fold(None, |best, c| match best {
                    Some(b) if b.center.distance_to(&middle) <= c.center.distance_to(&middle) => Some(b),
                    _ => Some(c),
                })
            }
        }
    }
}

impl PipelineStage for BoundaryDetector {
    type Input<'a> = &'a Mat;
    type Output = BoundaryEstimate;

    fn execute(&self, intensity: &Mat, sink: &mut dyn DiagnosticSink) -> Result<BoundaryEstimate> {
        let candidates = self.find_candidates(intensity)?;
        tracing::debug!(candidates = candidates.len(), "Circular Hough search finished");

        let Some(circle) = self.select(&candidates, (intensity.cols(), intensity.rows())) else {
            sink.emit(Stage::BoundaryDetection, "No circles detected in the image.");
            return Err(AlignError::NoBoundaryFound);
        };

        sink.emit(
            Stage::BoundaryDetection,
            &format!(
                "Boundary at ({:.1}, {:.1}) radius {:.1} ({} candidate(s), {:?} selection)",
                circle.center.x,
                circle.center.y,
                circle.radius,
                candidates.len(),
                self.config.selection
            ),
        );

        Ok(BoundaryEstimate {
            circle,
            candidates: candidates.len(),
        })
    }

    fn stage(&self) -> Stage {
        Stage::BoundaryDetection
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::AlignmentLog;
    use opencv::core::{Point, Scalar, CV_8UC1};

    fn circle(x: f32, y: f32, r: f32) -> Circle {
        Circle::new(Point2::new(x, y), r).unwrap()
    }

    fn detector(selection: CircleSelection) -> BoundaryDetector {
        BoundaryDetector::new(BoundaryConfig {
            selection,
            ..BoundaryConfig::default()
        })
    }

    #[test]
    fn test_first_selection_ignores_size() {
        let candidates = [circle(10.0, 10.0, 120.0), circle(300.0, 300.0, 250.0)];
        let chosen = detector(CircleSelection::First).select(&candidates, (600, 600)).unwrap();
        assert_eq!(chosen, candidates[0]);
    }

    #[test]
    fn test_largest_radius_selection_keeps_first_on_tie() {
        let candidates = [
            circle(10.0, 10.0, 120.0),
            circle(300.0, 300.0, 250.0),
            circle(200.0, 200.0, 250.0),
        ];
        let chosen = detector(CircleSelection::LargestRadius).select(&candidates, (600, 600)).unwrap();
        assert_eq!(chosen, candidates[1]);
    }

    #[test]
    fn test_closest_to_center_selection() {
        let candidates = [circle(100.0, 100.0, 150.0), circle(290.0, 310.0, 140.0)];
        let chosen = detector(CircleSelection::ClosestToCenter).select(&candidates, (600, 600)).unwrap();
        assert_eq!(chosen, candidates[1]);
    }

    #[test]
    fn test_empty_candidates_select_nothing() {
        assert!(detector(CircleSelection::First).select(&[], (10, 10)).is_none());
    }

    #[test]
    fn test_black_image_has_no_boundary() {
        let black = Mat::new_rows_cols_with_default(400, 400, CV_8UC1, Scalar::all(0.0)).unwrap();
        let mut log = AlignmentLog::new();
        let result = BoundaryDetector::default().execute(&black, &mut log);

        assert!(matches!(result, Err(AlignError::NoBoundaryFound)));
        assert_eq!(
            log.messages_for(Stage::BoundaryDetection).collect::<Vec<_>>(),
            vec!["No circles detected in the image."]
        );
    }

    #[test]
    fn test_filled_disk_is_found() {
        let mut image = Mat::new_rows_cols_with_default(600, 600, CV_8UC1, Scalar::all(0.0)).unwrap();
        imgproc::circle(
            &mut image,
            Point::new(310, 290),
            200,
            Scalar::all(220.0),
            imgproc::FILLED,
            imgproc::LINE_8,
            0,
        )
        .unwrap();

        let estimate = BoundaryDetector::default()
            .execute(&image, &mut crate::diagnostics::NullSink)
            .unwrap();
        assert!(estimate.candidates >= 1);
        assert!((estimate.circle.center.x - 310.0).abs() < 4.0, "{:?}", estimate.circle);
        assert!((estimate.circle.center.y - 290.0).abs() < 4.0, "{:?}", estimate.circle);
        assert!((estimate.circle.radius - 200.0).abs() < 5.0, "{:?}", estimate.circle);
    }

    #[test]
    fn test_min_center_distance_truncates() {
        let detector = BoundaryDetector::default();
        assert_eq!(detector.min_center_distance(2000), 250.0);
        assert_eq!(detector.min_center_distance(1007), 125.0);
        assert_eq!(detector.min_center_distance(7), 1.0);
    }

    #[test]
    fn test_color_input_rejected() {
        let color = Mat::new_rows_cols_with_default(10, 10, opencv::core::CV_8UC3, Scalar::all(0.0)).unwrap();
        assert!(matches!(
            BoundaryDetector::default().find_candidates(&color),
            Err(AlignError::InvalidInput(_))
        ));
    }
}
