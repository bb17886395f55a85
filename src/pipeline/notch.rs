use crate::config::NotchConfig;
use crate::diagnostics::{DiagnosticSink, Stage};
use crate::error::{AlignError, Result};
use crate::pipeline::types::{Circle, LineSegment, NotchEstimate, NotchSource, Point2};
use crate::pipeline::PipelineStage;
use opencv::core::{self, Mat, Scalar, Vec4i, Vector, CV_8UC1};
use opencv::imgproc;
use opencv::prelude::*;

/// Input of the notch search: the full edge map plus the chosen boundary
#[derive(Clone, Copy)]
pub struct NotchInput<'a> {
    pub edges: &'a Mat,
    pub circle: &'a Circle,
}

/// Locates the flat chord inside the wafer boundary
pub struct NotchDetector {
    config: NotchConfig,
}

impl Default for NotchDetector {
    fn default() -> Self {
        Self::new(NotchConfig::default())
    }
}

impl NotchDetector {
    pub fn new(config: NotchConfig) -> Self {
        Self { config }
    }

    /// 255 inside the circle (boundary included), 0 outside
    pub fn disk_mask(rows: i32, cols: i32, circle: &Circle) -> Result<Mat> {
        let mut mask = Mat::new_rows_cols_with_default(rows, cols, CV_8UC1, Scalar::all(0.0))
            .map_err(AlignError::detection(Stage::NotchDetection))?;

        let top = ((circle.center.y - circle.radius).floor() as i32).max(0);
        let bottom = ((circle.center.y + circle.radius).ceil() as i32).min(rows - 1);

        for y in top..=bottom {
            let row = mask
                .at_row_mut::<u8>(y)
                .map_err(AlignError::detection(Stage::NotchDetection))?;
            for (x, value) in row.iter_mut().enumerate() {
                if circle.contains(x as f32, y as f32) {
                    *value = 255;
                }
            }
        }

        Ok(mask)
    }

    /// Edges inside the boundary only
    pub fn mask_edges(edges: &Mat, circle: &Circle) -> Result<Mat> {
        let mask = Self::disk_mask(edges.rows(), edges.cols(), circle)?;
        let mut masked = Mat::default();
        core::bitwise_and(edges, &mask, &mut masked, &core::no_array())
            .map_err(AlignError::detection(Stage::NotchDetection))?;
        Ok(masked)
    }

    /// Probabilistic Hough segments in search order, zero-length ones dropped
    pub fn find_segments(&self, masked_edges: &Mat) -> Result<Vec<LineSegment>> {
        let mut lines = Vector::<Vec4i>::new();
        imgproc::hough_lines_p(
            masked_edges,
            &mut lines,
            self.config.rho,
            self.config.theta,
            self.config.threshold,
            self.config.min_line_length,
            self.config.max_line_gap,
        )
        .map_err(AlignError::detection(Stage::NotchDetection))?;

        Ok(lines
            .iter()
            .filter_map(|l| {
                LineSegment::new(
                    Point2::new(l[0] as f32, l[1] as f32),
                    Point2::new(l[2] as f32, l[3] as f32),
                )
            })
            .collect())
    }
}

/// Longest segment by squared length; the earliest wins a tie
pub fn select_longest(segments: &[LineSegment]) -> Option<LineSegment> {
    segments.iter().copied().fold(None, |best, candidate| match best {
        Some(b) if b.squared_length() >= candidate.squared_length() => Some(b),
        _ => Some(candidate),
    })
}

impl PipelineStage for NotchDetector {
    type Input<'a> = NotchInput<'a>;
    type Output = NotchEstimate;

    fn execute(&self, input: NotchInput<'_>, sink: &mut dyn DiagnosticSink) -> Result<NotchEstimate> {
        if input.edges.empty() || input.edges.channels() != 1 {
            return Err(AlignError::InvalidInput(
                "notch search needs a non-empty single-channel edge map".to_string(),
            ));
        }

        let masked = Self::mask_edges(input.edges, input.circle)?;
        let segments = self.find_segments(&masked)?;
        tracing::debug!(segments = segments.len(), "Line search inside boundary finished");

        let estimate = match select_longest(&segments) {
            Some(segment) => {
                sink.emit(
                    Stage::NotchDetection,
                    &format!(
                        "Flat found from ({:.0}, {:.0}) to ({:.0}, {:.0}), length {:.1}px, {} segment(s)",
                        segment.p1.x,
                        segment.p1.y,
                        segment.p2.x,
                        segment.p2.y,
                        segment.length(),
                        segments.len()
                    ),
                );
                NotchEstimate {
                    segment,
                    source: NotchSource::Detected {
                        candidates: segments.len(),
                    },
                }
            }
            None => {
                let segment = LineSegment::vertical_through(input.circle);
                sink.emit(
                    Stage::NotchDetection,
                    "No straight segment inside the boundary; using vertical fallback",
                );
                NotchEstimate {
                    segment,
                    source: NotchSource::Fallback,
                }
            }
        };

        Ok(estimate)
    }

    fn stage(&self) -> Stage {
        Stage::NotchDetection
    }
}
