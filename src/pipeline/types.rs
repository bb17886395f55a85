use crate::error::{AlignError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Image-space point (x to the right, y downwards)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point2 {
    pub x: f32,
    pub y: f32,
}

impl Point2 {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: &Point2) -> f32 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

/// Wafer boundary
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Circle {
    pub center: Point2,
    pub radius: f32,
}

impl Circle {
    pub fn new(center: Point2, radius: f32) -> Result<Self> {
        if !center.x.is_finite() || !center.y.is_finite() || !radius.is_finite() || radius <= 0.0 {
            return Err(AlignError::InvalidInput(format!(
                "invalid circle: center ({}, {}), radius {}",
                center.x, center.y, radius
            )));
        }
        Ok(Self { center, radius })
    }

    /// Inclusive disk test
    pub fn contains(&self, x: f32, y: f32) -> bool {
        let dx = x - self.center.x;
        let dy = y - self.center.y;
        dx * dx + dy * dy <= self.radius * self.radius
    }
}

/// Notch chord estimate; endpoints are always distinct
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LineSegment {
    pub p1: Point2,
    pub p2: Point2,
}

impl LineSegment {
    /// `None` for zero-length segments
    pub fn new(p1: Point2, p2: Point2) -> Option<Self> {
        if p1 == p2 {
            None
        } else {
            Some(Self { p1, p2 })
        }
    }

    pub fn dx(&self) -> f32 {
        self.p2.x - self.p1.x
    }

    pub fn dy(&self) -> f32 {
        self.p2.y - self.p1.y
    }

    pub fn squared_length(&self) -> f32 {
        self.dx() * self.dx() + self.dy() * self.dy()
    }

    pub fn length(&self) -> f32 {
        self.squared_length().sqrt()
    }

    /// Vertical chord through the whole circle, from bottom to top
    pub fn vertical_through(circle: &Circle) -> Self {
        Self {
            p1: Point2::new(circle.center.x, circle.center.y + circle.radius),
            p2: Point2::new(circle.center.x, circle.center.y - circle.radius),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum NotchSource {
    /// Longest of `candidates` segments from the line search
    Detected { candidates: usize },
    /// Nothing detected; vertical chord synthesised from the circle
    Fallback,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NotchEstimate {
    pub segment: LineSegment,
    pub source: NotchSource,
}

impl NotchEstimate {
    pub fn is_fallback(&self) -> bool {
        matches!(self.source, NotchSource::Fallback)
    }
}

/// Chosen boundary plus how many candidates the search produced
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundaryEstimate {
    pub circle: Circle,
    pub candidates: usize,
}

/// Which side of the 45°/135° split the chord angle fell on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Quadrant {
    /// `45 < θ' <= 135`: correction is `d - 90`
    TopBottom,
    /// Everything else: correction is `d + 90`
    Side,
}

/// Rotation derived from the notch chord, before the direction convention is applied
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Orientation {
    pub raw_degrees: f64,
    pub normalized_degrees: f64,
    pub quadrant: Quadrant,
    pub correction_degrees: f64,
}

/// Axis-aligned crop rectangle in rotated-image coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropRect {
    pub x: i32,
    pub y: i32,
    pub side: i32,
}

impl CropRect {
    pub fn fits_within(&self, width: i32, height: i32) -> bool {
        self.x >= 0 && self.y >= 0 && self.x + self.side <= width && self.y + self.side <= height
    }
}

/// 2x3 affine matrix, row-major, same layout as OpenCV's
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AffineMatrix(pub [[f64; 3]; 2]);

impl AffineMatrix {
    pub fn apply(&self, point: Point2) -> Point2 {
        let [r0, r1] = self.0;
        let x = point.x as f64;
        let y = point.y as f64;
        Point2::new(
            (r0[0] * x + r0[1] * y + r0[2]) as f32,
            (r1[0] * x + r1[1] * y + r1[2]) as f32,
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageTime {
    pub stage_name: String,
    pub duration_ms: f64,
}

impl StageTime {
    pub fn new(stage_name: impl Into<String>, duration: Duration) -> Self {
        Self {
            stage_name: stage_name.into(),
            duration_ms: duration.as_secs_f64() * 1000.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_circle_rejects_bad_radius() {
        assert!(Circle::new(Point2::new(10.0, 10.0), 0.0).is_err());
        assert!(Circle::new(Point2::new(10.0, 10.0), -3.0).is_err());
        assert!(Circle::new(Point2::new(f32::NAN, 10.0), 5.0).is_err());
        assert!(Circle::new(Point2::new(10.0, 10.0), 5.0).is_ok());
    }

    #[test]
    fn test_disk_test_is_inclusive() {
        let circle = Circle::new(Point2::new(0.0, 0.0), 5.0).unwrap();
        assert!(circle.contains(3.0, 4.0));
        assert!(circle.contains(0.0, -5.0));
        assert!(!circle.contains(3.0, 4.1));
    }

    #[test]
    fn test_segment_rejects_degenerate() {
        let p = Point2::new(4.0, 4.0);
        assert!(LineSegment::new(p, p).is_none());
        let seg = LineSegment::new(p, Point2::new(7.0, 8.0)).unwrap();
        assert_eq!(seg.squared_length(), 25.0);
    }

    #[test]
    fn test_vertical_fallback_spans_diameter() {
        let circle = Circle::new(Point2::new(100.0, 120.0), 40.0).unwrap();
        let seg = LineSegment::vertical_through(&circle);
        assert_eq!(seg.p1, Point2::new(100.0, 160.0));
        assert_eq!(seg.p2, Point2::new(100.0, 80.0));
        assert_eq!(seg.length(), 80.0);
    }

    #[test]
    fn test_crop_rect_bounds() {
        let rect = CropRect { x: 10, y: 10, side: 80 };
        assert!(rect.fits_within(90, 90));
        assert!(!rect.fits_within(89, 90));
        assert!(!CropRect { x: -1, y: 0, side: 5 }.fits_within(100, 100));
    }
}
