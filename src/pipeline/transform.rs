use crate::config::{CropPolicy, TransformConfig};
use crate::diagnostics::{DiagnosticSink, Stage};
use crate::error::{AlignError, Result};
use crate::pipeline::types::{AffineMatrix, Circle, CropRect, Point2};
use crate::pipeline::PipelineStage;
use opencv::core::{self, Mat, Point2f, Rect, Scalar, Size};
use opencv::imgproc;
use opencv::prelude::*;

pub struct TransformInput<'a> {
    pub image: &'a Mat,
    pub circle: &'a Circle,
    /// Correction from the orientation stage, before the direction convention
    pub correction_degrees: f64,
}

/// Every intermediate of the rotate/crop/resize chain
#[derive(Debug)]
pub struct TransformOutput {
    pub matrix: AffineMatrix,
    /// Angle handed to the rotation, after the direction convention
    pub applied_degrees: f64,
    pub rotated: Mat,
    pub crop: CropRect,
    pub padded: bool,
    pub cropped: Mat,
    pub canonical: Mat,
}

pub struct TransformEngine {
    config: TransformConfig,
}

impl Default for TransformEngine {
    fn default() -> Self {
        Self::new(TransformConfig::default())
    }
}

impl TransformEngine {
    pub fn new(config: TransformConfig) -> Self {
        Self { config }
    }

    /// Rotation angle actually applied for a given correction
    pub fn applied_angle(correction_degrees: f64, clockwise: bool) -> f64 {
        if clockwise {
            -correction_degrees
        } else {
            correction_degrees
        }
    }

    /// Square of side `2r` centred on the circle
    pub fn crop_rect(circle: &Circle) -> CropRect {
        let side = (circle.radius * 2.0) as i32;
        CropRect {
            x: (circle.center.x - (side / 2) as f32) as i32,
            y: (circle.center.y - (side / 2) as f32) as i32,
            side,
        }
    }

    /// `getRotationMatrix2D` about `center` with unit scale, as a `Mat` for
    /// the warp plus a copy of its coefficients for the report
    pub fn rotation_matrix(center: Point2, angle_degrees: f64) -> Result<(Mat, AffineMatrix)> {
        let m = imgproc::get_rotation_matrix_2d(Point2f::new(center.x, center.y), angle_degrees, 1.0)
            .map_err(AlignError::TransformFailure)?;

        let mut coefficients = [[0.0; 3]; 2];
        for (r, row) in coefficients.iter_mut().enumerate() {
            for (c, value) in row.iter_mut().enumerate() {
                *value = *m.at_2d::<f64>(r as i32, c as i32).map_err(AlignError::TransformFailure)?;
            }
        }
        Ok((m, AffineMatrix(coefficients)))
    }

    /// Full-image warp, output has the input's size
    pub fn rotate(image: &Mat, matrix: &Mat) -> Result<Mat> {
        let mut rotated = Mat::default();
        imgproc::warp_affine(
            image,
            &mut rotated,
            matrix,
            image.size().map_err(AlignError::TransformFailure)?,
            imgproc::INTER_LINEAR,
            core::BORDER_CONSTANT,
            Scalar::default(),
        )
        .map_err(AlignError::TransformFailure)?;
        Ok(rotated)
    }

    /// Cut out `rect`, handling out-of-bounds squares per `policy`.
    ///
    /// Returns the owned crop and whether padding was needed.
    pub fn crop(image: &Mat, rect: CropRect, policy: CropPolicy) -> Result<(Mat, bool)> {
        let (width, height) = (image.cols(), image.rows());
        if rect.side <= 0 {
            return Err(AlignError::DegenerateCrop {
                x: rect.x,
                y: rect.y,
                side: rect.side,
                width,
                height,
            });
        }

        if rect.fits_within(width, height) {
            let roi = Mat::roi(image, Rect::new(rect.x, rect.y, rect.side, rect.side))
                .map_err(AlignError::TransformFailure)?;
            let cropped = roi.try_clone().map_err(AlignError::TransformFailure)?;
            return Ok((cropped, false));
        }

        match policy {
            CropPolicy::Reject => Err(AlignError::DegenerateCrop {
                x: rect.x,
                y: rect.y,
                side: rect.side,
                width,
                height,
            }),
            CropPolicy::Pad => {
                let left = (-rect.x).max(0);
                let top = (-rect.y).max(0);
                let right = (rect.x + rect.side - width).max(0);
                let bottom = (rect.y + rect.side - height).max(0);

                let mut padded = Mat::default();
                core::copy_make_border(
                    image,
                    &mut padded,
                    top,
                    bottom,
                    left,
                    right,
                    core::BORDER_CONSTANT,
                    Scalar::default(),
                )
                .map_err(AlignError::TransformFailure)?;

                let roi = Mat::roi(&padded, Rect::new(rect.x + left, rect.y + top, rect.side, rect.side))
                    .map_err(AlignError::TransformFailure)?;
                let cropped = roi.try_clone().map_err(AlignError::TransformFailure)?;
                Ok((cropped, true))
            }
        }
    }

    pub fn resize(image: &Mat, size: (u32, u32)) -> Result<Mat> {
        let mut resized = Mat::default();
        imgproc::resize(
            image,
            &mut resized,
            Size::new(size.0 as i32, size.1 as i32),
            0.0,
            0.0,
            imgproc::INTER_LINEAR,
        )
        .map_err(AlignError::TransformFailure)?;
        Ok(resized)
    }
}

impl PipelineStage for TransformEngine {
    type Input<'a> = TransformInput<'a>;
    type Output = TransformOutput;

    fn execute(&self, input: TransformInput<'_>, sink: &mut dyn DiagnosticSink) -> Result<TransformOutput> {
        if input.image.empty() {
            return Err(AlignError::InvalidInput("image has no pixels".to_string()));
        }

        let applied_degrees = Self::applied_angle(input.correction_degrees, self.config.clockwise);
        let (m, matrix) = Self::rotation_matrix(input.circle.center, applied_degrees)?;
        let rotated = Self::rotate(input.image, &m)?;
        sink.emit(
            Stage::Transform,
            &format!(
                "Rotated {:.3} degrees about ({:.1}, {:.1})",
                applied_degrees, input.circle.center.x, input.circle.center.y
            ),
        );

        let crop = Self::crop_rect(input.circle);
        let (cropped, padded) = Self::crop(&rotated, crop, self.config.crop_policy)?;
        if padded {
            tracing::warn!(x = crop.x, y = crop.y, side = crop.side, "Crop square left the image; padded");
        }
        sink.emit(
            Stage::Transform,
            &format!(
                "Cropped {}x{} at ({}, {}){}",
                crop.side,
                crop.side,
                crop.x,
                crop.y,
                if padded { " with padding" } else { "" }
            ),
        );

        let canonical = Self::resize(&cropped, self.config.canonical_size)?;
        sink.emit(
            Stage::Transform,
            &format!(
                "Resized to {}x{}",
                self.config.canonical_size.0, self.config.canonical_size.1
            ),
        );

        Ok(TransformOutput {
            matrix,
            applied_degrees,
            rotated,
            crop,
            padded,
            cropped,
            canonical,
        })
    }

    fn stage(&self) -> Stage {
        Stage::Transform
    }
}
