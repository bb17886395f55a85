use crate::data::loader::save_image;
use crate::diagnostics::{DiagnosticSink, Stage};
use crate::error::{AlignError, Result};
use crate::pipeline::notch::NotchDetector;
use crate::pipeline::types::{Circle, LineSegment};
use opencv::core::{Mat, Point, Scalar};
use opencv::imgproc;
use opencv::prelude::*;
use std::path::PathBuf;

pub const OVERLAY_FILE: &str = "detected_circle_and_flat.png";
pub const FLAT_FILE: &str = "detected_flat_part.png";
pub const ROTATED_FILE: &str = "rotated_image.png";
pub const CROPPED_FILE: &str = "cropped_image.png";
pub const FINAL_FILE: &str = "final_processed_image.png";

/// Intermediates of one run that are worth looking at
pub struct ArtifactSet<'a> {
    pub original: &'a Mat,
    pub edges: &'a Mat,
    pub circle: &'a Circle,
    pub segment: &'a LineSegment,
    pub rotated: &'a Mat,
    pub cropped: &'a Mat,
    pub canonical: &'a Mat,
}

/// Writes debug images for a run into one directory
pub struct ArtifactWriter {
    directory: PathBuf,
}

impl ArtifactWriter {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    pub fn write(&self, artifacts: &ArtifactSet<'_>, sink: &mut dyn DiagnosticSink) -> Result<Vec<PathBuf>> {
        let overlay = Self::draw_overlay(artifacts.original, artifacts.circle, artifacts.segment)?;
        let flat = Self::draw_flat(artifacts.edges, artifacts.circle, artifacts.segment)?;

        let outputs = [
            (OVERLAY_FILE, &overlay),
            (FLAT_FILE, &flat),
            (ROTATED_FILE, artifacts.rotated),
            (CROPPED_FILE, artifacts.cropped),
            (FINAL_FILE, artifacts.canonical),
        ];

        let mut written = Vec::with_capacity(outputs.len());
        for (name, mat) in outputs {
            let path = self.directory.join(name);
            save_image(&path, mat)?;
            written.push(path);
        }

        sink.emit(
            Stage::Artifacts,
            &format!("Wrote {} images to {}", written.len(), self.directory.display()),
        );
        Ok(written)
    }

    /// Boundary in green and the notch chord in blue over the source image
    pub fn draw_overlay(original: &Mat, circle: &Circle, segment: &LineSegment) -> Result<Mat> {
        let mut canvas = to_bgr(original)?;
        imgproc::circle(
            &mut canvas,
            Point::new(circle.center.x.round() as i32, circle.center.y.round() as i32),
            circle.radius.round() as i32,
            Scalar::new(0.0, 255.0, 0.0, 0.0),
            3,
            imgproc::LINE_8,
            0,
        )
        .map_err(draw_error)?;
        draw_segment(&mut canvas, segment)?;
        Ok(canvas)
    }

    /// Edges inside the boundary with the chosen chord on top
    pub fn draw_flat(edges: &Mat, circle: &Circle, segment: &LineSegment) -> Result<Mat> {
        let masked = NotchDetector::mask_edges(edges, circle)?;
        let mut canvas = to_bgr(&masked)?;
        draw_segment(&mut canvas, segment)?;
        Ok(canvas)
    }
}

fn to_bgr(image: &Mat) -> Result<Mat> {
    let code = match image.channels() {
        3 => return image.try_clone().map_err(draw_error),
        1 => imgproc::COLOR_GRAY2BGR,
        4 => imgproc::COLOR_BGRA2BGR,
        n => return Err(AlignError::InvalidInput(format!("unsupported channel count {}", n))),
    };
    let mut bgr = Mat::default();
    imgproc::cvt_color_def(image, &mut bgr, code).map_err(draw_error)?;
    Ok(bgr)
}

fn draw_segment(canvas: &mut Mat, segment: &LineSegment) -> Result<()> {
    imgproc::line(
        canvas,
        Point::new(segment.p1.x.round() as i32, segment.p1.y.round() as i32),
        Point::new(segment.p2.x.round() as i32, segment.p2.y.round() as i32),
        Scalar::new(255.0, 0.0, 0.0, 0.0),
        3,
        imgproc::LINE_8,
        0,
    )
    .map_err(draw_error)
}

fn draw_error(e: opencv::Error) -> AlignError {
    AlignError::Detection {
        stage: Stage::Artifacts,
        source: e,
    }
}
