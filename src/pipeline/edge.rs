use crate::config::EdgeConfig;
use crate::diagnostics::{DiagnosticSink, Stage};
use crate::error::{AlignError, Result};
use crate::pipeline::PipelineStage;
use opencv::core::Mat;
use opencv::imgproc;
use opencv::prelude::*;

/// Intensity and binary edge maps of one image, same dimensions as the input
#[derive(Debug)]
pub struct EdgeMaps {
    pub intensity: Mat,
    pub edges: Mat,
}

/// Grayscale conversion followed by Canny
pub struct EdgeExtractor {
    config: EdgeConfig,
}

impl Default for EdgeExtractor {
    fn default() -> Self {
        Self::new(EdgeConfig::default())
    }
}

impl EdgeExtractor {
    pub fn new(config: EdgeConfig) -> Self {
        Self { config }
    }

    pub fn to_intensity(image: &Mat) -> Result<Mat> {
        if image.empty() {
            return Err(AlignError::InvalidInput("image has no pixels".to_string()));
        }

        let code = match image.channels() {
            1 => return image.try_clone().map_err(AlignError::detection(Stage::EdgeExtraction)),
            3 => imgproc::COLOR_BGR2GRAY,
            4 => imgproc::COLOR_BGRA2GRAY,
            n => {
                return Err(AlignError::InvalidInput(format!(
                    "unsupported channel count {}",
                    n
                )))
            }
        };

        let mut gray = Mat::default();
        imgproc::cvt_color_def(image, &mut gray, code)
            .map_err(AlignError::detection(Stage::EdgeExtraction))?;
        Ok(gray)
    }
}

impl PipelineStage for EdgeExtractor {
    type Input<'a> = &'a Mat;
    type Output = EdgeMaps;

    fn execute(&self, image: &Mat, sink: &mut dyn DiagnosticSink) -> Result<EdgeMaps> {
        let intensity = Self::to_intensity(image)?;

        let mut edges = Mat::default();
        imgproc::canny(
            &intensity,
            &mut edges,
            self.config.low_threshold,
            self.config.high_threshold,
            self.config.aperture_size,
            self.config.l2_gradient,
        )
        .map_err(AlignError::detection(Stage::EdgeExtraction))?;

        let edge_pixels = opencv::core::count_non_zero(&edges)
            .map_err(AlignError::detection(Stage::EdgeExtraction))?;

        tracing::debug!(
            width = intensity.cols(),
            height = intensity.rows(),
            edge_pixels = edge_pixels,
            "Edge maps computed"
        );
        sink.emit(
            Stage::EdgeExtraction,
            &format!(
                "Edge map {}x{} with {} edge pixels (Canny {}/{})",
                intensity.cols(),
                intensity.rows(),
                edge_pixels,
                self.config.low_threshold,
                self.config.high_threshold
            ),
        );

        Ok(EdgeMaps { intensity, edges })
    }

    fn stage(&self) -> Stage {
        Stage::EdgeExtraction
    }
}
