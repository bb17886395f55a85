use crate::config::AlignerConfig;
use crate::data::loader::ImageSource;
use crate::data::raster::RasterImage;
use crate::diagnostics::{DiagnosticSink, Stage};
use crate::error::{AlignError, Result};
use crate::logging::AlignmentSpan;
use crate::pipeline::boundary::BoundaryDetector;
use crate::pipeline::edge::{EdgeExtractor, EdgeMaps};
use crate::pipeline::notch::{NotchDetector, NotchInput};
use crate::pipeline::orientation::OrientationCalculator;
use crate::pipeline::report::{AlignmentReport, InspectionReport};
use crate::pipeline::transform::{TransformEngine, TransformInput};
use crate::pipeline::types::{BoundaryEstimate, NotchEstimate, Orientation, StageTime};
use crate::pipeline::PipelineStage;
use crate::visualization::{ArtifactSet, ArtifactWriter};
use opencv::core::Mat;
use std::time::Instant;
use uuid::Uuid;

/// Processed image plus the record of how it was produced
#[derive(Debug)]
pub struct AlignedWafer {
    pub image: RasterImage,
    pub report: AlignmentReport,
}

struct Detection {
    maps: EdgeMaps,
    boundary: BoundaryEstimate,
    notch: NotchEstimate,
    orientation: Orientation,
}

/// Runs edge extraction, boundary and notch detection, orientation and the
/// final transform on one image.
///
/// Holds configuration only, so one instance can serve many threads.
pub struct WaferAligner {
    config: AlignerConfig,
    edge: EdgeExtractor,
    boundary: BoundaryDetector,
    notch: NotchDetector,
    orientation: OrientationCalculator,
    transform: TransformEngine,
}

impl Default for WaferAligner {
    fn default() -> Self {
        Self::build(AlignerConfig::default())
    }
}

impl WaferAligner {
    pub fn new(config: AlignerConfig) -> Result<Self> {
        config
            .validate()
            .map_err(|errors| AlignError::InvalidConfig(errors.join("; ")))?;
        Ok(Self::build(config))
    }

    fn build(config: AlignerConfig) -> Self {
        Self {
            edge: EdgeExtractor::new(config.edge.clone()),
            boundary: BoundaryDetector::new(config.boundary.clone()),
            notch: NotchDetector::new(config.notch.clone()),
            orientation: OrientationCalculator,
            transform: TransformEngine::new(config.transform.clone()),
            config,
        }
    }

    pub fn config(&self) -> &AlignerConfig {
        &self.config
    }

    /// Load from `source`, then align
    pub fn align_source<S: ImageSource + ?Sized>(
        &self,
        source: &S,
        sink: &mut dyn DiagnosticSink,
    ) -> Result<AlignedWafer> {
        let name = source.describe();
        let image = match source.load() {
            Ok(image) => image,
            Err(e) => {
                sink.emit(Stage::Load, &format!("Failed to load {}: {}", name, e));
                return Err(e);
            }
        };
        self.align(&image, &name, sink)
    }

    pub fn align(&self, image: &RasterImage, source: &str, sink: &mut dyn DiagnosticSink) -> Result<AlignedWafer> {
        let run_id = Uuid::new_v4();
        let span = AlignmentSpan::new(run_id, source, image.dimensions());
        let _entered = span.enter();

        let result = self.run(&span, image, source, sink);
        match &result {
            Ok(aligned) => span.record_result(
                true,
                &format!(
                    "rotated {:.3} degrees, output {}x{}",
                    aligned.report.applied_rotation_degrees, aligned.report.output_size.0, aligned.report.output_size.1
                ),
            ),
            Err(e) => {
                // An empty frame already says why under boundary detection
                if e.is_fatal() {
                    sink.emit(Stage::Complete, &format!("Image processing failed: {}", e));
                }
                span.record_result(false, &e.to_string());
            }
        }
        result
    }

    /// Detection and orientation only
    pub fn inspect(&self, image: &RasterImage, source: &str, sink: &mut dyn DiagnosticSink) -> Result<InspectionReport> {
        let span = AlignmentSpan::new(Uuid::new_v4(), source, image.dimensions());
        let _entered = span.enter();

        let mut stage_times = Vec::new();
        let detection = self.detect(&span, image.as_mat(), sink, &mut stage_times)?;

        Ok(InspectionReport {
            source: source.to_string(),
            input_size: image.dimensions(),
            boundary: detection.boundary,
            notch: detection.notch,
            orientation: detection.orientation,
            stage_times,
        })
    }

    fn run(
        &self,
        span: &AlignmentSpan,
        image: &RasterImage,
        source: &str,
        sink: &mut dyn DiagnosticSink,
    ) -> Result<AlignedWafer> {
        let start = Instant::now();
        let mut stage_times = Vec::new();

        sink.emit(
            Stage::Load,
            &format!(
                "Processing {} ({}x{}, {} channel(s))",
                source,
                image.width(),
                image.height(),
                image.channels()
            ),
        );

        let detection = self.detect(span, image.as_mat(), sink, &mut stage_times)?;
        let circle = detection.boundary.circle;

        let output = timed(&mut stage_times, self.transform.stage_name(), || {
            self.transform.execute(
                TransformInput {
                    image: image.as_mat(),
                    circle: &circle,
                    correction_degrees: detection.orientation.correction_degrees,
                },
                sink,
            )
        })?;

        let artifacts = if self.config.artifacts.enabled {
            let writer = ArtifactWriter::new(self.config.artifacts.directory.join(span.run_id().to_string()));
            let set = ArtifactSet {
                original: image.as_mat(),
                edges: &detection.maps.edges,
                circle: &circle,
                segment: &detection.notch.segment,
                rotated: &output.rotated,
                cropped: &output.cropped,
                canonical: &output.canonical,
            };
            match timed(&mut stage_times, Stage::Artifacts.as_str(), || writer.write(&set, sink)) {
                Ok(paths) => paths,
                Err(e) => {
                    // Debug images never decide the outcome of a run
                    tracing::warn!(error = %e, "Artifact output failed");
                    sink.emit(Stage::Artifacts, &format!("Could not write artifacts: {}", e));
                    Vec::new()
                }
            }
        } else {
            Vec::new()
        };

        let aligned = RasterImage::from_mat(output.canonical)?;
        sink.emit(Stage::Complete, "Image processing completed");

        let report = AlignmentReport {
            run_id: span.run_id(),
            source: source.to_string(),
            input_size: image.dimensions(),
            boundary: detection.boundary,
            notch: detection.notch,
            orientation: detection.orientation,
            applied_rotation_degrees: output.applied_degrees,
            crop: output.crop,
            crop_padded: output.padded,
            output_size: aligned.dimensions(),
            stage_times,
            total_time_ms: start.elapsed().as_secs_f64() * 1000.0,
            artifacts,
        };

        Ok(AlignedWafer { image: aligned, report })
    }

    fn detect(
        &self,
        span: &AlignmentSpan,
        image: &Mat,
        sink: &mut dyn DiagnosticSink,
        stage_times: &mut Vec<StageTime>,
    ) -> Result<Detection> {
        let maps = timed(stage_times, self.edge.stage_name(), || self.edge.execute(image, sink))?;

        let boundary = timed(stage_times, self.boundary.stage_name(), || {
            self.boundary.execute(&maps.intensity, sink)
        })?;
        span.record_boundary(&boundary.circle, boundary.candidates);

        let notch = timed(stage_times, self.notch.stage_name(), || {
            self.notch.execute(
                NotchInput {
                    edges: &maps.edges,
                    circle: &boundary.circle,
                },
                sink,
            )
        })?;
        span.record_notch(&notch);

        let orientation = timed(stage_times, self.orientation.stage_name(), || {
            self.orientation.execute(&notch.segment, sink)
        })?;
        span.record_orientation(&orientation);

        Ok(Detection {
            maps,
            boundary,
            notch,
            orientation,
        })
    }
}

fn timed<T>(stage_times: &mut Vec<StageTime>, stage_name: &str, f: impl FnOnce() -> Result<T>) -> Result<T> {
    let start = Instant::now();
    let result = f();
    stage_times.push(StageTime::new(stage_name, start.elapsed()));
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::{AlignmentLog, NullSink};
    use opencv::core::{Point, Rect, Scalar, CV_8UC3};
    use opencv::imgproc;

    fn wafer_with_bottom_flat() -> RasterImage {
        let mut mat = Mat::new_rows_cols_with_default(600, 600, CV_8UC3, Scalar::all(0.0)).unwrap();
        imgproc::circle(
            &mut mat,
            Point::new(300, 300),
            200,
            Scalar::all(200.0),
            imgproc::FILLED,
            imgproc::LINE_8,
            0,
        )
        .unwrap();
        imgproc::rectangle(
            &mut mat,
            Rect::new(0, 470, 600, 130),
            Scalar::all(0.0),
            imgproc::FILLED,
            imgproc::LINE_8,
            0,
        )
        .unwrap();
        RasterImage::from_mat(mat).unwrap()
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = AlignerConfig::default();
        config.transform.canonical_size = (0, 1000);
        assert!(matches!(WaferAligner::new(config), Err(AlignError::InvalidConfig(_))));
    }

    #[test]
    fn test_black_image_stops_after_boundary() {
        let mat = Mat::new_rows_cols_with_default(400, 400, CV_8UC3, Scalar::all(0.0)).unwrap();
        let image = RasterImage::from_mat(mat).unwrap();
        let mut log = AlignmentLog::new();

        let result = WaferAligner::default().align(&image, "black", &mut log);

        assert!(matches!(result, Err(AlignError::NoBoundaryFound)));
        assert_eq!(
            log.stages(),
            vec![Stage::Load, Stage::EdgeExtraction, Stage::BoundaryDetection]
        );
    }

    #[test]
    fn test_align_reports_every_stage() {
        let mut log = AlignmentLog::new();
        let aligned = WaferAligner::default()
            .align(&wafer_with_bottom_flat(), "synthetic", &mut log)
            .unwrap();

        assert_eq!(aligned.image.dimensions(), (1000, 1000));
        assert_eq!(aligned.report.output_size, (1000, 1000));
        assert_eq!(aligned.report.source, "synthetic");
        assert_eq!(
            log.stages(),
            vec![
                Stage::Load,
                Stage::EdgeExtraction,
                Stage::BoundaryDetection,
                Stage::NotchDetection,
                Stage::Orientation,
                Stage::Transform,
                Stage::Complete,
            ]
        );
        assert_eq!(
            log.messages_for(Stage::Complete).collect::<Vec<_>>(),
            vec!["Image processing completed"]
        );

        let names: Vec<_> = aligned.report.stage_times.iter().map(|t| t.stage_name.as_str()).collect();
        assert_eq!(
            names,
            vec!["edge_extraction", "boundary_detection", "notch_detection", "orientation", "transform"]
        );
    }

    #[test]
    fn test_inspect_matches_align_decisions() {
        let aligner = WaferAligner::default();
        let image = wafer_with_bottom_flat();

        let inspection = aligner.inspect(&image, "synthetic", &mut NullSink).unwrap();
        let aligned = aligner.align(&image, "synthetic", &mut NullSink).unwrap();

        assert_eq!(inspection.boundary, aligned.report.boundary);
        assert_eq!(inspection.orientation, aligned.report.orientation);
        assert_eq!(
            aligned.report.applied_rotation_degrees,
            -aligned.report.orientation.correction_degrees
        );
    }

    #[test]
    fn test_failed_load_is_logged() {
        let missing = std::path::PathBuf::from("/definitely/not/here.png");
        let mut log = AlignmentLog::new();
        let result = WaferAligner::default().align_source(&missing, &mut log);

        assert!(matches!(result, Err(AlignError::LoadFailure { .. })));
        assert_eq!(log.stages(), vec![Stage::Load]);
    }
}
