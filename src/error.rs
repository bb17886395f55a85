use crate::diagnostics::Stage;
use thiserror::Error;

/// Errors produced by a single alignment run
///
/// Every variant is local to the image being processed; none of them leave
/// shared state behind, so callers can move on to the next image.
#[derive(Debug, Error)]
pub enum AlignError {
    /// The source image is missing or could not be decoded.
    #[error("image unreadable: {source_name}: {reason}")]
    LoadFailure { source_name: String, reason: String },

    /// The image is empty or has an unsupported channel layout.
    #[error("invalid input image: {0}")]
    InvalidInput(String),

    /// The boundary search returned no candidate circle.
    #[error("no wafer boundary found")]
    NoBoundaryFound,

    /// The crop square does not fit inside the rotated image.
    #[error("crop square {side}px at ({x}, {y}) exceeds image bounds {width}x{height}")]
    DegenerateCrop {
        x: i32,
        y: i32,
        side: i32,
        width: i32,
        height: i32,
    },

    /// The warp or resize primitive rejected the operation.
    #[error("transform failed: {0}")]
    TransformFailure(#[source] opencv::Error),

    /// A detection primitive (colour conversion, Canny, Hough) failed.
    #[error("{stage} failed: {source}")]
    Detection {
        stage: Stage,
        #[source]
        source: opencv::Error,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to write {path}: {reason}")]
    Artifact { path: String, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl AlignError {
    /// `false` for outcomes that simply mean there was nothing to align.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, AlignError::NoBoundaryFound)
    }

    pub(crate) fn detection(stage: Stage) -> impl FnOnce(opencv::Error) -> Self {
        move |source| AlignError::Detection { stage, source }
    }
}

pub type Result<T> = std::result::Result<T, AlignError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_boundary_is_not_fatal() {
        assert!(!AlignError::NoBoundaryFound.is_fatal());
        assert!(AlignError::InvalidInput("empty".into()).is_fatal());
        assert!(AlignError::DegenerateCrop { x: -1, y: 0, side: 10, width: 5, height: 5 }.is_fatal());
    }

    #[test]
    fn test_detection_error_names_stage() {
        let err = AlignError::detection(Stage::NotchDetection)(opencv::Error::new(
            opencv::core::StsBadArg,
            "bad lines",
        ));
        assert!(err.to_string().starts_with("notch_detection failed"));
    }
}
