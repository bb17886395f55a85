use crate::pipeline::types::{BoundaryEstimate, CropRect, NotchEstimate, Orientation, StageTime};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

/// Everything one successful alignment decided, in JSON-friendly form
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlignmentReport {
    pub run_id: Uuid,
    pub source: String,
    pub input_size: (u32, u32),
    pub boundary: BoundaryEstimate,
    pub notch: NotchEstimate,
    pub orientation: Orientation,
    /// Angle passed to the rotation after the direction convention
    pub applied_rotation_degrees: f64,
    pub crop: CropRect,
    pub crop_padded: bool,
    pub output_size: (u32, u32),
    pub stage_times: Vec<StageTime>,
    pub total_time_ms: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub artifacts: Vec<PathBuf>,
}

impl AlignmentReport {
    pub fn stage_time(&self, stage_name: &str) -> Option<f64> {
        self.stage_times
            .iter()
            .find(|t| t.stage_name == stage_name)
            .map(|t| t.duration_ms)
    }
}

/// Detection-only result, nothing is warped or written
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InspectionReport {
    pub source: String,
    pub input_size: (u32, u32),
    pub boundary: BoundaryEstimate,
    pub notch: NotchEstimate,
    pub orientation: Orientation,
    pub stage_times: Vec<StageTime>,
}
