use crate::logging::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub aligner: AlignerConfig,
    pub logging: LoggingConfig,
}

/// Every tunable of the alignment pipeline
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AlignerConfig {
    pub edge: EdgeConfig,
    pub boundary: BoundaryConfig,
    pub notch: NotchConfig,
    pub transform: TransformConfig,
    pub artifacts: ArtifactConfig,
}

/// Canny thresholds on an 8-bit intensity scale
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EdgeConfig {
    pub low_threshold: f64,
    pub high_threshold: f64,
    pub aperture_size: i32,
    pub l2_gradient: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircleSelection {
    /// Whatever the Hough search reports first (its strongest accumulator peak).
    #[default]
    First,
    LargestRadius,
    ClosestToCenter,
}

/// Parameters of the gradient circular Hough search
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BoundaryConfig {
    /// Inverse accumulator resolution
    pub dp: f64,
    /// Minimum centre separation is `image height / min_dist_divisor`
    pub min_dist_divisor: f64,
    /// Upper Canny threshold used inside the search
    pub canny_high_threshold: f64,
    pub accumulator_threshold: f64,
    pub min_radius: i32,
    /// 0 leaves the radius unbounded
    pub max_radius: i32,
    pub selection: CircleSelection,
}

/// Parameters of the probabilistic line search
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotchConfig {
    pub rho: f64,
    /// Angle resolution in radians
    pub theta: f64,
    pub threshold: i32,
    pub min_line_length: f64,
    pub max_line_gap: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CropPolicy {
    /// Pad the rotated image with black so the whole square is available.
    #[default]
    Pad,
    /// Fail the run with `DegenerateCrop`.
    Reject,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformConfig {
    /// Output width and height in pixels
    pub canonical_size: (u32, u32),
    /// Negate the correction angle before rotating
    pub clockwise: bool,
    pub crop_policy: CropPolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtifactConfig {
    pub enabled: bool,
    pub directory: PathBuf,
}

impl Default for EdgeConfig {
    fn default() -> Self {
        Self {
            low_threshold: 50.0,
            high_threshold: 150.0,
            aperture_size: 3,
            l2_gradient: false,
        }
    }
}

impl Default for BoundaryConfig {
    fn default() -> Self {
        Self {
            dp: 1.0,
            min_dist_divisor: 8.0,
            canny_high_threshold: 100.0,
            accumulator_threshold: 30.0,
            min_radius: 100,
            max_radius: 0,
            selection: CircleSelection::First,
        }
    }
}

impl Default for NotchConfig {
    fn default() -> Self {
        Self {
            rho: 1.0,
            theta: std::f64::consts::PI / 180.0,
            threshold: 50,
            min_line_length: 50.0,
            max_line_gap: 10.0,
        }
    }
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            canonical_size: (1000, 1000),
            clockwise: true,
            crop_policy: CropPolicy::Pad,
        }
    }
}

impl Default for ArtifactConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            directory: PathBuf::from("."),
        }
    }
}

impl AlignerConfig {
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.edge.low_threshold < 0.0 || self.edge.high_threshold <= 0.0 {
            errors.push("Edge thresholds must be positive".to_string());
        }

        if self.edge.low_threshold > self.edge.high_threshold {
            errors.push("Edge low_threshold must not exceed high_threshold".to_string());
        }

        if ![3, 5, 7].contains(&self.edge.aperture_size) {
            errors.push("Edge aperture_size must be 3, 5 or 7".to_string());
        }

        if self.boundary.dp < 1.0 {
            errors.push("Boundary dp must be at least 1.0".to_string());
        }

        if self.boundary.min_dist_divisor <= 0.0 {
            errors.push("Boundary min_dist_divisor must be positive".to_string());
        }

        if self.boundary.canny_high_threshold <= 0.0 || self.boundary.accumulator_threshold <= 0.0 {
            errors.push("Boundary thresholds must be positive".to_string());
        }

        if self.boundary.min_radius < 0 || self.boundary.max_radius < 0 {
            errors.push("Boundary radii must be non-negative".to_string());
        }

        if self.boundary.max_radius != 0 && self.boundary.max_radius < self.boundary.min_radius {
            errors.push("Boundary max_radius must be 0 or at least min_radius".to_string());
        }

        if self.notch.rho <= 0.0 || self.notch.theta <= 0.0 {
            errors.push("Notch rho and theta must be positive".to_string());
        }

        if self.notch.threshold <= 0 {
            errors.push("Notch threshold must be positive".to_string());
        }

        if self.notch.min_line_length < 0.0 || self.notch.max_line_gap < 0.0 {
            errors.push("Notch line length and gap must be non-negative".to_string());
        }

        let (width, height) = self.transform.canonical_size;
        if width == 0 || height == 0 || width > i32::MAX as u32 || height > i32::MAX as u32 {
            errors.push("Transform canonical_size must be positive".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

impl Config {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let content = fs::read_to_string(path)?;

        if content.trim_start().starts_with('{') {
            Ok(serde_json::from_str(&content)?)
        } else {
            Ok(toml::from_str(&content)?)
        }
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P, format: ConfigFormat) -> Result<(), Box<dyn std::error::Error>> {
        fs::write(path, self.to_string_in(format)?)?;
        Ok(())
    }

    pub fn to_string_in(&self, format: ConfigFormat) -> Result<String, Box<dyn std::error::Error>> {
        Ok(match format {
            ConfigFormat::Json => serde_json::to_string_pretty(self)?,
            ConfigFormat::Toml => toml::to_string_pretty(self)?,
        })
    }

    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = match self.aligner.validate() {
            Ok(()) => Vec::new(),
            Err(errors) => errors,
        };

        if let Err(e) = self.logging.validate() {
            errors.push(e);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Json,
    Toml,
}

/// Load `config_path`, falling back to defaults on any problem.
///
/// Problems come back as messages rather than log events, since this
/// usually runs before the subscriber exists.
pub fn load_config_or_default(config_path: Option<&Path>) -> (Config, Vec<String>) {
    let Some(path) = config_path else {
        return (Config::default(), Vec::new());
    };

    match Config::load_from_file(path) {
        Ok(config) => match config.validate() {
            Ok(()) => (config, Vec::new()),
            Err(errors) => {
                let mut warnings = vec![format!("Configuration validation errors in {}:", path.display())];
                warnings.extend(errors.into_iter().map(|e| format!("  - {}", e)));
                warnings.push("Using default configuration instead.".to_string());
                (Config::default(), warnings)
            }
        },
        Err(e) => (
            Config::default(),
            vec![
                format!("Failed to load config from '{}': {}", path.display(), e),
                "Using default configuration.".to_string(),
            ],
        ),
    }
}
