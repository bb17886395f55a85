use crate::data::raster::RasterImage;
use crate::error::{AlignError, Result};
use image::RgbImage;
use opencv::core::{Mat, Vector};
use opencv::imgcodecs;
use opencv::prelude::*;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Anything that can hand the aligner an image
pub trait ImageSource {
    fn load(&self) -> Result<RasterImage>;

    /// Human-readable name for logs and reports
    fn describe(&self) -> String;
}

impl ImageSource for Path {
    fn load(&self) -> Result<RasterImage> {
        load_image(self)
    }

    fn describe(&self) -> String {
        self.display().to_string()
    }
}

impl ImageSource for PathBuf {
    fn load(&self) -> Result<RasterImage> {
        load_image(self)
    }

    fn describe(&self) -> String {
        self.display().to_string()
    }
}

impl ImageSource for RgbImage {
    fn load(&self) -> Result<RasterImage> {
        RasterImage::from_rgb_image(self)
    }

    fn describe(&self) -> String {
        format!("in-memory {}x{} image", self.width(), self.height())
    }
}

/// Read a colour image from disk
pub fn load_image(path: &Path) -> Result<RasterImage> {
    let load_failure = |reason: String| AlignError::LoadFailure {
        source_name: path.display().to_string(),
        reason,
    };

    if !path.exists() {
        return Err(load_failure("file does not exist".to_string()));
    }

    let path_str = path
        .to_str()
        .ok_or_else(|| load_failure("path is not valid UTF-8".to_string()))?;

    let mat = imgcodecs::imread(path_str, imgcodecs::IMREAD_COLOR)
        .map_err(|e| load_failure(e.to_string()))?;

    if mat.empty() {
        return Err(load_failure("could not decode image".to_string()));
    }

    RasterImage::from_mat(mat)
}

/// Write a Mat to disk; the format follows the file extension
pub fn save_image(path: &Path, mat: &Mat) -> Result<()> {
    let artifact_error = |reason: String| AlignError::Artifact {
        path: path.display().to_string(),
        reason,
    };

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let path_str = path
        .to_str()
        .ok_or_else(|| artifact_error("path is not valid UTF-8".to_string()))?;

    let written = imgcodecs::imwrite(path_str, mat, &Vector::new()).map_err(|e| artifact_error(e.to_string()))?;
    if written {
        Ok(())
    } else {
        Err(artifact_error("encoder refused the image".to_string()))
    }
}

/// `aligned_<uuid>.png`
pub fn aligned_file_name(id: Uuid) -> String {
    format!("aligned_{}.png", id)
}
