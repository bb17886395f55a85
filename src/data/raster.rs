use crate::diagnostics::Stage;
use crate::error::{AlignError, Result};
use crate::utils::image_conversion::{mat_to_rgb_image, rgb_image_to_mat};
use image::RgbImage;
use opencv::core::Mat;
use opencv::prelude::*;

/// Owned pixel buffer: BGR colour or single-channel intensity, 8 bits per sample
#[derive(Debug)]
pub struct RasterImage {
    mat: Mat,
}

impl RasterImage {
    /// Wrap a decoded matrix; empty or non-8-bit matrices are rejected
    pub fn from_mat(mat: Mat) -> Result<Self> {
        if mat.empty() {
            return Err(AlignError::InvalidInput("image has no pixels".to_string()));
        }
        if mat.depth() != opencv::core::CV_8U {
            return Err(AlignError::InvalidInput(format!(
                "expected 8-bit samples, got depth {}",
                mat.depth()
            )));
        }
        match mat.channels() {
            1 | 3 | 4 => Ok(Self { mat }),
            n => Err(AlignError::InvalidInput(format!("unsupported channel count {}", n))),
        }
    }

    pub fn from_rgb_image(image: &RgbImage) -> Result<Self> {
        Self::from_mat(rgb_image_to_mat(image)?)
    }

    pub fn to_rgb_image(&self) -> Result<RgbImage> {
        mat_to_rgb_image(&self.mat)
    }

    pub fn width(&self) -> u32 {
        self.mat.cols() as u32
    }

    pub fn height(&self) -> u32 {
        self.mat.rows() as u32
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width(), self.height())
    }

    pub fn channels(&self) -> i32 {
        self.mat.channels()
    }

    /// Bytes per row (samples are 8-bit, so elements equal bytes)
    pub fn stride(&self) -> Result<usize> {
        self.mat.step1(0).map_err(AlignError::detection(Stage::Load))
    }

    pub fn as_mat(&self) -> &Mat {
        &self.mat
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;
    use opencv::core::{Scalar, CV_32FC1, CV_8UC2, CV_8UC3};

    #[test]
    fn test_rejects_empty_and_unsupported() {
        assert!(RasterImage::from_mat(Mat::default()).is_err());

        let two_channel = Mat::new_rows_cols_with_default(4, 4, CV_8UC2, Scalar::all(0.0)).unwrap();
        assert!(RasterImage::from_mat(two_channel).is_err());

        let float = Mat::new_rows_cols_with_default(4, 4, CV_32FC1, Scalar::all(0.0)).unwrap();
        assert!(RasterImage::from_mat(float).is_err());
    }

    #[test]
    fn test_dimensions_and_stride() {
        let mat = Mat::new_rows_cols_with_default(30, 40, CV_8UC3, Scalar::all(7.0)).unwrap();
        let raster = RasterImage::from_mat(mat).unwrap();
        assert_eq!(raster.dimensions(), (40, 30));
        assert_eq!(raster.channels(), 3);
        assert_eq!(raster.stride().unwrap(), 120);
    }

    #[test]
    fn test_rgb_image_keeps_channel_order() {
        let mut img = RgbImage::new(3, 2);
        img.put_pixel(1, 1, Rgb([200, 10, 30]));

        let raster = RasterImage::from_rgb_image(&img).unwrap();
        let back = raster.to_rgb_image().unwrap();
        assert_eq!(back.get_pixel(1, 1), &Rgb([200, 10, 30]));
        assert_eq!(back.get_pixel(0, 0), &Rgb([0, 0, 0]));
    }
}
