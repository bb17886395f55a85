use crate::diagnostics::Stage;
use crate::error::{AlignError, Result};
use image::RgbImage;
use opencv::core::{Mat, Scalar, CV_8UC3};
use opencv::imgproc;
use opencv::prelude::*;

fn conversion_error(source: opencv::Error) -> AlignError {
    AlignError::detection(Stage::Load)(source)
}

/// Convert an RGB `image` buffer to a BGR OpenCV Mat
pub fn rgb_image_to_mat(image: &RgbImage) -> Result<Mat> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(AlignError::InvalidInput("image has no pixels".to_string()));
    }

    let mut rgb = Mat::new_rows_cols_with_default(height as i32, width as i32, CV_8UC3, Scalar::all(0.0))
        .map_err(conversion_error)?;
    rgb.data_bytes_mut()
        .map_err(conversion_error)?
        .copy_from_slice(image.as_raw());

    let mut bgr = Mat::default();
    imgproc::cvt_color_def(&rgb, &mut bgr, imgproc::COLOR_RGB2BGR).map_err(conversion_error)?;
    Ok(bgr)
}

/// Convert a BGR, BGRA or single-channel Mat to an RGB `image` buffer
pub fn mat_to_rgb_image(mat: &Mat) -> Result<RgbImage> {
    let code = match mat.channels() {
        1 => imgproc::COLOR_GRAY2RGB,
        3 => imgproc::COLOR_BGR2RGB,
        4 => imgproc::COLOR_BGRA2RGB,
        n => {
            return Err(AlignError::InvalidInput(format!(
                "cannot convert {}-channel image to RGB",
                n
            )))
        }
    };

    let mut rgb = Mat::default();
    imgproc::cvt_color_def(mat, &mut rgb, code).map_err(conversion_error)?;

    let data = rgb.data_bytes().map_err(conversion_error)?.to_vec();
    RgbImage::from_raw(rgb.cols() as u32, rgb.rows() as u32, data)
        .ok_or_else(|| AlignError::InvalidInput("Failed to create RgbImage from Mat".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_rgb_to_mat_swaps_to_bgr() {
        let img = RgbImage::from_pixel(4, 3, Rgb([255, 0, 10]));
        let mat = rgb_image_to_mat(&img).unwrap();

        assert_eq!(mat.rows(), 3);
        assert_eq!(mat.cols(), 4);
        let px = mat.at_2d::<opencv::core::Vec3b>(1, 2).unwrap();
        assert_eq!(px[0], 10);
        assert_eq!(px[2], 255);
    }

    #[test]
    fn test_empty_image_rejected() {
        assert!(rgb_image_to_mat(&RgbImage::new(0, 0)).is_err());
    }
}
