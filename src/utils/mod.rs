pub mod image_conversion;

pub use image_conversion::*;
