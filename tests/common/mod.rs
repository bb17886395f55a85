#![allow(dead_code)]

use image::{Rgb, RgbImage};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Bright disk on black with the part beyond one chord removed
#[derive(Debug, Clone, Copy)]
pub struct SyntheticWafer {
    pub width: u32,
    pub height: u32,
    pub center: (f32, f32),
    pub radius: f32,
    /// Direction from the centre towards the flat, image coordinates (y down)
    pub flat_normal_degrees: f32,
    /// Distance from the centre to the flat
    pub flat_distance: f32,
    pub level: u8,
}

impl SyntheticWafer {
    pub fn centered(size: u32, radius: f32, flat_normal_degrees: f32) -> Self {
        Self {
            width: size,
            height: size,
            center: (size as f32 / 2.0, size as f32 / 2.0),
            radius,
            flat_normal_degrees,
            flat_distance: radius * 0.85,
            level: 200,
        }
    }

    pub fn contains(&self, x: f32, y: f32) -> bool {
        let dx = x - self.center.0;
        let dy = y - self.center.1;
        let normal = self.flat_normal_degrees.to_radians();
        dx * dx + dy * dy <= self.radius * self.radius
            && dx * normal.cos() + dy * normal.sin() <= self.flat_distance
    }

    pub fn render(&self) -> RgbImage {
        RgbImage::from_fn(self.width, self.height, |x, y| {
            if self.contains(x as f32, y as f32) {
                Rgb([self.level; 3])
            } else {
                Rgb([0; 3])
            }
        })
    }

    /// Direction of the flat chord, defined modulo 180
    pub fn chord_direction_degrees(&self) -> f64 {
        self.flat_normal_degrees as f64 + 90.0
    }
}

/// Uniform per-pixel noise in `[-amplitude, amplitude]`, reproducible per seed
pub fn add_noise(image: &mut RgbImage, amplitude: i16, seed: u64) {
    let mut rng = StdRng::seed_from_u64(seed);
    for pixel in image.pixels_mut() {
        let delta = rng.gen_range(-amplitude..=amplitude);
        let value = (pixel[0] as i16 + delta).clamp(0, 255) as u8;
        *pixel = Rgb([value; 3]);
    }
}

/// Distance of `degrees` from the nearest multiple of 180
pub fn axis_distance(degrees: f64) -> f64 {
    let m = degrees.rem_euclid(180.0);
    m.min(180.0 - m)
}

/// Smallest difference between two angles on the circle
pub fn angular_distance(a: f64, b: f64) -> f64 {
    let d = (a - b).rem_euclid(360.0);
    d.min(360.0 - d)
}
