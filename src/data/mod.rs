pub mod loader;
pub mod raster;

pub use loader::*;
pub use raster::*;
