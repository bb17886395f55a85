pub mod aligner;
pub mod boundary;
pub mod edge;
pub mod notch;
pub mod orientation;
pub mod report;
pub mod traits;
pub mod transform;
pub mod types;

pub use aligner::*;
pub use boundary::BoundaryDetector;
pub use edge::{EdgeExtractor, EdgeMaps};
pub use notch::{select_longest, NotchDetector, NotchInput};
pub use orientation::OrientationCalculator;
pub use report::*;
pub use traits::*;
pub use transform::{TransformEngine, TransformInput, TransformOutput};
pub use types::*;
