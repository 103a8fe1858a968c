pub mod calibrator;
pub mod projector;

pub use calibrator::*;
pub use projector::*;
