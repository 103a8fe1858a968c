pub mod library;
pub mod model;
pub mod pitch;

pub use library::*;
pub use model::*;
pub use pitch::*;
