pub mod audio;
pub mod sound;
pub mod types;

pub use audio::*;
pub use sound::*;
pub use types::*;
