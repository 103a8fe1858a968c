pub mod audio_graph;
pub mod beat_clock;
pub mod config;
pub mod ipc;
pub mod note_source;
pub mod schedule_bridge;
pub mod scheduler;
pub mod transport_controller;

pub use audio_graph::*;
pub use beat_clock::*;
pub use config::*;
pub use ipc::*;
pub use note_source::*;
pub use schedule_bridge::*;
pub use scheduler::*;
pub use transport_controller::*;
