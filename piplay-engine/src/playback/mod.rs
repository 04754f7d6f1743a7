//! Playback: queue construction and the external player process

pub mod controller;
pub mod queue;

pub use controller::{PlayerCommand, PlayerController, PlayerStatus};
pub use queue::{build_queue, PlaybackQueue, QueueBuilder};
