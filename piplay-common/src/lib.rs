//! # PiPlay Common Library
//!
//! Shared code for the PiPlay workspace:
//! - Song and playlist models
//! - Read access to the playlist database
//! - Player lifecycle events
//! - Configuration loading

pub mod config;
pub mod db;
pub mod error;
pub mod events;

pub use db::models::{Playlist, SongRecord, StoredSong};
pub use error::{Error, Result};
pub use events::PlayerEvent;
