//! Playlist database access
//!
//! The CRUD front end owns all writes; this crate only creates the schema and
//! reads songs and playlists back.

pub mod init;
pub mod models;
pub mod playlists;

pub use init::*;
pub use models::*;
pub use playlists::*;
