//! HTTP API handlers for piplay-engine

pub mod health;
pub mod playback;
pub mod requester;
pub mod search;
pub mod sse;

pub use health::health_routes;
pub use playback::{playback_status, play_from, stop_playback};
pub use requester::Requester;
pub use search::{forget_results, search, select};
pub use sse::event_stream;
