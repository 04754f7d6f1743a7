//! # piplay-engine
//!
//! Playback and search resolution for PiPlay:
//! - Catalog search against the NetEase music API, including the second
//!   detail lookup for id-only results
//! - Per-requester search result sets with one-based selection
//! - Playlist playback: chosen song first, the rest shuffled
//! - Control of a single external player process
//!
//! The same operations are served over HTTP by [`build_router`].

use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod catalog;
pub mod engine;
pub mod error;
pub mod playback;
pub mod search;
pub mod store;

pub use engine::{Engine, PlaybackAck};
pub use error::{ApiError, Error, Result};

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Engine>,
}

impl AppState {
    pub fn new(engine: Arc<Engine>) -> Self {
        Self { engine }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::{get, post};

    Router::new()
        .route("/api/search", post(api::search).delete(api::forget_results))
        .route("/api/search/select/:index", get(api::select))
        .route("/api/playback/play", post(api::play_from))
        .route("/api/playback/stop", post(api::stop_playback))
        .route("/api/playback/status", get(api::playback_status))
        .route("/api/events", get(api::event_stream))
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
