//! Playback endpoints

use axum::{extract::State, Json};
use serde::Deserialize;

use crate::engine::PlaybackAck;
use crate::error::ApiResult;
use crate::playback::PlayerStatus;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct PlayRequest {
    pub song_id: i64,
    pub playlist_id: i64,
}

/// POST /api/playback/play
pub async fn play_from(
    State(state): State<AppState>,
    Json(request): Json<PlayRequest>,
) -> ApiResult<Json<PlaybackAck>> {
    let ack = state
        .engine
        .play_from(request.song_id, request.playlist_id)
        .await?;
    Ok(Json(ack))
}

/// POST /api/playback/stop
pub async fn stop_playback(State(state): State<AppState>) -> ApiResult<Json<PlaybackAck>> {
    Ok(Json(state.engine.stop_playback().await?))
}

/// GET /api/playback/status
pub async fn playback_status(State(state): State<AppState>) -> Json<PlayerStatus> {
    Json(state.engine.player_status().await)
}
