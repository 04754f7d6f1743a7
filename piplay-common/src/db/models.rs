//! Database models

use serde::{Deserialize, Serialize};

/// A playable song as resolved from the catalog or read from the database
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SongRecord {
    pub catalog_id: String,
    pub title: String,
    pub artist: String,
    pub album: String,
    pub stream_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Playlist {
    pub playlist_id: i64,
    pub label: String,
    pub comment: Option<String>,
}

/// A song row persisted in a playlist
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredSong {
    pub song_id: i64,
    pub playlist_id: i64,
    pub record: SongRecord,
}
