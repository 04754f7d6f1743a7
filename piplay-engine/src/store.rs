//! Playlist storage seam
//!
//! The engine only reads playlists. [`SqlitePlaylistStore`] serves them from
//! the shared database; tests can plug in anything implementing
//! [`PlaylistStore`].

use async_trait::async_trait;
use piplay_common::db;
use piplay_common::{Playlist, StoredSong};
use sqlx::SqlitePool;

#[async_trait]
pub trait PlaylistStore: Send + Sync {
    async fn get_playlist_by_id(&self, playlist_id: i64) -> piplay_common::Result<Option<Playlist>>;

    /// Songs of a playlist, newest first
    async fn get_playlist_songs(&self, playlist_id: i64) -> piplay_common::Result<Vec<StoredSong>>;

    async fn get_song(&self, song_id: i64) -> piplay_common::Result<Option<StoredSong>>;
}

#[derive(Clone)]
pub struct SqlitePlaylistStore {
    pool: SqlitePool,
}

impl SqlitePlaylistStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PlaylistStore for SqlitePlaylistStore {
    async fn get_playlist_by_id(&self, playlist_id: i64) -> piplay_common::Result<Option<Playlist>> {
        db::get_playlist_by_id(&self.pool, playlist_id).await
    }

    async fn get_playlist_songs(&self, playlist_id: i64) -> piplay_common::Result<Vec<StoredSong>> {
        db::get_playlist_songs(&self.pool, playlist_id).await
    }

    async fn get_song(&self, song_id: i64) -> piplay_common::Result<Option<StoredSong>> {
        db::get_song(&self.pool, song_id).await
    }
}
