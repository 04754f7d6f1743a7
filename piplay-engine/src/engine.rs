//! Engine facade
//!
//! Ties the catalog, the per-requester result cache, the playlist store and
//! the player together behind the four operations the front ends call:
//! [`resolve_search`](Engine::resolve_search),
//! [`select_from_search`](Engine::select_from_search),
//! [`play_from`](Engine::play_from) and
//! [`stop_playback`](Engine::stop_playback).

use piplay_common::config::TomlConfig;
use piplay_common::{PlayerEvent, SongRecord};
use serde::Serialize;
use sqlx::SqlitePool;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{info, warn};
use uuid::Uuid;

use crate::catalog::{Catalog, NeteaseClient};
use crate::error::{Error, Result};
use crate::playback::{PlayerController, PlayerStatus, QueueBuilder};
use crate::search::{RequesterId, SearchResolver, SearchResultCache, SearchResultSet};
use crate::store::{PlaylistStore, SqlitePlaylistStore};

/// Outcome of a playback command
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaybackAck {
    pub session: Option<Uuid>,
    pub queue_len: usize,
    pub message: String,
}

pub struct Engine {
    resolver: SearchResolver,
    cache: SearchResultCache,
    store: Arc<dyn PlaylistStore>,
    queue_builder: QueueBuilder,
    player: PlayerController,
}

impl Engine {
    pub fn new(
        catalog: Arc<dyn Catalog>,
        store: Arc<dyn PlaylistStore>,
        queue_builder: QueueBuilder,
        player: PlayerController,
    ) -> Self {
        Self {
            resolver: SearchResolver::new(catalog),
            cache: SearchResultCache::new(),
            store,
            queue_builder,
            player,
        }
    }

    /// Engine backed by the NetEase catalog and the SQLite playlist database
    pub fn from_config(config: &TomlConfig, pool: SqlitePool) -> Result<Self> {
        let catalog = NeteaseClient::new(&config.catalog)?;
        Ok(Self::new(
            Arc::new(catalog),
            Arc::new(SqlitePlaylistStore::new(pool)),
            QueueBuilder::new(config.playback.shuffle_seed),
            PlayerController::from_config(&config.player),
        ))
    }

    /// Search the catalog and make the result the requester's current set
    ///
    /// The requester's previous set is invalidated even when the search
    /// fails; an empty set takes its place.
    pub async fn resolve_search(
        &self,
        query: &str,
        requester: &RequesterId,
    ) -> Result<Arc<SearchResultSet>> {
        match self.search_and_store(query, requester).await {
            (set, None) => Ok(set),
            (_, Some(e)) => Err(e),
        }
    }

    /// Like [`resolve_search`](Self::resolve_search), but a recoverable
    /// catalog failure yields the empty set stored in its place together with
    /// the error that caused it
    pub async fn resolve_search_lenient(
        &self,
        query: &str,
        requester: &RequesterId,
    ) -> Result<(Arc<SearchResultSet>, Option<Error>)> {
        match self.search_and_store(query, requester).await {
            (_, Some(e)) if !e.is_recoverable() => Err(e),
            outcome => Ok(outcome),
        }
    }

    async fn search_and_store(
        &self,
        query: &str,
        requester: &RequesterId,
    ) -> (Arc<SearchResultSet>, Option<Error>) {
        match self.resolver.resolve(query).await {
            Ok(songs) => {
                let set = self
                    .cache
                    .store(requester, SearchResultSet::new(query.trim(), songs))
                    .await;
                info!(
                    requester = %requester,
                    search_id = %set.search_id,
                    results = set.len(),
                    "Stored search results"
                );
                (set, None)
            }
            Err(e) => {
                warn!(requester = %requester, query = %query, error = %e, "Search failed");
                let set = self
                    .cache
                    .store(requester, SearchResultSet::empty(query.trim()))
                    .await;
                (set, Some(e))
            }
        }
    }

    /// The requester's current result set
    pub async fn current_search(&self, requester: &RequesterId) -> Result<Arc<SearchResultSet>> {
        self.cache.get(requester).await
    }

    /// Discard the requester's results; returns whether there were any
    pub async fn forget_search(&self, requester: &RequesterId) -> bool {
        self.cache.forget(requester).await
    }

    /// Resolve a one-based index against the requester's current results
    ///
    /// When `search_id` is given it must name the current set.
    pub async fn select_from_search(
        &self,
        requester: &RequesterId,
        index: usize,
        search_id: Option<Uuid>,
    ) -> Result<Option<SongRecord>> {
        self.cache
            .resolve_selection(requester, index, search_id)
            .await
    }

    /// Play `song_id` first, then the rest of `playlist_id` shuffled
    pub async fn play_from(&self, song_id: i64, playlist_id: i64) -> Result<PlaybackAck> {
        let song = self
            .store
            .get_song(song_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("song {}", song_id)))?;

        let playlist = self
            .store
            .get_playlist_by_id(playlist_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("playlist {}", playlist_id)))?;

        if song.playlist_id != playlist.playlist_id {
            return Err(Error::NotFound(format!(
                "song {} in playlist {}",
                song_id, playlist_id
            )));
        }

        let records: Vec<SongRecord> = self
            .store
            .get_playlist_songs(playlist.playlist_id)
            .await?
            .into_iter()
            .map(|s| s.record)
            .collect();

        let queue = self.queue_builder.build(&song.record, &records);
        let queue_len = queue.len();
        let session = self.player.start(queue).await?;

        info!(
            song_id,
            playlist = %playlist.label,
            queue_len,
            session = %session,
            "Playback started"
        );

        Ok(PlaybackAck {
            session: Some(session),
            queue_len,
            message: format!("Playing {} from {}", song.record.title, playlist.label),
        })
    }

    /// Stop playback; a no-op when nothing is playing
    pub async fn stop_playback(&self) -> Result<PlaybackAck> {
        let stopped = self.player.stop().await?;
        let message = match stopped {
            Some(_) => "Playback stopped",
            None => "Nothing was playing",
        };
        Ok(PlaybackAck {
            session: stopped,
            queue_len: 0,
            message: message.to_string(),
        })
    }

    pub async fn player_status(&self) -> PlayerStatus {
        self.player.status().await
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<PlayerEvent> {
        self.player.subscribe()
    }
}
