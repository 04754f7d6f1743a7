//! Search resolution
//!
//! Turns a free-text query into playable [`SongRecord`]s, doing the second
//! detail lookup when the catalog only returned id stubs.

use piplay_common::SongRecord;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::catalog::{Catalog, CatalogSearchResult, CatalogSong};
use crate::error::{Error, Result};

pub struct SearchResolver {
    catalog: Arc<dyn Catalog>,
}

impl SearchResolver {
    pub fn new(catalog: Arc<dyn Catalog>) -> Self {
        Self { catalog }
    }

    /// Resolve a query into songs, in catalog search order
    ///
    /// An empty list means "not found" and is not an error.
    pub async fn resolve(&self, query: &str) -> Result<Vec<SongRecord>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(Error::InvalidQuery);
        }

        let entries = match self.catalog.search(query).await? {
            CatalogSearchResult::Empty => {
                info!(query = %query, "No catalog results");
                return Ok(Vec::new());
            }
            CatalogSearchResult::Direct(songs) => songs,
            CatalogSearchResult::Stubs(ids) => self.fetch_in_search_order(&ids).await?,
        };

        let songs: Vec<SongRecord> = entries.iter().filter_map(to_song_record).collect();

        info!(
            query = %query,
            returned = entries.len(),
            resolved = songs.len(),
            "Search resolved"
        );
        Ok(songs)
    }

    /// One detail lookup for all stub ids, rejoined by id in search order
    async fn fetch_in_search_order(&self, ids: &[String]) -> Result<Vec<CatalogSong>> {
        debug!(count = ids.len(), "Resolving id-only search results");

        let details = self.catalog.fetch_details(ids).await?;

        let mut by_id: HashMap<String, CatalogSong> = HashMap::with_capacity(details.len());
        for song in details {
            if let Some(id) = song.id.clone() {
                by_id.entry(id).or_insert(song);
            }
        }

        Ok(ids
            .iter()
            .filter_map(|id| {
                let song = by_id.get(id).cloned();
                if song.is_none() {
                    warn!(catalog_id = %id, "Catalog returned no details for search result");
                }
                song
            })
            .collect())
    }
}

/// Map a catalog entry to a song record
///
/// Id, title, stream URL and at least one artist name are required; album is
/// optional. Entries missing a required field are dropped.
fn to_song_record(song: &CatalogSong) -> Option<SongRecord> {
    let id = non_empty(song.id.as_deref());
    let title = non_empty(song.name.as_deref());
    let stream_url = non_empty(song.mp3_url.as_deref());

    let artists: Vec<&str> = song
        .artists
        .iter()
        .flatten()
        .filter_map(|a| non_empty(a.name.as_deref()))
        .collect();

    let (Some(catalog_id), Some(title), Some(stream_url)) = (id, title, stream_url) else {
        warn!(
            catalog_id = ?song.id,
            title = ?song.name,
            has_url = song.has_stream_url(),
            "Dropping catalog entry with missing fields"
        );
        return None;
    };

    if artists.is_empty() {
        warn!(catalog_id = %catalog_id, "Dropping catalog entry without artist");
        return None;
    }

    Some(SongRecord {
        catalog_id: catalog_id.to_string(),
        title: title.to_string(),
        artist: artists.join(", "),
        album: song
            .album
            .as_ref()
            .and_then(|a| non_empty(a.name.as_deref()))
            .unwrap_or_default()
            .to_string(),
        stream_url: stream_url.to_string(),
    })
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CatalogAlbum, CatalogArtist};

    fn full_song(id: &str) -> CatalogSong {
        CatalogSong {
            id: Some(id.to_string()),
            name: Some(format!("Title {}", id)),
            artists: Some(vec![CatalogArtist {
                name: Some("Artist".to_string()),
            }]),
            album: Some(CatalogAlbum {
                name: Some("Album".to_string()),
            }),
            mp3_url: Some(format!("http://m/{}.mp3", id)),
        }
    }

    #[test]
    fn test_complete_entry_maps() {
        let record = to_song_record(&full_song("7")).unwrap();
        assert_eq!(
            record,
            SongRecord {
                catalog_id: "7".to_string(),
                title: "Title 7".to_string(),
                artist: "Artist".to_string(),
                album: "Album".to_string(),
                stream_url: "http://m/7.mp3".to_string(),
            }
        );
    }

    #[test]
    fn test_multiple_artists_joined() {
        let mut song = full_song("1");
        song.artists = Some(vec![
            CatalogArtist {
                name: Some("A".to_string()),
            },
            CatalogArtist { name: None },
            CatalogArtist {
                name: Some("B".to_string()),
            },
        ]);
        assert_eq!(to_song_record(&song).unwrap().artist, "A, B");
    }

    #[test]
    fn test_missing_album_is_empty() {
        let mut song = full_song("1");
        song.album = None;
        assert_eq!(to_song_record(&song).unwrap().album, "");
    }

    #[test]
    fn test_missing_required_fields_dropped() {
        let mut no_url = full_song("1");
        no_url.mp3_url = Some("  ".to_string());
        assert!(to_song_record(&no_url).is_none());

        let mut no_title = full_song("2");
        no_title.name = None;
        assert!(to_song_record(&no_title).is_none());

        let mut no_artist = full_song("3");
        no_artist.artists = Some(vec![]);
        assert!(to_song_record(&no_artist).is_none());

        let mut no_id = full_song("4");
        no_id.id = None;
        assert!(to_song_record(&no_id).is_none());
    }
}
