//! Music catalog access
//!
//! The catalog answers searches in one of two shapes: songs that already carry
//! a playable URL, or bare id stubs that need a second detail lookup. The shape
//! is decided once, here, and handed on as [`CatalogSearchResult`].

pub mod netease;

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;
use tracing::warn;

pub use netease::NeteaseClient;

/// Catalog client errors
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Network failure, timeout or failure status
    #[error("{0}")]
    Unavailable(String),

    /// Payload could not be parsed
    #[error("{0}")]
    BadResponse(String),
}

/// Song entry as the catalog returns it. Every field may be missing.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct CatalogSong {
    #[serde(default, deserialize_with = "deserialize_catalog_id")]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub artists: Option<Vec<CatalogArtist>>,
    #[serde(default)]
    pub album: Option<CatalogAlbum>,
    #[serde(rename = "mp3Url", default)]
    pub mp3_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct CatalogArtist {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct CatalogAlbum {
    #[serde(default)]
    pub name: Option<String>,
}

impl CatalogSong {
    /// True when the entry can be played without a detail lookup
    pub fn has_stream_url(&self) -> bool {
        self.mp3_url.as_deref().is_some_and(|u| !u.trim().is_empty())
    }
}

/// Catalog ids arrive as JSON numbers or strings
fn deserialize_catalog_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        Some(serde_json::Value::String(s)) if !s.is_empty() => Some(s),
        _ => None,
    })
}

/// Search response, classified by the shape of its first entry
#[derive(Debug, Clone, PartialEq)]
pub enum CatalogSearchResult {
    /// No song entries at all
    Empty,
    /// Entries carry playable URLs
    Direct(Vec<CatalogSong>),
    /// Entries are id-only stubs; ids kept in search order
    Stubs(Vec<String>),
}

impl CatalogSearchResult {
    pub fn from_songs(songs: Vec<CatalogSong>) -> Self {
        let Some(first) = songs.first() else {
            return CatalogSearchResult::Empty;
        };

        if first.has_stream_url() {
            return CatalogSearchResult::Direct(songs);
        }

        let total = songs.len();
        let ids: Vec<String> = songs.into_iter().filter_map(|s| s.id).collect();
        if ids.len() < total {
            warn!(
                dropped = total - ids.len(),
                "Dropping catalog stubs without an id"
            );
        }

        if ids.is_empty() {
            CatalogSearchResult::Empty
        } else {
            CatalogSearchResult::Stubs(ids)
        }
    }

    pub fn len(&self) -> usize {
        match self {
            CatalogSearchResult::Empty => 0,
            CatalogSearchResult::Direct(songs) => songs.len(),
            CatalogSearchResult::Stubs(ids) => ids.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Remote music catalog
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Free-text song search
    async fn search(&self, query: &str) -> Result<CatalogSearchResult, CatalogError>;

    /// Full song entries (with URLs) for the given ids, in any order
    async fn fetch_details(&self, ids: &[String]) -> Result<Vec<CatalogSong>, CatalogError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn song(id: &str, url: Option<&str>) -> CatalogSong {
        CatalogSong {
            id: Some(id.to_string()),
            name: Some(format!("song {}", id)),
            mp3_url: url.map(String::from),
            ..Default::default()
        }
    }

    #[test]
    fn test_numeric_and_string_ids() {
        let songs: Vec<CatalogSong> =
            serde_json::from_str(r#"[{"id": 186016}, {"id": "abc"}, {"id": null}, {}]"#).unwrap();
        assert_eq!(songs[0].id.as_deref(), Some("186016"));
        assert_eq!(songs[1].id.as_deref(), Some("abc"));
        assert_eq!(songs[2].id, None);
        assert_eq!(songs[3].id, None);
    }

    #[test]
    fn test_classify_by_first_entry() {
        assert_eq!(CatalogSearchResult::from_songs(vec![]), CatalogSearchResult::Empty);

        let direct = CatalogSearchResult::from_songs(vec![song("1", Some("http://x/1.mp3"))]);
        assert!(matches!(direct, CatalogSearchResult::Direct(ref s) if s.len() == 1));

        let stubs = CatalogSearchResult::from_songs(vec![song("a", None), song("b", Some(""))]);
        assert_eq!(
            stubs,
            CatalogSearchResult::Stubs(vec!["a".to_string(), "b".to_string()])
        );
    }

    #[test]
    fn test_stubs_without_ids_are_dropped() {
        let result = CatalogSearchResult::from_songs(vec![
            song("a", None),
            CatalogSong::default(),
            song("c", None),
        ]);
        assert_eq!(
            result,
            CatalogSearchResult::Stubs(vec!["a".to_string(), "c".to_string()])
        );

        let all_bad = CatalogSearchResult::from_songs(vec![CatalogSong::default()]);
        assert!(all_bad.is_empty());
    }
}
