//! Per-requester search result cache
//!
//! Each requester owns at most one result set: the one produced by its latest
//! search. Later "add song N" selections are resolved against that set only.
//!
//! Locking is two-level. The map lock is held just long enough to find or
//! create a requester's slot; the slot's own mutex then serializes store and
//! read for that requester without blocking anyone else.

use piplay_common::SongRecord;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;
use uuid::Uuid;

use crate::error::{Error, Result};

/// Identity of the session a search was made for
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct RequesterId(String);

impl RequesterId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequesterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RequesterId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Songs returned by one search, in catalog order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResultSet {
    pub search_id: Uuid,
    pub query: String,
    pub songs: Vec<SongRecord>,
}

impl SearchResultSet {
    pub fn new(query: impl Into<String>, songs: Vec<SongRecord>) -> Self {
        Self {
            search_id: Uuid::new_v4(),
            query: query.into(),
            songs,
        }
    }

    pub fn empty(query: impl Into<String>) -> Self {
        Self::new(query, Vec::new())
    }

    pub fn len(&self) -> usize {
        self.songs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.songs.is_empty()
    }

    /// Resolve a one-based position; `0` means "no selection"
    pub fn select(&self, index: usize) -> Result<Option<&SongRecord>> {
        if index == 0 {
            return Ok(None);
        }
        self.songs
            .get(index - 1)
            .map(Some)
            .ok_or(Error::IndexOutOfRange {
                index,
                len: self.songs.len(),
            })
    }
}

type Slot = Arc<Mutex<Option<Arc<SearchResultSet>>>>;

#[derive(Default)]
pub struct SearchResultCache {
    entries: RwLock<HashMap<RequesterId, Slot>>,
}

impl SearchResultCache {
    pub fn new() -> Self {
        Self::default()
    }

    async fn existing_slot(&self, requester: &RequesterId) -> Option<Slot> {
        self.entries.read().await.get(requester).cloned()
    }

    async fn slot_or_insert(&self, requester: &RequesterId) -> Slot {
        if let Some(slot) = self.existing_slot(requester).await {
            return slot;
        }
        let mut entries = self.entries.write().await;
        Arc::clone(entries.entry(requester.clone()).or_default())
    }

    /// Replace the requester's result set; earlier indices stop applying
    pub async fn store(&self, requester: &RequesterId, set: SearchResultSet) -> Arc<SearchResultSet> {
        let set = Arc::new(set);
        let slot = self.slot_or_insert(requester).await;
        let mut current = slot.lock().await;

        if let Some(previous) = current.as_ref() {
            debug!(
                requester = %requester,
                previous = %previous.search_id,
                current = %set.search_id,
                "Superseding search results"
            );
        }
        *current = Some(Arc::clone(&set));
        set
    }

    /// The requester's current result set
    pub async fn get(&self, requester: &RequesterId) -> Result<Arc<SearchResultSet>> {
        let slot = self
            .existing_slot(requester)
            .await
            .ok_or_else(|| Error::NotFound(format!("no search results for {}", requester)))?;
        let current = slot.lock().await;
        current
            .clone()
            .ok_or_else(|| Error::NotFound(format!("no search results for {}", requester)))
    }

    /// Resolve a one-based index against the requester's current set
    ///
    /// `0` is "no selection" whatever the cache holds. Anything outside
    /// `1..=len` is `IndexOutOfRange`, with `len` 0 when nothing was stored.
    pub async fn resolve_index(
        &self,
        requester: &RequesterId,
        index: usize,
    ) -> Result<Option<SongRecord>> {
        self.resolve_selection(requester, index, None).await
    }

    /// Like [`resolve_index`](Self::resolve_index), additionally rejecting a
    /// selection made against a result set that is no longer current
    pub async fn resolve_selection(
        &self,
        requester: &RequesterId,
        index: usize,
        search_id: Option<Uuid>,
    ) -> Result<Option<SongRecord>> {
        if index == 0 {
            return Ok(None);
        }

        let Some(slot) = self.existing_slot(requester).await else {
            return Err(match search_id {
                Some(id) => Error::StaleSelection(id),
                None => Error::IndexOutOfRange { index, len: 0 },
            });
        };
        let current = slot.lock().await;

        let Some(set) = current.as_ref() else {
            return Err(Error::IndexOutOfRange { index, len: 0 });
        };

        if let Some(id) = search_id {
            if id != set.search_id {
                return Err(Error::StaleSelection(id));
            }
        }

        Ok(set.select(index)?.cloned())
    }

    /// Drop the requester's entry once its session is over
    pub async fn forget(&self, requester: &RequesterId) -> bool {
        let removed = self.entries.write().await.remove(requester).is_some();
        if removed {
            debug!(requester = %requester, "Forgot search results");
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str) -> SongRecord {
        SongRecord {
            catalog_id: id.to_string(),
            title: format!("Title {}", id),
            artist: "Artist".to_string(),
            album: "Album".to_string(),
            stream_url: format!("http://m/{}.mp3", id),
        }
    }

    fn set(ids: &[&str]) -> SearchResultSet {
        SearchResultSet::new("q", ids.iter().map(|id| record(id)).collect())
    }

    #[tokio::test]
    async fn test_index_zero_is_no_selection() {
        let cache = SearchResultCache::new();
        let req = RequesterId::from("alice");

        // Nothing stored yet
        assert_eq!(cache.resolve_index(&req, 0).await.unwrap(), None);

        cache.store(&req, set(&["a", "b"])).await;
        assert_eq!(cache.resolve_index(&req, 0).await.unwrap(), None);

        cache.store(&req, set(&[])).await;
        assert_eq!(cache.resolve_index(&req, 0).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_one_based_resolution() {
        let cache = SearchResultCache::new();
        let req = RequesterId::from("alice");
        cache.store(&req, set(&["a", "b", "c"])).await;

        assert_eq!(cache.resolve_index(&req, 1).await.unwrap(), Some(record("a")));
        assert_eq!(cache.resolve_index(&req, 3).await.unwrap(), Some(record("c")));
    }

    #[tokio::test]
    async fn test_out_of_range() {
        let cache = SearchResultCache::new();
        let req = RequesterId::from("alice");

        assert!(matches!(
            cache.resolve_index(&req, 1).await,
            Err(Error::IndexOutOfRange { index: 1, len: 0 })
        ));

        cache.store(&req, set(&["a", "b"])).await;
        assert!(matches!(
            cache.resolve_index(&req, 3).await,
            Err(Error::IndexOutOfRange { index: 3, len: 2 })
        ));
        assert!(matches!(
            cache.resolve_index(&req, usize::MAX).await,
            Err(Error::IndexOutOfRange { .. })
        ));
    }

    #[tokio::test]
    async fn test_new_store_invalidates_previous_set() {
        let cache = SearchResultCache::new();
        let req = RequesterId::from("alice");

        let first = cache.store(&req, set(&["a", "b", "c"])).await;
        let second = cache.store(&req, set(&["x"])).await;

        // Old index 3 no longer exists, old index 1 points at the new set
        assert!(matches!(
            cache.resolve_index(&req, 3).await,
            Err(Error::IndexOutOfRange { index: 3, len: 1 })
        ));
        assert_eq!(cache.resolve_index(&req, 1).await.unwrap(), Some(record("x")));

        // Selections tagged with the old search id are rejected outright
        assert!(matches!(
            cache.resolve_selection(&req, 1, Some(first.search_id)).await,
            Err(Error::StaleSelection(id)) if id == first.search_id
        ));
        assert_eq!(
            cache
                .resolve_selection(&req, 1, Some(second.search_id))
                .await
                .unwrap(),
            Some(record("x"))
        );
    }

    #[tokio::test]
    async fn test_requesters_are_independent() {
        let cache = SearchResultCache::new();
        let alice = RequesterId::from("alice");
        let bob = RequesterId::from("bob");

        cache.store(&alice, set(&["a1", "a2"])).await;
        cache.store(&bob, set(&["b1"])).await;

        assert_eq!(cache.resolve_index(&alice, 2).await.unwrap(), Some(record("a2")));
        assert_eq!(cache.resolve_index(&bob, 1).await.unwrap(), Some(record("b1")));
        assert!(cache.resolve_index(&bob, 2).await.is_err());
    }

    #[tokio::test]
    async fn test_get_and_forget() {
        let cache = SearchResultCache::new();
        let req = RequesterId::from("alice");

        assert!(matches!(cache.get(&req).await, Err(Error::NotFound(_))));

        let stored = cache.store(&req, set(&["a"])).await;
        assert_eq!(cache.get(&req).await.unwrap().search_id, stored.search_id);

        assert!(cache.forget(&req).await);
        assert!(!cache.forget(&req).await);
        assert!(matches!(cache.get(&req).await, Err(Error::NotFound(_))));
        assert!(matches!(
            cache.resolve_index(&req, 1).await,
            Err(Error::IndexOutOfRange { len: 0, .. })
        ));
    }

    #[tokio::test]
    async fn test_concurrent_stores_for_many_requesters() {
        let cache = Arc::new(SearchResultCache::new());

        let mut handles = Vec::new();
        for n in 0..32 {
            let cache = Arc::clone(&cache);
            handles.push(tokio::spawn(async move {
                let req = RequesterId::new(format!("req-{}", n));
                let id = format!("song-{}", n);
                cache.store(&req, set(&[id.as_str()])).await;
                cache.resolve_index(&req, 1).await.unwrap().unwrap()
            }));
        }

        for (n, handle) in handles.into_iter().enumerate() {
            let song = handle.await.unwrap();
            assert_eq!(song.catalog_id, format!("song-{}", n));
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_same_requester_selection_never_crosses_sets() {
        let cache = Arc::new(SearchResultCache::new());
        let req = RequesterId::from("shared");

        let mut handles = Vec::new();
        for n in 0..16 {
            let cache = Arc::clone(&cache);
            let req = req.clone();
            handles.push(tokio::spawn(async move {
                let prefix = format!("set{}", n);
                let ids: Vec<String> = (0..3).map(|i| format!("{}-{}", prefix, i)).collect();
                let ids: Vec<&str> = ids.iter().map(String::as_str).collect();

                for _ in 0..50 {
                    let stored = cache.store(&req, set(&ids)).await;
                    for index in 1..=3 {
                        match cache
                            .resolve_selection(&req, index, Some(stored.search_id))
                            .await
                        {
                            Ok(Some(song)) => {
                                assert_eq!(song.catalog_id, format!("{}-{}", prefix, index - 1))
                            }
                            Ok(None) => panic!("index {} resolved to no selection", index),
                            Err(Error::StaleSelection(id)) => assert_eq!(id, stored.search_id),
                            Err(e) => panic!("unexpected error {:?}", e),
                        }
                    }
                    tokio::task::yield_now().await;
                }
            }));
        }

        for handle in handles {
            handle.await.unwrap();
        }

        // Whatever set won last is intact
        let current = cache.get(&req).await.unwrap();
        assert_eq!(current.len(), 3);
        let prefix = current.songs[0].catalog_id.split('-').next().unwrap().to_string();
        let owner = format!("{}-", prefix);
        assert!(current.songs.iter().all(|s| s.catalog_id.starts_with(&owner)));
    }
}
