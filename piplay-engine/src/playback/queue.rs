//! Playback queue construction
//!
//! The chosen song always plays first; the rest of its playlist follows in
//! shuffled order.

use piplay_common::SongRecord;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::sync::Mutex;
use tracing::debug;

/// Ordered stream URLs handed to the player
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct PlaybackQueue {
    urls: Vec<String>,
}

impl PlaybackQueue {
    pub fn new(urls: Vec<String>) -> Self {
        Self { urls }
    }

    pub fn urls(&self) -> &[String] {
        &self.urls
    }

    pub fn first(&self) -> Option<&str> {
        self.urls.first().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }
}

/// `[chosen] ++ shuffle(playlist - chosen)`
///
/// Every playlist record sharing the chosen song's catalog id is left out of
/// the remainder.
pub fn build_queue<R>(chosen: &SongRecord, playlist_songs: &[SongRecord], rng: &mut R) -> PlaybackQueue
where
    R: Rng + ?Sized,
{
    let mut rest: Vec<&SongRecord> = playlist_songs
        .iter()
        .filter(|s| s.catalog_id != chosen.catalog_id)
        .collect();
    rest.shuffle(rng);

    let mut urls = Vec::with_capacity(rest.len() + 1);
    urls.push(chosen.stream_url.clone());
    urls.extend(rest.into_iter().map(|s| s.stream_url.clone()));

    PlaybackQueue::new(urls)
}

/// Queue builder owning the engine's random source
pub struct QueueBuilder {
    rng: Mutex<StdRng>,
}

impl QueueBuilder {
    /// Seeded for reproducible shuffles, or from OS entropy when `seed` is `None`
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            rng: Mutex::new(rng),
        }
    }

    pub fn build(&self, chosen: &SongRecord, playlist_songs: &[SongRecord]) -> PlaybackQueue {
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let queue = build_queue(chosen, playlist_songs, &mut *rng);
        debug!(
            chosen = %chosen.catalog_id,
            queue_len = queue.len(),
            "Built playback queue"
        );
        queue
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn record(id: &str) -> SongRecord {
        SongRecord {
            catalog_id: id.to_string(),
            title: id.to_uppercase(),
            artist: "Artist".to_string(),
            album: String::new(),
            stream_url: format!("http://m/{}.mp3", id),
        }
    }

    #[test]
    fn test_empty_playlist_gives_singleton() {
        let chosen = record("c");
        let mut rng = StdRng::seed_from_u64(1);
        let queue = build_queue(&chosen, &[], &mut rng);
        assert_eq!(queue.urls(), ["http://m/c.mp3".to_string()]);
    }

    #[test]
    fn test_chosen_first_and_excluded_from_rest() {
        let chosen = record("b");
        let playlist = vec![record("a"), record("b"), record("c"), record("b")];
        let mut rng = StdRng::seed_from_u64(99);

        let queue = build_queue(&chosen, &playlist, &mut rng);

        assert_eq!(queue.first(), Some("http://m/b.mp3"));
        assert_eq!(queue.len(), 3);
        let rest: HashSet<&str> = queue.urls()[1..].iter().map(String::as_str).collect();
        assert_eq!(rest, HashSet::from(["http://m/a.mp3", "http://m/c.mp3"]));
    }

    #[test]
    fn test_same_seed_same_order() {
        let chosen = record("x");
        let playlist: Vec<SongRecord> = ["s1", "s2", "s3"].iter().map(|id| record(id)).collect();

        let first = build_queue(&chosen, &playlist, &mut StdRng::seed_from_u64(42));
        for _ in 0..10 {
            let again = build_queue(&chosen, &playlist, &mut StdRng::seed_from_u64(42));
            assert_eq!(first, again);
        }
    }

    #[test]
    fn test_shuffle_reaches_every_permutation() {
        let chosen = record("x");
        let playlist: Vec<SongRecord> = ["s1", "s2", "s3"].iter().map(|id| record(id)).collect();
        let mut rng = StdRng::seed_from_u64(7);

        let mut seen = HashSet::new();
        for _ in 0..600 {
            seen.insert(build_queue(&chosen, &playlist, &mut rng));
        }
        assert_eq!(seen.len(), 6, "All 3! orderings of the remainder should occur");
    }

    #[test]
    fn test_builder_with_seed_is_reproducible() {
        let chosen = record("x");
        let playlist: Vec<SongRecord> = (0..8).map(|n| record(&format!("s{}", n))).collect();

        let a = QueueBuilder::new(Some(5));
        let b = QueueBuilder::new(Some(5));
        assert_eq!(a.build(&chosen, &playlist), b.build(&chosen, &playlist));
        assert_eq!(a.build(&chosen, &playlist), b.build(&chosen, &playlist));
    }
}
