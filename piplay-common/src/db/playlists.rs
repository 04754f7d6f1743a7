//! Playlist and song reads

use crate::db::models::{Playlist, SongRecord, StoredSong};
use crate::Result;
use sqlx::SqlitePool;

type SongRow = (i64, i64, String, String, Option<String>, Option<String>, String);

const SONG_COLUMNS: &str = "song_id, in_playlist, CAST(netease_id AS TEXT), song_name, \
                            artist_name, album_name, mp3_url";

fn song_from_row(row: SongRow) -> StoredSong {
    StoredSong {
        song_id: row.0,
        playlist_id: row.1,
        record: SongRecord {
            catalog_id: row.2,
            title: row.3,
            artist: row.4.unwrap_or_default(),
            album: row.5.unwrap_or_default(),
            stream_url: row.6,
        },
    }
}

/// Look up a playlist by id
pub async fn get_playlist_by_id(pool: &SqlitePool, playlist_id: i64) -> Result<Option<Playlist>> {
    let row = sqlx::query_as::<_, (i64, String, Option<String>)>(
        "SELECT playlist_id, label, comment FROM playlist WHERE playlist_id = ?",
    )
    .bind(playlist_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|(playlist_id, label, comment)| Playlist {
        playlist_id,
        label,
        comment,
    }))
}

/// All songs of a playlist, newest first
pub async fn get_playlist_songs(pool: &SqlitePool, playlist_id: i64) -> Result<Vec<StoredSong>> {
    let rows = sqlx::query_as::<_, SongRow>(&format!(
        "SELECT {} FROM song WHERE in_playlist = ? ORDER BY song_id DESC",
        SONG_COLUMNS
    ))
    .bind(playlist_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(song_from_row).collect())
}

/// Look up a single persisted song
pub async fn get_song(pool: &SqlitePool, song_id: i64) -> Result<Option<StoredSong>> {
    let row = sqlx::query_as::<_, SongRow>(&format!(
        "SELECT {} FROM song WHERE song_id = ?",
        SONG_COLUMNS
    ))
    .bind(song_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(song_from_row))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init::create_schema;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn setup() -> SqlitePool {
        // One connection: every connection to sqlite::memory: is its own database
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        create_schema(&pool).await.unwrap();
        pool
    }

    #[tokio::test]
    async fn test_missing_playlist_is_none() {
        let pool = setup().await;
        assert!(get_playlist_by_id(&pool, 42).await.unwrap().is_none());
        assert!(get_song(&pool, 42).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_songs_read_back_with_null_columns() {
        let pool = setup().await;
        sqlx::query("INSERT INTO playlist (label, comment) VALUES ('road', NULL)")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query(
            "INSERT INTO song (in_playlist, netease_id, song_name, artist_name, album_name, mp3_url)
             VALUES (1, 1001, 'First', 'A', NULL, 'http://m/1.mp3'),
                    (1, '1002', 'Second', NULL, 'B', 'http://m/2.mp3')",
        )
        .execute(&pool)
        .await
        .unwrap();

        let playlist = get_playlist_by_id(&pool, 1).await.unwrap().unwrap();
        assert_eq!(playlist.label, "road");
        assert_eq!(playlist.comment, None);

        let songs = get_playlist_songs(&pool, 1).await.unwrap();
        assert_eq!(songs.len(), 2);
        // Newest first
        assert_eq!(songs[0].record.title, "Second");
        assert_eq!(songs[0].record.artist, "");
        assert_eq!(songs[1].record.catalog_id, "1001");
        assert_eq!(songs[1].record.album, "");

        let song = get_song(&pool, 1).await.unwrap().unwrap();
        assert_eq!(song.playlist_id, 1);
        assert_eq!(song.record.stream_url, "http://m/1.mp3");
    }
}
