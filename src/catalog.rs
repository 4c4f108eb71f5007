//! Catalog persistence for playlists and downloaded tracks.
//!
//! Backed by a local libsql database. The catalog answers one question for
//! the orchestrator ("which ids were already downloaded?") and records every
//! successful download exactly once.

use std::collections::HashSet;
use std::path::Path;

use anyhow::Context;
use libsql::{Builder, Connection, Row, params};

use crate::error::ArchiveError;

/// Row in the `playlists` table.
#[derive(Debug, Clone)]
pub struct PlaylistRow {
    pub playlist_id: String,
    pub playlist_url: String,
    pub playlist_title: Option<String>,
    pub created_at: String,
}

/// Row in the `videos` table. `title` is the actual filename stem produced by
/// the downloader, not the source metadata title.
#[derive(Debug, Clone)]
pub struct VideoRow {
    pub playlist_id: String,
    pub video_id: String,
    pub title: String,
    pub video_url: String,
    pub downloaded_at: String,
    pub file_path: String,
}

/// Wrapper around the libsql connection held for the whole run. Dropping the
/// store releases the connection on both success and failure paths.
pub struct CatalogStore {
    conn: Connection,
}

impl CatalogStore {
    /// Opens (and if necessary creates) the catalog database.
    pub async fn open(path: &Path) -> Result<Self, ArchiveError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let db = Builder::new_local(path)
            .build()
            .await
            .map_err(ArchiveError::Connection)?;
        let conn = db.connect().map_err(ArchiveError::Connection)?;
        // `PRAGMA journal_mode` returns a row, which `execute_batch` rejects
        // with `ExecuteReturnedRows`; it has to go through `query`.
        conn.query("PRAGMA journal_mode=WAL", ())
            .await
            .map_err(ArchiveError::Connection)?;
        conn.execute_batch("PRAGMA synchronous=NORMAL;")
            .await
            .map_err(ArchiveError::Connection)?;

        Ok(Self { conn })
    }

    /// Idempotently creates the two tables. Purely additive; existing columns
    /// are never mutated.
    pub async fn ensure_schema(&self) -> Result<(), ArchiveError> {
        self.conn
            .execute_batch(
                r#"
                CREATE TABLE IF NOT EXISTS playlists (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    playlist_id TEXT NOT NULL UNIQUE,
                    playlist_url TEXT NOT NULL,
                    playlist_title TEXT,
                    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
                );

                CREATE TABLE IF NOT EXISTS videos (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    playlist_id TEXT NOT NULL,
                    video_id TEXT NOT NULL,
                    title TEXT NOT NULL,
                    video_url TEXT NOT NULL,
                    downloaded_at TEXT NOT NULL,
                    file_path TEXT NOT NULL,
                    UNIQUE(playlist_id, video_id)
                );
                "#,
            )
            .await?;
        Ok(())
    }

    /// Inserts the playlist or, when the unique key conflicts, overwrites its
    /// url and title (last write wins; rows are never deleted).
    pub async fn upsert_playlist(
        &self,
        playlist_id: &str,
        playlist_url: &str,
        playlist_title: Option<&str>,
    ) -> Result<(), ArchiveError> {
        self.conn
            .execute(
                r#"
                INSERT INTO playlists (playlist_id, playlist_url, playlist_title)
                VALUES (?1, ?2, ?3)
                ON CONFLICT(playlist_id) DO UPDATE SET
                    playlist_url = excluded.playlist_url,
                    playlist_title = excluded.playlist_title
                "#,
                params![playlist_id, playlist_url, playlist_title],
            )
            .await?;
        Ok(())
    }

    /// All video ids already recorded for the playlist; the orchestrator's
    /// skip-filter.
    pub async fn existing_video_ids(
        &self,
        playlist_id: &str,
    ) -> Result<HashSet<String>, ArchiveError> {
        let mut rows = self
            .conn
            .query(
                "SELECT video_id FROM videos WHERE playlist_id = ?1",
                params![playlist_id],
            )
            .await?;

        let mut ids = HashSet::new();
        while let Some(row) = rows.next().await? {
            ids.insert(row.get::<String>(0)?);
        }
        Ok(ids)
    }

    /// Records one successful download. A unique-pair violation surfaces as
    /// an error; it is not suppressed or retried.
    pub async fn insert_video(&self, video: &VideoRow) -> Result<(), ArchiveError> {
        self.conn
            .execute(
                r#"
                INSERT INTO videos (
                    playlist_id, video_id, title, video_url, downloaded_at, file_path
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
                params![
                    video.playlist_id.as_str(),
                    video.video_id.as_str(),
                    video.title.as_str(),
                    video.video_url.as_str(),
                    video.downloaded_at.as_str(),
                    video.file_path.as_str(),
                ],
            )
            .await?;
        Ok(())
    }

    /// Fetches one playlist row. Used by tests and diagnostics.
    pub async fn playlist(&self, playlist_id: &str) -> anyhow::Result<Option<PlaylistRow>> {
        let mut rows = self
            .conn
            .query(
                r#"
                SELECT playlist_id, playlist_url, playlist_title, created_at
                FROM playlists
                WHERE playlist_id = ?1
                "#,
                params![playlist_id],
            )
            .await?;

        let Some(row) = rows.next().await? else {
            return Ok(None);
        };
        Ok(Some(PlaylistRow {
            playlist_id: row.get(0)?,
            playlist_url: row.get(1)?,
            playlist_title: row.get(2)?,
            created_at: row.get(3)?,
        }))
    }

    /// All recorded downloads for a playlist, in insertion order.
    pub async fn videos_for_playlist(&self, playlist_id: &str) -> anyhow::Result<Vec<VideoRow>> {
        let mut rows = self
            .conn
            .query(
                r#"
                SELECT playlist_id, video_id, title, video_url, downloaded_at, file_path
                FROM videos
                WHERE playlist_id = ?1
                ORDER BY id ASC
                "#,
                params![playlist_id],
            )
            .await?;

        let mut videos = Vec::new();
        while let Some(row) = rows.next().await? {
            videos.push(row_to_video(&row).context("reading video row")?);
        }
        Ok(videos)
    }
}

fn row_to_video(row: &Row) -> anyhow::Result<VideoRow> {
    Ok(VideoRow {
        playlist_id: row.get(0)?,
        video_id: row.get(1)?,
        title: row.get(2)?,
        video_url: row.get(3)?,
        downloaded_at: row.get(4)?,
        file_path: row.get(5)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample_video(playlist_id: &str, video_id: &str) -> VideoRow {
        VideoRow {
            playlist_id: playlist_id.to_owned(),
            video_id: video_id.to_owned(),
            title: format!("Artist - {video_id}"),
            video_url: format!("https://www.youtube.com/watch?v={video_id}"),
            downloaded_at: "2024-06-01T12:00:00Z".to_owned(),
            file_path: format!("downloads/Artist - {video_id}.mp3"),
        }
    }

    async fn open_store() -> (tempfile::TempDir, CatalogStore) {
        let dir = tempdir().unwrap();
        let store = CatalogStore::open(&dir.path().join("catalog/test.db"))
            .await
            .unwrap();
        store.ensure_schema().await.unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn ensure_schema_is_idempotent() {
        let (_dir, store) = open_store().await;
        store.ensure_schema().await.unwrap();

        for table in ["playlists", "videos"] {
            let mut rows = store
                .conn
                .query(
                    "SELECT name FROM sqlite_master WHERE type='table' AND name=?1",
                    [table],
                )
                .await
                .unwrap();
            assert!(rows.next().await.unwrap().is_some(), "{table} missing");
        }
    }

    #[tokio::test]
    async fn upsert_playlist_overwrites_url_and_title() {
        let (_dir, store) = open_store().await;

        store
            .upsert_playlist("PL1", "https://old.example/playlist", None)
            .await
            .unwrap();
        store
            .upsert_playlist("PL1", "https://new.example/playlist", Some("Mix"))
            .await
            .unwrap();

        let mut rows = store
            .conn
            .query("SELECT COUNT(*) FROM playlists", params![])
            .await
            .unwrap();
        let count: i64 = rows.next().await.unwrap().unwrap().get(0).unwrap();
        assert_eq!(count, 1);

        let playlist = store.playlist("PL1").await.unwrap().expect("row exists");
        assert_eq!(playlist.playlist_url, "https://new.example/playlist");
        assert_eq!(playlist.playlist_title.as_deref(), Some("Mix"));
        assert!(!playlist.created_at.is_empty());
    }

    #[tokio::test]
    async fn existing_video_ids_filters_by_playlist() {
        let (_dir, store) = open_store().await;
        store.insert_video(&sample_video("PL1", "a")).await.unwrap();
        store.insert_video(&sample_video("PL1", "b")).await.unwrap();
        store.insert_video(&sample_video("PL2", "c")).await.unwrap();

        let ids = store.existing_video_ids("PL1").await.unwrap();
        assert_eq!(ids, HashSet::from(["a".to_owned(), "b".to_owned()]));
        assert!(store.existing_video_ids("PL3").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn duplicate_video_insert_fails() {
        let (_dir, store) = open_store().await;
        store
            .insert_video(&sample_video("PL1", "dup"))
            .await
            .unwrap();
        let err = store.insert_video(&sample_video("PL1", "dup")).await;
        assert!(matches!(err, Err(ArchiveError::Catalog(_))));

        // Same id under a different playlist is fine.
        store
            .insert_video(&sample_video("PL2", "dup"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn videos_round_trip_in_insertion_order() {
        let (_dir, store) = open_store().await;
        store
            .insert_video(&sample_video("PL1", "first"))
            .await
            .unwrap();
        store
            .insert_video(&sample_video("PL1", "second"))
            .await
            .unwrap();

        let videos = store.videos_for_playlist("PL1").await.unwrap();
        assert_eq!(videos.len(), 2);
        assert_eq!(videos[0].video_id, "first");
        assert_eq!(videos[1].video_id, "second");
        assert_eq!(videos[0].title, "Artist - first");
        assert_eq!(videos[0].file_path, "downloads/Artist - first.mp3");
    }

    #[tokio::test]
    async fn open_creates_parent_directories() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/deeper/catalog.db");
        let store = CatalogStore::open(&path).await.unwrap();
        store.ensure_schema().await.unwrap();
        assert!(path.exists());
    }
}
