//! src/services/video_service.rs
//!
//! VideoService: metadata store for video records, backed by SQLite.
//! The upload pipeline reads and updates rows through it; records are created
//! by the API and never deleted here.

use crate::models::video::Video;
use sqlx::SqlitePool;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum VideoStoreError {
    #[error("video `{0}` not found")]
    NotFound(Uuid),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

pub type VideoStoreResult<T> = Result<T, VideoStoreError>;

const VIDEO_COLUMNS: &str = "id, user_id, title, description, created_at, updated_at, \
     thumbnail_url, video_url, video_bucket, video_key";

#[derive(Clone)]
pub struct VideoService {
    /// Shared SQLite connection pool used for metadata operations.
    pub db: Arc<SqlitePool>,
}

impl VideoService {
    pub fn new(db: Arc<SqlitePool>) -> Self {
        Self { db }
    }

    /// Insert a new record.
    pub async fn create_video(&self, video: &Video) -> VideoStoreResult<()> {
        sqlx::query(
            "INSERT INTO videos (id, user_id, title, description, created_at, updated_at,
                                 thumbnail_url, video_url, video_bucket, video_key)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(video.id)
        .bind(video.user_id)
        .bind(&video.title)
        .bind(&video.description)
        .bind(video.created_at)
        .bind(video.updated_at)
        .bind(&video.thumbnail_url)
        .bind(&video.video_url)
        .bind(&video.video_bucket)
        .bind(&video.video_key)
        .execute(&*self.db)
        .await?;

        debug!(video_id = %video.id, user_id = %video.user_id, "created video record");
        Ok(())
    }

    /// Fetch a record by ID. Returns NotFound if missing.
    pub async fn get_video(&self, id: Uuid) -> VideoStoreResult<Video> {
        sqlx::query_as::<_, Video>(&format!("SELECT {} FROM videos WHERE id = ?", VIDEO_COLUMNS))
            .bind(id)
            .fetch_one(&*self.db)
            .await
            .map_err(|err| match err {
                sqlx::Error::RowNotFound => VideoStoreError::NotFound(id),
                other => VideoStoreError::Sqlx(other),
            })
    }

    /// Persist `video.thumbnail_url` and bump `updated_at`.
    ///
    /// Only the thumbnail column is written, so a concurrent video upload on
    /// the same record is not reverted.
    pub async fn set_thumbnail(&self, video: &mut Video) -> VideoStoreResult<()> {
        video.updated_at = chrono::Utc::now();

        let result = sqlx::query("UPDATE videos SET thumbnail_url = ?, updated_at = ? WHERE id = ?")
            .bind(&video.thumbnail_url)
            .bind(video.updated_at)
            .bind(video.id)
            .execute(&*self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(VideoStoreError::NotFound(video.id));
        }

        debug!(video_id = %video.id, "updated thumbnail");
        Ok(())
    }

    /// Persist the three location columns and bump `updated_at`.
    ///
    /// The thumbnail column is left alone; the passed value picks up whatever
    /// thumbnail the row holds now.
    pub async fn set_video_location(&self, video: &mut Video) -> VideoStoreResult<()> {
        video.updated_at = chrono::Utc::now();

        let thumbnail_url = sqlx::query_scalar::<_, Option<String>>(
            "UPDATE videos
             SET video_url = ?, video_bucket = ?, video_key = ?, updated_at = ?
             WHERE id = ?
             RETURNING thumbnail_url",
        )
        .bind(&video.video_url)
        .bind(&video.video_bucket)
        .bind(&video.video_key)
        .bind(video.updated_at)
        .bind(video.id)
        .fetch_optional(&*self.db)
        .await?
        .ok_or(VideoStoreError::NotFound(video.id))?;

        video.thumbnail_url = thumbnail_url;
        debug!(video_id = %video.id, "updated video location");
        Ok(())
    }

    /// All records owned by `user_id`, newest first.
    pub async fn list_videos_for_user(&self, user_id: Uuid) -> VideoStoreResult<Vec<Video>> {
        let rows = sqlx::query_as::<_, Video>(&format!(
            "SELECT {} FROM videos WHERE user_id = ? ORDER BY created_at DESC",
            VIDEO_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&*self.db)
        .await?;

        Ok(rows)
    }
}
