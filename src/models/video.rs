//! Represents a video record and where its media lives.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use thiserror::Error;
use uuid::Uuid;

/// A video owned by a single user.
///
/// The row stores the video location in three nullable columns; use
/// [`Video::location`] and [`Video::set_location`] instead of touching them directly.
#[derive(Clone, FromRow, Debug)]
pub struct Video {
    /// Unique identifier for this video.
    pub id: Uuid,

    /// ID of the user that owns this video. Only the owner may change its media.
    pub user_id: Uuid,

    pub title: String,

    pub description: Option<String>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,

    /// Thumbnail as a `data:<mime>;base64,<data>` URI.
    pub thumbnail_url: Option<String>,

    /// Set for [`VideoLocation::Direct`].
    pub video_url: Option<String>,

    /// Set together with `video_key` for [`VideoLocation::Signed`].
    pub video_bucket: Option<String>,

    pub video_key: Option<String>,
}

/// Where an uploaded video can be fetched from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VideoLocation {
    /// A public URL returned as-is.
    Direct { url: String },

    /// A private object that is presigned every time it is read.
    Signed { bucket: String, key: String },
}

#[derive(Debug, Error)]
#[error("video `{0}` has inconsistent location columns")]
pub struct InconsistentLocation(pub Uuid);

impl Video {
    /// Build a fresh record with no media attached.
    pub fn new(user_id: Uuid, title: String, description: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            title,
            description,
            created_at: now,
            updated_at: now,
            thumbnail_url: None,
            video_url: None,
            video_bucket: None,
            video_key: None,
        }
    }

    /// Decode the location columns.
    ///
    /// Exactly one of `video_url` or the (`video_bucket`, `video_key`) pair may be set.
    pub fn location(&self) -> Result<Option<VideoLocation>, InconsistentLocation> {
        match (&self.video_url, &self.video_bucket, &self.video_key) {
            (None, None, None) => Ok(None),
            (Some(url), None, None) => Ok(Some(VideoLocation::Direct { url: url.clone() })),
            (None, Some(bucket), Some(key)) => Ok(Some(VideoLocation::Signed {
                bucket: bucket.clone(),
                key: key.clone(),
            })),
            _ => Err(InconsistentLocation(self.id)),
        }
    }

    pub fn set_location(&mut self, location: VideoLocation) {
        match location {
            VideoLocation::Direct { url } => {
                self.video_url = Some(url);
                self.video_bucket = None;
                self.video_key = None;
            }
            VideoLocation::Signed { bucket, key } => {
                self.video_url = None;
                self.video_bucket = Some(bucket);
                self.video_key = Some(key);
            }
        }
    }
}

/// JSON shape returned to clients.
///
/// `video_url` is already resolved: either the stored direct URL or a freshly
/// presigned one. It is never written back to the database.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct VideoView {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub thumbnail_url: Option<String>,
    pub video_url: Option<String>,
}

impl VideoView {
    pub fn new(video: Video, video_url: Option<String>) -> Self {
        Self {
            id: video.id,
            user_id: video.user_id,
            title: video.title,
            description: video.description,
            created_at: video.created_at,
            updated_at: video.updated_at,
            thumbnail_url: video.thumbnail_url,
            video_url,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signed_location_round_trips_through_columns() {
        let mut video = Video::new(Uuid::new_v4(), "clip".into(), None);
        let location = VideoLocation::Signed {
            bucket: "media-bucket".into(),
            key: "landscape-0f1e2d3c4b5a69788796a5b4c3d2e1f0.mp4".into(),
        };
        video.set_location(location.clone());

        assert_eq!(video.video_url, None);
        assert_eq!(video.location().unwrap(), Some(location));
    }

    #[test]
    fn keys_with_commas_survive_the_round_trip() {
        let mut video = Video::new(Uuid::new_v4(), "clip".into(), None);
        let location = VideoLocation::Signed {
            bucket: "b".into(),
            key: "odd,key.mp4".into(),
        };
        video.set_location(location.clone());
        assert_eq!(video.location().unwrap(), Some(location));
    }

    #[test]
    fn direct_location_clears_signed_columns() {
        let mut video = Video::new(Uuid::new_v4(), "clip".into(), None);
        video.set_location(VideoLocation::Signed {
            bucket: "b".into(),
            key: "k".into(),
        });
        video.set_location(VideoLocation::Direct {
            url: "https://b.s3.us-east-1.amazonaws.com/k".into(),
        });

        assert_eq!(video.video_bucket, None);
        assert_eq!(video.video_key, None);
        assert_eq!(
            video.location().unwrap(),
            Some(VideoLocation::Direct {
                url: "https://b.s3.us-east-1.amazonaws.com/k".into()
            })
        );
    }

    #[test]
    fn empty_record_has_no_location() {
        let video = Video::new(Uuid::new_v4(), "clip".into(), None);
        assert_eq!(video.location().unwrap(), None);
    }

    #[test]
    fn half_written_columns_are_rejected() {
        let mut video = Video::new(Uuid::new_v4(), "clip".into(), None);
        video.video_bucket = Some("b".into());
        assert!(video.location().is_err());

        video.video_key = Some("k".into());
        video.video_url = Some("https://example.com/k".into());
        assert!(video.location().is_err());
    }
}
