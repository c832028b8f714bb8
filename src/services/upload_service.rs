//! src/services/upload_service.rs
//!
//! UploadService: the upload-and-publish pipeline.
//!
//! Handlers authenticate, validate the declared media type and stage the body;
//! this service owns every step after that: ownership checks, probing,
//! remuxing, publishing, persisting the location and resolving it for the
//! response. Failures abort the request. Nothing is retried or rolled back.

use crate::{
    config::VideoUrlMode,
    models::video::{InconsistentLocation, Video, VideoLocation, VideoView},
    services::{
        media_service::{MediaError, MediaTools, Orientation},
        publisher_service::{ObjectPublisher, PublishError},
        staging::ScratchFile,
        video_service::{VideoService, VideoStoreError},
    },
};
use base64::{Engine as _, engine::general_purpose};
use std::{io, sync::Arc, time::Duration};
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

/// Lifetime of URLs handed out for signed locations.
pub const PRESIGN_TTL: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("not authorized to modify video `{0}`")]
    NotOwner(Uuid),
    #[error(transparent)]
    Store(#[from] VideoStoreError),
    #[error("video stored as `{key}` but the record was not updated: {source}")]
    Record {
        key: String,
        source: VideoStoreError,
    },
    #[error(transparent)]
    Location(#[from] InconsistentLocation),
    #[error(transparent)]
    Media(#[from] MediaError),
    #[error("failed to read processed video: {0}")]
    Processed(#[from] io::Error),
    #[error(transparent)]
    Publish(#[from] PublishError),
}

pub type UploadResult<T> = Result<T, UploadError>;

/// Where published videos go and how their location is recorded.
#[derive(Clone, Debug)]
pub struct PublishTarget {
    pub bucket: String,
    pub region: String,
    pub endpoint: Option<String>,
    pub url_mode: VideoUrlMode,
}

impl PublishTarget {
    /// Public URL for `key` in the target bucket.
    pub fn direct_url(&self, key: &str) -> String {
        match &self.endpoint {
            Some(endpoint) => format!("{}/{}/{}", endpoint.trim_end_matches('/'), self.bucket, key),
            None => format!(
                "https://{}.s3.{}.amazonaws.com/{}",
                self.bucket, self.region, key
            ),
        }
    }

    fn location_for(&self, key: String) -> VideoLocation {
        match self.url_mode {
            VideoUrlMode::Signed => VideoLocation::Signed {
                bucket: self.bucket.clone(),
                key,
            },
            VideoUrlMode::Direct => VideoLocation::Direct {
                url: self.direct_url(&key),
            },
        }
    }
}

#[derive(Clone)]
pub struct UploadService {
    videos: VideoService,
    media: Arc<dyn MediaTools>,
    publisher: Arc<dyn ObjectPublisher>,
    target: PublishTarget,
}

impl UploadService {
    pub fn new(
        videos: VideoService,
        media: Arc<dyn MediaTools>,
        publisher: Arc<dyn ObjectPublisher>,
        target: PublishTarget,
    ) -> Self {
        Self {
            videos,
            media,
            publisher,
            target,
        }
    }

    /// Load `video_id` and check that `user_id` owns it.
    pub async fn owned_video(&self, video_id: Uuid, user_id: Uuid) -> UploadResult<Video> {
        let video = self.videos.get_video(video_id).await?;
        if video.user_id != user_id {
            warn!(%video_id, %user_id, owner = %video.user_id, "rejected non-owner");
            return Err(UploadError::NotOwner(video_id));
        }
        Ok(video)
    }

    /// Embed the thumbnail as a data URL and persist it.
    pub async fn attach_thumbnail(
        &self,
        mut video: Video,
        media_type: &str,
        data: &[u8],
    ) -> UploadResult<Video> {
        video.thumbnail_url = Some(data_url(media_type, data));
        self.videos.set_thumbnail(&mut video).await?;

        info!(video_id = %video.id, media_type, bytes = data.len(), "thumbnail stored");
        Ok(video)
    }

    /// Probe, remux, publish and record a staged mp4.
    ///
    /// `extension` is appended to the generated object key (including its dot,
    /// or empty). The staged file and the remuxed copy are removed when this
    /// returns, on every path.
    pub async fn publish_video(
        &self,
        mut video: Video,
        staged: ScratchFile,
        media_type: &str,
        extension: &str,
    ) -> UploadResult<Video> {
        let geometry = self.media.probe(staged.path()).await?;
        let orientation = Orientation::classify(geometry);
        info!(
            video_id = %video.id,
            width = geometry.width(),
            height = geometry.height(),
            ?orientation,
            "video inspected"
        );

        let processed = self.media.remux_faststart(staged.path()).await?;
        let processed = ScratchFile::adopt(processed).await?;
        drop(staged);

        let key = object_key(orientation, extension);
        self.publisher
            .put_file(&self.target.bucket, &key, processed.path(), media_type)
            .await?;
        info!(
            video_id = %video.id,
            bucket = %self.target.bucket,
            key = %key,
            bytes = processed.len(),
            "video published"
        );

        video.set_location(self.target.location_for(key.clone()));
        if let Err(err) = self.videos.set_video_location(&mut video).await {
            warn!(
                video_id = %video.id,
                bucket = %self.target.bucket,
                key = %key,
                error = %err,
                "object stored but record update failed; object is orphaned"
            );
            return Err(UploadError::Record { key, source: err });
        }

        Ok(video)
    }

    /// Turn a record into its response view, presigning private locations.
    pub async fn resolve(&self, video: Video) -> UploadResult<VideoView> {
        let url = match video.location()? {
            None => None,
            Some(VideoLocation::Direct { url }) => Some(url),
            Some(VideoLocation::Signed { bucket, key }) => {
                Some(self.publisher.presign_get(&bucket, &key, PRESIGN_TTL).await?)
            }
        };
        Ok(VideoView::new(video, url))
    }
}

/// `{orientation prefix}{128 random bits as hex}{extension}`.
pub fn object_key(orientation: Orientation, extension: &str) -> String {
    format!(
        "{}{}{}",
        orientation.key_prefix(),
        Uuid::new_v4().simple(),
        extension
    )
}

/// `data:<mime>;base64,<data>`
pub fn data_url(media_type: &str, data: &[u8]) -> String {
    format!(
        "data:{};base64,{}",
        media_type,
        general_purpose::STANDARD.encode(data)
    )
}
